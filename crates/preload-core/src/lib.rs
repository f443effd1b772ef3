//! Core domain types and ports for the preload scheduler.
//!
//! This crate holds the pure data model shared by every adapter:
//!
//! - `load` - items, descriptors, results, events, and errors
//! - `ports` - trait seams the scheduler drives (event emission, host elements)
//! - `config` - queue configuration
//!
//! No networking, no task spawning, no parsing of fetched payloads happens here.
#![deny(unused_crate_dependencies)]

pub mod config;
pub mod load;
pub mod ports;

// Re-export commonly used types for convenience
pub use config::{ConfigError, DEFAULT_LOAD_TIMEOUT, DEFAULT_MAX_CONNECTIONS, LoadQueueConfig};
pub use load::{
    CompleteHandler, Descriptor, ElementHandle, ErrorCategory, Formatted, ImageTag, LoadError,
    LoadEvent, LoadItem, LoadOutput, LoadResult, Placeholder, PlaceholderId, QueueSnapshot,
    RawContent, ResourceType, ScriptTag, StructuredDescriptor, StyleTag, SvgTag, TagKind,
    XmlDocument, XmlElement, XmlNode,
};
pub use ports::{
    ChannelEmitter, HostElement, HostElementFactory, HostSignal, LoadEventEmitterPort,
    NoopLoadEmitter, TracingEmitter,
};
