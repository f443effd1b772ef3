//! Resource preloading queue.
//!
//! Schedules, orders and tracks resource loads on top of the domain types in
//! `preload-core`.
//!
//! - `manager` - the `LoadQueue` handle, driver tasks, manifests, chaining
//! - `queue` - pure scheduling state machine
//! - `normalizer` - descriptor to item resolution
//! - `plugins` - per-queue plugin registry
//! - `transport` - network and host-element loaders
//! - `progress` - per-item and aggregate progress
#![deny(unused_crate_dependencies)]

pub(crate) mod queue;

mod manager;
pub mod normalizer;
pub mod plugins;
pub mod progress;
pub mod transport;

pub use manager::{LoadBatch, LoadQueue, LoadQueueDeps, build_load_queue};
pub use normalizer::ItemNormalizer;
pub use plugins::{
    ItemOverride, PluginDecision, PluginDescriptor, PluginHandler, PluginRegistry, PluginRequest,
};
pub use transport::{HostElementLoader, LoadJob, Loader, NetworkLoader, ProgressUpdate, Strategy};

// Re-export core types for convenience
pub use preload_core::{
    ConfigError, Descriptor, Formatted, LoadError, LoadEvent, LoadItem, LoadOutput,
    LoadQueueConfig, QueueSnapshot, RawContent, ResourceType, StructuredDescriptor,
};
