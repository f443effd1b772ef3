//! Load domain types, events, and errors.
//!
//! Pure data types for the preload scheduler. No I/O, networking, or
//! runtime dependencies allowed.
//!
//! # Structure
//!
//! - `types` - resource types, tag kinds, placeholders, and `LoadItem`
//! - `descriptor` - what callers hand to the queue before normalization
//! - `output` - raw and formatted results of a finished load
//! - `events` - notifications emitted by the queue
//! - `errors` - error taxonomy
//! - `snapshot` - point-in-time queue state

pub mod descriptor;
pub mod errors;
pub mod events;
pub mod output;
pub mod snapshot;
pub mod types;

pub use descriptor::{Descriptor, StructuredDescriptor};
pub use errors::{ErrorCategory, LoadError, LoadResult};
pub use events::LoadEvent;
pub use output::{
    ElementHandle, Formatted, ImageTag, LoadOutput, RawContent, ScriptTag, StyleTag, SvgTag,
    XmlDocument, XmlElement, XmlNode,
};
pub use snapshot::QueueSnapshot;
pub use types::{CompleteHandler, LoadItem, Placeholder, PlaceholderId, ResourceType, TagKind};
