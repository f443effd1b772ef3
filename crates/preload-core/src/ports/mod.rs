//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces the scheduler expects from its surroundings.
//! They contain no implementation details and use only domain types.

pub mod event_emitter;
pub mod host_element;

pub use event_emitter::{ChannelEmitter, LoadEventEmitterPort, NoopLoadEmitter, TracingEmitter};
pub use host_element::{HostElement, HostElementFactory, HostSignal};
