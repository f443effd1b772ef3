//! Command handlers.
//!
//! Each handler parses nothing itself; it receives typed arguments from the
//! parser and drives the queue or the normalizer.

pub mod fetch;
pub mod inspect;
