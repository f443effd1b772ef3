//! Byte transport for the preload network strategy.
//!
//! [`HttpBackend`] is the seam the network loader fetches through.
//! [`ReqwestBackend`] serves `http`/`https` with reqwest and `file` URLs from
//! the local filesystem; `FakeBackend` (feature `test-utils`) returns canned
//! bodies for tests.
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

mod backend;
mod config;
mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use backend::{Body, BodyKind, FetchedBody, HttpBackend, ProgressFn, ReqwestBackend, resolve_url};
pub use config::HttpClientConfig;
pub use error::{HttpError, HttpResult};
