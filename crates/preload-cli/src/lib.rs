//! Command-line front end for the preload queue.
//!
//! `preload fetch` loads sources or a manifest through a [`LoadQueue`] with a
//! progress display and prints a summary; `preload inspect` shows how sources
//! normalize without loading anything.
//!
//! [`LoadQueue`]: preload_queue::LoadQueue
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Used by the binary only
use dotenvy as _;
use tracing_subscriber as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod host;
pub mod parser;
pub mod presentation;
pub mod sources;

// Re-export primary types for convenient access
pub use bootstrap::{CliContext, bootstrap, compose};
pub use commands::{Commands, QueueArgs, SourceArgs};
pub use error::CliError;
pub use parser::Cli;
