//! Terminal presentation.

pub mod progress;
pub mod tables;

pub use progress::LoadProgressPrinter;
