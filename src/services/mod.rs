//! Services that drive the pipeline over many inputs.

pub mod batch;

pub use batch::{scan_screenshots, BatchError, BatchEvent, BatchRunner, BatchSummary, ImageOutcome};
