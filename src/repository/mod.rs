//! Persistence layer.
//!
//! Records live in a single CSV file with a fixed column order; see
//! [`RecordStore`].

mod record_store;

pub use record_store::{AppendOutcome, RecordStore, StoreError};
