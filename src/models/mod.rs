//! Data models for runlog.

mod workout;

pub use workout::{StoredRow, WorkoutRecord, STORE_COLUMNS};
