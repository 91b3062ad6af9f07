//! Workout records extracted from running-app screenshots.
//!
//! Every field is independently optional. A missing value stays `None` all the
//! way to the store, so "0 kcal" and "calories not shown" remain distinct.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Structured summary of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkoutRecord {
    /// Calendar date of the run.
    pub date: Option<NaiveDate>,
    /// Distance in kilometres, never negative.
    pub distance_km: Option<f64>,
    /// Elapsed time as shown by the app (e.g. "00:28:30").
    pub duration: Option<String>,
    /// Average pace as shown by the app (e.g. "5:29/km").
    pub pace: Option<String>,
    /// Energy in kilocalories.
    pub calories: Option<u64>,
}

impl WorkoutRecord {
    /// True when no field could be extracted.
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.distance_km.is_none()
            && self.duration.is_none()
            && self.pace.is_none()
            && self.calories.is_none()
    }

    /// Number of populated fields.
    pub fn populated_fields(&self) -> usize {
        [
            self.date.is_some(),
            self.distance_km.is_some(),
            self.duration.is_some(),
            self.pace.is_some(),
            self.calories.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }
}

/// Header of the persisted store, in wire order.
pub const STORE_COLUMNS: [&str; 6] = [
    "Image File",
    "Distance (km)",
    "Duration",
    "Pace",
    "Date",
    "Calories",
];

/// A workout record keyed by the screenshot it came from.
///
/// Field order matches [`STORE_COLUMNS`]; external readers of the CSV depend on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRow {
    #[serde(rename = "Image File")]
    pub image_file: String,
    #[serde(rename = "Distance (km)")]
    pub distance_km: Option<f64>,
    #[serde(rename = "Duration")]
    pub duration: Option<String>,
    #[serde(rename = "Pace")]
    pub pace: Option<String>,
    #[serde(rename = "Date")]
    pub date: Option<NaiveDate>,
    #[serde(rename = "Calories")]
    pub calories: Option<u64>,
}

impl StoredRow {
    pub fn new(image_file: impl Into<String>, record: &WorkoutRecord) -> Self {
        Self {
            image_file: image_file.into(),
            distance_km: record.distance_km,
            duration: record.duration.clone(),
            pace: record.pace.clone(),
            date: record.date,
            calories: record.calories,
        }
    }

    /// The workout portion of the row.
    pub fn record(&self) -> WorkoutRecord {
        WorkoutRecord {
            date: self.date,
            distance_km: self.distance_km,
            duration: self.duration.clone(),
            pace: self.pace.clone(),
            calories: self.calories,
        }
    }
}
