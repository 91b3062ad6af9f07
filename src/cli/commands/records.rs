//! List stored records.

use std::path::PathBuf;

use console::style;

use super::helpers::truncate;
use crate::config::Settings;
use crate::models::STORE_COLUMNS;
use crate::repository::RecordStore;

pub fn cmd_records(settings: &Settings, output: Option<PathBuf>) -> anyhow::Result<()> {
    let store = RecordStore::new(output.unwrap_or_else(|| settings.paths.output_file.clone()));
    let rows = store.load()?;

    if rows.is_empty() {
        println!(
            "{} No records in {}",
            style("!").yellow(),
            store.path().display()
        );
        return Ok(());
    }

    println!(
        "{:<32} {:>13} {:>10} {:>10} {:>12} {:>9}",
        STORE_COLUMNS[0],
        STORE_COLUMNS[1],
        STORE_COLUMNS[2],
        STORE_COLUMNS[3],
        STORE_COLUMNS[4],
        STORE_COLUMNS[5]
    );
    println!("{}", "-".repeat(91));
    for row in &rows {
        println!(
            "{:<32} {:>13} {:>10} {:>10} {:>12} {:>9}",
            truncate(&row.image_file, 32),
            row.distance_km.map(|d| d.to_string()).unwrap_or_default(),
            row.duration.as_deref().unwrap_or(""),
            row.pace.as_deref().unwrap_or(""),
            row.date.map(|d| d.to_string()).unwrap_or_default(),
            row.calories.map(|c| c.to_string()).unwrap_or_default(),
        );
    }
    println!("\n{} {} records", style("✓").green(), rows.len());
    Ok(())
}
