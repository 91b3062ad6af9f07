//! Initialize command.

use console::style;

use crate::config::Settings;
use crate::repository::RecordStore;

/// Create the screenshots directory and an empty record store.
pub fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    let screenshots_dir = &settings.paths.screenshots_dir;
    std::fs::create_dir_all(screenshots_dir)?;
    println!(
        "  {} Screenshots directory: {}",
        style("✓").green(),
        screenshots_dir.display()
    );

    let store = RecordStore::new(&settings.paths.output_file);
    store.ensure_exists()?;
    println!(
        "  {} Record store: {}",
        style("✓").green(),
        store.path().display()
    );

    if settings.api.api_key.is_none() {
        println!(
            "{} No API key configured. Set RUNLOG_API_KEY (or add it to .env)",
            style("!").yellow()
        );
    }

    println!("{} Initialized runlog", style("✓").green());
    Ok(())
}
