//! Batch processing command.

use std::path::PathBuf;
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use super::helpers::{analysis_pipeline, with_backend};
use crate::config::{BackendPreference, Settings};
use crate::repository::RecordStore;
use crate::services::{BatchEvent, BatchRunner, ImageOutcome};

/// Process a screenshots directory.
pub fn cmd_process(
    settings: Settings,
    dir: Option<PathBuf>,
    output: Option<PathBuf>,
    backend: Option<BackendPreference>,
) -> anyhow::Result<()> {
    let settings = with_backend(settings, backend);
    let dir = dir.unwrap_or_else(|| settings.paths.screenshots_dir.clone());
    let output = output.unwrap_or_else(|| settings.paths.output_file.clone());

    let pipeline = analysis_pipeline(&settings)?;
    println!(
        "{} Text extraction: {}",
        style("→").cyan(),
        pipeline.backend().availability_hint()
    );

    let runner = BatchRunner::new(
        pipeline,
        RecordStore::new(&output),
        Duration::from_millis(settings.pipeline.pacing_delay_ms),
    );

    let mut progress: Option<ProgressBar> = None;
    let summary = runner.run(&dir, |event| match event {
        BatchEvent::Started { total } => {
            println!(
                "{} Processing {} screenshots from {}",
                style("→").cyan(),
                total,
                dir.display()
            );
            let bar = ProgressBar::new(total as u64);
            if let Ok(bar_style) = ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
            {
                bar.set_style(bar_style.progress_chars("█▓░"));
            }
            progress = Some(bar);
        }
        BatchEvent::ImageStarted { file_name, .. } => {
            if let Some(ref bar) = progress {
                bar.set_message(file_name.to_string());
            }
        }
        BatchEvent::ImageFinished {
            file_name, outcome, ..
        } => {
            if let Some(ref bar) = progress {
                if let ImageOutcome::Failed(e) = outcome {
                    bar.suspend(|| {
                        eprintln!("  {} {} failed: {}", style("✗").red(), file_name, e);
                    });
                }
                bar.inc(1);
            }
        }
        BatchEvent::Pausing { delay } => {
            if let Some(ref bar) = progress {
                bar.set_message(format!("waiting {}ms", delay.as_millis()));
            }
        }
    })?;

    if let Some(bar) = progress {
        bar.finish_and_clear();
    }

    println!(
        "{} Done: {} stored, {} already present, {} failed",
        style("✓").green(),
        summary.stored,
        summary.duplicates,
        summary.failed
    );
    println!("  Records: {}", output.display());
    Ok(())
}
