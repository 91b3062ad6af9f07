//! Workout record extraction from running app screenshots.
//!
//! A screenshot goes through two stages: text extraction ([`ocr`]) and
//! structured field extraction by a language model ([`llm`]), orchestrated by
//! [`pipeline::AnalysisPipeline`]. New records are appended to a CSV store
//! ([`repository::RecordStore`]), at most one row per screenshot.

#![allow(clippy::should_implement_trait)]

pub mod cli;
pub mod config;
pub mod llm;
pub mod models;
pub mod ocr;
pub mod pipeline;
pub mod repository;
pub mod services;
pub mod utils;
