//! NICS Census - Firearm Background Check & U.S. Census Data Analysis
//!
//! Loads FBI NICS background check counts and Census state facts, cleans
//! both into state-keyed tables, and computes five descriptive results.

pub mod charts;
pub mod config;
pub mod data;
pub mod pipeline;
pub mod stats;

pub use config::AnalysisConfig;
pub use pipeline::{load_and_clean, run_analysis, AnalysisError, CleanedData};
