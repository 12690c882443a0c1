//! Load → clean → aggregate, start to finish.

use crate::config::AnalysisConfig;
use crate::data::{
    BackgroundCheckTable, CensusTable, CleaningSummary, DataLoader, DataProcessor, LoaderError,
    ProcessorError,
};
use crate::stats::{ResearchReport, StatsCalculator, StatsError};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    Load(#[from] LoaderError),
    #[error(transparent)]
    Clean(#[from] ProcessorError),
    #[error(transparent)]
    Stats(#[from] StatsError),
}

/// Both cleaned tables and what cleaning changed.
pub struct CleanedData {
    pub checks: BackgroundCheckTable,
    pub census: CensusTable,
    pub summaries: Vec<CleaningSummary>,
}

/// Load and clean both source files.
pub fn load_and_clean(config: &AnalysisConfig) -> Result<CleanedData, AnalysisError> {
    let raw_checks = DataLoader::load_background_checks(&config.gun_path)?;
    let raw_census = DataLoader::load_census(&config.census_path)?;

    let (checks, check_summary) = DataProcessor::clean_background_checks(&raw_checks)?;
    let (census, census_summary) = DataProcessor::clean_census(&raw_census)?;

    Ok(CleanedData {
        checks,
        census,
        summaries: vec![check_summary, census_summary],
    })
}

/// Run the whole analysis described by `config`.
pub fn run_analysis(config: &AnalysisConfig) -> Result<ResearchReport, AnalysisError> {
    info!(
        gun = %config.gun_path.display(),
        census = %config.census_path.display(),
        "starting analysis"
    );
    let data = load_and_clean(config)?;

    let mut report = StatsCalculator::compute_report(&data.checks, &data.census, config)?;
    report.cleaning = data.summaries;
    Ok(report)
}
