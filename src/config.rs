//! Analysis configuration.

use std::path::PathBuf;

pub const DEFAULT_GUN_PATH: &str = "gun_data.csv";
pub const DEFAULT_CENSUS_PATH: &str = "census_data.csv";
pub const DEFAULT_TOP_N: usize = 5;

/// Inputs and knobs for one analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub gun_path: PathBuf,
    pub census_path: PathBuf,
    /// Pinned `(early, late)` growth years; computed from coverage when `None`.
    pub reference_years: Option<(i32, i32)>,
    pub top_n: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            gun_path: PathBuf::from(DEFAULT_GUN_PATH),
            census_path: PathBuf::from(DEFAULT_CENSUS_PATH),
            reference_years: None,
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl AnalysisConfig {
    pub fn new(gun_path: impl Into<PathBuf>, census_path: impl Into<PathBuf>) -> Self {
        Self {
            gun_path: gun_path.into(),
            census_path: census_path.into(),
            ..Default::default()
        }
    }

    pub fn with_reference_years(mut self, early: i32, late: i32) -> Self {
        self.reference_years = Some((early, late));
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }
}
