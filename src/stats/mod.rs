//! Stats module - Research question computations

mod calculator;
pub mod coverage;

pub use calculator::{
    CategoryEstimate, GrowthRanking, JoinMismatch, PovertyCorrelation, PovertyPoint,
    ResearchReport, StateGrowth, StatsCalculator, StatsError, YearTotal, EDUCATION_LABELS,
    ETHNICITY_LABELS, OUTLIER_ROWS,
};
