//! Statistics Calculator Module
//! Computes the five research results over the cleaned tables.

use super::coverage::complete_years;
use crate::config::AnalysisConfig;
use crate::data::schema::*;
use crate::data::{
    f64_values, i64_values, str_values, BackgroundCheckTable, CensusTable, CleaningSummary,
};
use polars::prelude::*;
use serde::Serialize;
use statrs::statistics::Statistics;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{debug, info};

/// Column holding the per-state mean of totals.
pub const TOTALS_MEAN: &str = "totals_mean";

/// Rows shown in the poverty outlier table.
pub const OUTLIER_ROWS: usize = 5;

/// Display labels for the ethnicity columns.
pub const ETHNICITY_LABELS: [(&str, &str); 7] = [
    ("African", AFRICAN_AMERICAN),
    ("Asian", ASIAN),
    ("Hawaiian", PACIFIC_ISLANDER),
    ("Hispanic", HISPANIC),
    ("Native Indian/Alaskan", NATIVE_AMERICAN),
    ("Multi Racial", TWO_OR_MORE),
    ("Caucasian", WHITE_MEAN),
];

/// Display labels for the education columns.
pub const EDUCATION_LABELS: [(&str, &str); 2] = [
    ("High School Diploma", HIGH_SCHOOL),
    ("Bachelor's Degree", BACHELORS),
];

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("column '{0}' has no values")]
    NoValues(String),
    #[error("no year has complete monthly coverage")]
    NoCompleteYears,
    #[error("year {0} does not have complete monthly coverage")]
    IncompleteYear(i32),
}

/// Estimated average monthly checks attributed to one population category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryEstimate {
    pub label: String,
    pub column: String,
    pub mean_fraction: f64,
    pub estimated_checks: f64,
}

/// One state in the poverty comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PovertyPoint {
    pub state: String,
    pub totals_mean: f64,
    pub persons_in_poverty: f64,
    /// `persons_in_poverty × totals_mean`
    pub poverty_weighted_checks: f64,
    /// `persons_in_poverty × 100`
    pub poverty_percent: f64,
}

/// A state present in only one table; excluded from the join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinMismatch {
    pub state: String,
    pub missing_from: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PovertyCorrelation {
    /// Joined states, sorted by name.
    pub points: Vec<PovertyPoint>,
    /// Highest `(totals_mean, persons_in_poverty)` first.
    pub outliers: Vec<PovertyPoint>,
    /// Pearson r between poverty percent and mean monthly checks.
    pub pearson_r: Option<f64>,
    pub excluded: Vec<JoinMismatch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateGrowth {
    pub state: String,
    pub early_total: i64,
    pub late_total: i64,
    pub difference: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrowthRanking {
    pub early_year: i32,
    pub late_year: i32,
    pub top: Vec<StateGrowth>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearTotal {
    pub year: i32,
    pub total: i64,
}

/// Everything the analysis produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResearchReport {
    pub cleaning: Vec<CleaningSummary>,
    pub mean_monthly_checks: f64,
    pub ethnicity: Vec<CategoryEstimate>,
    pub education: Vec<CategoryEstimate>,
    pub poverty: PovertyCorrelation,
    pub growth: GrowthRanking,
    pub trend: Vec<YearTotal>,
}

/// Handles the research computations.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Run all five computations.
    pub fn compute_report(
        checks: &BackgroundCheckTable,
        census: &CensusTable,
        config: &AnalysisConfig,
    ) -> Result<ResearchReport, StatsError> {
        let mean_monthly_checks = Self::mean_monthly_checks(checks)?;
        let report = ResearchReport {
            cleaning: Vec::new(),
            mean_monthly_checks,
            ethnicity: Self::ethnicity_distribution(checks, census)?,
            education: Self::education_distribution(checks, census)?,
            poverty: Self::poverty_correlation(checks, census, OUTLIER_ROWS)?,
            growth: Self::growth_by_state(checks, config.reference_years, config.top_n)?,
            trend: Self::yearly_trend(checks)?,
        };
        info!(
            mean_monthly_checks,
            states = report.poverty.points.len(),
            years = report.trend.len(),
            "computed research report"
        );
        Ok(report)
    }

    /// Mean of `totals` over all state-months, truncated to whole checks.
    pub fn mean_monthly_checks(checks: &BackgroundCheckTable) -> Result<f64, StatsError> {
        let totals: Vec<f64> = i64_values(checks.frame(), TOTALS)?
            .into_iter()
            .flatten()
            .map(|v| v as f64)
            .collect();
        if totals.is_empty() {
            return Err(StatsError::NoValues(TOTALS.to_string()));
        }
        Ok(totals.iter().mean().trunc())
    }

    /// Average monthly checks per ethnicity, assuming checks follow population share.
    pub fn ethnicity_distribution(
        checks: &BackgroundCheckTable,
        census: &CensusTable,
    ) -> Result<Vec<CategoryEstimate>, StatsError> {
        let mean = Self::mean_monthly_checks(checks)?;
        Self::estimate_by_fraction(census, &ETHNICITY_LABELS, mean)
    }

    /// Average monthly checks per education level, assuming checks follow population share.
    pub fn education_distribution(
        checks: &BackgroundCheckTable,
        census: &CensusTable,
    ) -> Result<Vec<CategoryEstimate>, StatsError> {
        let mean = Self::mean_monthly_checks(checks)?;
        Self::estimate_by_fraction(census, &EDUCATION_LABELS, mean)
    }

    /// `mean(fraction across states) × mean_checks` for each labelled column.
    pub fn estimate_by_fraction(
        census: &CensusTable,
        columns: &[(&str, &str)],
        mean_checks: f64,
    ) -> Result<Vec<CategoryEstimate>, StatsError> {
        columns
            .iter()
            .map(|(label, column)| -> Result<CategoryEstimate, StatsError> {
                let fractions = census.fractions(column)?;
                let present: Vec<f64> = fractions.into_iter().flatten().collect();
                if present.is_empty() {
                    return Err(StatsError::NoValues(column.to_string()));
                }
                let mean_fraction = present.iter().mean();
                Ok(CategoryEstimate {
                    label: label.to_string(),
                    column: column.to_string(),
                    mean_fraction,
                    estimated_checks: mean_fraction * mean_checks,
                })
            })
            .collect()
    }

    /// Mean monthly totals for each state.
    pub fn state_means(checks: &BackgroundCheckTable) -> PolarsResult<DataFrame> {
        checks
            .frame()
            .clone()
            .lazy()
            .group_by([col(STATE)])
            .agg([col(TOTALS)
                .cast(DataType::Float64)
                .mean()
                .alias(TOTALS_MEAN)])
            .sort([STATE], SortMultipleOptions::default())
            .collect()
    }

    /// Join per-state mean checks with poverty rates.
    ///
    /// States missing from either table are excluded and reported, not
    /// treated as errors.
    pub fn poverty_correlation(
        checks: &BackgroundCheckTable,
        census: &CensusTable,
        outlier_rows: usize,
    ) -> Result<PovertyCorrelation, StatsError> {
        let means = Self::state_means(checks)?;
        let poverty = census.frame().select([STATE, POVERTY])?;

        let merged = means
            .clone()
            .lazy()
            .inner_join(poverty.clone().lazy(), col(STATE), col(STATE))
            .sort(
                [TOTALS_MEAN, POVERTY],
                SortMultipleOptions::default()
                    .with_order_descending(true)
                    .with_nulls_last(true),
            )
            .collect()?;

        let states = str_values(&merged, STATE)?;
        let totals = f64_values(&merged, TOTALS_MEAN)?;
        let rates = f64_values(&merged, POVERTY)?;

        let ranked: Vec<PovertyPoint> = states
            .into_iter()
            .zip(totals)
            .zip(rates)
            .filter_map(|((state, totals_mean), rate)| {
                let state = state?;
                match (totals_mean, rate) {
                    (Some(totals_mean), Some(rate)) => Some(PovertyPoint {
                        state,
                        totals_mean,
                        persons_in_poverty: rate,
                        poverty_weighted_checks: rate * totals_mean,
                        poverty_percent: rate * 100.0,
                    }),
                    _ => {
                        debug!(state = %state, "skipping state without totals or poverty rate");
                        None
                    }
                }
            })
            .collect();

        let outliers = ranked.iter().take(outlier_rows).cloned().collect();
        let mut points = ranked;
        points.sort_by(|a, b| a.state.cmp(&b.state));

        let excluded = Self::join_mismatches(&means, &poverty)?;
        if !excluded.is_empty() {
            debug!(count = excluded.len(), "states excluded from poverty join");
        }

        Ok(PovertyCorrelation {
            pearson_r: Self::pearson(&points),
            points,
            outliers,
            excluded,
        })
    }

    /// Per-state growth between two complete years, top `top_n` by difference.
    ///
    /// Without `reference_years`, the earliest and latest complete years are used.
    pub fn growth_by_state(
        checks: &BackgroundCheckTable,
        reference_years: Option<(i32, i32)>,
        top_n: usize,
    ) -> Result<GrowthRanking, StatsError> {
        let complete = complete_years(checks)?;
        let (early_year, late_year) = match reference_years {
            Some((early, late)) => {
                for year in [early, late] {
                    if !complete.contains(&year) {
                        return Err(StatsError::IncompleteYear(year));
                    }
                }
                (early, late)
            }
            None => match (complete.first(), complete.last()) {
                (Some(first), Some(last)) => (*first, *last),
                _ => return Err(StatsError::NoCompleteYears),
            },
        };

        let sums = Self::state_year_sums(checks)?;
        let early = sums.get(&early_year).cloned().unwrap_or_default();
        let late = sums.get(&late_year).cloned().unwrap_or_default();

        let mut growth: Vec<StateGrowth> = late
            .iter()
            .filter_map(|(state, late_total)| {
                let early_total = *early.get(state)?;
                Some(StateGrowth {
                    state: state.clone(),
                    early_total,
                    late_total: *late_total,
                    difference: late_total - early_total,
                })
            })
            .collect();

        growth.sort_by(|a, b| {
            b.difference
                .cmp(&a.difference)
                .then_with(|| a.state.cmp(&b.state))
        });
        growth.truncate(top_n);

        Ok(GrowthRanking {
            early_year,
            late_year,
            top: growth,
        })
    }

    /// Total checks per complete year, ascending by year.
    pub fn yearly_trend(checks: &BackgroundCheckTable) -> Result<Vec<YearTotal>, StatsError> {
        let complete: BTreeSet<i32> = complete_years(checks)?.into_iter().collect();

        let sums = checks
            .frame()
            .clone()
            .lazy()
            .group_by([col(YEAR)])
            .agg([col(TOTALS).sum()])
            .sort([YEAR], SortMultipleOptions::default())
            .collect()?;

        let years = i64_values(&sums, YEAR)?;
        let totals = i64_values(&sums, TOTALS)?;

        Ok(years
            .into_iter()
            .zip(totals)
            .filter_map(|(year, total)| {
                let year = year? as i32;
                complete.contains(&year).then(|| YearTotal {
                    year,
                    total: total.unwrap_or_default(),
                })
            })
            .collect())
    }

    /// Sum of totals keyed by year, then state.
    fn state_year_sums(
        checks: &BackgroundCheckTable,
    ) -> PolarsResult<BTreeMap<i32, BTreeMap<String, i64>>> {
        let sums = checks
            .frame()
            .clone()
            .lazy()
            .group_by([col(STATE), col(YEAR)])
            .agg([col(TOTALS).sum()])
            .collect()?;

        let states = str_values(&sums, STATE)?;
        let years = i64_values(&sums, YEAR)?;
        let totals = i64_values(&sums, TOTALS)?;

        let mut by_year: BTreeMap<i32, BTreeMap<String, i64>> = BTreeMap::new();
        for ((state, year), total) in states.into_iter().zip(years).zip(totals) {
            if let (Some(state), Some(year)) = (state, year) {
                by_year
                    .entry(year as i32)
                    .or_default()
                    .insert(state, total.unwrap_or_default());
            }
        }
        Ok(by_year)
    }

    fn join_mismatches(
        means: &DataFrame,
        poverty: &DataFrame,
    ) -> PolarsResult<Vec<JoinMismatch>> {
        let checked: BTreeSet<String> = str_values(means, STATE)?.into_iter().flatten().collect();
        let counted: BTreeSet<String> = str_values(poverty, STATE)?.into_iter().flatten().collect();

        let missing_census = checked.difference(&counted).map(|state| JoinMismatch {
            state: state.clone(),
            missing_from: CENSUS_TABLE,
        });
        let missing_checks = counted.difference(&checked).map(|state| JoinMismatch {
            state: state.clone(),
            missing_from: GUN_TABLE,
        });
        Ok(missing_census.chain(missing_checks).collect())
    }

    /// Pearson correlation of poverty percent against mean monthly checks.
    fn pearson(points: &[PovertyPoint]) -> Option<f64> {
        if points.len() < 2 {
            return None;
        }
        let x: Vec<f64> = points.iter().map(|p| p.poverty_percent).collect();
        let y: Vec<f64> = points.iter().map(|p| p.totals_mean).collect();

        let covariance = x.iter().covariance(y.iter());
        let r = covariance / (x.iter().std_dev() * y.iter().std_dev());
        r.is_finite().then_some(r)
    }
}
