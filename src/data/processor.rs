//! Data Processor Module
//! Cleans the raw tables into typed, state-keyed tables.
//!
//! Every step takes a table by reference and returns a new one, so the
//! pipeline can be run and tested one step at a time.

use super::normalize::{
    normalize_header, parse_count, parse_proportion, source_column_name, split_month,
    substitute_placeholder, ParseError, PLACEHOLDER_VALUE,
};
use super::schema::*;
use super::tables::{f64_values, str_values, BackgroundCheckTable, CensusTable};
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
}

/// What a cleaning pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleaningSummary {
    pub table: String,
    pub rows_in: usize,
    pub duplicates_removed: usize,
    pub rows_filtered: usize,
    pub placeholders_replaced: usize,
    pub parse_failures: usize,
    pub rows_out: usize,
}

/// Handles data cleaning and transformation operations.
pub struct DataProcessor;

impl DataProcessor {
    /// Clean the raw background check table.
    ///
    /// Output columns: [state, year, month_no, totals]
    pub fn clean_background_checks(
        raw: &DataFrame,
    ) -> Result<(BackgroundCheckTable, CleaningSummary), ProcessorError> {
        let mut summary = CleaningSummary {
            table: GUN_TABLE.to_string(),
            rows_in: raw.height(),
            ..Default::default()
        };

        let df = Self::select_columns(raw, GUN_TABLE, &GUN_COLUMNS)?;
        let deduped = Self::drop_duplicates(&df)?;
        summary.duplicates_removed = df.height() - deduped.height();

        let states = Self::keep_us_states(&deduped)?;
        summary.rows_filtered = deduped.height() - states.height();

        let covered: BTreeSet<String> =
            str_values(&states, STATE)?.into_iter().flatten().collect();
        if covered.len() < US_STATES.len() {
            warn!(
                states = covered.len(),
                expected = US_STATES.len(),
                "background checks do not cover every state"
            );
        }

        let dated = Self::split_month_column(&states)?;
        let (typed, failures) = Self::parse_totals(&dated)?;
        summary.parse_failures = failures;

        let df = typed.select([STATE, YEAR, MONTH_NO, TOTALS])?;
        summary.rows_out = df.height();
        info!(?summary, "cleaned background checks");

        Ok((BackgroundCheckTable::from_frame(df)?, summary))
    }

    /// Clean the raw census table.
    ///
    /// Output columns: [state, population_estimates, ethnicities..., education..., persons_in_poverty]
    pub fn clean_census(raw: &DataFrame) -> Result<(CensusTable, CleaningSummary), ProcessorError> {
        let mut summary = CleaningSummary {
            table: CENSUS_TABLE.to_string(),
            rows_in: raw.height(),
            ..Default::default()
        };

        let deduped = Self::drop_duplicates(raw)?;
        summary.duplicates_removed = raw.height() - deduped.height();

        let transposed = Self::transpose_census(&deduped)?;
        let states = Self::keep_us_states(&transposed)?;
        summary.rows_filtered = transposed.height() - states.height();
        Self::ensure_unique_states(&states)?;

        let mut columns = vec![STATE, POPULATION];
        columns.extend(CENSUS_PROPORTIONS);
        let df = Self::select_columns(&states, CENSUS_TABLE, &columns)?;

        let (df, replaced) = Self::replace_placeholders(&df)?;
        summary.placeholders_replaced = replaced;

        let (df, proportion_failures) = Self::normalize_units(&df, &CENSUS_PROPORTIONS)?;
        let (df, population_failures) = Self::parse_population(&df)?;
        summary.parse_failures = proportion_failures + population_failures;

        let df = Self::derive_white_mean(&df)?;
        summary.rows_out = df.height();
        info!(?summary, "cleaned census");

        Ok((CensusTable::from_frame(df)?, summary))
    }

    /// Keep only the named columns, failing on the first one that is absent.
    pub fn select_columns(
        df: &DataFrame,
        table: &'static str,
        columns: &[&str],
    ) -> Result<DataFrame, ProcessorError> {
        require_columns(df, table, columns)?;
        Ok(df.select(columns.iter().copied())?)
    }

    /// Drop exact duplicate rows, keeping the first occurrence in order.
    pub fn drop_duplicates(df: &DataFrame) -> PolarsResult<DataFrame> {
        df.clone()
            .lazy()
            .unique_stable(None, UniqueKeepStrategy::First)
            .collect()
    }

    /// Keep rows whose `state` is one of the 50 U.S. states.
    ///
    /// The kept `state` values are stored trimmed.
    pub fn keep_us_states(df: &DataFrame) -> PolarsResult<DataFrame> {
        let states: Vec<Option<String>> = str_values(df, STATE)?
            .into_iter()
            .map(|s| s.map(|s| s.trim().to_string()))
            .collect();
        let mask: BooleanChunked = states
            .iter()
            .map(|s| s.as_deref().is_some_and(is_us_state))
            .collect();

        let dropped: BTreeSet<&str> = states
            .iter()
            .filter_map(|s| s.as_deref())
            .filter(|s| !is_us_state(s))
            .collect();
        if !dropped.is_empty() {
            info!(?dropped, "dropping non-state rows");
        }

        let mut out = df.clone();
        out.with_column(Column::new(STATE.into(), states))?;
        out.filter(&mask)
    }

    /// Turn the fact-per-row census into a state-per-row table.
    ///
    /// The `Fact` column supplies the new column labels, each remaining
    /// source column becomes one row, and the metadata columns are dropped.
    pub fn transpose_census(raw: &DataFrame) -> Result<DataFrame, ProcessorError> {
        require_columns(raw, CENSUS_TABLE, &[FACT])?;

        let mut labels = vec![Some(STATE.to_string())];
        labels.extend(str_values(raw, FACT)?);
        let header = normalize_header(&labels);

        let mut rows: Vec<(String, Vec<Option<String>>)> = Vec::new();
        for column in raw.get_columns() {
            let name = column.name().to_string();
            if CENSUS_META_COLUMNS.contains(&name.as_str()) {
                continue;
            }
            let state = source_column_name(&name).to_string();
            rows.push((state, str_values(raw, &name)?));
        }

        if rows.is_empty() {
            return Err(SchemaError::TooFewRows {
                table: CENSUS_TABLE,
                expected: 1,
                found: 0,
            }
            .into());
        }

        let mut columns = Vec::with_capacity(header.len());
        columns.push(Column::new(
            header[0].as_str().into(),
            rows.iter().map(|(state, _)| state.clone()).collect::<Vec<_>>(),
        ));
        for (idx, name) in header.iter().enumerate().skip(1) {
            let values: Vec<Option<String>> =
                rows.iter().map(|(_, cells)| cells[idx - 1].clone()).collect();
            columns.push(Column::new(name.as_str().into(), values));
        }

        debug!(
            states = rows.len(),
            facts = header.len() - 1,
            "transposed census"
        );
        Ok(DataFrame::new(columns)?)
    }

    /// Replace the `Z` sentinel with `0.0%` in every string column.
    ///
    /// Returns the new table and the number of cells replaced.
    pub fn replace_placeholders(df: &DataFrame) -> PolarsResult<(DataFrame, usize)> {
        let mut out = df.clone();
        let mut replaced = 0;

        for column in df.get_columns() {
            if column.dtype() != &DataType::String {
                continue;
            }
            let values: Vec<Option<String>> = column
                .str()?
                .into_iter()
                .map(|v| {
                    v.map(|s| {
                        let substituted = substitute_placeholder(s);
                        if substituted == PLACEHOLDER_VALUE && s != PLACEHOLDER_VALUE {
                            replaced += 1;
                        }
                        substituted.to_string()
                    })
                })
                .collect();
            out.with_column(Column::new(column.name().clone(), values))?;
        }

        if replaced > 0 {
            debug!(replaced, "substituted placeholder cells");
        }
        Ok((out, replaced))
    }

    /// Convert percentage and decimal strings into `Float64` fractions.
    ///
    /// Numeric columns are only range checked. Cells that fail to parse or
    /// fall outside [0, 1] become null and are counted.
    pub fn normalize_units(df: &DataFrame, columns: &[&str]) -> PolarsResult<(DataFrame, usize)> {
        let mut out = df.clone();
        let mut failures = 0;

        for name in columns {
            let column = df.column(name)?;
            let parsed: Vec<Option<Result<f64, ParseError>>> = if column.dtype()
                == &DataType::String
            {
                column
                    .str()?
                    .into_iter()
                    .map(|cell| cell.map(parse_proportion))
                    .collect()
            } else {
                column
                    .cast(&DataType::Float64)?
                    .f64()?
                    .into_iter()
                    .map(|cell| {
                        cell.map(|v| {
                            if (0.0..=1.0).contains(&v) {
                                Ok(v)
                            } else {
                                Err(ParseError::OutOfRange(v))
                            }
                        })
                    })
                    .collect()
            };

            let values: Vec<Option<f64>> = parsed
                .into_iter()
                .map(|cell| match cell? {
                    Ok(v) => Some(v),
                    Err(e) => {
                        debug!(column = *name, error = %e, "unparseable proportion");
                        failures += 1;
                        None
                    }
                })
                .collect();
            out.with_column(Column::new((*name).into(), values))?;
        }

        if failures > 0 {
            warn!(failures, "proportion cells set to missing");
        }
        Ok((out, failures))
    }

    /// Parse `population_estimates` into integers.
    pub fn parse_population(df: &DataFrame) -> PolarsResult<(DataFrame, usize)> {
        Self::parse_counts(df, POPULATION)
    }

    /// Parse `totals` into integers.
    pub fn parse_totals(df: &DataFrame) -> PolarsResult<(DataFrame, usize)> {
        Self::parse_counts(df, TOTALS)
    }

    fn parse_counts(df: &DataFrame, name: &str) -> PolarsResult<(DataFrame, usize)> {
        let column = df.column(name)?;
        if column.dtype() != &DataType::String {
            let mut out = df.clone();
            out.with_column(column.cast(&DataType::Int64)?)?;
            return Ok((out, 0));
        }

        let mut failures = 0;
        let values: Vec<Option<i64>> = column
            .str()?
            .into_iter()
            .map(|cell| {
                let cell = cell?;
                match parse_count(cell) {
                    Ok(v) => Some(v),
                    Err(e) => {
                        debug!(column = name, error = %e, "unparseable count");
                        failures += 1;
                        None
                    }
                }
            })
            .collect();

        let mut out = df.clone();
        out.with_column(Column::new(name.into(), values))?;
        if failures > 0 {
            warn!(column = name, failures, "count cells set to missing");
        }
        Ok((out, failures))
    }

    /// Split `month` (`YYYY-MM`) into integer `year` and `month_no`, then drop it.
    pub fn split_month_column(df: &DataFrame) -> Result<DataFrame, ProcessorError> {
        let months = str_values(df, MONTH)?;
        let mut years = Vec::with_capacity(months.len());
        let mut month_nos = Vec::with_capacity(months.len());

        for raw in &months {
            let (year, month) = raw.as_deref().and_then(split_month).ok_or_else(|| {
                SchemaError::MalformedValue {
                    table: GUN_TABLE,
                    column: MONTH.to_string(),
                    value: raw.clone().unwrap_or_default(),
                }
            })?;
            years.push(year);
            month_nos.push(month as i32);
        }

        let mut out = df.drop(MONTH)?;
        out.with_column(Column::new(YEAR.into(), years))?;
        out.with_column(Column::new(MONTH_NO.into(), month_nos))?;
        Ok(out)
    }

    /// Replace the two white population columns with their mean.
    pub fn derive_white_mean(df: &DataFrame) -> PolarsResult<DataFrame> {
        let white = f64_values(df, WHITE)?;
        let non_hispanic = f64_values(df, WHITE_NON_HISPANIC)?;

        let mean: Vec<Option<f64>> = white
            .iter()
            .zip(&non_hispanic)
            .map(|(a, b)| Some((a.as_ref()? + b.as_ref()?) / 2.0))
            .collect();

        let mut out = df.drop(WHITE)?.drop(WHITE_NON_HISPANIC)?;
        out.with_column(Column::new(WHITE_MEAN.into(), mean))?;
        Ok(out)
    }

    fn ensure_unique_states(df: &DataFrame) -> Result<(), ProcessorError> {
        let mut seen = BTreeSet::new();
        for state in str_values(df, STATE)?.into_iter().flatten() {
            if !seen.insert(state.clone()) {
                return Err(SchemaError::DuplicateState {
                    table: CENSUS_TABLE,
                    state,
                }
                .into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gun_frame(rows: &[(&str, &str, &str)]) -> DataFrame {
        DataFrame::new(vec![
            Column::new(
                MONTH.into(),
                rows.iter().map(|r| r.0).collect::<Vec<_>>(),
            ),
            Column::new(
                STATE.into(),
                rows.iter().map(|r| r.1).collect::<Vec<_>>(),
            ),
            Column::new("permit".into(), vec!["1"; rows.len()]),
            Column::new(
                TOTALS.into(),
                rows.iter().map(|r| r.2).collect::<Vec<_>>(),
            ),
        ])
        .unwrap()
    }

    fn census_frame() -> DataFrame {
        census_frame_with("4,863,300")
    }

    fn census_frame_with(alabama_population: &str) -> DataFrame {
        let facts = vec![
            Some("Population estimates, July 1, 2016,  (V2016)"),
            Some("White alone, percent, July 1, 2016,  (V2016)"),
            Some("Black or African American alone, percent, July 1, 2016,  (V2016)"),
            Some("American Indian and Alaska Native alone, percent, July 1, 2016,  (V2016)"),
            Some("Asian alone, percent, July 1, 2016,  (V2016)"),
            Some("Native Hawaiian and Other Pacific Islander alone, percent, July 1, 2016,  (V2016)"),
            Some("Two or More Races, percent, July 1, 2016,  (V2016)"),
            Some("Hispanic or Latino, percent, July 1, 2016,  (V2016)"),
            Some("White alone, not Hispanic or Latino, percent, July 1, 2016,  (V2016)"),
            Some("High school graduate or higher, percent of persons age 25 years+, 2011-2015"),
            Some("Bachelor's degree or higher, percent of persons age 25 years+, 2011-2015"),
            Some("Persons in poverty, percent"),
            None,
            None,
        ];
        let notes: Vec<Option<&str>> = vec![None; facts.len()];
        let alabama = vec![
            Some(alabama_population),
            Some("69.30%"),
            Some("26.80%"),
            Some("0.70%"),
            Some("1.40%"),
            Some("0.10%"),
            Some("1.60%"),
            Some("4.20%"),
            Some("65.80%"),
            Some("84.30%"),
            Some("23.50%"),
            Some("17.10%"),
            None,
            None,
        ];
        let alaska = vec![
            Some("741,894"),
            Some("0.661"),
            Some("0.038"),
            Some("0.152"),
            Some("0.063"),
            Some("Z"),
            Some("0.074"),
            Some("0.07"),
            Some("0.612"),
            Some("0.921"),
            Some("0.28"),
            Some("0.099"),
            None,
            None,
        ];

        DataFrame::new(vec![
            Column::new(FACT.into(), facts),
            Column::new(FACT_NOTE.into(), notes),
            Column::new("Alabama".into(), alabama),
            Column::new("Alaska".into(), alaska),
        ])
        .unwrap()
    }

    #[test]
    fn background_checks_are_pruned_split_and_filtered() {
        let raw = gun_frame(&[
            ("2016-01", "Alabama", "2600"),
            ("2016-01", "Alabama", "2600"),
            ("2016-02", "Guam", "5"),
            ("2016-02", "District of Columbia", "12"),
            ("2016-03", "Alaska", "oops"),
        ]);

        let (table, summary) = DataProcessor::clean_background_checks(&raw).unwrap();
        let df = table.frame();

        assert_eq!(
            df.get_column_names()
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>(),
            vec![STATE, YEAR, MONTH_NO, TOTALS]
        );
        assert_eq!(summary.rows_in, 5);
        assert_eq!(summary.duplicates_removed, 1);
        assert_eq!(summary.rows_filtered, 2);
        assert_eq!(summary.parse_failures, 1);
        assert_eq!(summary.rows_out, 2);

        let records = table.records().unwrap();
        assert_eq!(records[0].state, "Alabama");
        assert_eq!((records[0].year, records[0].month_no), (2016, 1));
        assert_eq!(records[0].totals, Some(2600));
        assert_eq!(records[1].totals, None);
        assert_eq!(table.states().unwrap(), vec!["Alabama", "Alaska"]);
    }

    #[test]
    fn malformed_month_fails_fast() {
        let raw = gun_frame(&[("January", "Alabama", "1")]);
        let err = DataProcessor::clean_background_checks(&raw).unwrap_err();
        assert!(matches!(
            err,
            ProcessorError::Schema(SchemaError::MalformedValue { ref value, .. }) if value == "January"
        ));
    }

    #[test]
    fn census_is_transposed_with_normalized_names() {
        let transposed = DataProcessor::transpose_census(&census_frame()).unwrap();
        let names: Vec<String> = transposed
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        assert_eq!(transposed.height(), 2);
        assert_eq!(names[0], STATE);
        assert!(names.contains(&WHITE.to_string()));
        assert!(names.contains(&WHITE_NON_HISPANIC.to_string()));
        assert!(names.contains(&BACHELORS.to_string()));
        assert!(names.contains(&"unnamed_13".to_string()));
    }

    #[test]
    fn census_is_cleaned_to_fractions() {
        let (table, summary) = DataProcessor::clean_census(&census_frame()).unwrap();
        let records = table.records().unwrap();

        assert_eq!(summary.placeholders_replaced, 1);
        assert_eq!(summary.parse_failures, 0);
        assert_eq!(records.len(), 2);

        let alabama = &records[0];
        assert_eq!(alabama.state, "Alabama");
        assert_eq!(alabama.population_estimates, Some(4_863_300));
        assert!((alabama.persons_in_poverty.unwrap() - 0.171).abs() < 1e-12);
        assert!((alabama.white_alone_mean.unwrap() - (0.693 + 0.658) / 2.0).abs() < 1e-12);

        let alaska = &records[1];
        assert_eq!(alaska.native_hawaiian_and_other_pacific_islander_alone, Some(0.0));
        assert_eq!(alaska.white_alone_mean, Some((0.661 + 0.612) / 2.0));

        let names = table.frame().get_column_names();
        assert!(!names.iter().any(|n| n.as_str() == WHITE));
        assert!(!names.iter().any(|n| n.as_str() == WHITE_NON_HISPANIC));
    }

    #[test]
    fn census_missing_fact_is_a_schema_error() {
        let df = census_frame().drop(FACT).unwrap();
        let err = DataProcessor::clean_census(&df).unwrap_err();
        assert!(matches!(
            err,
            ProcessorError::Schema(SchemaError::MissingColumn { ref column, .. }) if column == FACT
        ));
    }

    #[test]
    fn census_missing_fact_row_is_a_schema_error() {
        let raw = census_frame();
        let keep: BooleanChunked = str_values(&raw, FACT)
            .unwrap()
            .iter()
            .map(|f| !f.as_deref().is_some_and(|f| f.starts_with("Persons in poverty")))
            .collect();
        let raw = raw.filter(&keep).unwrap();

        let err = DataProcessor::clean_census(&raw).unwrap_err();
        assert!(matches!(
            err,
            ProcessorError::Schema(SchemaError::MissingColumn { ref column, .. }) if column == POVERTY
        ));
    }

    #[test]
    fn value_steps_are_idempotent() {
        let df = DataFrame::new(vec![
            Column::new(STATE.into(), vec!["Alabama", "Alaska", "Alaska"]),
            Column::new(ASIAN.into(), vec!["Z", "6.3%", "6.3%"]),
            Column::new(POVERTY.into(), vec!["0.171", "bad", "bad"]),
        ])
        .unwrap();
        let columns = [ASIAN, POVERTY];

        let once = DataProcessor::drop_duplicates(&df).unwrap();
        let (once, replaced) = DataProcessor::replace_placeholders(&once).unwrap();
        let (once, failures) = DataProcessor::normalize_units(&once, &columns).unwrap();
        assert_eq!(once.height(), 2);
        assert_eq!(replaced, 1);
        assert_eq!(failures, 1);

        let twice = DataProcessor::drop_duplicates(&once).unwrap();
        let (twice, replaced) = DataProcessor::replace_placeholders(&twice).unwrap();
        let (twice, failures) = DataProcessor::normalize_units(&twice, &columns).unwrap();
        assert_eq!(replaced, 0);
        assert_eq!(failures, 0);
        assert!(once.equals_missing(&twice));
    }

    #[test]
    fn dedup_never_grows_the_table() {
        let df = gun_frame(&[
            ("2016-01", "Alabama", "1"),
            ("2016-01", "Alabama", "1"),
            ("2016-01", "Alabama", "1"),
            ("2016-02", "Alabama", "1"),
        ]);
        let deduped = DataProcessor::drop_duplicates(&df).unwrap();
        assert!(deduped.height() <= df.height());
        assert_eq!(deduped.height(), 2);
        assert_eq!(DataProcessor::drop_duplicates(&deduped).unwrap().height(), 2);
    }

    #[test]
    fn state_names_are_stored_trimmed() {
        let raw = gun_frame(&[
            ("2016-01", " Alabama", "5"),
            ("2016-01", "Alabama", "7"),
            ("2016-01", "Alaska  ", "3"),
        ]);

        let (table, summary) = DataProcessor::clean_background_checks(&raw).unwrap();

        assert_eq!(summary.rows_filtered, 0);
        assert_eq!(table.states().unwrap(), vec!["Alabama", "Alaska"]);
    }

    #[test]
    fn repeated_state_column_is_a_schema_error() {
        let mut raw = census_frame();
        let copy = raw
            .column("Alabama")
            .unwrap()
            .clone()
            .with_name("Alabama_duplicated_0".into());
        raw.with_column(copy).unwrap();

        let err = DataProcessor::clean_census(&raw).unwrap_err();
        assert!(matches!(
            err,
            ProcessorError::Schema(SchemaError::DuplicateState { ref state, .. }) if state == "Alabama"
        ));
    }

    #[test]
    fn census_without_state_columns_has_too_few_rows() {
        let raw = census_frame().select([FACT, FACT_NOTE]).unwrap();
        let err = DataProcessor::clean_census(&raw).unwrap_err();
        assert!(matches!(
            err,
            ProcessorError::Schema(SchemaError::TooFewRows { found: 0, .. })
        ));
    }

    #[test]
    fn unparseable_population_becomes_missing() {
        let (table, summary) = DataProcessor::clean_census(&census_frame_with("n/a")).unwrap();
        let records = table.records().unwrap();

        assert_eq!(summary.parse_failures, 1);
        assert_eq!(records[0].state, "Alabama");
        assert_eq!(records[0].population_estimates, None);
        assert_eq!(records[1].population_estimates, Some(741_894));
    }

    #[test]
    fn numeric_proportions_are_range_checked() {
        let df = DataFrame::new(vec![
            Column::new(STATE.into(), vec!["Alabama", "Alaska", "Ohio"]),
            Column::new(ASIAN.into(), vec![Some(0.063), Some(69.3), None]),
        ])
        .unwrap();

        let (out, failures) = DataProcessor::normalize_units(&df, &[ASIAN]).unwrap();

        assert_eq!(failures, 1);
        assert_eq!(f64_values(&out, ASIAN).unwrap(), vec![Some(0.063), None, None]);
    }
}
