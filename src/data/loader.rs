//! CSV Data Loader Module
//! Reads the raw background check and census files using Polars.

use super::schema::{SchemaError, CENSUS_TABLE, FACT, GUN_COLUMNS, GUN_TABLE};
use polars::prelude::*;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
}

/// Raw shape of a loaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overview {
    pub rows: usize,
    pub columns: usize,
    pub duplicates: usize,
}

/// Loads the two source files as all-string tables.
pub struct DataLoader;

impl DataLoader {
    /// Load a CSV file with every column read as a string.
    ///
    /// Typing happens in the cleaner, so nothing is lost to schema inference.
    pub fn load_csv(file_path: impl AsRef<Path>) -> Result<DataFrame, LoaderError> {
        let path = file_path.as_ref();
        debug!(path = %path.display(), "reading csv");

        let df = LazyCsvReader::new(path)
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .finish()?
            .collect()?;

        Ok(df)
    }

    /// Load the background check file and check its required columns.
    pub fn load_background_checks(file_path: impl AsRef<Path>) -> Result<DataFrame, LoaderError> {
        let df = Self::load_csv(file_path)?;
        super::schema::require_columns(&df, GUN_TABLE, &GUN_COLUMNS)?;
        Self::log_overview(GUN_TABLE, &df)?;
        Ok(df)
    }

    /// Load the census file and check that its fact label column exists.
    pub fn load_census(file_path: impl AsRef<Path>) -> Result<DataFrame, LoaderError> {
        let df = Self::load_csv(file_path)?;
        super::schema::require_columns(&df, CENSUS_TABLE, &[FACT])?;
        Self::log_overview(CENSUS_TABLE, &df)?;
        Ok(df)
    }

    /// Rows, columns and exact duplicate count of a raw table.
    pub fn overview(df: &DataFrame) -> Result<Overview, LoaderError> {
        let unique = df
            .clone()
            .lazy()
            .unique_stable(None, UniqueKeepStrategy::First)
            .collect()?;

        Ok(Overview {
            rows: df.height(),
            columns: df.width(),
            duplicates: df.height() - unique.height(),
        })
    }

    /// Get list of column names.
    pub fn get_columns(df: &DataFrame) -> Vec<String> {
        df.get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn log_overview(table: &str, df: &DataFrame) -> Result<(), LoaderError> {
        let overview = Self::overview(df)?;
        info!(
            table,
            rows = overview.rows,
            columns = overview.columns,
            duplicates = overview.duplicates,
            "loaded dataset"
        );
        Ok(())
    }
}
