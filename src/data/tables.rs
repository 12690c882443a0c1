//! Cleaned Tables Module
//! Typed records and the read-only tables produced by the cleaner.

use super::schema::*;
use polars::prelude::*;
use serde::Serialize;

/// One state-month of background checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackgroundCheckRecord {
    pub state: String,
    pub year: i32,
    pub month_no: u32,
    pub totals: Option<i64>,
}

/// One state of census facts. Proportions are fractions in [0, 1].
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CensusRecord {
    pub state: String,
    pub population_estimates: Option<i64>,
    pub black_or_african_american_alone: Option<f64>,
    pub asian_alone: Option<f64>,
    pub native_hawaiian_and_other_pacific_islander_alone: Option<f64>,
    pub hispanic_or_latino: Option<f64>,
    pub american_indian_and_alaska_native_alone: Option<f64>,
    pub two_or_more_races: Option<f64>,
    pub white_alone_mean: Option<f64>,
    pub high_school_graduate_or_higher: Option<f64>,
    pub bachelors_degree_or_higher: Option<f64>,
    pub persons_in_poverty: Option<f64>,
}

/// Cleaned background checks: columns `state`, `year`, `month_no`, `totals`.
#[derive(Debug, Clone)]
pub struct BackgroundCheckTable(DataFrame);

/// Cleaned census, one row per state.
#[derive(Debug, Clone)]
pub struct CensusTable(DataFrame);

/// Every proportion column of the cleaned census.
pub const CENSUS_FRACTION_COLUMNS: [&str; 10] = [
    AFRICAN_AMERICAN,
    ASIAN,
    PACIFIC_ISLANDER,
    HISPANIC,
    NATIVE_AMERICAN,
    TWO_OR_MORE,
    WHITE_MEAN,
    HIGH_SCHOOL,
    BACHELORS,
    POVERTY,
];

impl BackgroundCheckTable {
    pub(crate) fn from_frame(df: DataFrame) -> Result<Self, SchemaError> {
        require_columns(&df, GUN_TABLE, &[STATE, YEAR, MONTH_NO, TOTALS])?;
        Ok(Self(df))
    }

    /// Build a cleaned table directly from records.
    pub fn from_records(records: &[BackgroundCheckRecord]) -> PolarsResult<Self> {
        let df = DataFrame::new(vec![
            Column::new(
                STATE.into(),
                records.iter().map(|r| r.state.clone()).collect::<Vec<_>>(),
            ),
            Column::new(
                YEAR.into(),
                records.iter().map(|r| r.year).collect::<Vec<_>>(),
            ),
            Column::new(
                MONTH_NO.into(),
                records.iter().map(|r| r.month_no as i32).collect::<Vec<_>>(),
            ),
            Column::new(
                TOTALS.into(),
                records.iter().map(|r| r.totals).collect::<Vec<_>>(),
            ),
        ])?;
        Ok(Self(df))
    }

    pub fn frame(&self) -> &DataFrame {
        &self.0
    }

    pub fn height(&self) -> usize {
        self.0.height()
    }

    pub fn records(&self) -> PolarsResult<Vec<BackgroundCheckRecord>> {
        let states = str_values(&self.0, STATE)?;
        let years = i64_values(&self.0, YEAR)?;
        let months = i64_values(&self.0, MONTH_NO)?;
        let totals = i64_values(&self.0, TOTALS)?;

        Ok(states
            .into_iter()
            .zip(years)
            .zip(months)
            .zip(totals)
            .filter_map(|(((state, year), month), totals)| {
                Some(BackgroundCheckRecord {
                    state: state?,
                    year: year? as i32,
                    month_no: month? as u32,
                    totals,
                })
            })
            .collect())
    }

    /// Distinct states, sorted.
    pub fn states(&self) -> PolarsResult<Vec<String>> {
        let mut states: Vec<String> = str_values(&self.0, STATE)?.into_iter().flatten().collect();
        states.sort();
        states.dedup();
        Ok(states)
    }
}

impl CensusTable {
    pub(crate) fn from_frame(df: DataFrame) -> Result<Self, SchemaError> {
        require_columns(&df, CENSUS_TABLE, &[STATE, POPULATION])?;
        require_columns(&df, CENSUS_TABLE, &CENSUS_FRACTION_COLUMNS)?;
        Ok(Self(df))
    }

    /// Build a cleaned table directly from records.
    pub fn from_records(records: &[CensusRecord]) -> PolarsResult<Self> {
        let fraction = |name: &str, get: fn(&CensusRecord) -> Option<f64>| {
            Column::new(name.into(), records.iter().map(get).collect::<Vec<_>>())
        };

        let df = DataFrame::new(vec![
            Column::new(
                STATE.into(),
                records.iter().map(|r| r.state.clone()).collect::<Vec<_>>(),
            ),
            Column::new(
                POPULATION.into(),
                records
                    .iter()
                    .map(|r| r.population_estimates)
                    .collect::<Vec<_>>(),
            ),
            fraction(AFRICAN_AMERICAN, |r| r.black_or_african_american_alone),
            fraction(ASIAN, |r| r.asian_alone),
            fraction(PACIFIC_ISLANDER, |r| {
                r.native_hawaiian_and_other_pacific_islander_alone
            }),
            fraction(HISPANIC, |r| r.hispanic_or_latino),
            fraction(NATIVE_AMERICAN, |r| r.american_indian_and_alaska_native_alone),
            fraction(TWO_OR_MORE, |r| r.two_or_more_races),
            fraction(WHITE_MEAN, |r| r.white_alone_mean),
            fraction(HIGH_SCHOOL, |r| r.high_school_graduate_or_higher),
            fraction(BACHELORS, |r| r.bachelors_degree_or_higher),
            fraction(POVERTY, |r| r.persons_in_poverty),
        ])?;
        Ok(Self(df))
    }

    pub fn frame(&self) -> &DataFrame {
        &self.0
    }

    pub fn height(&self) -> usize {
        self.0.height()
    }

    pub fn records(&self) -> PolarsResult<Vec<CensusRecord>> {
        let states = str_values(&self.0, STATE)?;
        let population = i64_values(&self.0, POPULATION)?;
        let mut columns = CENSUS_FRACTION_COLUMNS
            .iter()
            .map(|name| f64_values(&self.0, name))
            .collect::<PolarsResult<Vec<_>>>()?;

        let mut records = Vec::with_capacity(states.len());
        for (idx, state) in states.into_iter().enumerate() {
            let Some(state) = state else { continue };
            let mut at = |i: usize| columns[i][idx].take();
            records.push(CensusRecord {
                state,
                population_estimates: population[idx],
                black_or_african_american_alone: at(0),
                asian_alone: at(1),
                native_hawaiian_and_other_pacific_islander_alone: at(2),
                hispanic_or_latino: at(3),
                american_indian_and_alaska_native_alone: at(4),
                two_or_more_races: at(5),
                white_alone_mean: at(6),
                high_school_graduate_or_higher: at(7),
                bachelors_degree_or_higher: at(8),
                persons_in_poverty: at(9),
            });
        }
        Ok(records)
    }

    /// Values of one proportion column across states.
    pub fn fractions(&self, column: &str) -> PolarsResult<Vec<Option<f64>>> {
        f64_values(&self.0, column)
    }
}

/// Values of a string column.
pub(crate) fn str_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    Ok(column
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Values of a numeric column as `f64`.
pub(crate) fn f64_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().collect())
}

/// Values of a numeric column as `i64`.
pub(crate) fn i64_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<i64>>> {
    let column = df.column(name)?.cast(&DataType::Int64)?;
    Ok(column.i64()?.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_records_survive_the_frame() {
        let records = vec![
            BackgroundCheckRecord {
                state: "Alabama".into(),
                year: 2016,
                month_no: 1,
                totals: Some(2600),
            },
            BackgroundCheckRecord {
                state: "Alaska".into(),
                year: 2016,
                month_no: 2,
                totals: None,
            },
        ];
        let table = BackgroundCheckTable::from_records(&records).unwrap();

        assert_eq!(table.height(), 2);
        assert_eq!(table.records().unwrap(), records);
        assert_eq!(table.states().unwrap(), vec!["Alabama", "Alaska"]);
    }

    #[test]
    fn census_records_survive_the_frame() {
        let records = vec![CensusRecord {
            state: "Kentucky".into(),
            population_estimates: Some(4_436_974),
            white_alone_mean: Some(0.86),
            persons_in_poverty: Some(0.188),
            ..Default::default()
        }];
        let table = CensusTable::from_records(&records).unwrap();

        assert_eq!(table.records().unwrap(), records);
        assert_eq!(table.fractions(POVERTY).unwrap(), vec![Some(0.188)]);
    }
}
