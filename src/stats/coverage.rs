//! Monthly coverage of the background check table.

use crate::data::schema::{MONTH_NO, YEAR};
use crate::data::{i64_values, BackgroundCheckTable};
use polars::prelude::*;
use std::collections::BTreeMap;

pub const MONTHS_PER_YEAR: usize = 12;

/// Distinct months observed for each year.
pub fn months_per_year(checks: &BackgroundCheckTable) -> PolarsResult<BTreeMap<i32, usize>> {
    let counts = checks
        .frame()
        .clone()
        .lazy()
        .group_by([col(YEAR)])
        .agg([col(MONTH_NO).n_unique().alias("months")])
        .collect()?;

    let years = i64_values(&counts, YEAR)?;
    let months = i64_values(&counts, "months")?;

    Ok(years
        .into_iter()
        .zip(months)
        .filter_map(|(year, months)| Some((year? as i32, months? as usize)))
        .collect())
}

/// Years with all twelve months present, ascending.
pub fn complete_years(checks: &BackgroundCheckTable) -> PolarsResult<Vec<i32>> {
    Ok(months_per_year(checks)?
        .into_iter()
        .filter(|(_, months)| *months == MONTHS_PER_YEAR)
        .map(|(year, _)| year)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::BackgroundCheckRecord;

    fn record(year: i32, month_no: u32) -> BackgroundCheckRecord {
        BackgroundCheckRecord {
            state: "Alabama".into(),
            year,
            month_no,
            totals: Some(1),
        }
    }

    #[test]
    fn partial_years_are_not_complete() {
        let mut records: Vec<_> = (11..=12).map(|m| record(1998, m)).collect();
        records.extend((1..=12).map(|m| record(1999, m)));
        records.extend((1..=12).map(|m| record(2000, m)));
        // a second state repeating a month does not add coverage
        records.push(BackgroundCheckRecord {
            state: "Alaska".into(),
            ..record(2001, 1)
        });
        records.extend((1..=9).map(|m| record(2001, m)));

        let table = BackgroundCheckTable::from_records(&records).unwrap();
        let months = months_per_year(&table).unwrap();

        assert_eq!(months[&1998], 2);
        assert_eq!(months[&2001], 9);
        assert_eq!(complete_years(&table).unwrap(), vec![1999, 2000]);
    }
}
