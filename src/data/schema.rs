//! Schema Module
//! Column names, state lists and schema validation shared by both datasets.

use polars::prelude::*;
use thiserror::Error;

/// Fatal schema violations found while loading or cleaning.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("{table}: required column '{column}' is missing")]
    MissingColumn { table: &'static str, column: String },
    #[error("{table}: column '{column}' has malformed value '{value}'")]
    MalformedValue {
        table: &'static str,
        column: String,
        value: String,
    },
    #[error("{table}: expected at least {expected} rows, found {found}")]
    TooFewRows {
        table: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("{table}: state '{state}' appears more than once")]
    DuplicateState { table: &'static str, state: String },
}

pub const GUN_TABLE: &str = "background checks";
pub const CENSUS_TABLE: &str = "census";

// Background check columns
pub const MONTH: &str = "month";
pub const STATE: &str = "state";
pub const TOTALS: &str = "totals";
pub const YEAR: &str = "year";
pub const MONTH_NO: &str = "month_no";

/// Raw columns kept from the background check file.
pub const GUN_COLUMNS: [&str; 3] = [MONTH, STATE, TOTALS];

// Census columns, after name normalization
pub const FACT: &str = "Fact";
pub const FACT_NOTE: &str = "Fact Note";
pub const POPULATION: &str = "population_estimates";
pub const AFRICAN_AMERICAN: &str = "black_or_african_american_alone";
pub const ASIAN: &str = "asian_alone";
pub const PACIFIC_ISLANDER: &str = "native_hawaiian_and_other_pacific_islander_alone";
pub const HISPANIC: &str = "hispanic_or_latino";
pub const NATIVE_AMERICAN: &str = "american_indian_and_alaska_native_alone";
pub const TWO_OR_MORE: &str = "two_or_more_races";
pub const WHITE: &str = "white_alone";
pub const WHITE_NON_HISPANIC: &str = "white_alone_non_hispanic";
pub const WHITE_MEAN: &str = "white_alone_mean";
pub const HIGH_SCHOOL: &str = "high_school_graduate_or_higher";
pub const BACHELORS: &str = "bachelor's_degree_or_higher";
pub const POVERTY: &str = "persons_in_poverty";

/// Source columns of the census that become metadata rows once transposed.
pub const CENSUS_META_COLUMNS: [&str; 2] = [FACT, FACT_NOTE];

/// Proportion columns selected from the transposed census.
pub const CENSUS_PROPORTIONS: [&str; 11] = [
    AFRICAN_AMERICAN,
    ASIAN,
    PACIFIC_ISLANDER,
    HISPANIC,
    NATIVE_AMERICAN,
    TWO_OR_MORE,
    WHITE,
    WHITE_NON_HISPANIC,
    HIGH_SCHOOL,
    BACHELORS,
    POVERTY,
];

/// Names produced by label truncation that collide, and the rename applied
/// to their second occurrence.
pub const COLLISION_RENAMES: [(&str, &str); 1] = [(WHITE, WHITE_NON_HISPANIC)];

/// Rows of the background check file that are not states.
pub const TERRITORIES: [&str; 5] = [
    "Guam",
    "District of Columbia",
    "Mariana Islands",
    "Puerto Rico",
    "Virgin Islands",
];

pub const US_STATES: [&str; 50] = [
    "Alabama",
    "Alaska",
    "Arizona",
    "Arkansas",
    "California",
    "Colorado",
    "Connecticut",
    "Delaware",
    "Florida",
    "Georgia",
    "Hawaii",
    "Idaho",
    "Illinois",
    "Indiana",
    "Iowa",
    "Kansas",
    "Kentucky",
    "Louisiana",
    "Maine",
    "Maryland",
    "Massachusetts",
    "Michigan",
    "Minnesota",
    "Mississippi",
    "Missouri",
    "Montana",
    "Nebraska",
    "Nevada",
    "New Hampshire",
    "New Jersey",
    "New Mexico",
    "New York",
    "North Carolina",
    "North Dakota",
    "Ohio",
    "Oklahoma",
    "Oregon",
    "Pennsylvania",
    "Rhode Island",
    "South Carolina",
    "South Dakota",
    "Tennessee",
    "Texas",
    "Utah",
    "Vermont",
    "Virginia",
    "Washington",
    "West Virginia",
    "Wisconsin",
    "Wyoming",
];

/// Check whether a name is one of the 50 U.S. states.
pub fn is_us_state(name: &str) -> bool {
    US_STATES.contains(&name.trim())
}

/// Fail with `SchemaError::MissingColumn` for the first absent column.
pub fn require_columns(
    df: &DataFrame,
    table: &'static str,
    columns: &[&str],
) -> Result<(), SchemaError> {
    let present: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    match columns
        .iter()
        .find(|column| !present.iter().any(|p| p.as_str() == **column))
    {
        Some(missing) => Err(SchemaError::MissingColumn {
            table,
            column: missing.to_string(),
        }),
        None => Ok(()),
    }
}
