//! Value Normalization Module
//! Cell and label level conversions used by the cleaning steps.

use super::schema::COLLISION_RENAMES;
use std::collections::HashMap;
use thiserror::Error;

/// Census sentinel for "greater than zero but less than half unit of measure shown".
pub const PLACEHOLDER: &str = "Z";

/// Value substituted for the placeholder before numeric parsing.
pub const PLACEHOLDER_VALUE: &str = "0.0%";

const DUPLICATE_SUFFIX: &str = "_duplicated_";

/// A single cell that could not be coerced. Never fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("'{0}' is not a number")]
    NotNumeric(String),
    #[error("{0} is outside the proportion range [0, 1]")]
    OutOfRange(f64),
}

/// Normalize a fact label into a column identifier.
///
/// Truncates at the first comma, trims, lower-cases and replaces spaces
/// with underscores.
pub fn normalize_label(label: &str) -> String {
    label
        .split(',')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
        .replace(' ', "_")
}

/// Normalize a full header and make every name unique.
///
/// Known collisions are renamed from `COLLISION_RENAMES`; any other repeat
/// gets a numeric suffix. Missing labels become `unnamed_<index>`.
pub fn normalize_header(labels: &[Option<String>]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::with_capacity(labels.len());

    for (idx, label) in labels.iter().enumerate() {
        let base = match label.as_deref().map(normalize_label) {
            Some(name) if !name.is_empty() => name,
            _ => format!("unnamed_{idx}"),
        };

        let count = seen.entry(base.clone()).or_insert(0);
        *count += 1;

        let name = match *count {
            1 => base,
            2 => COLLISION_RENAMES
                .iter()
                .find(|(from, _)| *from == base)
                .map(|(_, to)| to.to_string())
                .unwrap_or_else(|| format!("{base}_2")),
            n => format!("{base}_{n}"),
        };
        names.push(name);
    }

    names
}

/// Replace the placeholder sentinel; every other value passes through.
pub fn substitute_placeholder(value: &str) -> &str {
    if value.trim() == PLACEHOLDER {
        PLACEHOLDER_VALUE
    } else {
        value
    }
}

/// Parse a proportion cell into a fraction in [0, 1].
///
/// `"12.5%"` becomes `0.125`; `"0.125"` is taken as already a fraction.
pub fn parse_proportion(raw: &str) -> Result<f64, ParseError> {
    let value = substitute_placeholder(raw).trim();

    let parsed = match value.strip_suffix('%') {
        Some(percent) => parse_plain(percent).map(|v| v / 100.0),
        None => parse_plain(value),
    }
    .ok_or_else(|| ParseError::NotNumeric(raw.to_string()))?;

    if (0.0..=1.0).contains(&parsed) {
        Ok(parsed)
    } else {
        Err(ParseError::OutOfRange(parsed))
    }
}

/// Parse an integer count, dropping thousands separators.
pub fn parse_count(raw: &str) -> Result<i64, ParseError> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if let Ok(v) = cleaned.parse::<i64>() {
        return Ok(v);
    }
    // Counts exported as "123.0"
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 => Ok(v as i64),
        _ => Err(ParseError::NotNumeric(raw.to_string())),
    }
}

/// Header name as written in the file.
///
/// The CSV reader renames a repeated header to `<name>_duplicated_<n>`;
/// this undoes that rename.
pub fn source_column_name(name: &str) -> &str {
    match name.rsplit_once(DUPLICATE_SUFFIX) {
        Some((base, n)) if !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()) => base,
        _ => name,
    }
}

/// Split a `YYYY-MM` month into `(year, month_no)`.
pub fn split_month(raw: &str) -> Option<(i32, u32)> {
    let mut parts = raw.trim().splitn(3, '-');
    let year = parts.next()?.parse::<i32>().ok()?;
    let month = parts.next()?.parse::<u32>().ok()?;
    if (1..=12).contains(&month) {
        Some((year, month))
    } else {
        None
    }
}

fn parse_plain(value: &str) -> Option<f64> {
    let cleaned: String = value.trim().chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}
