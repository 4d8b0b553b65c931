use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::ServiceError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Number of positions in a source row (indices 0–11).
pub const FIELD_COUNT: usize = 12;

/// One symbol/hour OHLC bid/ask observation.
///
/// Field order matches the positional layout of source rows. Every field is
/// optional because the lenient ingestion policy keeps short or null-padded
/// rows; strict ingestion guarantees all fields are populated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub symbol: Option<String>,
    pub date: Option<NaiveDate>,
    pub hour: Option<i64>,
    pub openbid: Option<f64>,
    pub highbid: Option<f64>,
    pub lowbid: Option<f64>,
    pub closebid: Option<f64>,
    pub openask: Option<f64>,
    pub highask: Option<f64>,
    pub lowask: Option<f64>,
    pub closeask: Option<f64>,
    pub totalticks: Option<i64>,
}

/// How a positional row is converted into a [`Trade`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsePolicy {
    /// All 12 positions present and convertible, or the row is rejected.
    Strict,
    /// Missing, null, or undateable positions become `None`; only a present
    /// non-null value of the wrong type is rejected.
    Lenient,
}

impl Trade {
    /// Convert one positional source row.
    pub fn from_row(row: &[Value], policy: ParsePolicy) -> Result<Trade, ServiceError> {
        let r = RowReader { row, policy };

        let symbol = r.str_at(0, "symbol")?;
        if policy == ParsePolicy::Strict && symbol.as_deref().map_or(true, str::is_empty) {
            return Err(ServiceError::MalformedRecord(
                "symbol must be a non-empty string".to_string(),
            ));
        }

        Ok(Trade {
            symbol,
            date: r.date_at(1, "date")?,
            hour: r.int_at(2, "hour")?,
            openbid: r.float_at(3, "openbid")?,
            highbid: r.float_at(4, "highbid")?,
            lowbid: r.float_at(5, "lowbid")?,
            closebid: r.float_at(6, "closebid")?,
            openask: r.float_at(7, "openask")?,
            highask: r.float_at(8, "highask")?,
            lowask: r.float_at(9, "lowask")?,
            closeask: r.float_at(10, "closeask")?,
            totalticks: r.int_at(11, "totalticks")?,
        })
    }
}

/// Column metadata for the `datatable` response envelope.
pub fn column_spec() -> Value {
    json!([
        { "name": "symbol", "type": "String" },
        { "name": "date", "type": "Date" },
        { "name": "hour", "type": "Integer" },
        { "name": "openbid", "type": "double" },
        { "name": "highbid", "type": "double" },
        { "name": "lowbid", "type": "double" },
        { "name": "closebid", "type": "double" },
        { "name": "openask", "type": "double" },
        { "name": "highask", "type": "double" },
        { "name": "lowask", "type": "double" },
        { "name": "closeask", "type": "double" },
        { "name": "totalticks", "type": "Integer" },
    ])
}

struct RowReader<'a> {
    row: &'a [Value],
    policy: ParsePolicy,
}

impl RowReader<'_> {
    /// Fetch the raw value at `idx`. Under the lenient policy a missing index
    /// or JSON null reads as absent; under strict it is an error.
    fn raw(&self, idx: usize, name: &str) -> Result<Option<&Value>, ServiceError> {
        match self.row.get(idx) {
            Some(Value::Null) | None => match self.policy {
                ParsePolicy::Lenient => Ok(None),
                ParsePolicy::Strict => Err(ServiceError::MalformedRecord(format!(
                    "missing value for {name} at index {idx}"
                ))),
            },
            Some(v) => Ok(Some(v)),
        }
    }

    fn str_at(&self, idx: usize, name: &str) -> Result<Option<String>, ServiceError> {
        match self.raw(idx, name)? {
            None => Ok(None),
            Some(v) => v
                .as_str()
                .map(|s| Some(s.to_string()))
                .ok_or_else(|| type_err(name, idx, "string", v)),
        }
    }

    fn date_at(&self, idx: usize, name: &str) -> Result<Option<NaiveDate>, ServiceError> {
        let Some(v) = self.raw(idx, name)? else {
            return Ok(None);
        };
        let s = v.as_str().ok_or_else(|| type_err(name, idx, "date string", v))?;
        match NaiveDate::parse_from_str(s, DATE_FORMAT) {
            Ok(d) => Ok(Some(d)),
            // Lenient policy coerces bad dates to null instead of failing.
            Err(_) if self.policy == ParsePolicy::Lenient => Ok(None),
            Err(e) => Err(ServiceError::MalformedRecord(format!(
                "invalid {name} at index {idx}: {s:?} ({e})"
            ))),
        }
    }

    fn int_at(&self, idx: usize, name: &str) -> Result<Option<i64>, ServiceError> {
        match self.raw(idx, name)? {
            None => Ok(None),
            Some(v) => as_i64(v)
                .map(Some)
                .ok_or_else(|| type_err(name, idx, "integer", v)),
        }
    }

    fn float_at(&self, idx: usize, name: &str) -> Result<Option<f64>, ServiceError> {
        match self.raw(idx, name)? {
            None => Ok(None),
            Some(v) => as_f64(v)
                .map(Some)
                .ok_or_else(|| type_err(name, idx, "float", v)),
        }
    }
}

/// Numeric positions accept JSON numbers or numeric strings. Integer
/// positions additionally accept floats with no fractional part.
fn as_i64(v: &Value) -> Option<i64> {
    v.as_i64()
        .or_else(|| v.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
        .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

fn as_f64(v: &Value) -> Option<f64> {
    v.as_f64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

fn type_err(name: &str, idx: usize, expected: &str, got: &Value) -> ServiceError {
    ServiceError::MalformedRecord(format!(
        "expected {expected} for {name} at index {idx}, got {got}"
    ))
}
