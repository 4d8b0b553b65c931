use chrono::NaiveDate;

use crate::trade::Trade;

/// Select trades with `start <= date <= end`, optionally restricted to one
/// symbol.
///
/// Both bounds are inclusive. Matching records keep their table order; no
/// sorting or deduplication. Records with no date (possible under lenient
/// ingestion) never fall inside any range.
pub fn filter_trades<'a>(
    table: &'a [Trade],
    start: NaiveDate,
    end: NaiveDate,
    symbol: Option<&str>,
) -> Vec<&'a Trade> {
    table
        .iter()
        .filter(|t| t.date.is_some_and(|d| start <= d && d <= end))
        .filter(|t| symbol.map_or(true, |s| t.symbol.as_deref() == Some(s)))
        .collect()
}
