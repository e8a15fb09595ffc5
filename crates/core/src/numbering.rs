use chrono::{Datelike, NaiveDate};

use crate::domain::quote::QuoteNumber;

const SEQUENCE_WIDTH: usize = 4;

/// Next quote number for the month of `today`: `YYYYMM` followed by a zero-padded sequence one
/// above the highest number already issued with that prefix. Numbers from other months and
/// suffixes that are not plain digits are ignored.
pub fn next_quote_number<'a, I>(existing: I, today: NaiveDate) -> QuoteNumber
where
    I: IntoIterator<Item = &'a str>,
{
    let prefix = format!("{:04}{:02}", today.year(), today.month());

    let highest = existing
        .into_iter()
        .filter_map(|number| number.trim().strip_prefix(prefix.as_str()))
        .filter(|suffix| !suffix.is_empty() && suffix.chars().all(|ch| ch.is_ascii_digit()))
        .filter_map(|suffix| suffix.parse::<u64>().ok())
        .max()
        .unwrap_or(0);

    QuoteNumber(format!("{prefix}{:0width$}", highest + 1, width = SEQUENCE_WIDTH))
}
