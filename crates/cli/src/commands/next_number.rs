use std::path::Path;

use chrono::{NaiveDate, Utc};
use orcamento_core::domain::quote::Quote;
use orcamento_core::errors::ApplicationError;
use orcamento_core::numbering::next_quote_number;

use crate::commands::{read_json, CommandResult};

/// Next number for a new quote given the quotes already stored in `path`.
pub fn run(path: &Path, today: Option<NaiveDate>) -> CommandResult {
    let today = today.unwrap_or_else(|| Utc::now().date_naive());
    match existing_numbers(path) {
        Ok(numbers) => {
            let number = next_quote_number(numbers.iter().map(String::as_str), today);
            tracing::debug!(event_name = "quote.number_issued", number = %number, "number issued");
            CommandResult::success_with_data("next-number", number.to_string(), &number)
        }
        Err(error) => CommandResult::from_error("next-number", &error),
    }
}

pub(crate) fn existing_numbers(path: &Path) -> Result<Vec<String>, ApplicationError> {
    let quotes: Vec<Quote> = read_json(path)?;
    Ok(quotes.into_iter().filter_map(|quote| quote.number.map(|number| number.0)).collect())
}
