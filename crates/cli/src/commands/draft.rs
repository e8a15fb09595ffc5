use std::path::Path;

use chrono::{NaiveDate, Utc};
use orcamento_core::domain::quote::Quote;
use orcamento_core::errors::ApplicationError;
use orcamento_core::numbering::next_quote_number;
use tracing::info;

use crate::commands::next_number::existing_numbers;
use crate::commands::{load_config, CommandResult};

/// Starts an empty draft dated `today`, valid for the configured number of days. With `quotes`
/// the draft also takes the next number of the month.
pub fn run(quotes: Option<&Path>, today: Option<NaiveDate>) -> CommandResult {
    let today = today.unwrap_or_else(|| Utc::now().date_naive());
    match draft(quotes, today) {
        Ok(quote) => {
            let message = format!("draft valid until {}", quote.valid_until);
            CommandResult::success_with_data("draft", message, &quote)
        }
        Err(error) => CommandResult::from_error("draft", &error),
    }
}

fn draft(quotes: Option<&Path>, today: NaiveDate) -> Result<Quote, ApplicationError> {
    let config = load_config()?;
    let mut quote = Quote::new_draft(today, config.quotes.validity_days)?;

    if let Some(path) = quotes {
        let numbers = existing_numbers(path)?;
        quote.assign_number(next_quote_number(numbers.iter().map(String::as_str), today));
    }

    info!(
        event_name = "quote.draft_created",
        quote_id = %quote.id.0,
        validity_days = config.quotes.validity_days,
        "draft created"
    );
    Ok(quote)
}
