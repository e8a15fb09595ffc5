use std::path::Path;

use orcamento_core::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use orcamento_core::domain::client::Client;
use orcamento_core::domain::product::Product;
use orcamento_core::errors::ApplicationError;
use orcamento_core::import::{import_clients, import_products, ImportReport};
use serde::Serialize;
use tracing::info;

use crate::commands::{import_failure, load_config, new_correlation_id, read_text, CommandResult};

const ACTOR: &str = "orcamento-cli";

pub fn run_clients<S: AuditSink>(path: &Path, sink: &S) -> CommandResult {
    let command = "import-clients";
    let correlation_id = new_correlation_id(command);
    let result = clients(path);
    finish(command, result, sink, correlation_id)
}

pub fn run_products<S: AuditSink>(path: &Path, sink: &S) -> CommandResult {
    let command = "import-products";
    let correlation_id = new_correlation_id(command);
    let result = products(path);
    finish(command, result, sink, correlation_id)
}

fn clients(path: &Path) -> Result<ImportReport<Client>, ApplicationError> {
    let config = load_config()?;
    let raw = read_text(path)?;
    import_clients(&raw, &config.quotes.default_phone_country_code).map_err(import_failure)
}

fn products(path: &Path) -> Result<ImportReport<Product>, ApplicationError> {
    let raw = read_text(path)?;
    import_products(&raw).map_err(import_failure)
}

fn finish<T: Serialize, S: AuditSink>(
    command: &str,
    result: Result<ImportReport<T>, ApplicationError>,
    sink: &S,
    correlation_id: String,
) -> CommandResult {
    let report = match result {
        Ok(report) => report,
        Err(error) => {
            if let ApplicationError::Import(reason) = &error {
                sink.emit(
                    AuditEvent::new(
                        None,
                        correlation_id.as_str(),
                        "import.failed",
                        AuditCategory::Import,
                        ACTOR,
                        AuditOutcome::Failed,
                    )
                    .with_metadata("command", command)
                    .with_metadata("reason", reason.as_str()),
                );
            }
            return CommandResult::from_error_with_id(command, &error, correlation_id);
        }
    };

    info!(
        event_name = "import.completed",
        command,
        accepted = report.accepted.len(),
        skipped = report.skipped.len(),
        "import completed"
    );
    sink.emit(
        AuditEvent::new(
            None,
            correlation_id.as_str(),
            "import.completed",
            AuditCategory::Import,
            ACTOR,
            AuditOutcome::Success,
        )
        .with_metadata("command", command)
        .with_metadata("accepted", report.accepted.len().to_string())
        .with_metadata("skipped", report.skipped.len().to_string()),
    );

    let message =
        format!("{} rows accepted, {} skipped", report.accepted.len(), report.skipped.len());
    CommandResult::success_with_data(command, message, report)
}
