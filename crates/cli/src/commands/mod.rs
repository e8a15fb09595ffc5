pub mod config;
pub mod dashboard;
pub mod draft;
pub mod import;
pub mod next_number;
pub mod price;
pub mod transition;

use std::fs;
use std::path::Path;

use anyhow::Context;
use orcamento_core::audit::{AuditEvent, AuditSink};
use orcamento_core::config::{AppConfig, LoadOptions};
use orcamento_core::errors::{ApplicationError, DomainError};
use orcamento_core::import::ImportError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_INPUT: u8 = 3;
pub const EXIT_DOMAIN: u8 = 4;
pub const EXIT_IMPORT: u8 = 5;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, Value::Null)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: impl Serialize,
    ) -> Self {
        let data = match serde_json::to_value(data) {
            Ok(Value::Null) => None,
            Ok(value) => Some(value),
            Err(error) => {
                return Self::failure(command, "serialization", error.to_string(), EXIT_INPUT)
            }
        };
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            hint: None,
            correlation_id: None,
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            hint: None,
            correlation_id: None,
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Maps an application error to its error class and exit code. The message, hint and
    /// correlation id come from the error's interface form.
    pub fn from_error(command: &str, error: &ApplicationError) -> Self {
        Self::from_error_with_id(command, error, new_correlation_id(command))
    }

    pub fn from_error_with_id(
        command: &str,
        error: &ApplicationError,
        correlation_id: String,
    ) -> Self {
        let (error_class, exit_code) = match error {
            ApplicationError::Configuration(_) => ("config_validation", EXIT_CONFIG),
            ApplicationError::Input(_) => ("invalid_input", EXIT_INPUT),
            ApplicationError::Import(_) => ("import", EXIT_IMPORT),
            ApplicationError::Domain(DomainError::FlowTransition(_)) => {
                ("transition_rejected", EXIT_DOMAIN)
            }
            ApplicationError::Domain(_) => ("domain_validation", EXIT_DOMAIN),
        };
        let interface = error.clone().into_interface(correlation_id);
        tracing::warn!(
            event_name = "cli.command_failed",
            command,
            error_class,
            correlation_id = interface.correlation_id(),
            error = %error,
            "command failed"
        );

        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: interface.message().to_string(),
            hint: Some(interface.user_message().to_string()),
            correlation_id: Some(interface.correlation_id().to_string()),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

/// `<command>-<uuid>`, shared by a command's log lines, audit events and error output.
pub fn new_correlation_id(command: &str) -> String {
    format!("{command}-{}", Uuid::new_v4())
}

/// Emits audit events as structured log lines.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        info!(
            event_name = event.event_type.as_str(),
            event_id = event.event_id.as_str(),
            category = ?event.category,
            correlation_id = event.correlation_id.as_str(),
            actor = event.actor.as_str(),
            outcome = ?event.outcome,
            metadata = ?event.metadata,
            "audit"
        );
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub(crate) fn load_config() -> Result<AppConfig, ApplicationError> {
    AppConfig::load(LoadOptions::default())
        .map_err(|error| ApplicationError::Configuration(error.to_string()))
}

pub(crate) fn read_text(path: &Path) -> Result<String, ApplicationError> {
    fs::read_to_string(path)
        .with_context(|| format!("could not read `{}`", path.display()))
        .map_err(|error| ApplicationError::Input(format!("{error:#}")))
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ApplicationError> {
    let raw = read_text(path)?;
    serde_json::from_str(&raw)
        .with_context(|| format!("could not parse `{}` as JSON", path.display()))
        .map_err(|error| ApplicationError::Input(format!("{error:#}")))
}

pub(crate) fn import_failure(error: ImportError) -> ApplicationError {
    ApplicationError::Import(error.to_string())
}
