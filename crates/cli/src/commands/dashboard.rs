use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use orcamento_core::dashboard::{DashboardFilters, DashboardScope, DashboardStats};
use orcamento_core::domain::quote::Quote;
use orcamento_core::domain::salesperson::Salesperson;
use orcamento_core::domain::user::UserRole;
use orcamento_core::errors::ApplicationError;
use serde::Serialize;

use crate::commands::{read_json, CommandResult};

#[derive(Clone, Debug)]
pub struct DashboardRequest {
    pub quotes_path: PathBuf,
    pub salespeople_path: Option<PathBuf>,
    pub role: UserRole,
    pub email: String,
    pub filters: DashboardFilters,
    pub today: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
struct DashboardReport {
    scope: &'static str,
    stats: DashboardStats,
}

pub fn run(request: DashboardRequest) -> CommandResult {
    match build(&request) {
        Ok(report) => {
            let message = format!("{} quotes in scope", report.stats.quote_count);
            CommandResult::success_with_data("dashboard", message, report)
        }
        Err(error) => CommandResult::from_error("dashboard", &error),
    }
}

fn build(request: &DashboardRequest) -> Result<DashboardReport, ApplicationError> {
    let quotes: Vec<Quote> = read_json(&request.quotes_path)?;
    let salespeople = load_salespeople(request.salespeople_path.as_deref())?;

    let scope = DashboardScope::for_viewer(
        request.role,
        &request.email,
        &salespeople,
        request.filters.clone(),
    );
    let today = request.today.unwrap_or_else(|| Utc::now().date_naive());
    let stats = DashboardStats::compute(&scope.select(&quotes), today);

    let scope = match scope {
        DashboardScope::All(_) => "all",
        DashboardScope::Salesperson(_) => "salesperson",
        DashboardScope::Nothing => "none",
    };
    Ok(DashboardReport { scope, stats })
}

fn load_salespeople(path: Option<&Path>) -> Result<Vec<Salesperson>, ApplicationError> {
    match path {
        Some(path) => read_json(path),
        None => Ok(Vec::new()),
    }
}
