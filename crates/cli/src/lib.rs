pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{ArgGroup, Parser, Subcommand};
use orcamento_core::config::{AppConfig, LoadOptions};
use orcamento_core::dashboard::DashboardFilters;
use orcamento_core::domain::client::ClientId;
use orcamento_core::domain::product::ProductId;
use orcamento_core::domain::quote::FunnelStage;
use orcamento_core::domain::salesperson::SalespersonId;
use orcamento_core::domain::user::UserRole;

use crate::commands::dashboard::DashboardRequest;
use crate::commands::transition::TransitionTarget;
use crate::commands::TracingAuditSink;

#[derive(Debug, Parser)]
#[command(
    name = "orcamento",
    about = "Quote pricing, funnel and catalog tools",
    long_about = "Price quote exports, move quotes through the sales funnel, import clients and \
                  products from CSV, and summarize quotes for the dashboard.",
    after_help = "Examples:\n  orcamento price quote.json --admin\n  orcamento draft --quotes quotes.json\n  orcamento transition quote.json --status rejeitado --reason \"preço\"\n  orcamento import-products produtos.csv"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Recompute line and quote totals of a quote export")]
    Price {
        quote: PathBuf,
        #[arg(long, help = "Include unit costs and margins in the output")]
        admin: bool,
    },
    #[command(
        about = "Change the status or funnel stage of a quote export",
        group(ArgGroup::new("target").required(true).args(["status", "stage"]))
    )]
    Transition {
        quote: PathBuf,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        stage: Option<String>,
        #[arg(long, help = "Loss reason, required for rejected or lost")]
        reason: Option<String>,
        #[arg(long, default_value = "orcamento-cli")]
        actor: String,
    },
    #[command(about = "Normalize a client CSV export")]
    ImportClients { file: PathBuf },
    #[command(about = "Normalize a product CSV export")]
    ImportProducts { file: PathBuf },
    #[command(about = "Summarize the quotes visible to a user")]
    Dashboard {
        quotes: PathBuf,
        #[arg(long, default_value = "admin", value_parser = parse_role)]
        role: UserRole,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, help = "JSON file with the salesperson roster")]
        salespeople: Option<PathBuf>,
        #[arg(long = "filter-salesperson")]
        filter_salesperson: Option<String>,
        #[arg(long = "filter-client")]
        filter_client: Option<String>,
        #[arg(long = "filter-product")]
        filter_product: Option<String>,
        #[arg(long = "filter-stage", value_parser = parse_stage)]
        filter_stage: Option<FunnelStage>,
        #[arg(long, help = "Reference date (YYYY-MM-DD) for quotes created today")]
        today: Option<NaiveDate>,
    },
    #[command(about = "Start an empty draft quote valid for the configured number of days")]
    Draft {
        #[arg(long, help = "Existing quotes, used to assign the next number")]
        quotes: Option<PathBuf>,
        #[arg(long, help = "Quote date (YYYY-MM-DD)")]
        today: Option<NaiveDate>,
    },
    #[command(about = "Print the next quote number for the current month")]
    NextNumber {
        quotes: PathBuf,
        #[arg(long, help = "Reference date (YYYY-MM-DD)")]
        today: Option<NaiveDate>,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

fn parse_role(raw: &str) -> Result<UserRole, String> {
    raw.parse()
}

fn parse_stage(raw: &str) -> Result<FunnelStage, String> {
    raw.parse().map_err(|error: orcamento_core::DomainError| error.to_string())
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if let Ok(config) = AppConfig::load(LoadOptions::default()) {
        logging::init_logging(&config.logging);
    }

    let result = match cli.command {
        Command::Price { quote, admin } => {
            let role = if admin { UserRole::Admin } else { UserRole::Seller };
            commands::price::run(&quote, role, &TracingAuditSink)
        }
        Command::Transition { quote, status, stage, reason, actor } => {
            let target = match (status, stage) {
                (Some(status), _) => TransitionTarget::Status(status),
                (None, Some(stage)) => TransitionTarget::Stage(stage),
                (None, None) => {
                    return finish(commands::CommandResult::failure(
                        "transition",
                        "invalid_input",
                        "either --status or --stage is required",
                        commands::EXIT_INPUT,
                    ))
                }
            };
            commands::transition::run(&quote, target, reason, &actor, &TracingAuditSink)
        }
        Command::ImportClients { file } => {
            commands::import::run_clients(&file, &TracingAuditSink)
        }
        Command::ImportProducts { file } => {
            commands::import::run_products(&file, &TracingAuditSink)
        }
        Command::Dashboard {
            quotes,
            role,
            email,
            salespeople,
            filter_salesperson,
            filter_client,
            filter_product,
            filter_stage,
            today,
        } => commands::dashboard::run(DashboardRequest {
            quotes_path: quotes,
            salespeople_path: salespeople,
            role,
            email,
            filters: DashboardFilters {
                salesperson: filter_salesperson.map(SalespersonId),
                client: filter_client.map(ClientId),
                product: filter_product.map(ProductId),
                funnel_stage: filter_stage,
            },
            today,
        }),
        Command::Draft { quotes, today } => commands::draft::run(quotes.as_deref(), today),
        Command::NextNumber { quotes, today } => commands::next_number::run(&quotes, today),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
    };

    finish(result)
}

fn finish(result: commands::CommandResult) -> ExitCode {
    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
