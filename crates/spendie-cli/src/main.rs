//! Spendie CLI - Personal expense tracker
//!
//! Usage:
//!   spendie add 250 -c food            Record an expense
//!   spendie budget set food 5000       Set this month's food budget
//!   spendie report summary             Spending for this month
//!   spendie chat                       Talk to the chat bot in the terminal
//!   spendie serve --port 8080          Start the chat webhook and command API

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use spendie_core::{Config, ReportKind};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.database = db;
    }
    if let Some(owner) = cli.owner {
        config.owner = owner;
    }

    match cli.command {
        Commands::Init => commands::cmd_init(&config),
        Commands::Serve {
            port,
            host,
            no_auth,
        } => commands::cmd_serve(&config, host.as_deref(), port, no_auth).await,
        Commands::Add {
            amount,
            category,
            date,
            description,
        } => {
            let app = commands::open_app(&config)?;
            commands::cmd_add(
                &app,
                &amount,
                category.as_deref(),
                &date,
                description.as_deref(),
            )
        }
        Commands::List {
            category,
            period,
            search,
            min,
            max,
            limit,
        } => {
            let app = commands::open_app(&config)?;
            commands::cmd_list(
                &app,
                category.as_deref(),
                period.as_deref(),
                search.as_deref(),
                min.as_deref(),
                max.as_deref(),
                limit,
            )
        }
        Commands::Edit {
            id,
            amount,
            category,
            date,
            description,
        } => {
            let app = commands::open_app(&config)?;
            commands::cmd_edit(
                &app,
                id,
                amount.as_deref(),
                category.as_deref(),
                date.as_deref(),
                description.as_deref(),
            )
        }
        Commands::Delete { id } => {
            let app = commands::open_app(&config)?;
            commands::cmd_delete(&app, id)
        }
        Commands::DeleteAll { yes } => {
            let app = commands::open_app(&config)?;
            commands::cmd_delete_all(&app, yes)
        }
        Commands::Budget { action } => {
            let app = commands::open_app(&config)?;
            match action {
                None => commands::cmd_budget_list(&app, None, false),
                Some(BudgetAction::Set {
                    category,
                    limit,
                    period,
                    replace,
                }) => commands::cmd_budget_set(&app, &category, &limit, period.as_deref(), replace),
                Some(BudgetAction::Update {
                    category,
                    limit,
                    period,
                }) => commands::cmd_budget_set(&app, &category, &limit, period.as_deref(), true),
                Some(BudgetAction::List { period, all }) => {
                    commands::cmd_budget_list(&app, period.as_deref(), all)
                }
                Some(BudgetAction::Delete { category, period }) => {
                    commands::cmd_budget_delete(&app, &category, period.as_deref())
                }
            }
        }
        Commands::Report { report_type } => {
            let app = commands::open_app(&config)?;
            match report_type {
                ReportType::Summary {
                    period,
                    category,
                    rollup,
                } => {
                    let kind = if rollup {
                        ReportKind::Rollup
                    } else {
                        ReportKind::Summary
                    };
                    commands::cmd_report(&app, kind, &period, category.as_deref())
                }
                ReportType::Periods { period, category } => {
                    commands::cmd_report(&app, ReportKind::Periods, &period, category.as_deref())
                }
                ReportType::Trends { period, category } => {
                    commands::cmd_report(&app, ReportKind::Trends, &period, category.as_deref())
                }
                ReportType::Daily { days, category } => {
                    commands::cmd_report_daily(&app, days, category.as_deref())
                }
                ReportType::Compare {
                    current,
                    previous,
                    category,
                } => commands::cmd_report_compare(&app, &current, &previous, category.as_deref()),
            }
        }
        Commands::Alerts { period } => {
            let app = commands::open_app(&config)?;
            commands::cmd_alerts(&app, period.as_deref())
        }
        Commands::Export {
            output,
            period,
            category,
        } => {
            let app = commands::open_app(&config)?;
            commands::cmd_export(
                &app,
                output.as_deref(),
                period.as_deref(),
                category.as_deref(),
            )
        }
        Commands::Import { file } => {
            let app = commands::open_app(&config)?;
            commands::cmd_import(&app, &file)
        }
        Commands::Categories { action } => {
            let app = commands::open_app(&config)?;
            match action {
                None | Some(CategoriesAction::List) => commands::cmd_categories_list(&app),
                Some(CategoriesAction::Add { name, parent }) => {
                    commands::cmd_categories_add(&app, &name, parent.as_deref())
                }
                Some(CategoriesAction::Delete { name, reassign_to }) => {
                    commands::cmd_categories_delete(&app, &name, reassign_to.as_deref())
                }
            }
        }
        Commands::Chat => {
            let app = commands::open_app(&config)?;
            commands::cmd_chat(&app)
        }
    }
}
