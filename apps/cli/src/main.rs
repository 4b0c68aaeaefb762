mod args;
mod config;

use std::process::ExitCode;

use billing_app::{AppState, RunOverrides};
use clap::Parser;
use ingest::RunReport;

use crate::args::{Cli, Command};

fn main() -> ExitCode {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            log::error!("{}", err);
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> billing_app::Result<ExitCode> {
    let loaded = config::load(cli.config.as_deref())?;
    match &loaded.file {
        Some(path) => log::info!("using config {}", path.display()),
        None => log::info!("no config file, using defaults"),
    }
    let state = AppState::new(loaded.config);

    match cli.command {
        Command::Load(load) => {
            let report = state.run_load(&load.overrides())?;
            if load.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::InitDb { database } => {
            let overrides = RunOverrides {
                database,
                ..RunOverrides::default()
            };
            let mut config = state.config.clone();
            config.apply(&overrides);
            billing_app::setup_db(&config.database)?;
            println!("Database ready at {}.", config.database.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Check(target) => {
            let report = state.check(&target.overrides())?;
            for item in &report.items {
                let mark = match (item.ok, item.warning_only) {
                    (true, _) => "ok",
                    (false, true) => "warn",
                    (false, false) => "FAIL",
                };
                println!("{:<5} {:<13} {}", mark, item.name, item.detail);
            }
            Ok(if report.passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Status {
            target,
            limit,
            json,
        } => {
            let status = state.status(&target.overrides(), limit)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
                return Ok(ExitCode::SUCCESS);
            }
            println!(
                "{} {} files loaded for {}",
                status.files_loaded, status.file_type, status.tenant
            );
            println!("  watermark:  {}", status.watermark);
            println!("  raw rows:   {}", status.raw_rows);
            println!("  rate cards: {}", status.rate_cards);
            for file in &status.recent {
                println!(
                    "  {}  {:>8} rows  {}",
                    file.load_end, file.num_rows, file.file_name
                );
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_report(report: &RunReport) {
    let load = &report.load;
    println!(
        "Loaded {} of {} files ({} rows, {} skipped).",
        load.files_loaded, load.files_listed, load.rows_loaded, load.files_skipped
    );
    for issue in &load.issues {
        println!("  warning: {}: {}", issue.file_name, issue.message);
    }
    let Some(refresh) = &report.refresh else {
        println!("No new files; derived tables not refreshed.");
        return;
    };
    println!(
        "Refreshed {} stats rows, {} rate card rows, {} reference values.",
        refresh.stats_rows, refresh.rate_card_rows, refresh.reference_rows
    );
    if let Some(rates) = &refresh.public_rates {
        println!(
            "Public rates: {} of {} SKUs updated, {} failed{}.",
            rates.rows_updated,
            rates.skus_checked,
            rates.failures,
            if rates.aborted { ", price list unreachable" } else { "" }
        );
    }
}
