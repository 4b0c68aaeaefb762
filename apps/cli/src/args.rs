use std::path::PathBuf;

use billing_app::RunOverrides;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "billing-loader",
    version,
    about = "Loads OCI cost and FOCUS reports into a SQLite warehouse"
)]
pub struct Cli {
    /// TOML config file; defaults to `billing-loader.toml` when present.
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load new report files, then refresh stats, rate card and reference values.
    Load(LoadArgs),
    /// Create the warehouse tables for both report types.
    InitDb {
        #[arg(long)]
        database: Option<PathBuf>,
    },
    /// Check database schema, bucket, compartments and the public price list.
    Check(TargetArgs),
    /// Show load history for a tenant.
    Status {
        #[command(flatten)]
        target: TargetArgs,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct TargetArgs {
    /// `cost` or `focus`.
    #[arg(long)]
    pub file_type: Option<String>,
    #[arg(long)]
    pub tenant: Option<String>,
    /// Local directory used as the bucket.
    #[arg(long)]
    pub bucket: Option<PathBuf>,
    #[arg(long)]
    pub database: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct LoadArgs {
    #[command(flatten)]
    pub target: TargetArgs,
    /// Only load the file with this id or full object name.
    #[arg(short = 'f', long)]
    pub file: Option<String>,
    /// Skip files dated on or before this day (`YYYY-MM-DD`) or, for cost
    /// files, this creation minute (`YYYY-MM-DD HH:MM`).
    #[arg(short = 'd', long)]
    pub min_date: Option<String>,
    #[arg(long)]
    pub ts1: Option<String>,
    #[arg(long)]
    pub ts2: Option<String>,
    #[arg(long)]
    pub ts3: Option<String>,
    #[arg(long)]
    pub ts4: Option<String>,
    /// Do not call the public price list.
    #[arg(long)]
    pub skip_rate: bool,
    /// Refresh derived tables even when no file was loaded.
    #[arg(long)]
    pub force: bool,
    /// Print the run report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl TargetArgs {
    pub fn overrides(&self) -> RunOverrides {
        RunOverrides {
            file_type: self.file_type.clone(),
            tenant: self.tenant.clone(),
            bucket: self.bucket.clone(),
            database: self.database.clone(),
            ..RunOverrides::default()
        }
    }
}

impl LoadArgs {
    pub fn overrides(&self) -> RunOverrides {
        RunOverrides {
            file: self.file.clone(),
            min_date: self.min_date.clone(),
            special_tags: [
                self.ts1.clone(),
                self.ts2.clone(),
                self.ts3.clone(),
                self.ts4.clone(),
            ],
            skip_rates: self.skip_rate,
            force: self.force,
            ..self.target.overrides()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_load_flags() {
        let cli = Cli::try_parse_from([
            "billing-loader",
            "-c",
            "loader.toml",
            "load",
            "--file-type",
            "focus",
            "--tenant",
            "acme",
            "-f",
            "0001",
            "-d",
            "2024-01-31",
            "--ts2",
            "CostCenter",
            "--skip-rate",
            "--force",
        ])
        .expect("parse args");
        assert_eq!(cli.config, Some(PathBuf::from("loader.toml")));
        let Command::Load(load) = cli.command else {
            panic!("expected load command");
        };
        let overrides = load.overrides();
        assert_eq!(overrides.file_type.as_deref(), Some("focus"));
        assert_eq!(overrides.tenant.as_deref(), Some("acme"));
        assert_eq!(overrides.file.as_deref(), Some("0001"));
        assert_eq!(overrides.min_date.as_deref(), Some("2024-01-31"));
        assert_eq!(overrides.special_tags[1].as_deref(), Some("CostCenter"));
        assert!(overrides.special_tags[0].is_none());
        assert!(overrides.skip_rates);
        assert!(overrides.force);
    }

    #[test]
    fn parses_other_commands() {
        let cli = Cli::try_parse_from(["billing-loader", "init-db", "--database", "w.sqlite"])
            .expect("parse init-db");
        assert!(matches!(cli.command, Command::InitDb { database: Some(_) }));

        let cli = Cli::try_parse_from(["billing-loader", "status", "--tenant", "acme", "--json"])
            .expect("parse status");
        let Command::Status { target, limit, json } = cli.command else {
            panic!("expected status command");
        };
        assert_eq!(target.tenant.as_deref(), Some("acme"));
        assert_eq!(limit, 10);
        assert!(json);

        assert!(Cli::try_parse_from(["billing-loader"]).is_err());
    }
}
