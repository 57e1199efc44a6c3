//! # Command Line Interface
//!
//! Operator commands: mirror backup and restore for a scope, printing the
//! derived namespace accounts, and running mirror database migrations.

pub mod output;

use crate::backends::etcd::EtcdKeyMapper;
use crate::backends::nacos::NacosKeyMapper;
use crate::backends::BackendRegistry;
use crate::config::{AppConfig, BackendSettings};
use crate::domain::{Account, ConfigItem, Scope};
use crate::observability::{init_logging, log_config_info};
use crate::services::ConfigService;
use crate::storage::{create_pool, get_migration_version, run_migrations, SqlMirrorStore};
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use output::OutputFormat;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "gantry")]
#[command(about = "Config center backup, restore and account tooling")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Database URL override
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format: json or table
    #[arg(short, long, global = true, default_value = "table")]
    pub output: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Copy backend config items into the mirror store
    Backup(ScopeArgs),

    /// Publish mirrored config items missing from the backend
    Restore(ScopeArgs),

    /// Print the read and read-write accounts of a namespace
    Accounts(ScopeArgs),

    /// Run pending mirror database migrations
    Migrate,
}

/// Tenant/project scope, optionally narrowed to one environment
#[derive(Args, Debug, Clone)]
pub struct ScopeArgs {
    #[arg(long)]
    pub tenant: String,

    #[arg(long)]
    pub project: String,

    /// Leave empty to cover every environment of the project
    #[arg(long, default_value = "")]
    pub environment: String,
}

impl ScopeArgs {
    pub fn scope(&self) -> Scope {
        Scope::new(&self.tenant, &self.project, &self.environment)
    }
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let format = OutputFormat::from_str(&cli.output)?;

    let mut config = crate::config::load(cli.config.as_deref())
        .context("Failed to load gantry configuration")?;
    if let Some(url) = cli.database_url.clone() {
        config.database.url = url;
    }
    if cli.verbose {
        config.observability.log_level = "debug".to_string();
    }

    init_logging(&config.observability)?;
    log_config_info(&config);

    match cli.command {
        Commands::Backup(args) => {
            let service = build_service(&config).await?;
            let report = service.backup(&args.scope()).await?;
            output::print_report(&report, format)?;
        }
        Commands::Restore(args) => {
            let service = build_service(&config).await?;
            let report = service.restore(&args.scope()).await?;
            output::print_report(&report, format)?;
        }
        Commands::Accounts(args) => {
            let accounts = accounts_for(&config, &args)?;
            output::print_accounts(&accounts, format)?;
        }
        Commands::Migrate => {
            let mut database = config.database.clone();
            database.auto_migrate = false;
            let pool = create_pool(&database).await?;
            run_migrations(&pool).await?;
            match get_migration_version(&pool).await? {
                Some(version) => println!("Mirror database at migration {}", version),
                None => println!("No migrations applied"),
            }
        }
    }

    Ok(())
}

async fn build_service(config: &AppConfig) -> anyhow::Result<ConfigService> {
    let pool = create_pool(&config.database).await?;
    let registry = BackendRegistry::from_config(config).await?;
    Ok(ConfigService::new(Arc::new(registry), Arc::new(SqlMirrorStore::new(pool))))
}

/// Accounts are derived from names alone, so no backend connection is made.
fn accounts_for(config: &AppConfig, args: &ScopeArgs) -> anyhow::Result<Vec<Account>> {
    let name = config.routing.backend_for(&args.tenant);
    let settings = config
        .backend(name)
        .with_context(|| format!("Tenant '{}' routes to unknown backend '{}'", args.tenant, name))?;

    let item = ConfigItem::new(&args.tenant, &args.project, &args.environment, "");
    let accounts = match settings {
        BackendSettings::Etcd(etcd) => EtcdKeyMapper::new(&etcd.root).accounts(&item)?,
        BackendSettings::Nacos(nacos) => NacosKeyMapper::new(&nacos.root).accounts(&item)?,
    };
    Ok(accounts)
}
