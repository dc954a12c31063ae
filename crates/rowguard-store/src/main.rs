//! rowguard CLI
//!
//! ```bash
//! rowguard check --config rowguard.yaml
//! rowguard policies --config rowguard.yaml --table companies --out scripts/rls_policies.sql
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use rowguard_core::error::{Result, RowGuardError};
use rowguard_core::policy::render_script;
use rowguard_store::{config, Store};

#[derive(Parser)]
#[command(name = "rowguard")]
#[command(version)]
#[command(about = "Tenant row security tooling", long_about = None)]
struct Cli {
    /// Store config file
    #[arg(long, short, global = true, env = "ROWGUARD_CONFIG", default_value = "rowguard.yaml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the config and compile every table
    Check,
    /// Write the Postgres row level security script
    Policies {
        /// Only this table (default: every table with row security)
        #[arg(long)]
        table: Option<String>,
        #[arg(long, short, default_value = "scripts/rls_policies.sql")]
        out: PathBuf,
    },
}

fn main() -> ExitCode {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let res = match cli.command {
        Commands::Check => check(&cli.config),
        Commands::Policies { table, out } => policies(&cli.config, table.as_deref(), &out),
    };

    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = e.code().as_str(), error = %e, "rowguard failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load(path: &str) -> Result<Store> {
    let cfg = config::load_from_file(path)?;
    Store::new(cfg)
}

fn check(path: &str) -> Result<()> {
    let store = load(path)?;
    println!(
        "config ok: tenant column {}, session setting {}",
        store.rls().tenant_column,
        store.rls().setting_name
    );
    for name in store.table_names() {
        let rls = if store.row_security_enabled(&name)? { "on" } else { "off" };
        println!("  table {name}: row security {rls}");
    }
    Ok(())
}

fn policies(path: &str, table: Option<&str>, out: &Path) -> Result<()> {
    let store = load(path)?;
    let sets = match table {
        Some(t) => vec![store.policy_set(t)?],
        None => store.policy_sets()?,
    };
    if sets.is_empty() {
        return Err(RowGuardError::BadRequest(
            "no table has row security enabled".into(),
        ));
    }

    if let Some(dir) = out.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .map_err(|e| RowGuardError::Internal(format!("create {} failed: {e}", dir.display())))?;
    }
    fs::write(out, render_script(&sets))
        .map_err(|e| RowGuardError::Internal(format!("write {} failed: {e}", out.display())))?;

    tracing::info!(tables = sets.len(), out = %out.display(), "policy script written");
    println!("wrote {} ({} tables)", out.display(), sets.len());
    println!("apply as a postgres superuser:");
    println!("  psql -h <host> -U <superuser> -d <database> -f {}", out.display());
    Ok(())
}
