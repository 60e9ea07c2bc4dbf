use crate::{
    commands::{CheckpointArgs, Commands, MigrateArgs},
    conn::ConnectionKind,
    env::EnvManager,
    error::CliError,
    output::EntityCounts,
};
use clap::Parser;
use connectors::sql::base::{destination::TargetStore, source::SourceStore};
use engine_config::settings::{
    SyncSettingsBuilder, checkpoint::CheckpointSettings, connection::ConnectionSettings,
    retry::RetrySettings, transform::TransformSettings, validator::SettingsValidator,
};
use engine_core::state::CheckpointStore;
use engine_runtime::execution::{
    executor,
    factory::{self, PoolConnector},
};
use model::entity::EntityKind;
use std::{path::PathBuf, str::FromStr, sync::Arc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod conn;
mod env;
mod error;
mod output;

#[derive(Parser)]
#[command(
    name = "forum-sync",
    version,
    about = "Incremental sync from the scraper database into the forum database"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, default_value = ".env", help = "Env file with connection settings")]
    env_file: PathBuf,

    #[arg(long, global = true, help = "Checkpoint file path")]
    checkpoint_file: Option<PathBuf>,

    #[arg(long, global = true, help = "Directory for checkpoint backups")]
    backup_dir: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Log at debug level unless RUST_LOG is set")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if let Err(err) = run(cli).await {
        error!(error = %err, "forum-sync failed");
        return Err(err);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut env = EnvManager::new();
    env.load_optional(&cli.env_file)?;
    let checkpoints = CheckpointSettings::new(cli.checkpoint_file, cli.backup_dir);

    match cli.command {
        Commands::Migrate(args) => migrate(args, &env, &checkpoints).await,
        Commands::Checkpoint(args) => manage_checkpoint(args, &checkpoints).await,
        Commands::Status => show_status(&env, &checkpoints).await,
        Commands::TestConn { format, conn_str } => {
            let kind = ConnectionKind::from_str(&format)
                .map_err(|_| CliError::InvalidConnectionFormat(format))?;
            kind.pinger(conn_str).ping().await
        }
    }
}

async fn migrate(
    args: MigrateArgs,
    env: &EnvManager,
    checkpoints: &CheckpointSettings,
) -> Result<(), CliError> {
    let builder = SyncSettingsBuilder::from(args);
    let settings = SettingsValidator::new(&builder).validate()?;
    let connections = ConnectionSettings::from_env(env.all())?;
    let retry = RetrySettings::from_env(env.all())?.policy();
    let transformer = factory::create_transformer(&TransformSettings::from_env(env.all()))?;

    let connector = Arc::new(PoolConnector::new(connections));
    let store = Arc::new(checkpoints.store());
    let summary = executor::run(connector, store, transformer, retry, settings).await?;

    output::print_summary(&summary);
    Ok(())
}

async fn manage_checkpoint(
    args: CheckpointArgs,
    settings: &CheckpointSettings,
) -> Result<(), CliError> {
    let store = settings.store();

    if args.status {
        print!("{}", store.stats().await);
    } else if args.clear {
        store.clear().await?;
        info!(path = %store.path().display(), "Checkpoint cleared");
    } else if args.backup {
        match store.backup().await? {
            Some(path) => info!(path = %path.display(), "Checkpoint backed up"),
            None => warn!("No checkpoint to back up"),
        }
    } else if args.restore {
        match store.restore_latest_backup().await? {
            Some(checkpoint) => info!(
                operation = %checkpoint.operation,
                total_processed = checkpoint.total_processed,
                "Checkpoint restored from backup"
            ),
            None => warn!("No valid backup to restore"),
        }
    }
    Ok(())
}

async fn show_status(env: &EnvManager, checkpoints: &CheckpointSettings) -> Result<(), CliError> {
    print!("{}", checkpoints.store().stats().await);
    println!();

    let connections = ConnectionSettings::from_env(env.all())?;
    let stores = factory::connect(&connections).await?;

    let mut counts = Vec::with_capacity(EntityKind::ALL.len());
    for entity in EntityKind::ALL {
        let table = entity.table();
        let source = stores
            .source
            .count_rows(table)
            .await
            .inspect_err(|e| warn!(table, error = %e, "Could not count source rows"))
            .ok();
        let target = stores
            .target
            .count_rows(table)
            .await
            .inspect_err(|e| warn!(table, error = %e, "Could not count target rows"))
            .ok();
        counts.push(EntityCounts {
            entity,
            source,
            target,
        });
    }
    stores.close().await;

    output::print_counts(&counts);
    Ok(())
}
