use clap::{Args, Subcommand};
use engine_config::settings::SyncSettingsBuilder;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Copy rows the forum does not have yet from the scraper database
    Migrate(MigrateArgs),
    /// Inspect or manage the checkpoint file
    Checkpoint(CheckpointArgs),
    /// Show the checkpoint and per-entity row counts on both sides
    Status,
    /// Test a connection string against a given format
    TestConn {
        /// Data format: "mysql" or "pg"
        #[arg(long)]
        format: String,

        /// Connection string
        #[arg(long)]
        conn_str: String,
    },
}

#[derive(Args, Debug, Default)]
pub struct MigrateArgs {
    #[arg(long, help = "Rows per insert statement (1-10000, default 1000)")]
    pub batch_size: Option<usize>,

    #[arg(long, help = "Skip entities completed by an interrupted run")]
    pub resume: bool,

    #[arg(long, help = "Delete the checkpoint before starting")]
    pub clear_checkpoint: bool,

    #[arg(long, help = "Only read source rows with an id at or above this value")]
    pub from_id: Option<i64>,

    #[arg(long, help = "Only read rows newer than this date (YYYY-MM-DD or RFC 3339)")]
    pub since: Option<String>,

    #[arg(long, help = "Read, filter and transform without writing anything")]
    pub dry_run: bool,

    #[arg(long, help = "Create missing auxiliary tables before migrating")]
    pub ensure_tables: bool,

    #[arg(
        long = "entity",
        value_name = "NAME",
        help = "Restrict the run to these entities; repeatable"
    )]
    pub entities: Vec<String>,

    #[arg(long, help = "Write the run summary as JSON to this file")]
    pub report: Option<PathBuf>,
}

impl From<MigrateArgs> for SyncSettingsBuilder {
    fn from(args: MigrateArgs) -> Self {
        SyncSettingsBuilder {
            batch_size: args.batch_size,
            resume: args.resume,
            clear_checkpoint: args.clear_checkpoint,
            from_id: args.from_id,
            since: args.since,
            dry_run: args.dry_run,
            ensure_tables: args.ensure_tables,
            entities: args.entities,
            report: args.report,
        }
    }
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct CheckpointArgs {
    #[arg(long, help = "Print the current checkpoint")]
    pub status: bool,

    #[arg(long, help = "Delete the current checkpoint")]
    pub clear: bool,

    #[arg(long, help = "Copy the current checkpoint into the backup directory")]
    pub backup: bool,

    #[arg(long, help = "Restore the newest valid backup")]
    pub restore: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cli;
    use clap::Parser;

    #[test]
    fn test_migrate_flags_reach_builder() {
        let cli = Cli::try_parse_from([
            "forum-sync",
            "migrate",
            "--batch-size",
            "500",
            "--since",
            "2024-01-01",
            "--entity",
            "users",
            "--entity",
            "replies",
            "--dry-run",
        ])
        .unwrap();

        let Commands::Migrate(args) = cli.command else {
            panic!("expected migrate");
        };
        let builder = SyncSettingsBuilder::from(args);
        assert_eq!(builder.batch_size, Some(500));
        assert_eq!(builder.since.as_deref(), Some("2024-01-01"));
        assert_eq!(builder.entities, vec!["users", "replies"]);
        assert!(builder.dry_run);
        assert!(!builder.resume);
    }

    #[test]
    fn test_checkpoint_needs_exactly_one_action() {
        assert!(Cli::try_parse_from(["forum-sync", "checkpoint"]).is_err());
        assert!(Cli::try_parse_from(["forum-sync", "checkpoint", "--clear", "--backup"]).is_err());
        assert!(Cli::try_parse_from(["forum-sync", "checkpoint", "--status"]).is_ok());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "forum-sync",
            "status",
            "--env-file",
            "prod.env",
            "--checkpoint-file",
            "/tmp/cp.json",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.env_file, PathBuf::from("prod.env"));
        assert_eq!(cli.checkpoint_file, Some(PathBuf::from("/tmp/cp.json")));
    }
}
