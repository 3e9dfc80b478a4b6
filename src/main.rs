use std::path::PathBuf;

use clap::{Parser, Subcommand};
use cmdb_sync::archive::ArchiveClient;
use cmdb_sync::cmdb::CmdbClient;
use cmdb_sync::config::SyncConfig;
use cmdb_sync::{Result, SyncError, sync};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = SyncConfig::from_path(&cli.config)?;
    let client = CmdbClient::new(&config.cmdb)?;
    let catalog = config.load_catalog()?;

    match cli.command {
        Command::Ingest(args) => {
            ensure_exists(&args.elemfile)?;
            ensure_exists(&args.relfile)?;
            let archive = match &config.archive {
                Some(settings) => Some(ArchiveClient::new(settings)?),
                None => None,
            };
            let report = sync::ingest(
                &client,
                archive.as_ref(),
                &catalog,
                &args.elemfile,
                &args.relfile,
                args.prune,
            )?;
            println!(
                "{} created, {} updated, {} unchanged, {} deleted, {} excluded, {} rejected, {} failed",
                report.created,
                report.updated,
                report.unchanged,
                report.deleted,
                report.excluded,
                report.rejected,
                report.failed
            );
            Ok(())
        }
        Command::Delete(args) => {
            ensure_exists(&args.elemfile)?;
            let report = sync::delete_from_file(&client, &args.elemfile, args.permanent)?;
            println!(
                "{} deleted, {} unresolved, {} failed",
                report.deleted, report.rejected, report.failed
            );
            Ok(())
        }
    }
}

fn ensure_exists(path: &PathBuf) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(SyncError::MissingInput(path.clone()))
    }
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Synchronise architecture-modeling exports into the CMDB."
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "cmdb-sync.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile assets and relationships, then archive the source files.
    Ingest(IngestArgs),
    /// Delete every asset listed in an element export.
    Delete(DeleteArgs),
}

#[derive(clap::Args)]
struct IngestArgs {
    /// Element export file (CSV or XLSX).
    #[arg(long, short = 'e')]
    elemfile: PathBuf,

    /// Relationship export file (CSV or XLSX).
    #[arg(long, short = 'r')]
    relfile: PathBuf,

    /// Also soft-delete remote assets absent from the element file.
    #[arg(long)]
    prune: bool,
}

#[derive(clap::Args)]
struct DeleteArgs {
    /// Element export file (CSV or XLSX) listing the assets to delete.
    #[arg(long, short = 'e')]
    elemfile: PathBuf,

    /// Remove assets permanently instead of soft-deleting them.
    #[arg(long)]
    permanent: bool,
}
