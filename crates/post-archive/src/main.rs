mod bootstrap;
mod feed;

use std::sync::Arc;

use anyhow::Result;
use archive_core::settings::{Command, ExportScope, Settings};
use archive_core::time_utils::{resolve_timezone, TimezoneHandler};
use archive_data::exporter::Exporter;
use archive_data::store::Store;
use archive_runtime::commands::{CommandInterface, DirectorySink, Intent, Reply, Request};
use archive_runtime::ingestor::Ingestor;
use archive_runtime::peers::PeerTitles;
use clap::Parser;
use tokio::sync::mpsc;

/// Events buffered between the stdin feed and the ingestor.
const EVENT_BUFFER: usize = 64;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::parse();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(settings.effective_log_level())?;
    settings.validate()?;

    tracing::info!("post-archive v{} starting", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(Store::new(settings.store_path()));
    store.ensure_initialized()?;

    match &settings.command {
        Command::Init => {
            tracing::info!("Store ready at {}", store.path().display());
        }

        Command::Ingest => {
            let titles = match &settings.peers {
                Some(path) => PeerTitles::load_from(path)?,
                None => PeerTitles::default(),
            };
            let ingestor = Ingestor::new(
                Arc::clone(&store),
                titles,
                TimezoneHandler::new(&settings.reference_timezone),
                settings.store_time_of_day,
            );

            let (tx, rx) = mpsc::channel(EVENT_BUFFER);
            let handle = ingestor.spawn(rx);
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());

            // The feed owns the sender; once it returns or is dropped the
            // ingestor drains what is buffered and stops.
            tokio::select! {
                result = feed::forward_events(stdin, tx) => {
                    let fed = result?;
                    tracing::info!("Read {} event(s), {} malformed", fed.forwarded, fed.malformed);
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received; stopping ingestion");
                }
            }

            if let Some(stats) = handle.join().await {
                tracing::info!(
                    "Archived {} post(s); store now holds {} row(s)",
                    stats.stored,
                    store.len()?
                );
            }
        }

        Command::Export { scope, out } => {
            let exporter = Exporter::new(Arc::clone(&store), settings.export_dir());
            let commands = CommandInterface::new(
                exporter,
                DirectorySink::new(out),
                resolve_timezone(&settings.timezone),
            );

            let intent = match scope {
                ExportScope::Current => Intent::CurrentMonth,
                ExportScope::All => Intent::Everything,
                ExportScope::Month { month } => Intent::Month(*month),
            };

            match commands.handle(Request::Export(intent)) {
                Reply::Delivered { caption, rows } => {
                    println!("{} ({} post(s)) delivered to {}", caption, rows, out.display());
                }
                Reply::Failed { message } => anyhow::bail!(message),
                Reply::Menu { text, .. } => println!("{}", text),
            }
        }
    }

    Ok(())
}
