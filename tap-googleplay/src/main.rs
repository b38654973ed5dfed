//! tap-googleplay command line entry point.
//!
//! Messages go to stdout; diagnostics go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use tap_googleplay::catalog::{discover, Catalog, StreamRegistry};
use tap_googleplay::config::TapConfig;
use tap_googleplay::context::TapContext;
use tap_googleplay::error::Result;
use tap_googleplay::logging::setup::{init_logging, LoggingConfig};
use tap_googleplay::sink::WriterSink;
use tap_googleplay::sync::{RunState, SyncEngine};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// State file from a previous run
    #[arg(short, long)]
    state: Option<PathBuf>,

    /// Catalog file selecting the streams to sync
    #[arg(long, visible_alias = "properties", short_alias = 'p')]
    catalog: Option<PathBuf>,

    /// Print the catalog instead of syncing
    #[arg(short, long)]
    discover: bool,

    /// Log as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_logging(LoggingConfig::default().with_json_format(args.log_json)) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "tap-googleplay failed");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = TapConfig::from_path(&args.config)?;

    if args.discover {
        info!("Running discovery");
        println!("{}", discover()?.to_pretty_json()?);
        return Ok(());
    }

    let catalog = args.catalog.as_ref().map(Catalog::from_path).transpose()?;
    let registry = StreamRegistry::from_optional_catalog(catalog.as_ref())?;
    let state = match &args.state {
        Some(path) => RunState::from_path(path)?,
        None => RunState::default(),
    };

    let source = open_source(&config)?;
    let ctx = TapContext::new(config, registry);
    let mut sink = WriterSink::stdout();

    SyncEngine::new(&ctx, &source, &mut sink, state)?
        .run()
        .await?;
    Ok(())
}

#[cfg(feature = "gcs")]
fn open_source(config: &TapConfig) -> Result<tap_googleplay::sources::ObjectStoreSource> {
    use tap_googleplay::sources::{GcsConfig, ObjectStoreSource};

    ObjectStoreSource::gcs(&GcsConfig::from_tap_config(config))
}

#[cfg(not(feature = "gcs"))]
fn open_source(_config: &TapConfig) -> Result<tap_googleplay::sources::ObjectStoreSource> {
    Err(tap_googleplay::error::TapError::configuration(
        "built without the `gcs` feature; no report bucket backend is available",
    ))
}
