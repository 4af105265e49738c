//! Top-level CLI definition and dispatch.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pst_send::catalog::{CatalogClient, HttpCatalogClient};
use pst_send::core::config::{CatalogConfig, Config};
use pst_send::core::errors::Result;
use pst_send::daemon::signals::SignalHandler;
use pst_send::orchestrator::Orchestrator;

/// pst-send — data-egress daemon for PST voltage-recorder scans.
#[derive(Debug, Parser)]
#[command(
    name = "pst-send",
    author,
    version,
    about = "Post-process, transfer, catalog, and reclaim completed PST voltage-recorder scans",
    long_about = None
)]
pub struct Cli {
    /// Local staging root containing <eb>/<subsystem>/<scan> directories.
    local_path: PathBuf,
    /// Remote filesystem root mirroring the local layout.
    remote_path: PathBuf,
    /// PST subsystem instance to watch.
    #[arg(value_parser = ["pst-low", "pst-mid"])]
    ska_subsystem: String,
    /// Data-product catalog base URL, or "disabled" to skip catalog handoff.
    #[arg(long, default_value = "disabled", value_name = "URL|disabled")]
    data_product_dashboard: String,
    /// Seconds of inactivity after which a scan is considered stale.
    #[arg(long, default_value_t = 300, value_name = "SECONDS")]
    scan_timeout: u64,
    /// Raise logging verbosity to debug.
    #[arg(short, long)]
    verbose: bool,
    /// Optional TOML file overriding the built-in timeout defaults.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Build the runtime configuration, construct the orchestrator, and run it
/// until shutdown. Any error here is the CLI's unhandled-exception path.
pub fn run(cli: &Cli) -> Result<()> {
    init_logging(cli.verbose);

    let file_config = Config::load_file(cli.config.as_deref())?;

    // The CLI flag wins when set explicitly; a "disabled" default falls back
    // to a catalog URL configured in the TOML file, if any.
    let catalog = if cli.data_product_dashboard == "disabled" {
        file_config.catalog.clone()
    } else {
        CatalogConfig {
            base_url: Some(cli.data_product_dashboard.clone()),
        }
    };

    let mut timeouts = file_config.timeouts;
    timeouts.scan_timeout_secs = cli.scan_timeout;

    let config = Config {
        local_path: cli.local_path.clone(),
        remote_path: cli.remote_path.clone(),
        ska_subsystem: cli.ska_subsystem.clone(),
        catalog,
        timeouts,
        verbose: cli.verbose,
    };
    config.validate()?;

    let catalog_client: Option<Arc<dyn CatalogClient>> = if config.catalog.is_enabled() {
        let base_url = config
            .catalog
            .base_url
            .clone()
            .expect("is_enabled() guarantees base_url is set");
        Some(Arc::new(HttpCatalogClient::new(base_url)))
    } else {
        None
    };

    let signals = SignalHandler::new();
    let orchestrator = Orchestrator::new(
        config.local_path,
        config.remote_path,
        config.ska_subsystem,
        config.timeouts,
        catalog_client,
        signals,
    );
    orchestrator.run()
}

fn init_logging(verbose: bool) {
    let default_directive = if verbose { "pst_send=debug" } else { "pst_send=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
