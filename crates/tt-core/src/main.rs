//! tstat-send: walk a tstat output tree and ship flow records to a
//! message broker.
//!
//! Designed to run unattended from cron: already-delivered directories
//! are skipped via their completion marker, so re-invocation is cheap and
//! idempotent for a healthy tree.

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tt_common::{Error, Result};
use tt_config::Config;
use tt_core::filter::VolumeFilter;
use tt_core::transport::{DeliveryChannel, DryRunChannel, RabbitChannel};
use tt_core::walk::Walker;
use tt_core::ShutdownFlag;

/// Parse tstat logs and ship flow records to a message broker.
#[derive(Parser, Debug)]
#[command(name = "tstat-send", version)]
struct Cli {
    /// Root of the tstat output directory tree
    #[arg(short, long)]
    directory: PathBuf,

    /// Path to the TOML configuration file
    #[arg(
        short,
        long,
        env = "TSTAT_SEND_CONFIG",
        default_value = "tstat_send.toml"
    )]
    config: PathBuf,

    /// Minimum per-direction volume in megabytes; 0 keeps everything
    #[arg(short, long, default_value_t = 0)]
    threshold: u64,

    /// Sensor identifier stamped into record meta (default: hostname)
    #[arg(short, long)]
    sensor: Option<String>,

    /// Record batches instead of sending them
    #[arg(long)]
    dry_run: bool,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(err) = run(&cli) {
        error!(code = err.code(), "{err}");
        std::process::exit(err.code() as i32);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = Config::load(&cli.config)?;
    let sensor_id = config.resolve_sensor_id(cli.sensor.as_deref());

    let shutdown = ShutdownFlag::new();
    {
        let shutdown = shutdown.clone();
        if let Err(e) = ctrlc::set_handler(move || shutdown.set()) {
            warn!("could not install interrupt handler: {e}");
        }
    }

    // One channel per run, torn down when it goes out of scope on any
    // exit path, interruption included.
    let mut channel: Box<dyn DeliveryChannel> = if cli.dry_run {
        info!("dry run: batches will be recorded, not sent");
        Box::new(DryRunChannel::new())
    } else {
        Box::new(RabbitChannel::open(&config.rabbit)?)
    };

    let mut walker = Walker::new(
        channel.as_mut(),
        VolumeFilter::from_megabytes(cli.threshold),
        sensor_id,
        shutdown,
    );
    let summary = walker.walk(&cli.directory)?;

    info!(
        visited = summary.visited,
        delivered = summary.delivered,
        already_done = summary.already_done,
        records = summary.records,
        batches = summary.batches,
        rejected = summary.rejected,
        "walk complete"
    );

    if !summary.is_clean() {
        for (dir, reason) in &summary.failures {
            error!(dir = %dir.display(), %reason, "directory left unmarked");
        }
        return Err(Error::WalkIncomplete {
            failed: summary.failures.len(),
            visited: summary.visited,
        });
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
