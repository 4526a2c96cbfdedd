use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use fieldlink::{gateway, Settings};
use fieldlink_link::LinkError;
use fieldlink_types::GATEWAY_BUILD;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "fieldlink")]
#[command(about = "Field gateway bridging a sensor-radio MCU to a telemetry sink")]
struct Args {
    /// Path to the configuration file (optional)
    #[arg(short, long, default_value = "fieldlink.toml")]
    config: PathBuf,

    /// Validate configuration and key table, print a summary and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let settings = Settings::load(&args.config)?;
    let keys = settings.key_store()?;

    if args.check {
        print_summary(&settings, &keys);
        return Ok(());
    }

    info!(build = GATEWAY_BUILD, site_id = %settings.site_id, "fieldlink gateway starting");

    let err = match gateway::run(settings, Arc::new(keys)).await {
        Ok(()) => return Ok(()),
        Err(e) => e,
    };
    let code = err.downcast_ref::<LinkError>().map_or(1, LinkError::exit_code);
    error!(error = %err, code, "link failed, exiting");
    std::process::exit(code);
}

fn print_summary(settings: &Settings, keys: &fieldlink_decode::KeyStore) {
    let table = keys.snapshot();
    println!("configuration ok");
    println!("  site_id:    {}", settings.site_id);
    println!("  heartbeat:  {}", settings.sockets.heartbeat);
    println!("  stats:      {}", settings.sockets.stats);
    println!("  data:       {}", settings.sockets.data);
    if settings.sink.url.is_empty() {
        println!("  sink:       (log only)");
    } else {
        println!("  sink:       {}", settings.sink.url);
    }
    println!(
        "  probe:      {}",
        settings.probe.address.as_deref().unwrap_or("(always reachable)")
    );
    println!("  stats out:  {}", settings.stats.output);
    println!("  keys:       {} [{}]", table.len(), table.serials().join(", "));
}
