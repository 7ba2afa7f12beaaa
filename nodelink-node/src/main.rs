use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use nodelink_node::session::{run_inbound_monitor, run_send_monitor};
use nodelink_node::{
    Config, LinkConfig, LinkDriver, MockLink, SensorConfig, Session, SimulatedMpu6050, Transport,
    UdpLink,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser)]
#[command(name = "nodelink-node")]
#[command(about = "Sensor node reporting readings to a fixed peer")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "nodelink-node.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "nodelink_node=info,nodelink_core=info".to_owned());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    let config = if cli.config.exists() {
        info!(path = ?cli.config, "Loading configuration");
        Config::load(&cli.config)?
    } else {
        info!("No configuration file found, using defaults");
        Config::default()
    };

    info!(
        identity = %config.node.identity,
        peer = %config.peer.address,
        channel = config.peer.channel,
        sample_interval_ms = config.node.sample_interval_ms.get(),
        "Starting nodelink-node"
    );

    match &config.link {
        LinkConfig::Mock => {
            info!("Using mock link");
            run_node(&config, MockLink::new()).await
        }
        LinkConfig::Udp {
            bind,
            local_address,
            peers,
        } => {
            info!(%bind, %local_address, "Using UDP link");
            let link = UdpLink::bind(*bind, *local_address, peers.clone()).await?;
            run_node(&config, link).await
        }
    }
}

async fn run_node<L: LinkDriver>(config: &Config, link: L) -> color_eyre::Result<()> {
    let cancel = CancellationToken::new();
    let transport = Arc::new(Transport::new(link));

    transport.register_peer(&config.peer).await?;

    let reports = transport
        .on_send_result()
        .ok_or_else(|| color_eyre::eyre::eyre!("send-result stream already taken"))?;
    let send_monitor = tokio::spawn(run_send_monitor(reports, cancel.clone()));

    let inbound = transport.on_receive(cancel.clone()).await?;
    let inbound_monitor = tokio::spawn(run_inbound_monitor(inbound, cancel.clone()));

    let sensor = match config.sensor {
        SensorConfig::Simulated => SimulatedMpu6050::new(),
    };
    let session = Session::new(&config.node, &config.peer, sensor, Arc::clone(&transport));
    let session_handle = tokio::spawn(session.run(cancel.clone()));

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down...");
    cancel.cancel();

    let _ = session_handle.await;
    let _ = send_monitor.await;
    let _ = inbound_monitor.await;

    info!("nodelink-node shut down complete");
    Ok(())
}
