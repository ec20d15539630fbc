//! Backend Simulator CLI
//!
//! Serves all four simulated backend services on one address so the gateway
//! can be run locally with every `*_URL` pointing at it.

use anyhow::Result;
use clap::Parser;
use gateway_domain::RouteName;
use gateway_simulator::{Behavior, SimulatedBackend};
use serde_json::json;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "backend-simulator")]
#[command(about = "Simulate the gateway's backend services")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "127.0.0.1:5000")]
    bind: SocketAddr,

    /// Artificial latency added to every reply, in milliseconds
    #[arg(long, default_value = "0")]
    latency_ms: u64,

    /// Routes that answer with HTTP 500 (preprocess, train, predict, experiments)
    #[arg(long, value_delimiter = ',')]
    fail: Vec<RouteName>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("gateway_simulator=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let latency = Duration::from_millis(args.latency_ms);
    let backend = SimulatedBackend::new();

    for route in RouteName::ALL {
        let behavior = if args.fail.contains(&route) {
            Behavior::json(500, json!({ "detail": format!("simulated {route} failure") }))
        } else {
            Behavior::generated()
        };
        backend.set_behavior(route, behavior.with_latency(latency));
    }

    let handle = backend.spawn(args.bind).await?;
    info!("Backend simulator at {}", handle.base_url());
    info!("Latency: {}ms, failing routes: {:?}", args.latency_ms, args.fail);

    tokio::select! {
        () = handle.join() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
