//! Relay server example
//!
//! Connects to the sample stream and pushes hashtag records to WebSocket
//! subscribers.
//!
//! Run with: cargo run --example relay_server [BIND_ADDR]
//!
//! Credentials are read from the environment (a `.env` file is loaded first):
//!
//!   RELAY_BEARER_TOKEN=...        # required
//!   RELAY_API_KEY=...
//!   RELAY_API_KEY_SECRET=...
//!
//! ## Subscribing
//!
//! With websocat:
//!   websocat ws://localhost:5080

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hashtag_relay::{
    Credentials, PublishedRecord, PushServer, PushServerConfig, Relay, SampleStreamConnector,
    SessionConfig, StreamSession, SubscriberRegistry,
};

fn parse_bind_addr(s: &str) -> Result<SocketAddr, String> {
    if s == "localhost" {
        return Ok(SocketAddr::from(([127, 0, 0, 1], 5080)));
    }
    if let Ok(addr) = s.parse() {
        return Ok(addr);
    }
    if let Ok(port) = s.parse::<u16>() {
        return Ok(SocketAddr::from(([0, 0, 0, 0], port)));
    }
    Err(format!("Invalid bind address: {}", s))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hashtag_relay=debug".parse()?)
                .add_directive("relay_server=debug".parse()?),
        )
        .init();

    let mut config = PushServerConfig::default();
    if let Some(arg) = std::env::args().nth(1) {
        config = config.bind(parse_bind_addr(&arg)?);
    }

    let credentials = Credentials::from_env()?;
    let registry = Arc::new(SubscriberRegistry::new());
    let relay = Arc::new(Relay::new(Arc::clone(&registry)));

    relay.add_observer(Arc::new(|record: &PublishedRecord| {
        tracing::trace!(
            author = record.author_id(),
            hashtags = record.hashtags().len(),
            "Record published"
        );
    }));

    let session = StreamSession::new(
        SampleStreamConnector::new()?,
        credentials,
        Arc::clone(&relay),
        SessionConfig::default(),
    );
    session.start()?;

    println!("Push server on ws://{}", config.bind_addr);
    let server = PushServer::new(config, registry);

    // Print stats every 30 seconds
    let stats = Arc::clone(relay.stats());
    let stats_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(30));
        loop {
            interval.tick().await;
            let snapshot = stats.snapshot();
            println!(
                "Stats: published={} deliveries={} failures={} reconnects={}",
                snapshot.records_published,
                snapshot.deliveries,
                snapshot.delivery_failures,
                snapshot.reconnects,
            );
        }
    });

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                eprintln!("Server error: {}", e);
            }
        }
        failure = session.wait_stopped() => {
            if let Some(e) = failure {
                eprintln!("Stream stopped: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutting down...");
        }
    }

    session.stop();
    stats_handle.abort();

    Ok(())
}
