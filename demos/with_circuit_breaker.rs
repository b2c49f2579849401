//! Circuit breaker example guarding a market data feed and a broker store.
//!
//! This example shows how to:
//! - Guard a provider so it trips after repeated failures
//! - Serve a fallback while a circuit is open
//! - Let a circuit recover through a half-open probe
//! - Inspect and reset circuits as an operator
//!
//! Run with: cargo run --example with_circuit_breaker

use quoteguard::prelude::*;
use quoteguard::providers::{MockBrokerConfig, MockMarketData};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== Circuit Breaker Example ===\n");

    let registry = Arc::new(CircuitRegistry::new());
    let admin = CircuitAdmin::new(Arc::clone(&registry));

    let config = CircuitConfig::default()
        .with_failure_threshold(3)
        .with_success_threshold(2)
        .with_timeout(Duration::from_secs(2));

    println!("Circuit configuration:");
    println!("  Failure threshold: {}", config.failure_threshold);
    println!("  Success threshold: {}", config.success_threshold);
    println!("  Open timeout: {:?}", config.timeout);
    println!();

    let feed = GuardedMarketData::new(
        MockMarketData::new()
            .with_name("market_data")
            .with_quote("EURUSD", 1.0840, 1.0844),
        Arc::clone(&registry),
        config.clone(),
    )?;

    println!("Feed goes down, sending requests...\n");
    feed.inner().set_failing(true);

    for i in 1..=5 {
        println!("Request #{}: circuit = {}", i, feed.circuit().state.name());

        match feed.quote("EURUSD").await {
            Ok(quote) => println!("  Success! mid = {:.5}", quote.mid()),
            Err(ProviderError::Unavailable(e)) => println!("  Rejected: {}", e),
            Err(e) => println!("  Failed ({}): {}", e.status_code(), e),
        }
    }
    println!(
        "  Provider saw {} calls, circuit rejected the rest\n",
        feed.inner().call_count()
    );

    println!("=== Demonstrating Recovery ===\n");
    feed.inner().set_failing(false);
    tokio::time::sleep(Duration::from_secs(3)).await;

    for i in 1..=2 {
        match feed.quote("EURUSD").await {
            Ok(quote) => println!("Probe #{}: success, mid = {:.5}", i, quote.mid()),
            Err(e) => println!("Probe #{}: failed: {}", i, e),
        }
        println!("  circuit = {}", feed.circuit().state.name());
    }
    println!("Final metrics: {:?}\n", feed.circuit().metrics);

    println!("=== Demonstrating Fallback ===\n");

    let stale_eurusd = Quote::new("EURUSD", 1.0800, 1.0810);
    let guard: AsyncGuard<Quote> = AsyncGuard::builder(&registry, "backup_feed")
        .failure_threshold(1)
        .fallback(stale_eurusd)
        .build_async()?;

    let backup = MockMarketData::new().with_name("backup_feed");
    backup.set_failing(true);
    let _ = guard.call(|| backup.quote("EURUSD")).await;

    let quote = guard.call(|| backup.quote("EURUSD")).await?;
    println!("Circuit is {}, served fallback mid = {:.5}\n", guard.snapshot().state.name(), quote.mid());

    println!("=== Demonstrating Operator Reset ===\n");

    let store = GuardedBrokerConfig::new(
        MockBrokerConfig::new()
            .with_broker(BrokerConfig::new("ib", 1.5, 0.35)),
        Arc::clone(&registry),
        CircuitConfig::default().with_failure_threshold(1),
    )?;
    store.inner().set_failing(true);
    let _ = store.broker_config("ib");
    store.inner().set_failing(false);

    println!("Tripped circuits: {:?}", admin.tripped());
    admin.reset("mock-broker-config");
    println!("After reset: {:?}", admin.tripped());
    println!("Broker fee: {:?}\n", store.broker_config("ib")?);

    println!("{}", serde_json::to_string_pretty(&admin.states_json())?);

    println!("\n=== Example Complete ===");
    Ok(())
}
