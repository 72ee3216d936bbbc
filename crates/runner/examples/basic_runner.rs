//! Basic example of using the runner
//!
//! This example demonstrates:
//! - Running multiple named concurrent processes
//! - Graceful shutdown on SIGTERM/SIGINT (Ctrl+C)
//! - Cleanup with closers
//!
//! Run with: cargo run --example basic_runner

use std::time::Duration;
use tracksim_runner::Runner;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting runner example");

    let runner = Runner::new()
        // First process: counter that increments every second
        .with_named_process("counter", |ctx| async move {
            let mut counter = 0;
            loop {
                tokio::select! {
                    _ = ctx.cancelled() => {
                        tracing::info!("Counter process stopping gracefully at count: {}", counter);
                        break;
                    }
                    _ = tokio::time::sleep(Duration::from_secs(1)) => {
                        counter += 1;
                        tracing::info!("Counter: {}", counter);
                    }
                }
            }
            Ok(())
        })
        // Second process: simulates an error after 30 seconds (if not cancelled first)
        .with_named_process("error_simulator", |ctx| async move {
            tokio::select! {
                _ = ctx.cancelled() => {
                    tracing::info!("Error simulator stopping gracefully");
                    Ok(())
                }
                _ = tokio::time::sleep(Duration::from_secs(30)) => {
                    tracing::error!("Simulated error occurred!");
                    Err(anyhow::anyhow!("Simulated error after 30 seconds"))
                }
            }
        })
        // Add cleanup closers
        .with_closer(|| async move {
            tracing::info!("Closer: Cleaning up resources...");
            tokio::time::sleep(Duration::from_millis(500)).await;
            tracing::info!("Closer: Done");
            Ok(())
        })
        .with_closer_timeout(Duration::from_secs(5));

    tracing::info!("Press Ctrl+C to trigger graceful shutdown");
    if runner.run().await.is_err() {
        std::process::exit(1);
    }
}
