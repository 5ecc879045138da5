use retryer::{
    BackoffConfig, CancelOptions, RetryDelay, Retryer, RetryerConfig, RetryerMetrics,
    RetrySettings, SignalSwitch,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=trace cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,retryer=debug"))
        )
        .init();

    tracing::info!("🚀 Starting retryer demo");

    let metrics = RetryerMetrics::new()?;
    let network = Arc::new(SignalSwitch::new(true));

    // === 1. Flaky operation that loses the network after its first failure ===
    let attempts = Arc::new(AtomicU32::new(0));
    let op_attempts = attempts.clone();
    let fail_network = network.clone();

    let settings = RetrySettings::from_json(r#"{"retry": 5, "execution_mode": "online"}"#)?;
    let flaky = Retryer::spawn(
        RetryerConfig::new(move || {
            let attempt = op_attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if attempt < 3 {
                    Err(format!("upstream timeout on attempt {}", attempt))
                } else {
                    Ok(attempt)
                }
            }
        })
        .name("fetch_profile")
        .settings(&settings)
        .retry_delay(RetryDelay::Backoff(BackoffConfig::aggressive()))
        .connectivity(network.clone())
        .observer(Arc::new(metrics.observer("fetch_profile")))
        .on_fail(move |failure_count, error| {
            tracing::info!(failure_count, %error, "attempt failed");
            if failure_count == 1 {
                tracing::info!("📴 Network lost");
                fail_network.set(false);
            }
        })
        .on_pause(|| tracing::info!("⏸️  Waiting for network"))
        .on_continue(|| tracing::info!("▶️  Network back, continuing")),
    );

    let control = flaky.control();
    let reconnect_network = network.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        tracing::info!("📶 Network restored");
        reconnect_network.set(true);
        control.resume();
    });

    match flaky.await {
        Ok(attempt) => tracing::info!("✅ fetch_profile succeeded on attempt {}", attempt),
        Err(e) => tracing::error!("❌ fetch_profile failed: {}", e),
    }

    // === 2. Operation that hangs and gets cancelled ===
    let aborted = Arc::new(AtomicU32::new(0));
    let abort_counter = aborted.clone();

    let hanging = Retryer::spawn(
        RetryerConfig::new(|| std::future::pending::<Result<(), String>>())
            .name("sync_settings")
            .abort(move || {
                abort_counter.fetch_add(1, Ordering::SeqCst);
            })
            .observer(Arc::new(metrics.observer("sync_settings"))),
    );

    tokio::time::sleep(Duration::from_millis(100)).await;
    hanging.cancel(CancelOptions::silent());

    match hanging.await {
        Err(e) if e.is_cancelled() => tracing::info!(
            aborts = aborted.load(Ordering::SeqCst),
            "🛑 sync_settings cancelled: {}",
            e
        ),
        other => tracing::warn!("unexpected sync_settings outcome: {:?}", other),
    }

    // === 3. Dump metrics ===
    println!("{}", metrics.render()?);

    tracing::info!("🎉 Demo complete!");

    Ok(())
}
