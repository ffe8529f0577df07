use tracing::{error, info, info_span, warn};

use datadog_log_sink::init::init_tracing;

/// Reads `DD_API_KEY`, `DD_SITE`, `DD_ENV` and friends from the
/// environment. Without an API key the records only go to stderr.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let handler = init_tracing()?;

    info!(target: "demo", version = env!("CARGO_PKG_VERSION"), "starting service");

    let span = info_span!("request", id = 42, path = "/login");
    {
        let _guard = span.enter();
        warn!(target: "demo", attempts = 3, "slow upstream");
        error!(target: "demo", user_id = 7, reason = "invalid password", "authentication failed");
    }

    // Flushes the final partial batch before exiting.
    handler.close().await;
    Ok(())
}
