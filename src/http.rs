use reqwest::Client;
use std::time::Duration;

/// Shared client for catalogue uploads. The runner enforces no deadline of
/// its own, so these timeouts are the only bound on an in-flight dispatch.
pub fn build_client() -> Client {
    Client::builder()
        .timeout(env_secs("HTTP_TIMEOUT_SECS", 15))
        .connect_timeout(env_secs("HTTP_CONNECT_TIMEOUT_SECS", 5))
        .user_agent(concat!("catalog-agent-rs/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| Client::new())
}

fn env_secs(key: &str, default: u64) -> Duration {
    let secs = std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default);
    Duration::from_secs(secs)
}
