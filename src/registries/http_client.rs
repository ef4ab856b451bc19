//! Shared HTTP client for registry lookups.
//!
//! One client is built per server so every document's fetches share the
//! connection pool, TLS sessions and DNS cache.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

const USER_AGENT: &str = concat!("npmdesc-lsp/", env!("CARGO_PKG_VERSION"));

/// Transport timeout. Fetches themselves are never cancelled or timed out
/// by the dispatcher, so without this a hung request would stay
/// `is_fetching` forever. Bounding it here is a deliberate choice: the
/// stuck record becomes a rejected fetch once this elapses.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

pub fn create_shared_client() -> anyhow::Result<Arc<Client>> {
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(DEFAULT_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .pool_max_idle_per_host(10)
        .tcp_keepalive(Duration::from_secs(60))
        .build()?;

    Ok(Arc::new(client))
}
