/*
[INPUT]:  Caller overrides for the stream connection
[OUTPUT]: WsConfig with endpoint, keep-alive and watch timing
[POS]:    WebSocket layer - connection configuration
[UPDATE]: When adding connection options
*/

use std::time::Duration;

use crate::http::{EgeraError, Result};

/// Public stream endpoint
pub const DEFAULT_WS_URL: &str = "wss://n1.ws.egera.com";

const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(15);
const DEFAULT_PONG_TIMEOUT: Duration = Duration::from_secs(45);
const DEFAULT_WATCH_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// WebSocket client configuration
#[derive(Debug, Clone)]
pub struct WsConfig {
    pub url: String,
    /// How often a JSON `ping` frame is sent; Egera has no protocol-level ping
    pub ping_interval: Duration,
    /// Connection is closed when no pong arrives for this long
    pub pong_timeout: Duration,
    /// Upper bound on a single `watch_*` call
    pub watch_timeout: Duration,
    /// Outbound queue depth
    pub channel_capacity: usize,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WS_URL.to_string(),
            ping_interval: DEFAULT_PING_INTERVAL,
            pong_timeout: DEFAULT_PONG_TIMEOUT,
            watch_timeout: DEFAULT_WATCH_TIMEOUT,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl WsConfig {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Reject values the connection task cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.ping_interval.is_zero() {
            return Err(EgeraError::Config("ping_interval must be non-zero".to_string()));
        }
        if self.channel_capacity == 0 {
            return Err(EgeraError::Config("channel_capacity must be non-zero".to_string()));
        }
        Ok(())
    }
}
