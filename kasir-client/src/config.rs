//! Client configuration

use crate::{ClientError, ClientResult};
use chrono::{FixedOffset, Local, Offset};
use shared::error::AppError;
use std::time::Duration;

/// Default order service base URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Client configuration for connecting to the order and catalog services
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Service base URL (e.g., "http://localhost:8000/api")
    pub base_url: String,

    /// Bearer token for authentication
    pub token: Option<String>,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Push channel TCP address
    pub push_addr: Option<String>,

    /// Pending queue synchronization
    pub sync: SyncConfig,

    /// Push channel reconnection
    pub push: PushConfig,
}

impl ClientConfig {
    /// Create a new client configuration
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: 30,
            push_addr: None,
            sync: SyncConfig::default(),
            push: PushConfig::default(),
        }
    }

    /// Load from `KASIR_*` environment variables, falling back to defaults
    pub fn from_env() -> ClientResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> ClientResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config = Self::new(get("KASIR_API_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into()));
        if let Some(token) = get("KASIR_API_TOKEN") {
            config = config.with_token(token);
        }
        if let Some(addr) = get("KASIR_PUSH_ADDR") {
            config = config.with_push_addr(addr);
        }
        if let Some(raw) = get("KASIR_TIMEOUT_SECS") {
            config = config.with_timeout(parse_secs("KASIR_TIMEOUT_SECS", &raw)?);
        }
        if let Some(raw) = get("KASIR_RESYNC_SECS") {
            let secs = parse_secs("KASIR_RESYNC_SECS", &raw)?;
            config.sync = config.sync.with_resync_interval(Duration::from_secs(secs));
        }
        Ok(config)
    }

    /// Set the bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    /// Set the push channel address
    pub fn with_push_addr(mut self, addr: impl Into<String>) -> Self {
        self.push_addr = Some(addr.into());
        self
    }

    pub fn with_sync(mut self, sync: SyncConfig) -> Self {
        self.sync = sync;
        self
    }

    pub fn with_push(mut self, push: PushConfig) -> Self {
        self.push = push;
        self
    }

    /// Create an HTTP client from this configuration
    pub fn build_http_client(&self) -> ClientResult<super::HttpClient> {
        super::HttpClient::new(self)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

fn parse_secs(key: &str, raw: &str) -> ClientResult<u64> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(ClientError::Validation(
            AppError::validation(format!("{key} must be a positive number of seconds"))
                .with_detail("value", raw),
        )),
    }
}

/// Pending queue synchronization settings
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Periodic bulk re-fetch; the upper bound on queue staleness
    pub resync_interval: Duration,
    /// How many finalized order ids are remembered
    pub finalized_capacity: usize,
    /// Tolerated clock difference between the service and this terminal
    pub clock_skew_margin: Duration,
    /// Store UTC offset used to date synthesized invoice ids
    pub invoice_offset: FixedOffset,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            resync_interval: Duration::from_secs(30),
            finalized_capacity: 512,
            clock_skew_margin: Duration::from_secs(5),
            invoice_offset: Local::now().offset().fix(),
        }
    }
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resync_interval(mut self, interval: Duration) -> Self {
        self.resync_interval = interval;
        self
    }

    pub fn with_finalized_capacity(mut self, capacity: usize) -> Self {
        self.finalized_capacity = capacity.max(1);
        self
    }

    pub fn with_clock_skew_margin(mut self, margin: Duration) -> Self {
        self.clock_skew_margin = margin;
        self
    }

    pub fn with_invoice_offset(mut self, offset: FixedOffset) -> Self {
        self.invoice_offset = offset;
        self
    }
}

/// Push channel settings
#[derive(Debug, Clone)]
pub struct PushConfig {
    /// First reconnect delay
    pub reconnect_delay: Duration,
    /// Maximum reconnect delay (exponential backoff cap)
    pub max_reconnect_delay: Duration,
    /// Maximum reconnect attempts (0 means unlimited)
    pub max_reconnect_attempts: u32,
    /// Synchronizer input queue capacity
    pub queue_capacity: usize,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_millis(500),
            max_reconnect_delay: Duration::from_secs(10),
            max_reconnect_attempts: 0,
            queue_capacity: 1024,
        }
    }
}

impl PushConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_max_reconnect_delay(mut self, delay: Duration) -> Self {
        self.max_reconnect_delay = delay;
        self
    }

    /// Set maximum reconnect attempts (0 means unlimited)
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Delay before reconnect attempt `attempt` (1-based), doubling up to the cap
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.reconnect_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_reconnect_delay)
    }

    /// Whether another attempt is allowed after `attempt` failures
    pub fn may_retry(&self, attempt: u32) -> bool {
        self.max_reconnect_attempts == 0 || attempt < self.max_reconnect_attempts
    }
}
