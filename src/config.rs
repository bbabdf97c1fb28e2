//! Configuration types for a harvest run.
//!
//! All behaviour is controlled through [`HarvestConfig`], built via its
//! [`HarvestConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share a config across workers and to diff two runs to
//! understand why their outputs differ.

use crate::error::HarvestError;
use crate::pipeline::filter::FilterRange;
use crate::progress::ProgressCallback;
use std::fmt;
use tokio_util::sync::CancellationToken;

/// Browser-like `User-Agent` sent with every request. Some origins reject
/// requests that carry no recognisable client identifier.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Configuration for a harvest run.
///
/// Built via [`HarvestConfig::builder()`] or using
/// [`HarvestConfig::default()`].
///
/// # Example
/// ```rust
/// use web2zip::{FilterRange, HarvestConfig};
///
/// let config = HarvestConfig::builder()
///     .filter(FilterRange::new(300, 2000, 300, 2000))
///     .analyze(true)
///     .concurrency(8)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct HarvestConfig {
    /// Inclusive pixel-dimension bounds an image must satisfy to survive
    /// filtering. Default: unbounded (every decodable image passes).
    pub filter: FilterRange,

    /// Run the description stage over the filtered images. Default: false.
    ///
    /// Off by default because it is the expensive half of the pipeline:
    /// one remote vision-model call per surviving image.
    pub analyze: bool,

    /// Number of concurrent fetches / description calls. Default: 10.
    ///
    /// Both stages are network-bound. A small bounded pool cuts wall-clock
    /// time substantially without hammering the target origin or tripping
    /// the description service's rate limits. Lower this if you see `429`s.
    pub concurrency: usize,

    /// Maximum attempts per description call (initial try included).
    /// Default: 5.
    ///
    /// `429`/`500`/`503` and connection-level failures are transient and
    /// worth retrying; anything else fails the item immediately.
    pub max_attempts: u32,

    /// Backoff unit in milliseconds (exponential). Default: 1000.
    ///
    /// The delay before retry `n` is `retry_backoff_ms * 2^n`, so the
    /// default produces the 1 s → 2 s → 4 s → 8 s ladder. Exponential
    /// backoff avoids the thundering-herd problem where every concurrent
    /// worker retries at once against a recovering endpoint.
    pub retry_backoff_ms: u64,

    /// Source-page request timeout in seconds. Default: 15.
    pub page_timeout_secs: u64,

    /// Per-image request timeout in seconds. Default: 10.
    pub image_timeout_secs: u64,

    /// Per-description-call timeout in seconds. Default: 30.
    pub api_timeout_secs: u64,

    /// Description-service endpoint override. Default: the built-in
    /// `generateContent` endpoint.
    pub api_endpoint: Option<String>,

    /// Description-service API key. Falls back to the `GEMINI_API_KEY`
    /// environment variable when unset.
    pub api_key: Option<String>,

    /// Custom description prompt. If None, uses the built-in default.
    pub prompt: Option<String>,

    /// `User-Agent` override. If None, uses [`DEFAULT_USER_AGENT`].
    pub user_agent: Option<String>,

    /// Optional per-item progress callback.
    pub progress_callback: Option<ProgressCallback>,

    /// Cooperative cancellation signal, checked before each new request and
    /// before each retry sleep. Cancelling abandons the run between stages;
    /// items already in flight finish on their own.
    pub cancel: CancellationToken,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            filter: FilterRange::default(),
            analyze: false,
            concurrency: 10,
            max_attempts: 5,
            retry_backoff_ms: 1000,
            page_timeout_secs: 15,
            image_timeout_secs: 10,
            api_timeout_secs: 30,
            api_endpoint: None,
            api_key: None,
            prompt: None,
            user_agent: None,
            progress_callback: None,
            cancel: CancellationToken::new(),
        }
    }
}

impl fmt::Debug for HarvestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HarvestConfig")
            .field("filter", &self.filter)
            .field("analyze", &self.analyze)
            .field("concurrency", &self.concurrency)
            .field("max_attempts", &self.max_attempts)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("page_timeout_secs", &self.page_timeout_secs)
            .field("image_timeout_secs", &self.image_timeout_secs)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("api_endpoint", &self.api_endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn callback>"),
            )
            .finish()
    }
}

impl HarvestConfig {
    /// Create a new builder for `HarvestConfig`.
    pub fn builder() -> HarvestConfigBuilder {
        HarvestConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`HarvestConfig`].
#[derive(Debug)]
pub struct HarvestConfigBuilder {
    config: HarvestConfig,
}

impl HarvestConfigBuilder {
    pub fn filter(mut self, range: FilterRange) -> Self {
        self.config.filter = range;
        self
    }

    pub fn analyze(mut self, v: bool) -> Self {
        self.config.analyze = v;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n.max(1);
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn page_timeout_secs(mut self, secs: u64) -> Self {
        self.config.page_timeout_secs = secs;
        self
    }

    pub fn image_timeout_secs(mut self, secs: u64) -> Self {
        self.config.image_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn api_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.api_endpoint = Some(endpoint.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = Some(ua.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn cancel(mut self, token: CancellationToken) -> Self {
        self.config.cancel = token;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<HarvestConfig, HarvestError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(HarvestError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        if c.max_attempts == 0 {
            return Err(HarvestError::InvalidConfig(
                "max_attempts must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = HarvestConfig::default();
        assert!(!c.analyze);
        assert_eq!(c.concurrency, 10);
        assert_eq!(c.max_attempts, 5);
        assert_eq!(c.retry_backoff_ms, 1000);
        assert_eq!(c.page_timeout_secs, 15);
        assert_eq!(c.image_timeout_secs, 10);
        assert_eq!(c.api_timeout_secs, 30);
    }

    #[test]
    fn builder_clamps_zero_concurrency() {
        let c = HarvestConfig::builder().concurrency(0).build().unwrap();
        assert_eq!(c.concurrency, 1);
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = HarvestConfig::builder().api_key("secret-key").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret-key"));
        assert!(dbg.contains("<redacted>"));
    }
}
