//! Resilience configuration with builder pattern
//!
//! One configuration for request timeouts, retry policy and concurrency
//! limits, shared by the Sheets client and the record store.

use serde::Deserialize;
use std::time::Duration;

use super::retry::RetryConfig;

/// Resilience configuration for outbound API calls
#[derive(Debug, Clone)]
pub struct ResilienceConfig {
    pub retry: RetryConfig,
    pub concurrency: ConcurrencyConfig,
    /// Per-request timeout; a hung call surfaces as a transport error
    pub request_timeout: Duration,
}

/// Concurrency limiting configuration
#[derive(Debug, Clone)]
pub struct ConcurrencyConfig {
    /// Maximum concurrent HTTP requests per client
    pub max_concurrent_requests: usize,
    /// Whether request limiting is enabled
    pub enabled: bool,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 8, // Hosted REST tiers throttle well below this
            enabled: true,
        }
    }
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            concurrency: ConcurrencyConfig::default(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ResilienceConfig {
    /// Create a new builder for ResilienceConfig
    pub fn builder() -> ResilienceConfigBuilder {
        ResilienceConfigBuilder::new()
    }

    /// Conservative config for the nightly batch against production
    pub fn conservative() -> Self {
        Self {
            retry: RetryConfig::conservative(),
            concurrency: ConcurrencyConfig {
                max_concurrent_requests: 4,
                enabled: true,
            },
            request_timeout: Duration::from_secs(60),
        }
    }

    /// Aggressive config for development against a local store
    pub fn development() -> Self {
        Self {
            retry: RetryConfig::aggressive(),
            concurrency: ConcurrencyConfig {
                max_concurrent_requests: 32,
                enabled: false,
            },
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Disable retries and limits (for tests)
    pub fn disabled() -> Self {
        Self {
            retry: RetryConfig {
                max_attempts: 1,
                base_delay: Duration::from_millis(0),
                max_delay: Duration::from_millis(0),
                backoff_multiplier: 1.0,
                jitter: false,
            },
            concurrency: ConcurrencyConfig {
                max_concurrent_requests: usize::MAX,
                enabled: false,
            },
            request_timeout: Duration::from_secs(5),
        }
    }

    /// Apply settings from the `[resilience]` table of the config file
    pub fn from_settings(settings: &ResilienceSettings) -> Self {
        let mut builder = match settings.preset.as_deref() {
            Some("conservative") => ResilienceConfigBuilder::from(Self::conservative()),
            Some("development") => ResilienceConfigBuilder::from(Self::development()),
            Some("disabled") => ResilienceConfigBuilder::from(Self::disabled()),
            _ => ResilienceConfigBuilder::new(),
        };

        if let Some(attempts) = settings.max_attempts {
            builder = builder.max_retries(attempts.max(1));
        }
        if let Some(ms) = settings.base_delay_ms {
            builder = builder.base_delay(Duration::from_millis(ms));
        }
        if let Some(ms) = settings.max_delay_ms {
            builder = builder.max_delay(Duration::from_millis(ms));
        }
        if let Some(jitter) = settings.jitter {
            builder = builder.jitter(jitter);
        }
        if let Some(max) = settings.max_concurrent_requests {
            builder = builder.max_concurrent_requests(max.max(1));
        }
        if let Some(secs) = settings.request_timeout_secs {
            builder = builder.request_timeout(Duration::from_secs(secs.max(1)));
        }

        builder.build()
    }
}

/// `[resilience]` section of the config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResilienceSettings {
    /// "default", "conservative", "development" or "disabled"
    pub preset: Option<String>,
    pub max_attempts: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub jitter: Option<bool>,
    pub max_concurrent_requests: Option<usize>,
    pub request_timeout_secs: Option<u64>,
}

/// Builder for ResilienceConfig
#[derive(Debug)]
pub struct ResilienceConfigBuilder {
    config: ResilienceConfig,
}

impl ResilienceConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ResilienceConfig::default(),
        }
    }

    /// Set max attempts (1 = no retries)
    pub fn max_retries(mut self, attempts: u32) -> Self {
        self.config.retry.max_attempts = attempts;
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.config.retry.base_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.config.retry.max_delay = delay;
        self
    }

    pub fn jitter(mut self, enabled: bool) -> Self {
        self.config.retry.jitter = enabled;
        self
    }

    /// Set max concurrent requests
    pub fn max_concurrent_requests(mut self, max: usize) -> Self {
        self.config.concurrency.max_concurrent_requests = max;
        self
    }

    /// Enable/disable concurrency limiting
    pub fn enable_concurrency_limiting(mut self, enabled: bool) -> Self {
        self.config.concurrency.enabled = enabled;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> ResilienceConfig {
        self.config
    }
}

impl From<ResilienceConfig> for ResilienceConfigBuilder {
    fn from(config: ResilienceConfig) -> Self {
        Self { config }
    }
}

impl Default for ResilienceConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ResilienceConfig::default();

        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.concurrency.max_concurrent_requests, 8);
        assert!(config.concurrency.enabled);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_conservative_config() {
        let config = ResilienceConfig::conservative();

        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.concurrency.max_concurrent_requests, 4);
        assert!(config.concurrency.enabled);
    }

    #[test]
    fn test_disabled_config() {
        let config = ResilienceConfig::disabled();

        assert_eq!(config.retry.max_attempts, 1);
        assert!(!config.concurrency.enabled);
    }

    #[test]
    fn test_builder_pattern() {
        let config = ResilienceConfig::builder()
            .max_retries(5)
            .max_concurrent_requests(30)
            .enable_concurrency_limiting(false)
            .request_timeout(Duration::from_secs(3))
            .build();

        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.concurrency.max_concurrent_requests, 30);
        assert!(!config.concurrency.enabled);
        assert_eq!(config.request_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_from_settings_overrides_preset() {
        let settings = ResilienceSettings {
            preset: Some("conservative".into()),
            max_concurrent_requests: Some(0),
            request_timeout_secs: Some(15),
            ..Default::default()
        };
        let config = ResilienceConfig::from_settings(&settings);

        assert_eq!(config.retry.max_attempts, 2);
        // Zero is clamped to one request at a time
        assert_eq!(config.concurrency.max_concurrent_requests, 1);
        assert_eq!(config.request_timeout, Duration::from_secs(15));
    }
}
