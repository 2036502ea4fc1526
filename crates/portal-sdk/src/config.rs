//! Gateway configuration.
//!
//! The base address is read once, at construction.  A missing base
//! address is only fatal when a relative path is requested; absolute
//! URLs bypass it entirely.

use std::time::Duration;

use crate::error::SdkError;

/// Environment variable holding the gateway base address.
pub const API_URL_ENV: &str = "PORTAL_API_URL";
/// Environment variable overriding the notification poll period (seconds).
pub const POLL_SECS_ENV: &str = "PORTAL_POLL_SECS";
/// Default notification poll period.
pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_secs(30);

/// Settings shared by the gateway client and the poll synchronizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Base address prepended to relative paths (e.g. `https://api.example.com`).
    pub base_url: Option<String>,
    /// Period of the background notification refresh.
    pub poll_period: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            poll_period: DEFAULT_POLL_PERIOD,
        }
    }
}

impl GatewayConfig {
    /// Build the configuration from environment variables.
    ///
    /// | Variable           | Default | Description                         |
    /// |--------------------|---------|-------------------------------------|
    /// | `PORTAL_API_URL`   | unset   | Gateway base address                |
    /// | `PORTAL_POLL_SECS` | `30`    | Notification poll period in seconds |
    pub fn from_env() -> Self {
        let base_url = std::env::var(API_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty());

        let poll_period = std::env::var(POLL_SECS_ENV)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_POLL_PERIOD);

        Self {
            base_url,
            poll_period,
        }
    }

    /// Configuration with the given base address and default poll period.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::default().with_base_url(base_url)
    }

    /// Override the base address.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Override the poll period.
    pub fn with_poll_period(mut self, period: Duration) -> Self {
        self.poll_period = period;
        self
    }

    /// Turn a request path into an absolute URL.
    ///
    /// Absolute `http(s)://` URLs are returned unchanged; anything else is
    /// appended to the base address.
    pub fn resolve(&self, path: &str) -> Result<String, SdkError> {
        if is_absolute(path) {
            return Ok(path.to_string());
        }

        let base = self.base_url.as_deref().ok_or_else(|| {
            SdkError::Config(format!(
                "{API_URL_ENV} is not set; cannot resolve relative path `{path}`"
            ))
        })?;

        Ok(match (base.ends_with('/'), path.starts_with('/')) {
            (true, true) => format!("{base}{}", &path[1..]),
            _ => format!("{base}{path}"),
        })
    }
}

fn is_absolute(path: &str) -> bool {
    let lower = path.get(..8).unwrap_or(path).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_are_joined() {
        let cfg = GatewayConfig::new("http://api.local");
        assert_eq!(
            cfg.resolve("/api/notifications").unwrap(),
            "http://api.local/api/notifications"
        );

        let trailing = GatewayConfig::new("http://api.local/");
        assert_eq!(
            trailing.resolve("/auth/refresh").unwrap(),
            "http://api.local/auth/refresh"
        );
    }

    #[test]
    fn absolute_urls_bypass_the_base() {
        let cfg = GatewayConfig::default();
        assert_eq!(
            cfg.resolve("HTTPS://cdn.example.com/a.png").unwrap(),
            "HTTPS://cdn.example.com/a.png"
        );
    }

    #[test]
    fn missing_base_is_fatal_for_relative_paths() {
        let cfg = GatewayConfig::default();
        assert!(matches!(
            cfg.resolve("/api/notifications"),
            Err(SdkError::Config(_))
        ));
    }

    #[test]
    fn default_poll_period() {
        assert_eq!(GatewayConfig::default().poll_period, Duration::from_secs(30));
        let cfg = GatewayConfig::default().with_poll_period(Duration::from_millis(50));
        assert_eq!(cfg.poll_period, Duration::from_millis(50));
    }
}
