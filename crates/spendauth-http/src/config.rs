//! Transport configuration.

use std::time::Duration;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Token issuance endpoint.
pub const DEFAULT_LOGIN_PATH: &str = "/api-token-auth/";

/// Token refresh endpoint.
pub const DEFAULT_REFRESH_PATH: &str = "/api-token-auth/";

/// Cookie the server sets its CSRF token in.
pub const DEFAULT_CSRF_COOKIE: &str = "csrftoken";

/// Header the CSRF token is echoed back in.
pub const DEFAULT_CSRF_HEADER: &str = "X-CSRFTOKEN";

/// Settings for [`HttpTransport`](crate::HttpTransport).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpTransportConfig {
    /// Server origin, e.g. `https://spending.example.org`.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    pub login_path: String,
    pub refresh_path: String,
    pub csrf_cookie: String,
    pub csrf_header: String,
}

impl HttpTransportConfig {
    /// Default settings against `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Join `path` onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout: DEFAULT_TIMEOUT,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            csrf_cookie: DEFAULT_CSRF_COOKIE.to_string(),
            csrf_header: DEFAULT_CSRF_HEADER.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        let config = HttpTransportConfig::new("https://spending.example.org/");
        assert_eq!(
            config.url("/api-token-auth/"),
            "https://spending.example.org/api-token-auth/"
        );
        assert_eq!(
            config.url("api/v1/budgets/"),
            "https://spending.example.org/api/v1/budgets/"
        );
    }

    #[test]
    fn defaults_match_backend_conventions() {
        let config = HttpTransportConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.csrf_cookie, "csrftoken");
        assert_eq!(config.csrf_header, "X-CSRFTOKEN");
        assert_eq!(config.login_path, "/api-token-auth/");
    }
}
