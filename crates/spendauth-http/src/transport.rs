//! HTTP transport implementation.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, SET_COOKIE};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, trace};

use spendauth_core::error::TransportError;
use spendauth_core::traits::{AuthTransport, Method, TokenResponse};
use spendauth_core::{AccessToken, LoginCredentials, RefreshToken};

use crate::config::HttpTransportConfig;

/// Request body for token issuance.
#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Request body for token refresh.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// An [`AuthTransport`] over HTTP.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: HttpTransportConfig,
    csrf_token: RwLock<Option<String>>,
}

impl HttpTransport {
    /// Create a transport with the given settings.
    pub fn new(config: HttpTransportConfig) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static("x-requested-with"),
            HeaderValue::from_static("XMLHttpRequest"),
        );

        let client = reqwest::Client::builder()
            .user_agent(concat!("spendauth/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::Http {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            config,
            csrf_token: RwLock::new(None),
        })
    }

    /// Returns the settings this transport was built with.
    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }

    /// Returns the CSRF token last set by the server.
    pub fn csrf_token(&self) -> Option<String> {
        self.csrf_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn map_reqwest(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout {
                duration_ms: u64::try_from(self.config.timeout.as_millis()).unwrap_or(u64::MAX),
            }
        } else if err.is_connect() {
            TransportError::Connection {
                message: err.to_string(),
            }
        } else if err.is_decode() {
            TransportError::InvalidResponse {
                message: err.to_string(),
            }
        } else {
            TransportError::Http {
                message: err.to_string(),
            }
        }
    }

    /// Remember the CSRF cookie if the response sets one.
    fn remember_csrf(&self, headers: &HeaderMap) {
        let token = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|cookie| cookie.split(';').next()?.trim().split_once('='))
            .find(|(name, _)| *name == self.config.csrf_cookie)
            .map(|(_, value)| value.to_string());

        if let Some(token) = token {
            trace!("Stored CSRF token");
            *self
                .csrf_token
                .write()
                .unwrap_or_else(PoisonError::into_inner) = Some(token);
        }
    }

    fn build(
        &self,
        method: Method,
        path: &str,
        token: Option<&AccessToken>,
    ) -> reqwest::RequestBuilder {
        let url = self.config.url(path);
        let method = match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut request = self.client.request(method, url);
        if let Some(csrf) = self.csrf_token() {
            request = request.header(self.config.csrf_header.as_str(), csrf);
        }
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Token {}", token.as_str()));
        }
        request
    }

    /// Send the request, turning non-success statuses into errors.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, TransportError> {
        let response = request.send().await.map_err(|e| self.map_reqwest(e))?;
        self.remember_csrf(response.headers());

        let status = response.status();
        trace!(status = %status, "HTTP response");

        if status.is_success() {
            Ok(response)
        } else {
            Err(self.error_from_response(response).await)
        }
    }

    async fn error_from_response(&self, response: reqwest::Response) -> TransportError {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .ok()
            .and_then(|text| serde_json::from_str::<Value>(&text).ok());

        TransportError::Status {
            status,
            message: format!("request failed with status code {}", status),
            body,
        }
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, TransportError>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let response = self.send(self.build(Method::Post, path, None).json(body)).await?;
        response.json::<R>().await.map_err(|e| self.map_reqwest(e))
    }
}

#[async_trait]
impl AuthTransport for HttpTransport {
    #[instrument(skip(self, credentials), fields(base_url = %self.config.base_url))]
    async fn login(&self, credentials: &LoginCredentials) -> Result<TokenResponse, TransportError> {
        debug!(path = %self.config.login_path, "Requesting token");

        let request = LoginRequest {
            username: credentials.username(),
            password: credentials.password(),
        };
        self.post_json(&self.config.login_path, &request).await
    }

    #[instrument(skip(self, refresh_token), fields(base_url = %self.config.base_url))]
    async fn refresh(&self, refresh_token: &RefreshToken) -> Result<TokenResponse, TransportError> {
        debug!(path = %self.config.refresh_path, "Refreshing token");

        let request = RefreshRequest {
            refresh_token: refresh_token.as_str(),
        };
        self.post_json(&self.config.refresh_path, &request).await
    }

    #[instrument(skip(self, body, token), fields(base_url = %self.config.base_url))]
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: Option<&AccessToken>,
    ) -> Result<Value, TransportError> {
        debug!(%method, path, authorized = token.is_some(), "HTTP request");

        let mut request = self.build(method, path, token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = self.send(request).await?;
        let text = response.text().await.map_err(|e| self.map_reqwest(e))?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| TransportError::InvalidResponse {
            message: e.to_string(),
        })
    }

    fn clear_local(&self) {
        *self
            .csrf_token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}
