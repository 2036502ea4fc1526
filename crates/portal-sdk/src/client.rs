//! The credential-refreshing gateway client.
//!
//! [`GatewayClient`] is the single choke point every network call goes
//! through.  It resolves the URL, attaches the default content type and
//! the bearer credential, and on a 401 runs the renewal protocol:
//!
//! 1. Exchange the stored refresh token at `POST /auth/refresh`.
//! 2. On success, store the new pair in both scopes and resend the
//!    original request **once** with the new access token.
//! 3. On failure, clear the credential store and hand back the
//!    *original* 401.
//!
//! Exchanges are serialized per credential store.  A request that hit a
//! 401 while another call was already renewing reuses the token that
//! call stored instead of spending the rotated refresh token again.
//!
//! HTTP-level failures are returned as ordinary responses; only
//! transport failures and configuration problems are errors.
//!
//! # Typical usage
//!
//! ```rust,no_run
//! use portal_sdk::{CredentialStore, GatewayClient, GatewayConfig};
//!
//! # async fn run() -> Result<(), portal_sdk::SdkError> {
//! let client = GatewayClient::new(
//!     GatewayConfig::new("https://api.example.com"),
//!     CredentialStore::in_memory(),
//! );
//! let response = client.get("/api/notifications").await?;
//! println!("status {}", response.status());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use portal_models::{PersistMode, RefreshRequest, TokenGrant, TokenKind};
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::config::GatewayConfig;
use crate::credentials::CredentialStore;
use crate::error::SdkError;
use crate::request::{MultipartPart, RequestBody, RequestOptions, SendOptions, DEFAULT_CONTENT_TYPE};
use crate::routes::ApiRoutes;

/// Where one `send` call stands in the renewal protocol.
///
/// The only transition is `Available -> Spent`, so a call can renew at
/// most once no matter what the retried request answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Renewal {
    Available,
    Spent,
}

/// Outcome of one exchange at the refresh endpoint.
enum Renewed {
    /// New access token, already stored.
    Token(String),
    /// Nothing to exchange.
    NoRefreshToken,
    /// The endpoint refused, or answered with something unusable.  The
    /// store has already been cleared.
    Rejected,
}

/// HTTP client that attaches and renews portal credentials.
#[derive(Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    config: Arc<GatewayConfig>,
    credentials: CredentialStore,
}

impl GatewayClient {
    /// Client with a default `reqwest` transport.
    pub fn new(config: GatewayConfig, credentials: CredentialStore) -> Self {
        Self::with_http_client(reqwest::Client::new(), config, credentials)
    }

    /// Client over a caller-configured `reqwest` transport (proxies,
    /// timeouts, TLS roots…).
    pub fn with_http_client(
        http: reqwest::Client,
        config: GatewayConfig,
        credentials: CredentialStore,
    ) -> Self {
        Self {
            http,
            config: Arc::new(config),
            credentials,
        }
    }

    // ------------------------------------------------------------------
    // Sending
    // ------------------------------------------------------------------

    /// Issue a request, renewing credentials once on a 401.
    ///
    /// A caller-supplied `Authorization` header is sent untouched on the
    /// first attempt; the retry after a renewal always carries the new
    /// access token.
    pub async fn send(
        &self,
        path: &str,
        options: RequestOptions,
        send: SendOptions,
    ) -> Result<Response, SdkError> {
        let url = self.config.resolve(path)?;
        let mut bearer = if options.headers.contains_key(AUTHORIZATION) {
            None
        } else {
            self.credentials.get(TokenKind::Access)
        };
        let mut renewal = Renewal::Available;

        loop {
            let response = self.dispatch(&url, &options, bearer.as_deref()).await?;
            if response.status() != StatusCode::UNAUTHORIZED {
                return Ok(response);
            }

            renewal = match renewal {
                Renewal::Spent => {
                    debug!(%url, "retried request still unauthorized");
                    return Ok(response);
                }
                Renewal::Available if !send.auto_refresh => return Ok(response),
                Renewal::Available => {
                    let renewed = self.renew(bearer.as_deref()).await?;
                    match renewed {
                        Renewed::Token(access) => {
                            bearer = Some(access);
                            Renewal::Spent
                        }
                        Renewed::NoRefreshToken | Renewed::Rejected => return Ok(response),
                    }
                }
            };
        }
    }

    /// `GET` with automatic renewal.
    pub async fn get(&self, path: &str) -> Result<Response, SdkError> {
        self.send(path, RequestOptions::get(), SendOptions::default())
            .await
    }

    /// Send, require a 2xx, and decode the JSON body.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, SdkError> {
        let response = self.send(path, options, SendOptions::default()).await?;
        let response = error_for_status(response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Send and require a 2xx, discarding the body.
    pub async fn execute(&self, path: &str, options: RequestOptions) -> Result<(), SdkError> {
        let response = self.send(path, options, SendOptions::default()).await?;
        error_for_status(response).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The credential store this client reads and renews.
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// The configuration the client was built with.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn dispatch(
        &self,
        url: &str,
        options: &RequestOptions,
        bearer: Option<&str>,
    ) -> Result<Response, SdkError> {
        let mut headers = options.headers.clone();

        if let Some(body) = &options.body {
            if !headers.contains_key(CONTENT_TYPE) {
                let content_type = match body {
                    RequestBody::Binary {
                        content_type: Some(ct),
                        ..
                    } => Some(header_value(ct)?),
                    b if b.takes_default_content_type() => {
                        Some(HeaderValue::from_static(DEFAULT_CONTENT_TYPE))
                    }
                    _ => None,
                };
                if let Some(value) = content_type {
                    headers.insert(CONTENT_TYPE, value);
                }
            }
        }

        if let Some(token) = bearer {
            let mut value = header_value(&format!("Bearer {token}"))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let mut request = self
            .http
            .request(options.method.clone(), url)
            .headers(headers);

        request = match &options.body {
            None => request,
            Some(RequestBody::Json(value)) => request.body(serde_json::to_vec(value)?),
            Some(RequestBody::Raw(text)) => request.body(text.clone()),
            Some(RequestBody::Binary { bytes, .. }) => request.body(bytes.clone()),
            Some(RequestBody::Multipart(parts)) => request.multipart(multipart_form(parts)?),
        };

        debug!(method = %options.method, %url, authenticated = bearer.is_some(), "dispatching request");
        Ok(request.send().await?)
    }

    /// Exchange the refresh token for a new pair.
    ///
    /// `stale` is the stored access token the failed attempt carried, if
    /// any.  When the store already holds a different one, a concurrent
    /// call renewed first and that token is reused without a network
    /// round trip.  The refresh call itself is unauthenticated and never
    /// renews.
    async fn renew(&self, stale: Option<&str>) -> Result<Renewed, SdkError> {
        let _renewing = self.credentials.lock_renewal().await;

        if stale.is_some() {
            if let Some(current) = self.credentials.get(TokenKind::Access) {
                if Some(current.as_str()) != stale {
                    debug!("access token renewed by a concurrent request");
                    return Ok(Renewed::Token(current));
                }
            }
        }

        let Some(refresh_token) = self.credentials.get(TokenKind::Refresh) else {
            debug!("401 without a refresh token");
            return Ok(Renewed::NoRefreshToken);
        };

        let url = self.config.resolve(ApiRoutes::REFRESH)?;
        let response = self
            .http
            .post(&url)
            .json(&RefreshRequest {
                refresh_token: refresh_token.clone(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "credential refresh rejected");
            return Ok(self.reject(&refresh_token));
        }

        let bytes = response.bytes().await?;
        let pair = match serde_json::from_slice::<TokenGrant>(&bytes)
            .map_err(SdkError::from)
            .and_then(|grant| grant.credentials().map_err(SdkError::from))
        {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "unusable refresh response");
                return Ok(self.reject(&refresh_token));
            }
        };

        self.credentials.set(&pair, PersistMode::Both);
        info!(rotated = pair.refresh_token.is_some(), "access token renewed");

        // `credentials()` guarantees an access token.
        Ok(pair
            .access_token
            .map(Renewed::Token)
            .unwrap_or(Renewed::Rejected))
    }

    /// Settle a refused exchange of `sent`.
    ///
    /// The store is cleared only while it still holds the refresh token
    /// that was refused; a pair written meanwhile by another client
    /// sharing the same storage is kept and its access token used.
    fn reject(&self, sent: &str) -> Renewed {
        let current = self.credentials.credentials();
        if current.refresh_token.as_deref() != Some(sent) {
            if let Some(access) = current.access_token {
                debug!("refresh token replaced while renewing, keeping the new pair");
                return Renewed::Token(access);
            }
        }
        self.credentials.clear();
        Renewed::Rejected
    }
}

/// Turn a non-2xx response into [`SdkError::Status`].
///
/// The message comes from the body's `message` or `error` field when the
/// body is JSON, else a generic fallback naming the status.
pub async fn error_for_status(response: Response) -> Result<Response, SdkError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|body| {
            ["message", "error"]
                .iter()
                .find_map(|field| body.get(*field).and_then(|v| v.as_str()).map(str::to_owned))
        })
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("request failed with status {status}"));

    Err(SdkError::Status { status, message })
}

fn header_value(value: &str) -> Result<HeaderValue, SdkError> {
    HeaderValue::from_str(value).map_err(|e| SdkError::Config(format!("invalid header value: {e}")))
}

fn multipart_form(parts: &[MultipartPart]) -> Result<reqwest::multipart::Form, SdkError> {
    let mut form = reqwest::multipart::Form::new();
    for part in parts {
        let mut field = reqwest::multipart::Part::bytes(part.bytes.clone());
        if let Some(file_name) = &part.file_name {
            field = field.file_name(file_name.clone());
        }
        if let Some(content_type) = &part.content_type {
            field = field.mime_str(content_type)?;
        }
        form = form.part(part.name.clone(), field);
    }
    Ok(form)
}

#[cfg(test)]
mod tests {
    use portal_models::CredentialPair;

    use super::*;

    #[tokio::test]
    async fn relative_path_without_base_fails_before_any_io() {
        let client = GatewayClient::new(GatewayConfig::default(), CredentialStore::in_memory());
        let err = client.get("/api/notifications").await.unwrap_err();
        assert!(matches!(err, SdkError::Config(_)));
    }

    #[test]
    fn refusal_clears_only_the_refresh_token_that_was_sent() {
        let store = CredentialStore::in_memory();
        let client = GatewayClient::new(GatewayConfig::new("http://localhost"), store.clone());
        store.set(&CredentialPair::new("a2", Some("r2".into())), PersistMode::Both);

        // r1 was replaced before its refusal came back
        assert!(matches!(client.reject("r1"), Renewed::Token(access) if access == "a2"));
        assert!(store.is_authenticated());

        assert!(matches!(client.reject("r2"), Renewed::Rejected));
        assert!(store.credentials().is_empty());
    }

    #[test]
    fn bad_multipart_mime_is_rejected() {
        let parts = vec![MultipartPart::file(
            "file",
            "a.txt",
            Some("not a mime".into()),
            b"hi".to_vec(),
        )];
        assert!(multipart_form(&parts).is_err());
    }
}
