//! Main Playlist Collector backend client.

use crate::catalog::CatalogClient;
use crate::error::{CollectorClientError, Result};
use crate::export::ExportClient;
use crate::public::PublicClient;
use crate::token::{AuthEvent, TokenStore};
use crate::types::{
    ApiErrorBody, ClientConfig, ExchangeRequest, ExchangeResponse, StatusResponse,
};
use reqwest::{Client, Method, RequestBuilder, Response};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Main client for the Playlist Collector backend.
///
/// Owns the HTTP connection pool, the persisted bearer credential, and the
/// process-wide auth-event channel. Catalog, export, and public operations
/// hang off it as borrowed sub-clients.
#[derive(Debug)]
pub struct CollectorClient {
    http: Client,
    base_url: String,
    token_store: TokenStore,
    auth_events: broadcast::Sender<AuthEvent>,
}

impl CollectorClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.base_url.is_empty() {
            return Err(CollectorClientError::InvalidUrl(
                "URL cannot be empty".into(),
            ));
        }

        let base_url = config.base_url.trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(CollectorClientError::InvalidUrl(
                "URL must start with http:// or https://".into(),
            ));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!(
                "PlaylistCollector/{} (CLI)",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(CollectorClientError::Request)?;

        let (auth_events, _) = broadcast::channel(16);

        Ok(Self {
            http,
            base_url,
            token_store: TokenStore::new(config.token_path),
            auth_events,
        })
    }

    /// Get the backend base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The browser-facing URL that begins the OAuth login flow.
    pub fn auth_url(&self) -> String {
        format!("{}/auth", self.base_url)
    }

    /// Access the persisted credential store.
    pub fn token_store(&self) -> &TokenStore {
        &self.token_store
    }

    /// Whether a locally valid (unexpired) credential is present.
    pub fn is_authenticated(&self) -> bool {
        self.token_store.has_valid_token()
    }

    /// Subscribe to authentication lifecycle events.
    pub fn subscribe_auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.auth_events.subscribe()
    }

    /// Check the session status against the backend.
    pub async fn status(&self) -> Result<StatusResponse> {
        let response = self.send(self.request(Method::GET, "/api/status")).await?;
        let response = self.error_for_status(response).await?;

        let status: StatusResponse = response.json().await.map_err(|e| {
            CollectorClientError::Parse(format!("Failed to parse status response: {}", e))
        })?;

        debug!(authenticated = status.authenticated, "Fetched session status");
        Ok(status)
    }

    /// Exchange an OAuth redirect code for a credential.
    ///
    /// On success the credential is persisted and returned.
    pub async fn exchange_code(&self, code: &str) -> Result<String> {
        let url = format!("{}/auth/exchange", self.base_url);
        debug!(url = %url, "Exchanging OAuth code");

        let response = self
            .send(self.http.post(&url).json(&ExchangeRequest { code }))
            .await?;
        let response = self.error_for_status(response).await?;

        let exchange: ExchangeResponse = response.json().await.map_err(|e| {
            CollectorClientError::Parse(format!("Failed to parse exchange response: {}", e))
        })?;

        self.token_store.set_token(&exchange.token)?;
        info!("OAuth code exchanged for credential");
        Ok(exchange.token)
    }

    /// Clear the stored credential (logout). Purely local; the backend has
    /// no logout endpoint to call.
    pub fn logout(&self) {
        self.token_store.remove_token();
        info!("Logged out");
    }

    /// Get a catalog client for collection and track listings.
    pub fn catalog(&self) -> CatalogClient<'_> {
        CatalogClient::new(self)
    }

    /// Get an export client for authenticated export downloads.
    pub fn export(&self) -> ExportClient<'_> {
        ExportClient::new(self)
    }

    /// Get a client for the unauthenticated public-collection flow.
    pub fn public(&self) -> PublicClient<'_> {
        PublicClient::new(self)
    }

    /// Build a request against an API path, attaching the bearer credential
    /// if and only if a locally valid one exists at send time.
    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.http.request(method, url);
        if self.token_store.has_valid_token() {
            if let Some(token) = self.token_store.token() {
                builder = builder.bearer_auth(token);
            }
        }
        builder
    }

    /// Build a request that never carries credentials.
    pub(crate) fn request_public(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.http.request(method, url)
    }

    /// Send a request, folding connection-level failures into
    /// `ServerUnreachable`.
    pub(crate) async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        builder.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                CollectorClientError::ServerUnreachable(e.to_string())
            } else {
                CollectorClientError::Request(e)
            }
        })
    }

    /// Translate a non-success response into the client error taxonomy.
    ///
    /// A 401 clears the stored credential and broadcasts
    /// [`AuthEvent::Expired`], once per response.
    pub(crate) async fn error_for_status(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        Err(match status.as_u16() {
            401 => {
                warn!("Received 401, invalidating stored credential");
                self.token_store.remove_token();
                let _ = self.auth_events.send(AuthEvent::Expired);
                CollectorClientError::AuthExpired
            }
            429 => {
                let body: ApiErrorBody = response.json().await.unwrap_or_default();
                let message = if body.error.is_empty() {
                    "Too many requests".to_string()
                } else {
                    body.error
                };
                CollectorClientError::RateLimited {
                    message,
                    reset_time: body.reset_time,
                }
            }
            code => {
                let message = response.text().await.unwrap_or_default();
                CollectorClientError::ServerError {
                    status: code,
                    message,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> ClientConfig {
        ClientConfig::new(url, std::env::temp_dir().join("collector-test-token"))
    }

    #[test]
    fn test_url_validation() {
        assert!(CollectorClient::new(config("https://example.com")).is_ok());
        assert!(CollectorClient::new(config("http://localhost:3001")).is_ok());

        assert!(CollectorClient::new(config("")).is_err());
        assert!(CollectorClient::new(config("not-a-url")).is_err());
        assert!(CollectorClient::new(config("ftp://example.com")).is_err());
    }

    #[test]
    fn test_url_normalization() {
        let client = CollectorClient::new(config("https://example.com/")).expect("valid url");
        assert_eq!(client.base_url(), "https://example.com");
        assert_eq!(client.auth_url(), "https://example.com/auth");
    }
}
