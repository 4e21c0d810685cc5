//! Bearer-token injection with one-shot refresh-and-retry.
//!
//! [`AuthFetcher::auth_fetch`] sends a request with the stored access token.
//! On a 401 it exchanges the stored refresh token once, persists the new
//! pair and replays the original request a single time. Every other outcome
//! is handed back to the caller untouched, including the original 401 when
//! the refresh itself fails.
//!
//! Concurrent calls that hit 401 each run their own refresh; nothing is
//! coalesced.

use crate::endpoints;
use crate::types::{RefreshRequest, RefreshResponse};
use crate::AuthResult;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Client, Request, Response, StatusCode};
use std::sync::Arc;
use storefront_config_and_utils::{build_url_with_base, Config};
use storefront_storage::TokenStore;
use tracing::{debug, info, warn};
use url::Url;

/// HTTP client bound to an API base URL and a shared token store.
pub struct AuthFetcher {
    http: Client,
    base_url: String,
    tokens: Arc<TokenStore>,
}

impl AuthFetcher {
    /// Create a fetcher with a default HTTP client.
    pub fn new(base_url: &str, tokens: Arc<TokenStore>) -> AuthResult<Self> {
        Self::with_client(Client::new(), base_url, tokens)
    }

    /// Create a fetcher from client configuration (base URL and timeout).
    pub fn from_config(config: &Config, tokens: Arc<TokenStore>) -> AuthResult<Self> {
        let base_url = config.api_base_url()?;
        let http = Client::builder().timeout(config.request_timeout()).build()?;
        Self::with_client(http, base_url.as_str(), tokens)
    }

    /// Create a fetcher around an existing HTTP client.
    pub fn with_client(http: Client, base_url: &str, tokens: Arc<TokenStore>) -> AuthResult<Self> {
        let parsed = Url::parse(base_url.trim())?;
        Ok(Self {
            http,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            tokens,
        })
    }

    /// The underlying HTTP client, for building requests.
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// The shared token store.
    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path.
    pub fn endpoint(&self, path: &str) -> AuthResult<Url> {
        Ok(build_url_with_base(&self.base_url, path)?)
    }

    /// Build and send an authenticated GET for an API path.
    pub async fn get(&self, path: &str) -> AuthResult<Response> {
        let request = self.http.get(self.endpoint(path)?).build()?;
        self.auth_fetch(request).await
    }

    /// Send `request` with the stored bearer token, refreshing and retrying
    /// once on 401.
    ///
    /// Only transport failures of the caller's own request are errors; any
    /// HTTP status, including a 401 that survived a failed refresh, is
    /// returned as a response.
    pub async fn auth_fetch(&self, request: Request) -> AuthResult<Response> {
        let credentials = self.tokens.get_stored_tokens();
        let replay = request.try_clone();

        let response = self
            .http
            .execute(with_bearer(request, &credentials.access))
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED || !credentials.has_refresh() {
            return Ok(response);
        }

        debug!(url = %response.url(), "Access token rejected, attempting refresh");

        let Some(access) = self.refresh(&credentials.refresh).await else {
            return Ok(response);
        };

        let Some(replay) = replay else {
            warn!(url = %response.url(), "Request body cannot be replayed, returning original 401");
            return Ok(response);
        };

        debug!(url = %response.url(), "Retrying request with refreshed token");
        Ok(self.http.execute(with_bearer(replay, &access)).await?)
    }

    /// Exchange the refresh token. Returns the new access token, or `None`
    /// when the refresh failed for any reason.
    async fn refresh(&self, refresh_token: &str) -> Option<String> {
        let url = match self.endpoint(endpoints::REFRESH) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "Cannot build refresh URL");
                return None;
            }
        };

        let response = match self
            .http
            .post(url)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Token refresh request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), "Token refresh rejected");
            return None;
        }

        let data: RefreshResponse = match response.json().await {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "Token refresh returned an unreadable body");
                return None;
            }
        };

        let Some(access) = data.access_token.filter(|token| !token.is_empty()) else {
            warn!("Token refresh response carried no access token");
            return None;
        };
        let rotated = data.refresh_token.unwrap_or_default();

        if let Err(e) = self.tokens.store_tokens(&access, &rotated) {
            warn!(error = %e, "Failed to persist refreshed tokens");
        }

        info!(rotated = !rotated.is_empty(), "Access token refreshed");
        Some(access)
    }
}

/// Set `Authorization: Bearer <token>` when a token is present, replacing
/// any Authorization header already on the request.
fn with_bearer(mut request: Request, token: &str) -> Request {
    if token.is_empty() {
        return request;
    }
    match HeaderValue::from_str(&format!("Bearer {}", token)) {
        Ok(mut value) => {
            value.set_sensitive(true);
            request.headers_mut().insert(AUTHORIZATION, value);
        }
        Err(e) => warn!(error = %e, "Stored access token is not a valid header value"),
    }
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::net::TcpListener;
    use storefront_storage::{CredentialPair, MemoryStorage};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn fetcher(server: &MockServer, access: &str, refresh: &str) -> AuthFetcher {
        let tokens = Arc::new(TokenStore::new(Box::new(MemoryStorage::new())));
        tokens.store_tokens(access, refresh).unwrap();
        AuthFetcher::new(&server.uri(), tokens).unwrap()
    }

    async fn mount_refresh(server: &MockServer, refresh: &str, status: u16, body: Value) {
        Mock::given(method("POST"))
            .and(path("/api/auth/refresh"))
            .and(body_json(json!({ "refresh_token": refresh })))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(server)
            .await;
    }

    async fn requests_to(server: &MockServer, route: &str) -> Vec<wiremock::Request> {
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|request| request.url.path() == route)
            .collect()
    }

    #[test]
    fn test_with_bearer_skips_empty_token() {
        let client = Client::new();
        let request = client.get("http://localhost/api").build().unwrap();
        let request = with_bearer(request, "");
        assert!(request.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_with_bearer_replaces_existing_header() {
        let client = Client::new();
        let request = client
            .get("http://localhost/api")
            .header(AUTHORIZATION, "Bearer stale")
            .build()
            .unwrap();
        let request = with_bearer(request, "fresh");
        assert_eq!(request.headers()[AUTHORIZATION], "Bearer fresh");
    }

    #[test]
    fn test_endpoint_keeps_base_prefix() {
        let tokens = Arc::new(TokenStore::new(Box::new(MemoryStorage::new())));
        let fetcher = AuthFetcher::new("https://shop.example.com/store/", tokens).unwrap();
        assert_eq!(
            fetcher.endpoint(endpoints::ME).unwrap().as_str(),
            "https://shop.example.com/store/api/auth/me"
        );
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let tokens = Arc::new(TokenStore::new(Box::new(MemoryStorage::new())));
        assert!(AuthFetcher::new("not a url", tokens).is_err());
    }

    #[tokio::test]
    async fn no_access_token_sends_no_authorization_header() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "email": "a@b.com" })))
            .mount(&server)
            .await;

        let fetcher = fetcher(&server, "", "");
        let response = fetcher.get(endpoints::ME).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let received = requests_to(&server, "/api/auth/me").await;
        assert_eq!(received.len(), 1);
        assert!(received[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn access_token_is_sent_as_bearer() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/me"))
            .and(header("Authorization", "Bearer A1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "email": "a@b.com" })))
            .mount(&server)
            .await;

        let fetcher = fetcher(&server, "A1", "R1");
        let response = fetcher.get(endpoints::ME).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(requests_to(&server, "/api/auth/refresh").await.is_empty());
    }

    #[tokio::test]
    async fn expired_access_is_refreshed_and_retried_once() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/me"))
            .and(header("Authorization", "Bearer A1"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "detail": "Invalid or expired token" })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/auth/me"))
            .and(header("Authorization", "Bearer A2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "email": "a@b.com" })))
            .mount(&server)
            .await;
        mount_refresh(
            &server,
            "R1",
            200,
            json!({ "access_token": "A2", "refresh_token": "R2", "token_type": "Bearer" }),
        )
        .await;

        let fetcher = fetcher(&server, "A1", "R1");
        let response = fetcher.get(endpoints::ME).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            fetcher.tokens().get_stored_tokens(),
            CredentialPair::new("A2", "R2")
        );
        assert_eq!(requests_to(&server, "/api/auth/refresh").await.len(), 1);
        assert_eq!(requests_to(&server, "/api/auth/me").await.len(), 2);
    }

    #[tokio::test]
    async fn failed_refresh_returns_original_401_and_keeps_tokens() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/me"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "detail": "Invalid or expired token" })))
            .mount(&server)
            .await;
        mount_refresh(&server, "R1", 401, json!({ "detail": "Refresh token expired" })).await;

        let fetcher = fetcher(&server, "A1", "R1");
        let response = fetcher.get(endpoints::ME).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["detail"], "Invalid or expired token");
        assert_eq!(
            fetcher.tokens().get_stored_tokens(),
            CredentialPair::new("A1", "R1")
        );
        assert_eq!(requests_to(&server, "/api/auth/me").await.len(), 1);
    }

    #[tokio::test]
    async fn refresh_without_access_token_counts_as_failure() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/me"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        mount_refresh(&server, "R1", 200, json!({ "refresh_token": "R2" })).await;

        let fetcher = fetcher(&server, "A1", "R1");
        let response = fetcher.get(endpoints::ME).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            fetcher.tokens().get_stored_tokens(),
            CredentialPair::new("A1", "R1")
        );
    }

    #[tokio::test]
    async fn refresh_without_rotation_keeps_refresh_token() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/me"))
            .and(header("Authorization", "Bearer A1"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/auth/me"))
            .and(header("Authorization", "Bearer A2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "email": "a@b.com" })))
            .mount(&server)
            .await;
        mount_refresh(&server, "R1", 200, json!({ "access_token": "A2" })).await;

        let fetcher = fetcher(&server, "A1", "R1");
        let response = fetcher.get(endpoints::ME).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            fetcher.tokens().get_stored_tokens(),
            CredentialPair::new("A2", "R1")
        );
    }

    #[tokio::test]
    async fn unauthorized_without_refresh_token_is_not_retried() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/me"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let fetcher = fetcher(&server, "A1", "");
        let response = fetcher.get(endpoints::ME).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(requests_to(&server, "/api/auth/refresh").await.is_empty());
    }

    #[tokio::test]
    async fn other_error_statuses_pass_through() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/me"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/products"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let fetcher = fetcher(&server, "A1", "R1");
        assert_eq!(
            fetcher.get(endpoints::ME).await.unwrap().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            fetcher.get("/api/products").await.unwrap().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert!(requests_to(&server, "/api/auth/refresh").await.is_empty());
    }

    #[tokio::test]
    async fn retry_that_still_fails_is_returned_without_second_refresh() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/me"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        mount_refresh(&server, "R1", 200, json!({ "access_token": "A2", "refresh_token": "R2" })).await;

        let fetcher = fetcher(&server, "A1", "R1");
        let response = fetcher.get(endpoints::ME).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(requests_to(&server, "/api/auth/refresh").await.len(), 1);
        assert_eq!(requests_to(&server, "/api/auth/me").await.len(), 2);
    }

    #[tokio::test]
    async fn retry_preserves_caller_headers_and_body() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        let payload = json!({ "current_password": "old", "new_password": "new" });
        Mock::given(method("POST"))
            .and(path("/api/auth/change-password"))
            .and(header("Authorization", "Bearer A1"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/change-password"))
            .and(header("Authorization", "Bearer A2"))
            .and(header("X-Request-Id", "req-7"))
            .and(body_json(payload.clone()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "Password has been changed" })))
            .mount(&server)
            .await;
        mount_refresh(&server, "R1", 200, json!({ "access_token": "A2", "refresh_token": "R2" })).await;

        let fetcher = fetcher(&server, "A1", "R1");
        let request = fetcher
            .http()
            .post(fetcher.endpoint(endpoints::CHANGE_PASSWORD).unwrap())
            .header("X-Request-Id", "req-7")
            .json(&payload)
            .build()
            .unwrap();

        let response = fetcher.auth_fetch(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn transport_failure_is_an_error() {
        let tokens = Arc::new(TokenStore::new(Box::new(MemoryStorage::new())));
        let fetcher = AuthFetcher::new("http://127.0.0.1:9", tokens).unwrap();

        let result = fetcher.get(endpoints::ME).await;
        assert!(matches!(result, Err(crate::AuthError::Http(_))));
    }

    #[tokio::test]
    async fn concurrent_unauthorized_calls_each_refresh() {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/me"))
            .and(header("Authorization", "Bearer A1"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "detail": "Invalid or expired token" })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/auth/me"))
            .and(header("Authorization", "Bearer A2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "email": "a@b.com" })))
            .mount(&server)
            .await;
        mount_refresh(&server, "R1", 200, json!({ "access_token": "A2" })).await;

        let fetcher = fetcher(&server, "A1", "R1");
        let (first, second) = tokio::join!(fetcher.get(endpoints::ME), fetcher.get(endpoints::ME));

        assert_eq!(first.unwrap().status(), StatusCode::OK);
        assert_eq!(second.unwrap().status(), StatusCode::OK);
        assert_eq!(requests_to(&server, "/api/auth/refresh").await.len(), 2);
        assert_eq!(fetcher.tokens().get_stored_tokens(), CredentialPair::new("A2", "R1"));
    }
}
