//! API client for the photodesk REST service.
//!
//! All feature modules issue requests through `ApiClient::request` (or the
//! typed helpers built on it), so credential handling and failure
//! classification live in one place.

use std::time::Duration;

use reqwest::{multipart::Form, Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::auth::{Credential, CredentialStore};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow uploads while failing fast enough for good UX.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Per-request options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    /// Send without a credential even if one is present (login, register).
    pub anonymous: bool,
}

impl RequestOptions {
    pub fn anonymous() -> Self {
        Self {
            anonymous: true,
            ..Default::default()
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }
}

/// Request gateway for the photodesk API.
/// Clone is cheap - reqwest::Client and the credential store are both
/// reference counted.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    store: CredentialStore,
}

impl ApiClient {
    /// Create a new API client with the default timeout
    pub fn new(base_url: &str, store: CredentialStore) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS), store)
    }

    pub fn with_timeout(
        base_url: &str,
        timeout: Duration,
        store: CredentialStore,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            store,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Absolute URL for an API path.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Issue a request. The current token is attached as a bearer
    /// credential unless the options ask for an anonymous call or no token
    /// exists.
    pub async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        opts: RequestOptions,
    ) -> Result<Response, ApiError> {
        let mut builder = self.client.request(method, self.url(path));
        if !opts.query.is_empty() {
            builder = builder.query(&opts.query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.send(builder, opts.anonymous).await
    }

    async fn send(&self, builder: RequestBuilder, anonymous: bool) -> Result<Response, ApiError> {
        // Read at send time so a token set a moment ago is used.
        let credential = if anonymous {
            None
        } else {
            self.store.credential()
        };

        let builder = match credential {
            Some(ref c) => builder.bearer_auth(&c.token),
            None => builder,
        };

        let request = builder.build()?;
        debug!(
            method = %request.method(),
            url = %request.url(),
            signed = credential.is_some(),
            "Sending request"
        );

        let response = self.client.execute(request).await?;
        self.check_response(response, credential.as_ref()).await
    }

    /// Check if response is successful, returning a classified error if not.
    /// A 401 on a signed request invalidates the session that signed it.
    async fn check_response(
        &self,
        response: Response,
        credential: Option<&Credential>,
    ) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        let error = ApiError::from_status(status, &body);
        warn!(url = %url, status = status.as_u16(), error = %error, "Request failed");

        if error.is_unauthorized() {
            if let Some(credential) = credential {
                self.store.invalidate(credential.generation);
            }
        }
        Err(error)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let url = response.url().to_string();
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", url, e)))
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        opts: RequestOptions,
    ) -> Result<T, ApiError> {
        let response = self.request::<()>(Method::GET, path, None, opts).await?;
        Self::decode(response).await
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOptions,
    ) -> Result<T, ApiError> {
        let response = self.request(Method::POST, path, Some(body), opts).await?;
        Self::decode(response).await
    }

    pub async fn patch_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .request(Method::PATCH, path, Some(body), RequestOptions::default())
            .await?;
        Self::decode(response).await
    }

    /// DELETE, discarding whatever acknowledgement body the server sends.
    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.request::<()>(Method::DELETE, path, None, RequestOptions::default())
            .await?;
        Ok(())
    }

    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
    ) -> Result<T, ApiError> {
        let builder = self.client.post(self.url(path)).multipart(form);
        let response = self.send(builder, false).await?;
        Self::decode(response).await
    }

    /// Raw response body, for downloads.
    pub async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        let response = self
            .request::<()>(Method::GET, path, None, RequestOptions::default())
            .await?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryTokenStorage;

    fn client(base: &str) -> ApiClient {
        let store = CredentialStore::open(Box::new(MemoryTokenStorage::default()));
        ApiClient::new(base, store).unwrap()
    }

    #[test]
    fn test_url_joins_cleanly() {
        let api = client("http://localhost:8000/");
        assert_eq!(api.base_url(), "http://localhost:8000");
        assert_eq!(api.url("/projects"), "http://localhost:8000/projects");
        assert_eq!(api.url("projects/1"), "http://localhost:8000/projects/1");
    }

    #[test]
    fn test_request_options_builder() {
        let opts = RequestOptions::default().query("limit", 100).query("offset", 0);
        assert!(!opts.anonymous);
        assert_eq!(
            opts.query,
            vec![
                ("limit".to_string(), "100".to_string()),
                ("offset".to_string(), "0".to_string())
            ]
        );
        assert!(RequestOptions::anonymous().anonymous);
    }
}
