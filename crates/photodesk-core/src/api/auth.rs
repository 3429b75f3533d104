//! Authentication endpoints.
//!
//! Register and login are sent anonymously: they run before a token exists,
//! and a stale token must never be offered alongside fresh credentials.

use crate::models::{LoginRequest, RegisterRequest, TokenResponse, UserProfile};

use super::{ApiClient, ApiError, RequestOptions};

impl ApiClient {
    /// Create an account. Does not log in.
    pub async fn register(&self, data: &RegisterRequest) -> Result<UserProfile, ApiError> {
        self.post_json("/auth/register", data, RequestOptions::anonymous())
            .await
    }

    /// Exchange credentials for a token. Does not touch the session; the
    /// caller decides whether to store the token.
    pub async fn login(&self, data: &LoginRequest) -> Result<TokenResponse, ApiError> {
        self.post_json("/auth/login", data, RequestOptions::anonymous())
            .await
    }

    /// "Who am I" for the current token.
    pub async fn current_user(&self) -> Result<UserProfile, ApiError> {
        self.get_json("/auth/me", RequestOptions::default()).await
    }
}
