//! API client for the donelist backend.
//!
//! All calls go through `execute`, which runs the session middleware around
//! the transport. The client never retries: authentication failures end the
//! session and are returned to the caller.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::middleware::{authorize_request, inspect_response};
use super::ApiError;
use crate::auth::SessionStore;
use crate::models::{Credentials, NewTodo, SessionToken, Todo, User};
use crate::navigation::Navigator;

// ============================================================================
// Constants
// ============================================================================

/// Every endpoint lives under this prefix.
pub const API_PREFIX: &str = "/api";

/// HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// API client for the donelist backend.
/// Clone is cheap - reqwest::Client and the session are shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Arc<SessionStore>,
    navigator: Arc<Navigator>,
}

impl ApiClient {
    /// Create a client for the backend at `base_url` (without the `/api` prefix).
    pub fn new(
        base_url: &str,
        timeout: Duration,
        session: Arc<SessionStore>,
        navigator: Arc<Navigator>,
    ) -> Result<Self, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: format!("{}{}", base_url.trim_end_matches('/'), API_PREFIX),
            session,
            navigator,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    /// Run a request through the middleware and the transport.
    async fn execute(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let request = builder.build()?;
        let request = authorize_request(&self.session, &self.navigator, request)?;

        debug!(method = %request.method(), url = %request.url(), "Sending request");
        let response = self.client.execute(request).await?;

        let response = inspect_response(&self.session, &self.navigator, response)?;
        Self::check_response(response).await
    }

    async fn execute_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = self.execute(builder).await?;
        let url = response.url().to_string();
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse JSON from {}: {}", url, e)))
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    // ===== Authentication =====

    /// Exchange credentials for a token, store it and load the user.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, ApiError> {
        // A stale token would make the interceptor refuse the login request
        self.session.check_token_expiration();

        let body = Credentials {
            username: username.to_string(),
            password: password.to_string(),
        };
        // The server answers bad credentials with 401
        let issued: SessionToken = self
            .execute_json(self.request(Method::POST, "/login").json(&body))
            .await
            .map_err(|e| match e {
                ApiError::Unauthorized => ApiError::InvalidCredentials,
                other => other,
            })?;

        if !self.session.set_token(&issued.token) {
            return Err(ApiError::InvalidResponse(
                "Server issued an expired or malformed token".to_string(),
            ));
        }

        let user = match self.me().await {
            Ok(user) => user,
            Err(e) => {
                self.session.clear_token();
                return Err(e);
            }
        };
        self.session.set_user(user.clone());
        info!(username = %user.username, "Logged in");
        Ok(user)
    }

    /// Create an account. Does not log in.
    pub async fn register(&self, username: &str, password: &str) -> Result<User, ApiError> {
        let body = Credentials {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.execute_json(self.request(Method::POST, "/register").json(&body))
            .await
    }

    /// Fetch the user the current token belongs to.
    pub async fn me(&self) -> Result<User, ApiError> {
        self.execute_json(self.request(Method::GET, "/me")).await
    }

    // ===== Todos =====

    pub async fn list_todos(&self) -> Result<Vec<Todo>, ApiError> {
        self.execute_json(self.request(Method::GET, "/todos")).await
    }

    pub async fn create_todo(&self, todo: &NewTodo) -> Result<Todo, ApiError> {
        self.execute_json(self.request(Method::POST, "/todos").json(todo))
            .await
    }

    pub async fn update_todo(&self, todo: &Todo) -> Result<Todo, ApiError> {
        let path = format!("/todos/{}", todo.id);
        self.execute_json(self.request(Method::PUT, &path).json(todo))
            .await
    }

    pub async fn delete_todo(&self, id: i64) -> Result<(), ApiError> {
        let path = format!("/todos/{}", id);
        self.execute(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }
}
