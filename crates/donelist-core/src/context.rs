//! Explicitly owned session context.
//!
//! `SessionContext` wires one `SessionStore`, one `Navigator` and one
//! `ApiClient` together. Front-ends create it once, call `start`, and pass
//! it (or clones of its parts) to whatever needs the session.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::api::{ApiClient, ApiError};
use crate::auth::{Clock, FileStorage, KeyringStorage, SessionStorage, SessionStore, SystemClock};
use crate::config::{Config, StorageBackend};
use crate::models::User;
use crate::navigation::{Navigator, DEFAULT_PATH};

pub struct SessionContext {
    session: Arc<SessionStore>,
    navigator: Arc<Navigator>,
    api: ApiClient,
}

impl SessionContext {
    pub fn new(
        storage: Arc<dyn SessionStorage>,
        clock: Arc<dyn Clock>,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let session = Arc::new(SessionStore::new(storage, clock));
        let navigator = Arc::new(Navigator::new(session.clone()));
        let api = ApiClient::new(base_url, timeout, session.clone(), navigator.clone())?;
        Ok(Self {
            session,
            navigator,
            api,
        })
    }

    /// Build a context using the storage backend and backend URL from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let storage: Arc<dyn SessionStorage> = match config.storage {
            StorageBackend::File => Arc::new(FileStorage::new(config.cache_dir()?)),
            StorageBackend::Keyring => Arc::new(KeyringStorage::new()),
        };
        Self::new(
            storage,
            Arc::new(SystemClock),
            &config.base_url,
            Duration::from_secs(config.request_timeout_secs),
        )
        .context("Failed to create API client")
    }

    /// Restore the persisted session and enter the first view. Returns the
    /// view actually entered after guards ran.
    pub fn start(&self, initial_path: &str) -> String {
        self.session.initialize();
        let path = self.navigator.navigate(initial_path);
        info!(path = %path, authenticated = self.session.is_authenticated(), "Session started");
        path
    }

    /// Log in and move to the default view.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, ApiError> {
        let user = self.api.login(username, password).await?;
        self.navigator.navigate(DEFAULT_PATH);
        Ok(user)
    }

    /// End the session and return to the login view.
    pub fn logout(&self) -> String {
        self.session.clear_token();
        self.navigator.redirect_to_login()
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn navigator(&self) -> &Arc<Navigator> {
        &self.navigator
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }
}
