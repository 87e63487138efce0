use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, info, warn};

use super::clock::Clock;
use super::storage::{SessionStorage, EXPIRES_AT_KEY, SESSION_KEYS, TOKEN_KEY, USER_KEY};
use super::token::{decode_claims, is_token_expired};
use crate::models::User;

/// In-memory view of the session. `user` is never set without `token`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub token: Option<String>,
    pub user: Option<User>,
}

/// Sole owner of the session token and user identity, and sole writer of
/// their storage keys.
///
/// Every operation takes `&self` and holds the state lock for its whole
/// duration, so the store can be shared behind an `Arc` by the API client,
/// the navigator and the UI.
pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
    clock: Arc<dyn Clock>,
    state: RwLock<SessionState>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn SessionStorage>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            state: RwLock::new(SessionState::default()),
        }
    }

    /// Hydrate the session from storage. Expired or undecodable tokens are
    /// purged along with the rest of the session keys.
    pub fn initialize(&self) {
        let mut state = self.write_state();
        *state = SessionState::default();

        let token = match self.storage.get(TOKEN_KEY) {
            Ok(Some(token)) => token,
            Ok(None) => {
                debug!("No stored session");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read stored token");
                return;
            }
        };

        if is_token_expired(&token, self.clock.now()) {
            info!("Stored token is expired or invalid, clearing session");
            self.purge_storage();
            return;
        }

        let user = match self.storage.get(USER_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<User>(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!(error = %e, "Ignoring unparsable stored user");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read stored user");
                None
            }
        };

        debug!(user = ?user.as_ref().map(|u| &u.username), "Restored session");
        state.token = Some(token);
        state.user = user;
    }

    /// Re-evaluated on every call. An expired token clears the session.
    pub fn is_authenticated(&self) -> bool {
        self.check_token_expiration() && self.read_state().token.is_some()
    }

    /// Replace the token. Expired or undecodable tokens are rejected and the
    /// previous session is kept. Returns whether the token was accepted.
    pub fn set_token(&self, new_token: &str) -> bool {
        let now = self.clock.now();
        let expires_at = match decode_claims(new_token) {
            Ok(claims) if !claims.is_expired_at(now) => claims.expires_at(),
            Ok(_) => {
                warn!("Attempted to set an expired token");
                return false;
            }
            Err(e) => {
                warn!(error = %e, "Attempted to set an undecodable token");
                return false;
            }
        };

        let mut state = self.write_state();
        state.token = Some(new_token.to_string());
        self.persist(TOKEN_KEY, new_token);
        self.persist(
            EXPIRES_AT_KEY,
            &expires_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        );
        info!(expires_at = %expires_at, "Token set");
        true
    }

    /// Replace the user identity. Ignored while no token is held so a user
    /// can never outlive its token.
    pub fn set_user(&self, new_user: User) {
        let mut state = self.write_state();
        if state.token.is_none() {
            warn!(username = %new_user.username, "Ignoring user without a session token");
            return;
        }
        match serde_json::to_string(&new_user) {
            Ok(raw) => self.persist(USER_KEY, &raw),
            Err(e) => warn!(error = %e, "Failed to serialize user"),
        }
        state.user = Some(new_user);
    }

    /// Drop token and user from memory and storage. Idempotent.
    pub fn clear_token(&self) {
        let mut state = self.write_state();
        self.clear_locked(&mut state);
    }

    /// Clear the session if its token has expired. Returns `false` only when
    /// an expired token was found and cleared.
    pub fn check_token_expiration(&self) -> bool {
        // Check and clear under one guard so a token set concurrently is
        // never wiped on behalf of the one it replaced
        let mut state = self.write_state();
        let expired = match state.token.as_deref() {
            Some(token) => is_token_expired(token, self.clock.now()),
            None => false,
        };
        if expired {
            self.clear_locked(&mut state);
            return false;
        }
        true
    }

    pub fn token(&self) -> Option<String> {
        self.read_state().token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.read_state().user.clone()
    }

    pub fn state(&self) -> SessionState {
        self.read_state().clone()
    }

    /// Decoded expiration of the current token.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let token = self.token()?;
        decode_claims(&token).ok().map(|c| c.expires_at())
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn clear_locked(&self, state: &mut SessionState) {
        if state.token.is_some() {
            info!("Clearing session");
        }
        *state = SessionState::default();
        self.purge_storage();
    }

    fn persist(&self, key: &str, value: &str) {
        if let Err(e) = self.storage.set(key, value) {
            warn!(key = key, error = %e, "Failed to persist session key");
        }
    }

    fn purge_storage(&self) {
        for key in SESSION_KEYS {
            if let Err(e) = self.storage.remove(key) {
                warn!(key = key, error = %e, "Failed to remove session key");
            }
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}
