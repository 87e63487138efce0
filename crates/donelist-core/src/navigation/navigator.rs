use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use super::router::{guard, NavigationDecision, Route, LOGIN_PATH};
use crate::auth::SessionStore;

/// Redirect chains longer than this indicate a session flapping mid-navigation.
const MAX_REDIRECTS: usize = 3;

/// Tracks the current view and applies route guards on every transition.
pub struct Navigator {
    session: Arc<SessionStore>,
    history: RwLock<Vec<String>>,
}

impl Navigator {
    /// Start with no view entered. Call `navigate` to enter the first one.
    pub fn new(session: Arc<SessionStore>) -> Self {
        Self {
            session,
            history: RwLock::new(Vec::new()),
        }
    }

    /// Navigate to `path`, following guard redirects. Returns the path that
    /// was actually entered.
    pub fn navigate(&self, path: &str) -> String {
        let mut target = path.to_string();
        for _ in 0..MAX_REDIRECTS {
            let route = Route::resolve(&target);
            match guard(route, self.session.is_authenticated()) {
                NavigationDecision::Proceed => break,
                NavigationDecision::Redirect(to) => {
                    debug!(from = %target, to = to, route = route.name(), "Navigation redirected");
                    target = to.to_string();
                }
            }
        }

        let mut history = self.history.write().unwrap_or_else(|e| e.into_inner());
        if history.last() != Some(&target) {
            history.push(target.clone());
        }
        target
    }

    /// Send the user to the login view after the session was torn down.
    pub fn redirect_to_login(&self) -> String {
        info!("Redirecting to login");
        self.navigate(LOGIN_PATH)
    }

    pub fn current_path(&self) -> Option<String> {
        let history = self.history.read().unwrap_or_else(|e| e.into_inner());
        history.last().cloned()
    }

    pub fn current_route(&self) -> Option<Route> {
        self.current_path().map(|p| Route::resolve(&p))
    }

    /// Every view entered so far, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.history.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
