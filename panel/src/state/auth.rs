//! Auth-session state for the current browser user.
//!
//! SYSTEM CONTEXT
//! ==============
//! The login form lives outside this panel. It leaves a bearer token and a
//! user record in `localStorage`; the session here restores them on start and
//! is handed to the chat controller by `Rc`. The history latch is owned by the
//! session so a new login always re-enables hydration.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use crate::net::types::SessionUser;
use crate::util::persistence;

pub const TOKEN_STORAGE_KEY: &str = "jwt";
pub const USER_STORAGE_KEY: &str = "user";

/// One-shot flag recording that server history has been applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HistoryLatch {
    loaded: bool,
}

impl HistoryLatch {
    #[must_use]
    pub fn is_set(self) -> bool {
        self.loaded
    }

    pub fn set(&mut self) {
        self.loaded = true;
    }

    pub fn reset(&mut self) {
        self.loaded = false;
    }
}

/// Authentication state tracking the bearer token and current user.
#[derive(Clone, Debug, Default)]
pub struct AuthSession {
    token: Option<String>,
    user: Option<SessionUser>,
    pub history: HistoryLatch,
}

impl AuthSession {
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Build a session from known credentials without touching storage.
    #[must_use]
    pub fn with_token(token: impl Into<String>, user: Option<SessionUser>) -> Self {
        let token = token.into();
        let token = (!token.trim().is_empty()).then_some(token);
        Self { token, user, history: HistoryLatch::default() }
    }

    /// Restore the session the login form persisted, if any.
    #[must_use]
    pub fn restore() -> Self {
        match persistence::load_string(TOKEN_STORAGE_KEY) {
            Some(token) => {
                let user = persistence::load_json::<SessionUser>(USER_STORAGE_KEY);
                log::debug!("restored session for {:?}", user.as_ref().map(|u| u.email.as_str()));
                Self::with_token(token, user)
            }
            None => Self::anonymous(),
        }
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    #[must_use]
    pub fn user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Adopt new credentials, persist them and re-arm history hydration.
    pub fn sign_in(&mut self, token: impl Into<String>, user: Option<SessionUser>) {
        let fresh = Self::with_token(token, user);
        if let Some(token) = fresh.token() {
            persistence::save_string(TOKEN_STORAGE_KEY, token);
        }
        if let Some(user) = fresh.user() {
            persistence::save_json(USER_STORAGE_KEY, user);
        }
        *self = fresh;
    }

    /// Drop credentials from memory and storage and reset the latch.
    pub fn sign_out(&mut self) {
        persistence::remove(TOKEN_STORAGE_KEY);
        persistence::remove(USER_STORAGE_KEY);
        self.token = None;
        self.user = None;
        self.history.reset();
    }
}
