//! Session credentials and the process-wide store that owns them.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::storage::TokenSink;

/// Identity of the signed-in user, as returned by login/signup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Access and refresh token, always held together.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

// Tokens must never end up in logs.
impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Result of a successful login or signup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub tokens: TokenPair,
    pub user: User,
}

/// Snapshot of the current session.
///
/// The token pair is a single `Option`, so a reader can never see an access
/// token without its refresh token. `user` is only kept while tokens exist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    tokens: Option<TokenPair>,
    user: Option<User>,
}

impl Credentials {
    pub fn new(tokens: Option<TokenPair>, user: Option<User>) -> Self {
        // A user without tokens is not a session.
        let user = if tokens.is_some() { user } else { None };
        Self { tokens, user }
    }

    pub fn tokens(&self) -> Option<&TokenPair> {
        self.tokens.as_ref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.tokens.as_ref().map(|t| t.access_token.as_str())
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.tokens.as_ref().map(|t| t.refresh_token.as_str())
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.tokens.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_none() && self.user.is_none()
    }
}

/// Single source of truth for the session's tokens and identity.
///
/// Every mutation is published to subscribers and written through to all
/// configured [`TokenSink`]s before the call returns.
pub struct CredentialStore {
    state: watch::Sender<Credentials>,
    sinks: Vec<Box<dyn TokenSink>>,
    // Serializes sink writes so the last snapshot written is the latest one.
    persist_lock: Mutex<()>,
}

impl CredentialStore {
    /// Store with no durable backing, useful for tests and one-shot calls.
    pub fn in_memory() -> Self {
        Self::with_state(Credentials::default(), Vec::new())
    }

    /// Open a store backed by `sinks`, restoring the first snapshot found.
    pub fn open(sinks: Vec<Box<dyn TokenSink>>) -> Self {
        let mut restored = Credentials::default();
        for sink in &sinks {
            match sink.load() {
                Ok(Some(credentials)) => {
                    debug!(sink = sink.name(), "Restored session");
                    restored = credentials;
                    break;
                }
                Ok(None) => {}
                Err(e) => warn!(sink = sink.name(), error = %e, "Failed to restore session"),
            }
        }
        Self::with_state(restored, sinks)
    }

    fn with_state(initial: Credentials, sinks: Vec<Box<dyn TokenSink>>) -> Self {
        let (state, _) = watch::channel(initial);
        Self {
            state,
            sinks,
            persist_lock: Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> Credentials {
        self.state.borrow().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.borrow().access_token().map(str::to_owned)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.state.borrow().refresh_token().map(str::to_owned)
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Receiver that observes every change to the credentials.
    pub fn subscribe(&self) -> watch::Receiver<Credentials> {
        self.state.subscribe()
    }

    /// Replace both tokens at once and persist them.
    pub fn set_tokens(
        &self,
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Result<()> {
        let tokens = TokenPair::new(access_token, refresh_token);
        self.state.send_modify(|c| c.tokens = Some(tokens));
        self.persist()
    }

    /// Replace the cached identity. Ignored while signed out.
    pub fn set_user(&self, user: User) -> Result<()> {
        let mut accepted = false;
        self.state.send_if_modified(|c| {
            if c.tokens.is_none() {
                return false;
            }
            accepted = true;
            if c.user.as_ref() == Some(&user) {
                return false;
            }
            c.user = Some(user);
            true
        });

        if !accepted {
            warn!("Ignoring user update without an active session");
            return Ok(());
        }
        self.persist()
    }

    /// Install a freshly authenticated session.
    pub fn login(&self, session: AuthSession) -> Result<()> {
        info!(user_id = %session.user.id, "Session started");
        self.state
            .send_replace(Credentials::new(Some(session.tokens), Some(session.user)));
        self.persist()
    }

    /// Clear tokens and identity and remove every persisted copy.
    pub fn logout(&self) -> Result<()> {
        let changed = self.state.send_if_modified(|c| {
            if c.is_empty() {
                return false;
            }
            *c = Credentials::default();
            true
        });
        if changed {
            info!("Session cleared");
        }

        let _guard = self.persist_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut failures = Vec::new();
        for sink in &self.sinks {
            if let Err(e) = sink.clear() {
                warn!(sink = sink.name(), error = %e, "Failed to clear persisted session");
                failures.push(format!("{}: {}", sink.name(), e));
            }
        }
        Self::summarize(failures)
    }

    fn persist(&self) -> Result<()> {
        let _guard = self.persist_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let snapshot = self.snapshot();
        let mut failures = Vec::new();
        for sink in &self.sinks {
            if let Err(e) = sink.store(&snapshot) {
                warn!(sink = sink.name(), error = %e, "Failed to persist session");
                failures.push(format!("{}: {}", sink.name(), e));
            }
        }
        Self::summarize(failures)
    }

    fn summarize(failures: Vec<String>) -> Result<()> {
        if failures.is_empty() {
            Ok(())
        } else {
            Err(anyhow!("Session storage failed ({})", failures.join("; ")))
        }
    }
}
