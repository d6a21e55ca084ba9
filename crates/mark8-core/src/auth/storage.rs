//! Durable homes for the session tokens.
//!
//! Two sinks are kept in step by the [`CredentialStore`](super::CredentialStore):
//! - [`SessionFile`]: JSON snapshot of the full credentials (tokens + user)
//! - [`CookieJar`]: per-token entries with their own expiry, read by code
//!   that only needs the raw tokens (e.g. the route guard)
//!
//! [`KeyringVault`] is an optional third copy in the OS keychain. It never
//! replaces either of the two above.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::credentials::{Credentials, TokenPair, User};

/// Snapshot file name in the data directory
const SESSION_FILE: &str = "auth-storage.json";

/// Cookie jar file name in the data directory
const COOKIE_FILE: &str = "cookies.json";

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Access token cookie lifetime in days.
const ACCESS_COOKIE_DAYS: i64 = 1;

/// Refresh token cookie lifetime in days.
const REFRESH_COOKIE_DAYS: i64 = 7;

const KEYRING_SERVICE: &str = "mark8";

/// A place the credential store writes through to.
pub trait TokenSink: Send + Sync {
    fn name(&self) -> &'static str;

    /// Previously persisted credentials, if a complete pair is available.
    fn load(&self) -> Result<Option<Credentials>>;

    fn store(&self, credentials: &Credentials) -> Result<()>;

    /// Remove every persisted copy. Must succeed when nothing is stored.
    fn clear(&self) -> Result<()>;
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, contents)
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}

// ============================================================================
// Session snapshot
// ============================================================================

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionSnapshot {
    access_token: Option<String>,
    refresh_token: Option<String>,
    user: Option<User>,
    #[serde(default)]
    saved_at: Option<DateTime<Utc>>,
}

impl SessionSnapshot {
    fn from_credentials(credentials: &Credentials) -> Self {
        Self {
            access_token: credentials.access_token().map(str::to_owned),
            refresh_token: credentials.refresh_token().map(str::to_owned),
            user: credentials.user().cloned(),
            saved_at: Some(Utc::now()),
        }
    }

    /// Half a token pair is treated as no session at all.
    fn into_credentials(self) -> Option<Credentials> {
        match (self.access_token, self.refresh_token) {
            (Some(access), Some(refresh)) if !access.is_empty() && !refresh.is_empty() => {
                Some(Credentials::new(Some(TokenPair::new(access, refresh)), self.user))
            }
            (None, None) => None,
            _ => {
                warn!("Discarding session snapshot with an incomplete token pair");
                None
            }
        }
    }
}

/// JSON snapshot of the whole session.
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(SESSION_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenSink for SessionFile {
    fn name(&self) -> &'static str {
        "session-file"
    }

    fn load(&self) -> Result<Option<Credentials>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents =
            std::fs::read_to_string(&self.path).context("Failed to read session file")?;
        let snapshot: SessionSnapshot =
            serde_json::from_str(&contents).context("Failed to parse session file")?;
        Ok(snapshot.into_credentials())
    }

    fn store(&self, credentials: &Credentials) -> Result<()> {
        if !credentials.is_authenticated() {
            return self.clear();
        }
        let contents = serde_json::to_string_pretty(&SessionSnapshot::from_credentials(credentials))?;
        write_atomic(&self.path, &contents)
    }

    fn clear(&self) -> Result<()> {
        remove_if_exists(&self.path)
    }
}

// ============================================================================
// Cookie jar
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Cookie {
    value: String,
    expires_at: DateTime<Utc>,
}

impl Cookie {
    fn new(value: &str, days: i64) -> Self {
        Self {
            value: value.to_string(),
            expires_at: Utc::now() + Duration::days(days),
        }
    }

    fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.value.is_empty() && self.expires_at > now
    }
}

/// Tokens as seen through cookies, where each may have expired on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// Per-token cookies with independent expiry.
pub struct CookieJar {
    path: PathBuf,
}

impl CookieJar {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(COOKIE_FILE),
        }
    }

    fn read(&self) -> Result<BTreeMap<String, Cookie>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&self.path).context("Failed to read cookie jar")?;
        serde_json::from_str(&contents).context("Failed to parse cookie jar")
    }

    /// Get a cookie value, skipping expired entries.
    pub fn get(&self, name: &str) -> Result<Option<String>> {
        let now = Utc::now();
        Ok(self
            .read()?
            .remove(name)
            .filter(|c| c.is_live(now))
            .map(|c| c.value))
    }

    pub fn tokens(&self) -> Result<CookieTokens> {
        Ok(CookieTokens {
            access_token: self.get(ACCESS_TOKEN_COOKIE)?,
            refresh_token: self.get(REFRESH_TOKEN_COOKIE)?,
        })
    }

    fn set_tokens(&self, tokens: &TokenPair) -> Result<()> {
        let mut jar = self.read().unwrap_or_else(|e| {
            debug!(error = %e, "Starting a fresh cookie jar");
            BTreeMap::new()
        });
        let now = Utc::now();
        let access = Self::stamp(
            &mut jar,
            ACCESS_TOKEN_COOKIE,
            &tokens.access_token,
            ACCESS_COOKIE_DAYS,
            now,
        );
        let refresh = Self::stamp(
            &mut jar,
            REFRESH_TOKEN_COOKIE,
            &tokens.refresh_token,
            REFRESH_COOKIE_DAYS,
            now,
        );
        if !access && !refresh {
            return Ok(());
        }
        write_atomic(&self.path, &serde_json::to_string_pretty(&jar)?)
    }

    /// Issue a cookie unless a live one already holds `value`. The expiry
    /// only moves when the token itself changes.
    fn stamp(
        jar: &mut BTreeMap<String, Cookie>,
        name: &str,
        value: &str,
        days: i64,
        now: DateTime<Utc>,
    ) -> bool {
        if jar.get(name).is_some_and(|c| c.value == value && c.is_live(now)) {
            return false;
        }
        jar.insert(name.to_string(), Cookie::new(value, days));
        true
    }
}

impl TokenSink for CookieJar {
    fn name(&self) -> &'static str {
        "cookie-jar"
    }

    fn load(&self) -> Result<Option<Credentials>> {
        let tokens = self.tokens()?;
        Ok(match (tokens.access_token, tokens.refresh_token) {
            (Some(access), Some(refresh)) => {
                Some(Credentials::new(Some(TokenPair::new(access, refresh)), None))
            }
            _ => None,
        })
    }

    fn store(&self, credentials: &Credentials) -> Result<()> {
        match credentials.tokens() {
            Some(tokens) => self.set_tokens(tokens),
            None => self.clear(),
        }
    }

    fn clear(&self) -> Result<()> {
        remove_if_exists(&self.path)
    }
}

// ============================================================================
// OS keychain
// ============================================================================

/// Token pair stored as a JSON secret in the OS keychain.
pub struct KeyringVault {
    account: String,
}

impl KeyringVault {
    pub fn new(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(KEYRING_SERVICE, &self.account).context("Failed to create keyring entry")
    }
}

impl TokenSink for KeyringVault {
    fn name(&self) -> &'static str {
        "keyring"
    }

    fn load(&self) -> Result<Option<Credentials>> {
        match self.entry()?.get_password() {
            Ok(secret) => {
                let tokens: TokenPair =
                    serde_json::from_str(&secret).context("Failed to parse keychain secret")?;
                Ok(Some(Credentials::new(Some(tokens), None)))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read tokens from keychain"),
        }
    }

    fn store(&self, credentials: &Credentials) -> Result<()> {
        match credentials.tokens() {
            Some(tokens) => self
                .entry()?
                .set_password(&serde_json::to_string(tokens)?)
                .context("Failed to store tokens in keychain"),
            None => self.clear(),
        }
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete tokens from keychain"),
        }
    }
}
