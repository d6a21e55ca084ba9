//! Access-token refresh with single-flight semantics.
//!
//! When several requests are rejected at the same time, only the first one
//! starts a refresh; the rest attach to the same in-flight future and receive
//! its outcome. Once that future resolves the coordinator is idle again.

use std::sync::{Arc, Mutex, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::credentials::{CredentialStore, TokenPair};

/// Header carrying the refresh token on the renewal endpoint.
const REFRESH_TOKEN_HEADER: &str = "refresh-token";

/// Path of the token renewal endpoint.
pub const REFRESH_PATH: &str = "/auth/get-new-access-token";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    #[error("No refresh token available")]
    MissingRefreshToken,

    #[error("Refresh token rejected (status {0})")]
    Rejected(u16),

    #[error("Invalid refresh response: {0}")]
    InvalidResponse(String),

    #[error("Network error during refresh: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    data: TokenPair,
}

type RefreshFuture = Shared<BoxFuture<'static, Result<String, RefreshError>>>;

pub struct RefreshCoordinator {
    client: Client,
    url: String,
    store: Arc<CredentialStore>,
    in_flight: Mutex<Option<RefreshFuture>>,
}

impl RefreshCoordinator {
    pub fn new(client: Client, base_url: &str, store: Arc<CredentialStore>) -> Self {
        Self {
            client,
            url: format!("{}{}", base_url.trim_end_matches('/'), REFRESH_PATH),
            store,
            in_flight: Mutex::new(None),
        }
    }

    pub fn state(&self) -> RefreshState {
        let slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(fut) if fut.peek().is_none() => RefreshState::Refreshing,
            _ => RefreshState::Idle,
        }
    }

    /// Obtain a usable access token after `stale_token` was rejected.
    ///
    /// Joins a refresh that is already running. If the store already holds a
    /// different access token (another caller refreshed or a new login
    /// happened), that token is returned without a network call.
    ///
    /// On failure the credential store has been cleared before this returns.
    pub async fn refresh(&self, stale_token: Option<&str>) -> Result<String, RefreshError> {
        let fut = {
            let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(fut) if fut.peek().is_none() => {
                    debug!("Joining in-flight token refresh");
                    fut.clone()
                }
                _ => {
                    if let Some(current) = self.store.access_token() {
                        if stale_token != Some(current.as_str()) {
                            debug!("Access token already renewed, skipping refresh");
                            return Ok(current);
                        }
                    }
                    let fut = Self::exchange(
                        self.client.clone(),
                        self.url.clone(),
                        Arc::clone(&self.store),
                    )
                    .boxed()
                    .shared();
                    *slot = Some(fut.clone());
                    fut
                }
            }
        };

        let outcome = fut.await;

        let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|f| f.peek().is_some()) {
            *slot = None;
        }
        outcome
    }

    async fn exchange(
        client: Client,
        url: String,
        store: Arc<CredentialStore>,
    ) -> Result<String, RefreshError> {
        match Self::request_tokens(&client, &url, store.refresh_token()).await {
            Ok(tokens) => {
                let access = tokens.access_token.clone();
                if let Err(e) = store.set_tokens(tokens.access_token, tokens.refresh_token) {
                    warn!(error = %e, "Refreshed tokens could not be persisted");
                }
                info!("Access token refreshed");
                Ok(access)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, ending session");
                if let Err(clear_err) = store.logout() {
                    warn!(error = %clear_err, "Failed to clear session after refresh failure");
                }
                Err(e)
            }
        }
    }

    async fn request_tokens(
        client: &Client,
        url: &str,
        refresh_token: Option<String>,
    ) -> Result<TokenPair, RefreshError> {
        let refresh_token = refresh_token.ok_or(RefreshError::MissingRefreshToken)?;

        let response = client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(REFRESH_TOKEN_HEADER, refresh_token)
            .send()
            .await
            .map_err(|e| RefreshError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefreshError::Rejected(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| RefreshError::Network(e.to_string()))?;
        let parsed: RefreshResponse = serde_json::from_str(&body)
            .map_err(|e| RefreshError::InvalidResponse(e.to_string()))?;

        if parsed.data.access_token.is_empty() || parsed.data.refresh_token.is_empty() {
            return Err(RefreshError::InvalidResponse("empty token in response".to_string()));
        }
        Ok(parsed.data)
    }
}
