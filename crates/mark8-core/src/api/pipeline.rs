//! Authenticated request pipeline.
//!
//! Every call goes out with the current bearer token. A 401 triggers one
//! refresh through the [`RefreshCoordinator`] and one replay of the request;
//! the `retried` flag travels with the [`PendingRequest`] so a second 401 is
//! returned to the caller instead of starting another refresh.

use std::sync::Arc;

use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::{CredentialStore, RefreshCoordinator};

use super::{ApiError, ApiResult};

/// An outbound call plus its retry flag.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    method: Method,
    path: String,
    query: Vec<(&'static str, String)>,
    body: Option<Value>,
    retried: bool,
}

impl PendingRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn with_query(mut self, params: Vec<(&'static str, String)>) -> Self {
        self.query = params;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_retried(&self) -> bool {
        self.retried
    }

    fn build(&self, client: &Client, base_url: &str, token: Option<&str>) -> RequestBuilder {
        let url = format!("{}{}", base_url, self.path);
        let mut builder = client
            .request(self.method.clone(), url)
            .header(header::ACCEPT, "application/json");
        if !self.query.is_empty() {
            builder = builder.query(&self.query);
        }
        if let Some(ref body) = self.body {
            // .json() also sets Content-Type: application/json
            builder = builder.json(body);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        builder
    }
}

pub struct RequestPipeline {
    client: Client,
    base_url: String,
    store: Arc<CredentialStore>,
    refresher: RefreshCoordinator,
}

impl RequestPipeline {
    pub fn new(client: Client, base_url: &str, store: Arc<CredentialStore>) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let refresher = RefreshCoordinator::new(client.clone(), &base_url, Arc::clone(&store));
        Self {
            client,
            base_url,
            store,
            refresher,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn refresher(&self) -> &RefreshCoordinator {
        &self.refresher
    }

    /// Send `request` with authorization and the refresh-once protocol.
    ///
    /// `token_override` replaces the stored access token on the first attempt
    /// only; a replay after refresh always uses the renewed token.
    pub async fn execute(
        &self,
        mut request: PendingRequest,
        token_override: Option<&str>,
    ) -> ApiResult<Response> {
        let mut token = token_override
            .map(str::to_owned)
            .or_else(|| self.store.access_token());
        let mut token_from_store = token_override.is_none();

        loop {
            let response = request
                .build(&self.client, &self.base_url, token.as_deref())
                .send()
                .await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }

            if status == StatusCode::UNAUTHORIZED && !request.retried {
                request.retried = true;
                debug!(path = %request.path, "Access token rejected, refreshing");
                // A rejected override says nothing about the stored token
                let stale = if token_from_store {
                    token.clone()
                } else {
                    self.store.access_token()
                };
                match self.refresher.refresh(stale.as_deref()).await {
                    Ok(fresh) => {
                        token = Some(fresh);
                        token_from_store = true;
                        continue;
                    }
                    Err(e) => {
                        warn!(path = %request.path, error = %e, "Session could not be renewed");
                        return Err(ApiError::Unauthorized);
                    }
                }
            }

            let body = response.text().await.unwrap_or_default();
            if status == StatusCode::UNAUTHORIZED {
                warn!(path = %request.path, "Request rejected again after token refresh");
            }
            return Err(ApiError::from_status(status, &body));
        }
    }

    /// Send without credentials or refresh handling (login, signup).
    pub async fn execute_public(&self, request: PendingRequest) -> ApiResult<Response> {
        let response = request.build(&self.client, &self.base_url, None).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }
}
