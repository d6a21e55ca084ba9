//! API client for the mark8 marketplace REST API.
//!
//! `ApiClient` is a cheap handle over a shared [`RequestPipeline`]; every
//! data call goes through the pipeline so expired access tokens are renewed
//! transparently.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, info};

use crate::auth::{AuthSession, CredentialStore, LoginRequest, SignupRequest, TokenPair, User};
use crate::models::{Envelope, Product, ProductPage, ProductQuery, Store, StoreList, StoreQuery};

use super::pipeline::{PendingRequest, RequestPipeline};
use super::{ApiError, ApiResult};

// ============================================================================
// Constants
// ============================================================================

/// Production API base URL
pub const DEFAULT_API_URL: &str = "https://api.mark8.awesomity.rw";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// `data` of a login or signup response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    id: String,
    email: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
}

impl AuthResponse {
    fn into_session(self) -> ApiResult<AuthSession> {
        match (self.access_token, self.refresh_token) {
            (Some(access), Some(refresh)) if !access.is_empty() && !refresh.is_empty() => {
                Ok(AuthSession {
                    tokens: TokenPair::new(access, refresh),
                    user: User {
                        id: self.id,
                        email: self.email,
                        first_name: self.first_name,
                        last_name: self.last_name,
                    },
                })
            }
            _ => Err(ApiError::InvalidResponse(
                "authentication response did not include a token pair".to_string(),
            )),
        }
    }
}

/// API client for the marketplace.
/// Clone is cheap - the pipeline and reqwest::Client are shared.
#[derive(Clone)]
pub struct ApiClient {
    pipeline: Arc<RequestPipeline>,
    token_override: Option<Arc<str>>,
}

impl ApiClient {
    /// Create a new API client bound to `store`
    pub fn new(base_url: &str, store: Arc<CredentialStore>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            pipeline: Arc::new(RequestPipeline::new(client, base_url, store)),
            token_override: None,
        })
    }

    /// Handle that sends `token` instead of the stored access token on the
    /// first attempt, sharing the connection pool and session.
    pub fn with_token(&self, token: impl Into<Arc<str>>) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
            token_override: Some(token.into()),
        }
    }

    pub fn base_url(&self) -> &str {
        self.pipeline.base_url()
    }

    pub fn credentials(&self) -> &Arc<CredentialStore> {
        self.pipeline.store()
    }

    pub fn pipeline(&self) -> &RequestPipeline {
        &self.pipeline
    }

    async fn parse<T: DeserializeOwned>(response: Response, what: &str) -> ApiResult<T> {
        let text = response.text().await?;
        let envelope: Envelope<T> = serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", what, e)))?;
        if let Some(ref message) = envelope.message {
            debug!(what, message = %message, "API response");
        }
        Ok(envelope.data)
    }

    /// GET through the authenticated pipeline and unwrap `data`.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(&'static str, String)>,
    ) -> ApiResult<T> {
        let request = PendingRequest::get(path).with_query(query);
        let response = self
            .pipeline
            .execute(request, self.token_override.as_deref())
            .await?;
        Self::parse(response, path).await
    }

    /// POST a JSON body through the authenticated pipeline and unwrap `data`.
    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> ApiResult<T> {
        let request = PendingRequest::post(path, body);
        let response = self
            .pipeline
            .execute(request, self.token_override.as_deref())
            .await?;
        Self::parse(response, path).await
    }

    // ===== Authentication =====

    async fn authenticate(&self, path: &str, body: serde_json::Value) -> ApiResult<User> {
        let response = self
            .pipeline
            .execute_public(PendingRequest::post(path, body))
            .await?;
        let auth: AuthResponse = Self::parse(response, path).await?;
        let session = auth.into_session()?;
        let user = session.user.clone();

        self.credentials()
            .login(session)
            .map_err(|e| ApiError::InvalidResponse(format!("session could not be saved: {}", e)))?;
        info!(user_id = %user.id, "Authenticated");
        Ok(user)
    }

    /// Log in and install the returned session
    pub async fn login(&self, request: &LoginRequest) -> ApiResult<User> {
        request.validate()?;
        let body = serde_json::to_value(request)
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        self.authenticate("/auth/login", body).await
    }

    /// Register a new account and install the returned session
    pub async fn signup(&self, request: &SignupRequest) -> ApiResult<User> {
        request.validate()?;
        let body = serde_json::to_value(request)
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        self.authenticate("/auth/signup", body).await
    }

    /// End the session locally
    pub fn logout(&self) -> Result<()> {
        self.credentials().logout()
    }

    // ===== Data Fetching Methods =====

    /// Fetch one page of products
    pub async fn fetch_products(&self, query: &ProductQuery) -> ApiResult<ProductPage> {
        self.get("/products", query.to_params()).await
    }

    /// Fetch a single product
    pub async fn fetch_product(&self, id: &str) -> ApiResult<Product> {
        self.get(&format!("/products/{}", id), Vec::new()).await
    }

    /// Fetch stores matching `query`
    pub async fn fetch_stores(&self, query: &StoreQuery) -> ApiResult<Vec<Store>> {
        let list: StoreList = self.get("/store", query.to_params()).await?;
        Ok(list.stores)
    }

    /// Fetch a single store
    pub async fn fetch_store(&self, id: &str) -> ApiResult<Store> {
        self.get(&format!("/store/{}", id), Vec::new()).await
    }
}
