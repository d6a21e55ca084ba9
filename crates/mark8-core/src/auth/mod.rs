//! Authentication module for the storefront session.
//!
//! This module provides:
//! - `CredentialStore`: the current token pair and user, with subscriptions
//! - `TokenSink` implementations persisting tokens across restarts
//! - `RefreshCoordinator`: single-flight access-token renewal
//! - Route guard and login/signup form validation

pub mod credentials;
pub mod forms;
pub mod guard;
pub mod refresh;
pub mod storage;

pub use credentials::{AuthSession, CredentialStore, Credentials, TokenPair, User};
pub use forms::{FieldError, LoginRequest, SignupRequest};
pub use guard::{route_access, RouteDecision};
pub use refresh::{RefreshCoordinator, RefreshError, RefreshState};
pub use storage::{CookieJar, CookieTokens, KeyringVault, SessionFile, TokenSink};
