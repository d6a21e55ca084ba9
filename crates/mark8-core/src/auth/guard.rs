//! Route access rules for storefront navigation.
//!
//! Signed-out visitors are sent to the login page; signed-in users are kept
//! away from the login and registration pages.

use super::storage::CookieTokens;

/// Paths reachable without a session.
const PUBLIC_PATHS: &[&str] = &["/login", "/register"];

/// Paths the guard never inspects (API proxies, static assets).
const UNGUARDED_PREFIXES: &[&str] = &["/api", "/_next/static", "/_next/image", "/favicon.ico"];

pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    RedirectToLogin,
    RedirectHome,
}

impl RouteDecision {
    /// Redirect target, if any.
    pub fn location(&self) -> Option<&'static str> {
        match self {
            RouteDecision::Allow => None,
            RouteDecision::RedirectToLogin => Some(LOGIN_PATH),
            RouteDecision::RedirectHome => Some(HOME_PATH),
        }
    }
}

pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.iter().any(|p| path.starts_with(p))
}

fn is_unguarded(path: &str) -> bool {
    UNGUARDED_PREFIXES.iter().any(|p| path.starts_with(p))
}

/// Decide whether `path` may be visited with the given cookie tokens.
///
/// Either token alone is enough to reach protected pages, since an expired
/// access token can still be renewed with the refresh token.
pub fn route_access(path: &str, tokens: &CookieTokens) -> RouteDecision {
    if is_unguarded(path) {
        return RouteDecision::Allow;
    }

    let has_access = tokens.access_token.is_some();
    let has_refresh = tokens.refresh_token.is_some();
    let public = is_public_path(path);

    if !has_access && !has_refresh && !public {
        RouteDecision::RedirectToLogin
    } else if has_access && has_refresh && public {
        RouteDecision::RedirectHome
    } else {
        RouteDecision::Allow
    }
}
