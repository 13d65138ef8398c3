use serde::{Deserialize, Serialize};

pub const DASHBOARD_ROUTE: &str = "/dashboard";
pub const LOGIN_ROUTE: &str = "/dashboard/login";
pub const REGISTER_ROUTE: &str = "/dashboard/register";
pub const REGISTERED_ROUTE: &str = "/dashboard/login?registered=success";

/// Key the bearer token is persisted under.
pub const AUTH_TOKEN_KEY: &str = "auth_token";

/// Outcome of a navigation check or a session transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Navigation {
    Proceed,
    Redirect(String),
}

impl Navigation {
    pub fn redirect(route: &str) -> Self {
        Navigation::Redirect(route.to_string())
    }

    pub fn target(&self) -> Option<&str> {
        match self {
            Navigation::Proceed => None,
            Navigation::Redirect(route) => Some(route),
        }
    }
}

/// Classification of a route for the session gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// Login and registration pages. Never redirected.
    Entry,
    /// Anything else under `/dashboard`.
    Protected,
    /// Marketing pages and the call simulator.
    Public,
}

impl RouteKind {
    pub fn classify(path: &str) -> Self {
        let route = path.split(['?', '#']).next().unwrap_or(path);
        let route = match route.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };

        if route == LOGIN_ROUTE || route == REGISTER_ROUTE {
            RouteKind::Entry
        } else if route == DASHBOARD_ROUTE || route.starts_with("/dashboard/") {
            RouteKind::Protected
        } else {
            RouteKind::Public
        }
    }
}
