//! Route guard: which screen the current session may see.
//!
//! SYSTEM CONTEXT
//! ==============
//! The presentation layer re-evaluates [`decide`] whenever the session
//! snapshot or the location changes, then either renders the returned view
//! or replaces the location with the redirect target. Decisions are advisory;
//! the backend enforces access on its own.

use serde::Serialize;

use crate::session::{SessionPhase, SessionSnapshot};

pub const LOGIN_PATH: &str = "/login";
pub const ADMIN_PREFIX: &str = "/admin";
pub const ADMIN_HOME: &str = "/admin/dashboard";
pub const USER_HOME: &str = "/bookings";

/// Screens the guard can authorize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Loading,
    Login,
    AdminDashboard,
    Bookings,
    ApprovedVisas,
    DeletedVisas,
    Countries,
    Search,
    Reports,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteDecision {
    Render(View),
    /// Replace the current location with this path.
    Redirect(&'static str),
}

const ADMIN_ROUTES: &[(&str, View)] = &[(ADMIN_HOME, View::AdminDashboard)];

const USER_ROUTES: &[(&str, View)] = &[
    (USER_HOME, View::Bookings),
    ("/approved-visas", View::ApprovedVisas),
    ("/deleted-visas", View::DeletedVisas),
    ("/countries", View::Countries),
    ("/search", View::Search),
    ("/reports", View::Reports),
];

/// Decide what to show for `requested_path` given the session `snapshot`.
///
/// A user whose role is still being looked up is treated as a regular user.
#[must_use]
pub fn decide(snapshot: &SessionSnapshot, requested_path: &str) -> RouteDecision {
    if snapshot.phase == SessionPhase::Initializing {
        return RouteDecision::Render(View::Loading);
    }

    let path = normalize_path(requested_path);

    if !snapshot.is_authenticated() {
        return if path == LOGIN_PATH {
            RouteDecision::Render(View::Login)
        } else {
            RouteDecision::Redirect(LOGIN_PATH)
        };
    }

    if snapshot.is_admin() {
        if !path.starts_with(ADMIN_PREFIX) {
            return RouteDecision::Redirect(ADMIN_HOME);
        }
        return lookup(ADMIN_ROUTES, path).map_or(RouteDecision::Redirect(ADMIN_HOME), RouteDecision::Render);
    }

    lookup(USER_ROUTES, path).map_or(RouteDecision::Redirect(USER_HOME), RouteDecision::Render)
}

fn lookup(routes: &[(&str, View)], path: &str) -> Option<View> {
    routes
        .iter()
        .find(|(route, _)| *route == path)
        .map(|&(_, view)| view)
}

/// Drop query string, fragment, and trailing slash.
fn normalize_path(raw: &str) -> &str {
    let end = raw.find(['?', '#']).unwrap_or(raw.len());
    let path = raw[..end].trim_end_matches('/');
    if path.is_empty() { "/" } else { path }
}

#[cfg(test)]
#[path = "route_test.rs"]
mod tests;
