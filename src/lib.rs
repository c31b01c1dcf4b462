//! # portal-auth
//!
//! Session, privilege, and route-guard core for the travel portal client.
//!
//! Identity-provider events drive the [`session::SessionStore`], which
//! resolves each identity's [`role::Role`] and publishes a snapshot.
//! [`route::decide`] maps that snapshot plus a requested path to the screen
//! the user may see. Login attempts pass through the
//! [`rate_limit::RateLimiter`] before reaching the provider.

pub mod config;
pub mod firebase;
pub mod identity;
pub mod rate_limit;
pub mod role;
pub mod route;
pub mod session;

#[cfg(test)]
mod test_helpers;

pub use identity::{Identity, IdentityProvider};
pub use role::{Role, RoleResolver};
pub use route::{RouteDecision, View, decide};
pub use session::{AuthError, SessionPhase, SessionSnapshot, SessionStore};
