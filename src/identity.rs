//! Identity-provider seam: the authenticated principal, the provider trait,
//! and the change-notification subscription.
//!
//! SYSTEM CONTEXT
//! ==============
//! The session store subscribes once and treats the event stream as the only
//! source of truth for who is signed in. Providers fan events out through
//! [`EventHub`] so every subscriber sees the current identity first and then
//! every later change in order.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

// =============================================================================
// IDENTITY
// =============================================================================

/// An authenticated session principal issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Provider-assigned unique user id.
    pub uid: String,
    pub email: String,
    /// Session token for authenticated calls to other backend services.
    #[serde(skip_serializing, default)]
    pub id_token: Option<String>,
}

impl Identity {
    #[must_use]
    pub fn new(uid: impl Into<String>, email: impl Into<String>) -> Self {
        Self { uid: uid.into(), email: email.into(), id_token: None }
    }
}

/// One change notification: the identity now in effect, or `None` once
/// signed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEvent {
    pub identity: Option<Identity>,
}

// =============================================================================
// ERROR
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// The provider refused the email/password pair.
    #[error("sign-in rejected: {}", .message.as_deref().unwrap_or("no reason given"))]
    InvalidCredentials { message: Option<String> },

    /// The provider could not be reached or answered with garbage.
    #[error("identity provider request failed: {0}")]
    Transport(String),
}

impl IdentityError {
    /// Human-readable reason, if the provider supplied one.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::InvalidCredentials { message } => message.as_deref(),
            Self::Transport(msg) => Some(msg),
        }
    }
}

// =============================================================================
// PROVIDER TRAIT
// =============================================================================

/// Remote identity provider. Enables mocking in tests.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Open a change-notification stream. The first event carries the
    /// current identity (or its absence).
    fn subscribe(&self) -> Subscription;

    /// Authenticate an email/password pair.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError`] when the credentials are refused or the
    /// provider is unreachable.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityError>;

    /// End the current session.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::Transport`] when the provider cannot be reached.
    async fn sign_out(&self) -> Result<(), IdentityError>;
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// Receiving end of a provider's change stream. Dropping it (or calling
/// [`Subscription::unsubscribe`]) stops delivery.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<AuthEvent>,
}

impl Subscription {
    /// Next event, or `None` once the provider has gone away.
    pub async fn recv(&mut self) -> Option<AuthEvent> {
        self.rx.recv().await
    }

    pub fn unsubscribe(mut self) {
        self.rx.close();
    }
}

/// Subscriber fan-out shared by provider implementations.
#[derive(Clone, Default)]
pub struct EventHub {
    inner: Arc<Mutex<HubInner>>,
}

#[derive(Default)]
struct HubInner {
    current: Option<Identity>,
    subscribers: Vec<mpsc::UnboundedSender<AuthEvent>>,
}

impl EventHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber, seeded with the current identity.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        // Receiver is alive in this scope, so the seed cannot fail.
        let _ = tx.send(AuthEvent { identity: inner.current.clone() });
        inner.subscribers.push(tx);
        Subscription { rx }
    }

    /// Replace the current identity and notify every live subscriber.
    pub fn publish(&self, identity: Option<Identity>) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.current.clone_from(&identity);
        inner
            .subscribers
            .retain(|tx| tx.send(AuthEvent { identity: identity.clone() }).is_ok());
    }

    #[must_use]
    pub fn current(&self) -> Option<Identity> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .current
            .clone()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.subscribers.retain(|tx| !tx.is_closed());
        inner.subscribers.len()
    }
}

#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;
