//! Process-wide session state.
//!
//! ARCHITECTURE
//! ============
//! [`SessionStore::start`] subscribes to the identity provider once and
//! spawns a driver task. That task owns a [`SessionMachine`] and is the only
//! writer of the published [`SessionSnapshot`]; everything else reads it
//! through a `watch` channel.
//!
//! Every identity event bumps a generation counter. Role lookups run on their
//! own tasks and report back tagged with the generation they started under,
//! so a lookup that finishes after a newer event is dropped instead of
//! overwriting the newer state. The driver also aborts the outstanding lookup
//! when a new event arrives.
//!
//! Login calls never write the snapshot. A successful sign-in shows up as a
//! provider event like any other change.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::identity::{Identity, IdentityError, IdentityProvider, Subscription};
use crate::rate_limit::{RateLimitError, RateLimiter};
use crate::role::{Role, RoleResolver};

pub const DEFAULT_SIGN_IN_ERROR: &str = "invalid email or password";

// =============================================================================
// ERROR
// =============================================================================

/// User-facing login failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("too many login attempts, please try again in {remaining_minutes} minutes")]
    RateLimitExceeded { remaining_minutes: u64 },

    #[error("{message}")]
    InvalidCredentials { message: String },

    #[error("not authorized as admin")]
    NotAuthorized,

    /// A non-admin was refused but the provider did not end the session, so
    /// it is still signed in.
    #[error("not authorized as admin, and sign-out failed: {message}")]
    SignOutFailed { message: String },
}

impl From<RateLimitError> for AuthError {
    fn from(err: RateLimitError) -> Self {
        match err {
            RateLimitError::Exceeded { remaining_minutes } => Self::RateLimitExceeded { remaining_minutes },
        }
    }
}

impl From<IdentityError> for AuthError {
    fn from(err: IdentityError) -> Self {
        let message = err
            .message()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(DEFAULT_SIGN_IN_ERROR)
            .to_owned();
        Self::InvalidCredentials { message }
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// The provider's first event has not arrived yet.
    #[default]
    Initializing,
    Resolved,
}

/// Immutable view of the session at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub identity: Option<Arc<Identity>>,
    pub phase: SessionPhase,
    pub role: Role,
}

impl SessionSnapshot {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Administrator only once the lookup has confirmed it.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.identity.is_some() && self.role.is_admin()
    }

    /// Label for the navigation bar.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.identity.as_deref().map(|id| id.email.as_str())
    }

    /// Initial event processed and no role lookup pending.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.phase == SessionPhase::Resolved && !matches!(self.role, Role::Unknown | Role::Resolving)
    }
}

// =============================================================================
// STATE MACHINE
// =============================================================================

/// Role lookup requested by an identity event.
#[derive(Debug, Clone)]
pub(crate) struct RoleTicket {
    pub generation: u64,
    pub identity: Arc<Identity>,
}

/// Completed role lookup, tagged with the generation it was issued under.
#[derive(Debug, Clone, Copy)]
struct Resolution {
    generation: u64,
    role: Role,
}

/// Snapshot transitions, free of I/O.
#[derive(Debug, Default)]
pub(crate) struct SessionMachine {
    snapshot: SessionSnapshot,
    generation: u64,
}

impl SessionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &SessionSnapshot {
        &self.snapshot
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Apply one provider event. Returns the lookup to run, if any.
    pub fn apply_event(&mut self, identity: Option<Identity>) -> Option<RoleTicket> {
        self.generation += 1;
        match identity {
            Some(identity) => {
                let identity = Arc::new(identity);
                self.snapshot = SessionSnapshot {
                    identity: Some(Arc::clone(&identity)),
                    phase: SessionPhase::Resolved,
                    role: Role::Resolving,
                };
                Some(RoleTicket { generation: self.generation, identity })
            }
            None => {
                self.snapshot = SessionSnapshot { identity: None, phase: SessionPhase::Resolved, role: Role::Regular };
                None
            }
        }
    }

    /// Apply a finished lookup. Returns `false` when it belongs to a
    /// superseded event and was dropped.
    pub fn apply_resolution(&mut self, generation: u64, role: Role) -> bool {
        if generation != self.generation || self.snapshot.identity.is_none() {
            return false;
        }
        self.snapshot = SessionSnapshot { role, ..self.snapshot.clone() };
        true
    }
}

// =============================================================================
// STORE
// =============================================================================

/// Handle to the session state. Cheap to clone; every clone shares the same
/// subscription and rate-limit window.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    provider: Arc<dyn IdentityProvider>,
    resolver: RoleResolver,
    limiter: RateLimiter,
    snapshot: watch::Receiver<SessionSnapshot>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        let driver = self
            .driver
            .get_mut()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(handle) = driver.take() {
            handle.abort();
        }
    }
}

impl SessionStore {
    /// Subscribe to `provider` and start tracking the session.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn start(provider: Arc<dyn IdentityProvider>, resolver: RoleResolver, limiter: RateLimiter) -> Self {
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::default());
        let events = provider.subscribe();
        let driver = tokio::spawn(drive(events, resolver.clone(), snapshot_tx));

        Self {
            inner: Arc::new(StoreInner {
                provider,
                resolver,
                limiter,
                snapshot: snapshot_rx,
                driver: Mutex::new(Some(driver)),
            }),
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    /// Receiver that is notified on every snapshot replacement.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.snapshot.clone()
    }

    /// Wait until the snapshot is settled. Returns `None` if the store was
    /// torn down first.
    pub async fn settled(&self) -> Option<SessionSnapshot> {
        let mut rx = self.watch();
        rx.wait_for(SessionSnapshot::is_settled)
            .await
            .ok()
            .map(|snapshot| snapshot.clone())
    }

    /// Submit credentials to the identity provider.
    ///
    /// # Errors
    ///
    /// [`AuthError::RateLimitExceeded`] when the login window is full,
    /// [`AuthError::InvalidCredentials`] when the provider refuses.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        self.inner.limiter.check_and_record()?;

        match self.inner.provider.sign_in(email, password).await {
            Ok(identity) => {
                tracing::info!(uid = %identity.uid, "sign-in accepted");
                Ok(identity)
            }
            Err(e) => {
                tracing::info!(error = %e, "sign-in rejected");
                Err(e.into())
            }
        }
    }

    /// Sign in and require administrator privilege. A non-admin session is
    /// signed back out before returning.
    ///
    /// # Errors
    ///
    /// Everything [`SessionStore::login`] returns, plus
    /// [`AuthError::NotAuthorized`] for a non-admin identity, or
    /// [`AuthError::SignOutFailed`] when that identity could not be signed
    /// back out.
    pub async fn login_as_admin(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let identity = self.login(email, password).await?;
        let role = self.inner.resolver.resolve(Some(&identity)).await;
        if role.is_admin() {
            return Ok(identity);
        }

        tracing::warn!(uid = %identity.uid, "admin login refused; signing out");
        if let Err(e) = self.inner.provider.sign_out().await {
            tracing::error!(uid = %identity.uid, error = %e, "sign-out after refused admin login failed");
            return Err(AuthError::SignOutFailed { message: e.to_string() });
        }
        Err(AuthError::NotAuthorized)
    }

    /// Request sign-out. The snapshot changes once the provider's event
    /// arrives.
    pub fn logout(&self) {
        let provider = Arc::clone(&self.inner.provider);
        tokio::spawn(async move {
            if let Err(e) = provider.sign_out().await {
                tracing::warn!(error = %e, "sign-out failed");
            }
        });
    }

    /// Stop listening to the provider. The last snapshot stays readable.
    pub fn teardown(&self) {
        let handle = self
            .inner
            .driver
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
            tracing::debug!("session subscription torn down");
        }
    }

    #[must_use]
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.inner.limiter
    }
}

// =============================================================================
// DRIVER
// =============================================================================

async fn drive(mut events: Subscription, resolver: RoleResolver, snapshot_tx: watch::Sender<SessionSnapshot>) {
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Resolution>();
    let mut machine = SessionMachine::new();
    let mut in_flight: Option<JoinHandle<()>> = None;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    tracing::info!("identity stream closed; session driver stopping");
                    break;
                };
                if let Some(handle) = in_flight.take() {
                    handle.abort();
                }

                let ticket = machine.apply_event(event.identity);
                snapshot_tx.send_replace(machine.snapshot().clone());

                if let Some(ticket) = ticket {
                    tracing::info!(uid = %ticket.identity.uid, generation = ticket.generation, "session identity changed");
                    let resolver = resolver.clone();
                    let done_tx = done_tx.clone();
                    in_flight = Some(tokio::spawn(async move {
                        let role = resolver.resolve(Some(&ticket.identity)).await;
                        let _ = done_tx.send(Resolution { generation: ticket.generation, role });
                    }));
                } else {
                    tracing::info!(generation = machine.generation(), "session cleared");
                }
            }
            Some(resolution) = done_rx.recv() => {
                if machine.apply_resolution(resolution.generation, resolution.role) {
                    tracing::info!(role = ?resolution.role, "role resolved");
                    snapshot_tx.send_replace(machine.snapshot().clone());
                } else {
                    tracing::debug!(
                        stale = resolution.generation,
                        current = machine.generation(),
                        "discarding stale role resolution"
                    );
                }
            }
        }
    }

    if let Some(handle) = in_flight {
        handle.abort();
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
