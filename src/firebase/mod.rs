//! Firebase REST adapters for the identity-provider and document-store seams.
//!
//! DESIGN
//! ======
//! Thin `reqwest` wrappers around the Identity Toolkit and Firestore REST
//! APIs. Response parsing is split into pure functions for testability. The
//! Firestore store authenticates with whatever id token the auth adapter
//! currently holds, through the [`TokenSource`] seam.

pub mod auth;
pub mod firestore;

use std::time::Duration;

pub use auth::FirebaseAuth;
pub use firestore::FirestoreStore;

use crate::config::HttpTimeouts;

/// Supplies the bearer token for authenticated store reads.
pub trait TokenSource: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

fn build_http(timeouts: HttpTimeouts) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeouts.request_secs))
        .connect_timeout(Duration::from_secs(timeouts.connect_secs))
        .build()
}
