//! Identity Toolkit client: email/password sign-in.
//!
//! Sign-out is local: the held identity is dropped and subscribers are told.

use crate::config::FirebaseConfig;
use crate::identity::{EventHub, Identity, IdentityError, IdentityProvider, Subscription};

use super::{TokenSource, build_http};

// =============================================================================
// CLIENT
// =============================================================================

pub struct FirebaseAuth {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    hub: EventHub,
}

impl FirebaseAuth {
    /// # Errors
    ///
    /// Returns [`IdentityError::Transport`] if the HTTP client fails to build.
    pub fn new(config: &FirebaseConfig) -> Result<Self, IdentityError> {
        let http = build_http(config.timeouts).map_err(|e| IdentityError::Transport(e.to_string()))?;
        Ok(Self { http, api_key: config.api_key.clone(), base_url: config.auth_base_url.clone(), hub: EventHub::new() })
    }

    fn sign_in_url(&self) -> String {
        format!("{}/accounts:signInWithPassword?key={}", self.base_url, self.api_key)
    }

    /// Map a sign-in response to its outcome. Only a 200 signs the session in
    /// and notifies subscribers.
    fn accept_sign_in(&self, status: u16, body: &str) -> Result<Identity, IdentityError> {
        if status != 200 {
            return Err(parse_error(status, body));
        }

        let identity = parse_sign_in(body)?;
        self.hub.publish(Some(identity.clone()));
        Ok(identity)
    }
}

#[async_trait::async_trait]
impl IdentityProvider for FirebaseAuth {
    fn subscribe(&self) -> Subscription {
        self.hub.subscribe()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        let body = SignInRequest { email, password, return_secure_token: true };

        let response = self
            .http
            .post(self.sign_in_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| IdentityError::Transport(e.to_string()))?;

        self.accept_sign_in(status, &text)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        self.hub.publish(None);
        Ok(())
    }
}

impl TokenSource for FirebaseAuth {
    fn bearer_token(&self) -> Option<String> {
        self.hub.current().and_then(|identity| identity.id_token)
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    #[serde(default)]
    email: String,
    id_token: Option<String>,
}

#[derive(serde::Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    message: String,
}

// =============================================================================
// PARSING
// =============================================================================

fn parse_sign_in(json: &str) -> Result<Identity, IdentityError> {
    let resp: SignInResponse =
        serde_json::from_str(json).map_err(|e| IdentityError::Transport(format!("unexpected sign-in response: {e}")))?;
    Ok(Identity { uid: resp.local_id, email: resp.email, id_token: resp.id_token })
}

fn parse_error(status: u16, body: &str) -> IdentityError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => IdentityError::InvalidCredentials { message: describe_error_code(&envelope.error.message) },
        Err(_) => IdentityError::Transport(format!("status {status}")),
    }
}

/// Readable message for an Identity Toolkit error code. Credential mismatches
/// map to `None` so callers show one generic message for all of them.
fn describe_error_code(raw: &str) -> Option<String> {
    let code = raw.split(" : ").next().unwrap_or(raw).trim();
    match code {
        "INVALID_LOGIN_CREDENTIALS" | "INVALID_PASSWORD" | "EMAIL_NOT_FOUND" => None,
        "USER_DISABLED" => Some("this account has been disabled".to_owned()),
        "TOO_MANY_ATTEMPTS_TRY_LATER" => Some("too many failed attempts, try again later".to_owned()),
        "INVALID_EMAIL" => Some("invalid email address".to_owned()),
        "MISSING_PASSWORD" => Some("password is required".to_owned()),
        other => Some(other.to_owned()),
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
