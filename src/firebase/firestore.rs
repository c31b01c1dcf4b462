//! Firestore REST client for role-record lookups.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::FirebaseConfig;
use crate::role::{DocumentStore, RoleRecord, StoreError};

use super::{TokenSource, build_http};

const NOT_FOUND: u16 = 404;

// =============================================================================
// CLIENT
// =============================================================================

pub struct FirestoreStore {
    http: reqwest::Client,
    base_url: reqwest::Url,
    project_id: String,
    tokens: Arc<dyn TokenSource>,
}

impl FirestoreStore {
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the base URL does not parse or
    /// cannot take a path, or if the HTTP client fails to build.
    pub fn new(config: &FirebaseConfig, tokens: Arc<dyn TokenSource>) -> Result<Self, StoreError> {
        let base_url = reqwest::Url::parse(&config.firestore_base_url)
            .map_err(|e| StoreError::Unavailable(format!("invalid Firestore base URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::Unavailable(format!("invalid Firestore base URL: {base_url}")));
        }
        let http = build_http(config.timeouts).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self { http, base_url, project_id: config.project_id.clone(), tokens })
    }

    /// Document resource URL. Each part is pushed as one path segment, so
    /// `/` or spaces in a key are percent-encoded.
    fn document_url(&self, collection: &str, key: &str) -> Result<reqwest::Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| StoreError::Unavailable(format!("invalid Firestore base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(["projects", self.project_id.as_str(), "databases", "(default)", "documents", collection, key]);
        Ok(url)
    }
}

#[async_trait::async_trait]
impl DocumentStore for FirestoreStore {
    async fn get_document(&self, collection: &str, key: &str) -> Result<Option<RoleRecord>, StoreError> {
        let mut request = self.http.get(self.document_url(collection, key)?);
        if let Some(token) = self.tokens.bearer_token() {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        document_response(status, &text)
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(serde::Deserialize)]
struct Document {
    #[serde(default)]
    fields: HashMap<String, FieldValue>,
}

/// Firestore typed value; only strings matter here.
#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldValue {
    string_value: Option<String>,
}

// =============================================================================
// PARSING
// =============================================================================

/// A missing document is not an error; any other non-200 is.
fn document_response(status: u16, body: &str) -> Result<Option<RoleRecord>, StoreError> {
    match status {
        NOT_FOUND => Ok(None),
        200 => parse_document(body).map(Some),
        _ => Err(StoreError::Unavailable(format!("status {status}: {body}"))),
    }
}

fn parse_document(json: &str) -> Result<RoleRecord, StoreError> {
    let doc: Document =
        serde_json::from_str(json).map_err(|e| StoreError::Unavailable(format!("unreadable document: {e}")))?;
    let role = doc
        .fields
        .get("role")
        .and_then(|value| value.string_value.clone());
    Ok(RoleRecord { role })
}

#[cfg(test)]
#[path = "firestore_test.rs"]
mod tests;
