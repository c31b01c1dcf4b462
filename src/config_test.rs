use std::collections::HashMap;

use super::*;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key| map.get(key).cloned()
}

const REQUIRED: &[(&str, &str)] = &[("FIREBASE_API_KEY", "key-123"), ("FIREBASE_PROJECT_ID", "visa-portal")];

#[test]
fn defaults_when_only_required_set() {
    let cfg = AuthConfig::from_lookup(lookup_from(REQUIRED)).unwrap();

    assert_eq!(cfg.admin_email, None);
    assert_eq!(cfg.rate_limit, RateLimitConfig::default());
    assert_eq!(cfg.firebase.api_key, "key-123");
    assert_eq!(cfg.firebase.project_id, "visa-portal");
    assert_eq!(cfg.firebase.auth_base_url, DEFAULT_FIREBASE_AUTH_BASE_URL);
    assert_eq!(cfg.firebase.firestore_base_url, DEFAULT_FIRESTORE_BASE_URL);
    assert_eq!(
        cfg.firebase.timeouts,
        HttpTimeouts { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    );
}

#[test]
fn parses_overrides() {
    let mut pairs = REQUIRED.to_vec();
    pairs.extend([
        ("ADMIN_EMAIL", " boss@example.com "),
        ("LOGIN_RATE_LIMIT_MAX_ATTEMPTS", "3"),
        ("LOGIN_RATE_LIMIT_WINDOW_SECS", "60"),
        ("FIREBASE_AUTH_BASE_URL", "http://localhost:9099/identitytoolkit.googleapis.com/v1/"),
        ("FIRESTORE_BASE_URL", "http://localhost:8080/v1"),
        ("FIREBASE_REQUEST_TIMEOUT_SECS", "5"),
        ("FIREBASE_CONNECT_TIMEOUT_SECS", "2"),
    ]);
    let cfg = AuthConfig::from_lookup(lookup_from(&pairs)).unwrap();

    assert_eq!(cfg.admin_email.as_deref(), Some("boss@example.com"));
    assert_eq!(cfg.rate_limit, RateLimitConfig { max_attempts: 3, window: Duration::from_secs(60) });
    assert_eq!(cfg.firebase.auth_base_url, "http://localhost:9099/identitytoolkit.googleapis.com/v1");
    assert_eq!(cfg.firebase.firestore_base_url, "http://localhost:8080/v1");
    assert_eq!(cfg.firebase.timeouts, HttpTimeouts { request_secs: 5, connect_secs: 2 });
}

#[test]
fn missing_api_key_is_error() {
    let err = AuthConfig::from_lookup(lookup_from(&[("FIREBASE_PROJECT_ID", "p")])).unwrap_err();
    assert!(matches!(err, ConfigError::Missing { var: "FIREBASE_API_KEY" }));
}

#[test]
fn blank_project_id_is_error() {
    let err = AuthConfig::from_lookup(lookup_from(&[("FIREBASE_API_KEY", "k"), ("FIREBASE_PROJECT_ID", "  ")])).unwrap_err();
    assert!(matches!(err, ConfigError::Missing { var: "FIREBASE_PROJECT_ID" }));
}

#[test]
fn blank_admin_email_is_unset() {
    let mut pairs = REQUIRED.to_vec();
    pairs.push(("ADMIN_EMAIL", "   "));
    let cfg = AuthConfig::from_lookup(lookup_from(&pairs)).unwrap();
    assert_eq!(cfg.admin_email, None);
}

#[test]
fn unparsable_numbers_fall_back_to_defaults() {
    let mut pairs = REQUIRED.to_vec();
    pairs.extend([("LOGIN_RATE_LIMIT_MAX_ATTEMPTS", "many"), ("FIREBASE_REQUEST_TIMEOUT_SECS", "-1")]);
    let cfg = AuthConfig::from_lookup(lookup_from(&pairs)).unwrap();
    assert_eq!(cfg.rate_limit.max_attempts, DEFAULT_MAX_ATTEMPTS);
    assert_eq!(cfg.firebase.timeouts.request_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
}

#[test]
fn missing_error_names_variable() {
    let err = ConfigError::Missing { var: "FIREBASE_API_KEY" };
    assert_eq!(err.to_string(), "missing required config: env var FIREBASE_API_KEY not set");
}
