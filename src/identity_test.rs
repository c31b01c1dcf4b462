use super::*;

fn alice() -> Identity {
    Identity::new("u-alice", "alice@example.com")
}

// =============================================================================
// EventHub
// =============================================================================

#[tokio::test]
async fn subscribe_seeds_with_absent_identity() {
    let hub = EventHub::new();
    let mut sub = hub.subscribe();
    let first = sub.recv().await.unwrap();
    assert_eq!(first.identity, None);
}

#[tokio::test]
async fn subscribe_seeds_with_current_identity() {
    let hub = EventHub::new();
    hub.publish(Some(alice()));

    let mut sub = hub.subscribe();
    let first = sub.recv().await.unwrap();
    assert_eq!(first.identity, Some(alice()));
}

#[tokio::test]
async fn publish_delivers_every_change_in_order() {
    let hub = EventHub::new();
    let mut sub = hub.subscribe();

    hub.publish(Some(alice()));
    hub.publish(None);

    assert_eq!(sub.recv().await.unwrap().identity, None);
    assert_eq!(sub.recv().await.unwrap().identity, Some(alice()));
    assert_eq!(sub.recv().await.unwrap().identity, None);
}

#[test]
fn dropped_subscription_is_pruned() {
    let hub = EventHub::new();
    let sub = hub.subscribe();
    let _kept = hub.subscribe();
    assert_eq!(hub.subscriber_count(), 2);

    drop(sub);
    assert_eq!(hub.subscriber_count(), 1);
}

#[test]
fn unsubscribe_closes_delivery() {
    let hub = EventHub::new();
    let sub = hub.subscribe();
    sub.unsubscribe();

    hub.publish(Some(alice()));
    assert_eq!(hub.subscriber_count(), 0);
    assert_eq!(hub.current(), Some(alice()));
}

// =============================================================================
// IdentityError
// =============================================================================

#[test]
fn invalid_credentials_message_passes_through() {
    let err = IdentityError::InvalidCredentials { message: Some("wrong password".into()) };
    assert_eq!(err.message(), Some("wrong password"));
    assert_eq!(err.to_string(), "sign-in rejected: wrong password");
}

#[test]
fn invalid_credentials_without_message() {
    let err = IdentityError::InvalidCredentials { message: None };
    assert_eq!(err.message(), None);
    assert_eq!(err.to_string(), "sign-in rejected: no reason given");
}

#[test]
fn identity_serialization_omits_token() {
    let mut id = alice();
    id.id_token = Some("secret".into());
    let json = serde_json::to_string(&id).unwrap();
    assert!(!json.contains("secret"));
    assert!(json.contains("alice@example.com"));
}
