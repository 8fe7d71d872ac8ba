use super::*;

fn identity(email: Option<&str>, full_name: Option<&str>) -> Identity {
    Identity {
        id: Uuid::nil(),
        email: email.map(str::to_owned),
        user_metadata: UserMetadata { full_name: full_name.map(str::to_owned) },
    }
}

// =============================================================================
// display_name
// =============================================================================

#[test]
fn display_name_prefers_full_name() {
    let id = identity(Some("ana@example.com"), Some("Ana Reyes"));
    assert_eq!(id.display_name(), "Ana Reyes");
}

#[test]
fn display_name_falls_back_to_email_local_part() {
    let id = identity(Some("ana@example.com"), Some("  "));
    assert_eq!(id.display_name(), "ana");
}

#[test]
fn display_name_guest_when_nothing_known() {
    let id = identity(None, None);
    assert_eq!(id.display_name(), "guest");
}

// =============================================================================
// serde
// =============================================================================

#[test]
fn identity_deserializes_service_user_payload() {
    let json = serde_json::json!({
        "id": "6f1c1f8e-5a43-4a53-9d55-2b3f0b8d7f10",
        "aud": "authenticated",
        "email": "ana@example.com",
        "user_metadata": { "full_name": "Ana Reyes" },
        "created_at": "2024-05-01T10:00:00Z"
    });
    let id: Identity = serde_json::from_value(json).unwrap();
    assert_eq!(id.email.as_deref(), Some("ana@example.com"));
    assert_eq!(id.user_metadata.full_name.as_deref(), Some("Ana Reyes"));
}

#[test]
fn identity_tolerates_missing_metadata() {
    let json = serde_json::json!({ "id": "6f1c1f8e-5a43-4a53-9d55-2b3f0b8d7f10" });
    let id: Identity = serde_json::from_value(json).unwrap();
    assert!(id.email.is_none());
    assert_eq!(id.user_metadata, UserMetadata::default());
}

// =============================================================================
// IdentityEvent / IdentityError
// =============================================================================

#[test]
fn event_names_match_service_vocabulary() {
    assert_eq!(IdentityEvent::InitialSession.as_str(), "INITIAL_SESSION");
    assert_eq!(IdentityEvent::SignedOut.as_str(), "SIGNED_OUT");
    assert_eq!(IdentityEvent::TokenRefreshed.as_str(), "TOKEN_REFRESHED");
}

#[test]
fn error_retryable_for_transport_and_server_faults() {
    assert!(IdentityError::Request("timeout".into()).retryable());
    assert!(IdentityError::Rejected { status: 503, message: "down".into() }.retryable());
    assert!(IdentityError::Rejected { status: 429, message: "slow down".into() }.retryable());
    assert!(!IdentityError::Rejected { status: 400, message: "Invalid login credentials".into() }.retryable());
    assert!(!IdentityError::NoSession.retryable());
}

#[test]
fn error_codes_are_stable() {
    assert_eq!(IdentityError::Parse("x".into()).error_code(), "E_IDENTITY_PARSE");
    assert_eq!(IdentityError::NoSession.error_code(), "E_NO_SESSION");
}
