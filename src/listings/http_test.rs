use super::*;
use crate::config::BackendTimeouts;

#[test]
fn endpoint_selects_all_columns() {
    assert_eq!(
        listings_endpoint("https://stays.backend.test", "properties"),
        "https://stays.backend.test/rest/v1/properties?select=*"
    );
}

#[test]
fn new_uses_configured_table() {
    let config = BackendConfig {
        url: "https://stays.backend.test".into(),
        anon_key: "anon".into(),
        timeouts: BackendTimeouts::default(),
        listings_table: "stays".into(),
    };
    let source = HttpListingSource::new(&config).unwrap();
    assert_eq!(source.endpoint, "https://stays.backend.test/rest/v1/stays?select=*");
}

#[test]
fn parse_listings_reads_rows() {
    let json = serde_json::json!([
        {
            "id": "a1",
            "title": "Harbour loft",
            "location": "Lisbon",
            "price": 140.0,
            "price_type": "night",
            "rating": 4.8,
            "reviews": 122,
            "bedrooms": 2,
            "bathrooms": 1,
            "area": 78.5,
            "image": "https://img.test/a1.jpg",
            "type": "apartment",
            "featured": true,
            "managed_by": "agency",
            "agency_name": "Tejo Homes",
            "agency_verified": true
        },
        { "id": 42, "title": "Garden studio", "location": "Porto", "price": 60 }
    ])
    .to_string();

    let rows = parse_listings(&json).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].kind.as_deref(), Some("apartment"));
    assert!(rows[0].featured);
    assert!(rows[0].agency_verified);
    assert!(!rows[0].landlord_verified);
    assert_eq!(rows[1].id, "42");
    assert!(!rows[1].featured);
    assert!(rows[1].rating.is_none());
}

#[test]
fn parse_listings_rejects_object_body() {
    let err = parse_listings(r#"{"message":"relation does not exist"}"#).unwrap_err();
    assert!(matches!(err, ListingError::Parse(_)));
}

#[test]
fn parse_listings_rejects_missing_id() {
    let err = parse_listings(r#"[{"title":"No id"}]"#).unwrap_err();
    assert!(matches!(err, ListingError::Parse(_)));
}

#[test]
fn any_success_status_passes_body_through() {
    let body = check_status(reqwest::StatusCode::PARTIAL_CONTENT, "[]".into()).unwrap();
    assert_eq!(body, "[]");
    assert!(check_status(reqwest::StatusCode::OK, "[]".into()).is_ok());
}

#[test]
fn error_status_keeps_body() {
    let err = check_status(reqwest::StatusCode::UNAUTHORIZED, "bad key".into()).unwrap_err();
    assert!(matches!(err, ListingError::Response { status: 401, ref body } if body == "bad key"));
}
