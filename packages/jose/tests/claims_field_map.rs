//! Tests for typed claims and header field maps

use chrono::{DateTime, Utc};
use cryypt_jose::claims::{AUDIENCE, EXPIRATION};
use cryypt_jose::*;
use proptest::prelude::*;

fn at(seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(seconds, 0).unwrap()
}

#[test]
fn test_claims_builder_sets_registered_claims() {
    let claims = Claims::new()
        .with_issuer("test-issuer")
        .with_subject("test-user")
        .with_audience("api")
        .with_expiration(at(1_700_003_600))
        .with_not_before(at(1_700_000_000))
        .with_issued_at(at(1_700_000_000))
        .with_id("jti-1");

    assert_eq!(claims.issuer(), Some("test-issuer"));
    assert_eq!(claims.subject(), Some("test-user"));
    assert_eq!(claims.audience(), Some(vec!["api"]));
    assert_eq!(claims.expiration(), Some(at(1_700_003_600)));
    assert_eq!(claims.not_before(), Some(at(1_700_000_000)));
    assert_eq!(claims.issued_at(), Some(at(1_700_000_000)));
    assert_eq!(claims.id(), Some("jti-1"));
    assert_eq!(claims.len(), 7);
}

#[test]
fn test_registered_claims_are_coerced_on_write() {
    let claims = Claims::new()
        .with_claim("exp", 1_700_000_000_i64)
        .unwrap()
        .with_claim("aud", "single")
        .unwrap();
    assert_eq!(claims.expiration(), Some(at(1_700_000_000)));
    assert_eq!(claims.audience(), Some(vec!["single"]));

    let err = Claims::new().with_claim(EXPIRATION.id(), true).unwrap_err();
    assert!(matches!(err, JoseError::Conversion { ref field, .. } if field == "exp"));

    let err = Claims::new().with_claim(AUDIENCE.id(), 5_i64).unwrap_err();
    assert!(matches!(err, JoseError::Conversion { .. }));
}

#[test]
fn test_extension_claims_round_trip_untyped() {
    let claims = Claims::new()
        .with_claim("roles", vec!["admin", "ops"])
        .unwrap()
        .with_claim("level", 3_i8)
        .unwrap();
    assert_eq!(
        claims.get_as::<Vec<String>>("roles").unwrap(),
        Some(vec!["admin".to_string(), "ops".to_string()])
    );
    assert_eq!(claims.get_as::<i64>("level").unwrap(), Some(3));
    assert!(matches!(
        claims.get_as::<String>("level"),
        Err(JoseError::RequiredType(_))
    ));
}

#[test]
fn test_overflow_safe_narrowing() {
    let claims = Claims::new().with_claim("n", 300_i64).unwrap();
    let err = claims.get_as::<i8>("n").unwrap_err();
    assert!(matches!(err, JoseError::RequiredType(ref m) if m.contains("300")));
    assert_eq!(claims.get_as::<i64>("n").unwrap(), Some(300));
}

#[test]
fn test_claims_from_decoded_values() {
    let values = vec![
        ("iss".to_string(), FieldValue::from("me")),
        ("exp".to_string(), FieldValue::I64(1_700_000_000)),
        ("custom".to_string(), FieldValue::F64(1.5)),
    ];
    let claims = Claims::from_values(values).unwrap();
    assert_eq!(claims.expiration(), Some(at(1_700_000_000)));
    assert_eq!(claims.get("custom"), Some(&FieldValue::F64(1.5)));

    let bad = vec![("nbf".to_string(), FieldValue::from("tomorrow"))];
    assert!(matches!(
        Claims::from_values(bad),
        Err(JoseError::Conversion { .. })
    ));
}

#[test]
fn test_header_typed_accessors() {
    let header = Header::with_alg("ES256")
        .with_type("JWT")
        .with_key_id("key-1")
        .with_compression("DEF")
        .with_x509_sha256_thumbprint(vec![1, 2, 3]);
    assert_eq!(header.algorithm(), Some("ES256"));
    assert_eq!(header.token_type(), Some("JWT"));
    assert_eq!(header.key_id(), Some("key-1"));
    assert_eq!(header.compression(), Some("DEF"));
    assert_eq!(header.x509_sha256_thumbprint(), Some(&[1, 2, 3][..]));
}

proptest! {
    #[test]
    fn test_narrowing_never_truncates(value in any::<i64>()) {
        let claims = Claims::new().with_claim("n", value).unwrap();
        match claims.get_as::<i8>("n") {
            Ok(Some(narrow)) => prop_assert_eq!(i64::from(narrow), value),
            Ok(None) => prop_assert!(false, "value disappeared"),
            Err(JoseError::RequiredType(_)) => prop_assert!(i8::try_from(value).is_err()),
            Err(other) => prop_assert!(false, "unexpected error {other}"),
        }
        match claims.get_as::<i32>("n") {
            Ok(Some(narrow)) => prop_assert_eq!(i64::from(narrow), value),
            Ok(None) => prop_assert!(false, "value disappeared"),
            Err(JoseError::RequiredType(_)) => prop_assert!(i32::try_from(value).is_err()),
            Err(other) => prop_assert!(false, "unexpected error {other}"),
        }
        prop_assert_eq!(claims.get_as::<i64>("n").unwrap(), Some(value));
    }

    #[test]
    fn test_small_kinds_widen(value in any::<i16>()) {
        let claims = Claims::new().with_claim("n", value).unwrap();
        prop_assert_eq!(claims.get_as::<i64>("n").unwrap(), Some(i64::from(value)));
        prop_assert_eq!(claims.get_as::<i32>("n").unwrap(), Some(i32::from(value)));
    }
}
