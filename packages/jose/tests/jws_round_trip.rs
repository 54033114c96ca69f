//! JWS build/parse round trips across the built-in signature algorithms

use chrono::{DateTime, Utc};
use cryypt_jose::*;
use p256::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use proptest::prelude::*;
use std::sync::Arc;

const NOW: i64 = 1_700_000_000;

fn at(seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(seconds, 0).unwrap()
}

fn parser(config: ParserConfig) -> CompactParser {
    CompactParser::with_config(config.with_clock(Arc::new(FixedClock::at_seconds(NOW))))
}

fn sample_claims() -> Claims {
    Claims::new()
        .with_issuer("https://issuer.example")
        .with_subject("user-42")
        .with_audience("api")
        .with_issued_at(at(NOW))
        .with_expiration(at(NOW + 3600))
        .with_claim("scope", "read write")
        .unwrap()
}

#[test]
fn test_hmac_round_trip_all_sizes() {
    for (alg, len) in [("HS256", 32), ("HS384", 48), ("HS512", 64)] {
        let key = Key::secret(vec![0x5a; len]);
        let header = Header::with_alg(alg).with_type("JWT");
        let claims = sample_claims();

        let token = Jose::builder().sign_claims(&header, &claims, &key).unwrap();
        let jwt = parser(ParserConfig::new()).parse_with_key(&token, &key).unwrap();

        assert_eq!(jwt.kind(), TokenKind::Signed);
        assert_eq!(jwt.header(), &header);
        assert_eq!(jwt.claims(), Some(&claims));
    }
}

#[test]
fn test_es256_round_trip_with_pem_keys() {
    let signing_key = p256::ecdsa::SigningKey::from_slice(&[0x42; 32]).unwrap();
    let private_pem = signing_key.to_pkcs8_pem(LineEnding::LF).unwrap();
    let public_pem = signing_key
        .verifying_key()
        .to_public_key_pem(LineEnding::LF)
        .unwrap();

    let header = Header::with_alg("ES256").with_key_id("ec-1");
    let token = Jose::builder()
        .sign_claims(
            &header,
            &sample_claims(),
            &Key::ec_private(private_pem.as_bytes().to_vec()),
        )
        .unwrap();

    let public = Key::ec_public(public_pem.into_bytes());
    let jwt = parser(ParserConfig::new()).parse_with_key(&token, &public).unwrap();
    assert_eq!(jwt.claims().and_then(Claims::subject), Some("user-42"));
}

#[test]
fn test_es384_round_trip_with_raw_keys() {
    let signing_key = p384::ecdsa::SigningKey::from_slice(&[0x17; 48]).unwrap();
    let public = signing_key.verifying_key().to_encoded_point(false);

    let token = Jose::builder()
        .sign_claims(
            &Header::with_alg("ES384"),
            &sample_claims(),
            &Key::ec_private(vec![0x17; 48]),
        )
        .unwrap();
    let jwt = parser(ParserConfig::new())
        .parse_with_key(&token, &Key::ec_public(public.as_bytes().to_vec()))
        .unwrap();
    assert_eq!(jwt.claims(), Some(&sample_claims()));
}

#[test]
fn test_raw_payload_round_trip() {
    let key = Key::secret(vec![1; 32]);
    let payload = Payload::from(b"not json at all".to_vec());
    let token = Jose::builder()
        .sign(&Header::with_alg("HS256"), &payload, Some(&key))
        .unwrap();
    let jwt = parser(ParserConfig::new()).parse_with_key(&token, &key).unwrap();
    assert_eq!(jwt.payload(), &payload);
    assert!(jwt.claims().is_none());
}

#[test]
fn test_compressed_payload_round_trip() {
    let key = Key::secret(vec![2; 32]);
    for zip in ["DEF", "GZIP"] {
        let header = Header::with_alg("HS256").with_compression(zip);
        let claims = sample_claims().with_claim("blob", "x".repeat(2048)).unwrap();
        let token = Jose::builder().sign_claims(&header, &claims, &key).unwrap();
        assert!(token.len() < 2048, "{zip} payload was not compressed");

        let jwt = parser(ParserConfig::new()).parse_with_key(&token, &key).unwrap();
        assert_eq!(jwt.claims(), Some(&claims));
    }
}

#[test]
fn test_key_locator_by_kid() {
    let locator = StaticKeyLocator::new()
        .with_key("a", Key::secret(vec![0xaa; 32]))
        .with_key("b", Key::secret(vec![0xbb; 32]));
    let token = Jose::builder()
        .sign_claims(
            &Header::with_alg("HS256").with_key_id("b"),
            &sample_claims(),
            &Key::secret(vec![0xbb; 32]),
        )
        .unwrap();

    let jwt = parser(ParserConfig::new().with_key_locator(Arc::new(locator)))
        .parse(&token)
        .unwrap();
    assert_eq!(jwt.header().key_id(), Some("b"));

    let empty = StaticKeyLocator::new();
    let err = parser(ParserConfig::new().with_key_locator(Arc::new(empty)))
        .parse(&token)
        .unwrap_err();
    assert!(matches!(err, JoseError::MissingKey(_)));
}

#[test]
fn test_closure_key_locator() {
    let locator = |header: &Header| -> JoseResult<Option<Key>> {
        Ok(match header.algorithm() {
            Some("HS512") => Some(Key::secret(vec![3; 64])),
            _ => None,
        })
    };
    let token = Jose::builder()
        .sign_claims(
            &Header::with_alg("HS512"),
            &sample_claims(),
            &Key::secret(vec![3; 64]),
        )
        .unwrap();
    let jwt = parser(ParserConfig::new().with_key_locator(Arc::new(locator)))
        .parse(&token)
        .unwrap();
    assert_eq!(jwt.kind(), TokenKind::Signed);
}

#[test]
fn test_unknown_header_parameters_survive() {
    let key = Key::secret(vec![4; 32]);
    let header = Header::with_alg("HS256")
        .with_param("x-tenant", "acme")
        .unwrap();
    let token = Jose::builder().sign_claims(&header, &sample_claims(), &key).unwrap();
    let jwt = parser(ParserConfig::new()).parse_with_key(&token, &key).unwrap();
    assert_eq!(jwt.header().get("x-tenant"), Some(&FieldValue::from("acme")));
}

#[test]
fn test_claim_expectations() {
    let key = Key::secret(vec![5; 32]);
    let token = Jose::builder()
        .sign_claims(&Header::with_alg("HS256"), &sample_claims(), &key)
        .unwrap();

    let accepting = ParserConfig::new()
        .require("iss", "https://issuer.example")
        .require("aud", "api")
        .require_present("scope");
    assert!(parser(accepting).parse_with_key(&token, &key).is_ok());

    let wrong_audience = ParserConfig::new().require("aud", "billing");
    assert!(matches!(
        parser(wrong_audience).parse_with_key(&token, &key),
        Err(JoseError::IncorrectClaim { .. })
    ));

    let missing = ParserConfig::new().require_present("tenant");
    assert!(matches!(
        parser(missing).parse_with_key(&token, &key),
        Err(JoseError::MissingClaim(ref claim)) if claim == "tenant"
    ));
}

#[test]
fn test_narrow_integer_extension_round_trip() {
    let key = Key::secret(vec![6; 32]);
    let claims = Claims::new()
        .with_subject("s")
        .with_claim("level", 3_i8)
        .unwrap()
        .with_claim("port", 8080_i16)
        .unwrap();
    let token = Jose::builder()
        .sign_claims(&Header::with_alg("HS256"), &claims, &key)
        .unwrap();
    let jwt = parser(ParserConfig::new()).parse_with_key(&token, &key).unwrap();

    assert_eq!(jwt.claims(), Some(&claims));
    assert_eq!(jwt.claims().unwrap().get_as::<i8>("level").unwrap(), Some(3));
}

fn extension_value() -> impl Strategy<Value = FieldValue> {
    let leaf = prop_oneof![
        any::<bool>().prop_map(FieldValue::Bool),
        any::<i8>().prop_map(FieldValue::I8),
        any::<i16>().prop_map(FieldValue::I16),
        any::<i32>().prop_map(FieldValue::I32),
        any::<i64>().prop_map(FieldValue::I64),
        "[a-z0-9 ]{0,12}".prop_map(FieldValue::String),
    ];
    leaf.prop_recursive(2, 8, 4, |inner| {
        prop::collection::vec(inner, 0..4).prop_map(FieldValue::Seq)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_extension_claims_survive_round_trip(
        extensions in prop::collection::vec(("x-[a-z]{1,6}", extension_value()), 0..4)
    ) {
        let key = Key::secret(vec![7; 32]);
        let mut claims = Claims::new().with_subject("prop");
        for (id, value) in extensions {
            claims = claims.with_claim(id, value).unwrap();
        }
        let token = Jose::builder()
            .sign_claims(&Header::with_alg("HS256"), &claims, &key)
            .unwrap();
        let jwt = parser(ParserConfig::new()).parse_with_key(&token, &key).unwrap();
        prop_assert_eq!(jwt.claims(), Some(&claims));
    }
}
