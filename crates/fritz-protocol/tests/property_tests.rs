//! Property-based tests for challenge and session identifier parsing.
//!
//! Parsers face untrusted gateway input, so they must never panic and must
//! classify every input as either a value or a typed error.

mod common;

use fritz_core::{Error, SessionId};
use fritz_protocol::{Challenge, XmlDocument, solve_iterated, solve_legacy};
use proptest::prelude::*;

/// Strategy for even-length hex salts (1-16 bytes).
fn hex_salt() -> impl Strategy<Value = String> {
    prop::collection::vec(any::<u8>(), 1..16).prop_map(hex::encode_upper)
}

/// Strategy for small iteration counts (keeps the test fast).
fn iterations() -> impl Strategy<Value = u32> {
    1u32..=4u32
}

proptest! {
    /// Property: Arbitrary input never panics the challenge parser.
    #[test]
    fn prop_challenge_parse_total(raw in ".*") {
        match Challenge::parse(&raw) {
            Ok(_) => {}
            Err(Error::InvalidFormat(_)) | Err(Error::OutOfRange(_)) => {
                prop_assert!(raw.starts_with("2$"));
            }
            Err(other) => prop_assert!(false, "unexpected error {other:?}"),
        }
    }

    /// Property: Well-formed iterated challenges always solve to
    /// `<salt2>$<64 hex chars>`.
    #[test]
    fn prop_iterated_response_shape(
        iter1 in iterations(),
        salt1 in hex_salt(),
        iter2 in iterations(),
        salt2 in hex_salt(),
        password in ".{0,40}",
    ) {
        let challenge = format!("2${iter1}${salt1}${iter2}${salt2}");
        let response = solve_iterated(&challenge, &password).unwrap();

        let (echoed, hash) = response.split_once('$').unwrap();
        prop_assert_eq!(echoed, salt2.as_str());
        prop_assert_eq!(hash.len(), 64);
        prop_assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    /// Property: Legacy responses are `<challenge>-<32 hex chars>`.
    #[test]
    fn prop_legacy_response_shape(challenge in "[0-9a-z]{8}", password in ".{0,40}") {
        let response = solve_legacy(&challenge, &password);
        let expected_prefix = format!("{challenge}-");
        prop_assert!(response.starts_with(&expected_prefix));
        prop_assert_eq!(response.len(), challenge.len() + 1 + 32);
    }

    /// Property: Every 16-char lowercase hex string is a SID; only zeros is invalid.
    #[test]
    fn prop_session_id_validity(raw in "[0-9a-f]{16}") {
        let sid = SessionId::new(&raw).unwrap();
        prop_assert_eq!(sid.is_valid(), raw != "0000000000000000");
        prop_assert_eq!(sid.as_str(), raw.as_str());
    }

    /// Property: The XML parser never panics on arbitrary input.
    #[test]
    fn prop_xml_parse_total(raw in ".{0,200}") {
        let _ = XmlDocument::parse(&raw);
    }
}
