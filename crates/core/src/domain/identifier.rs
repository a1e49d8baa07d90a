//! Canonical identifier validation.
//!
//! Identifiers arrive as free text from the reasoning capability, which is
//! prone to passing product names where ids are expected. Only the hyphenated
//! 8-4-4-4-12 form with an RFC 4122 version (1..=5) and variant (8, 9, a, b)
//! is accepted; braced, URN and simple forms are rejected even though the
//! `uuid` crate would parse them.

use uuid::Uuid;

use crate::errors::DomainError;

const HYPHEN_POSITIONS: [usize; 4] = [8, 13, 18, 23];
const VERSION_POSITION: usize = 14;
const VARIANT_POSITION: usize = 19;

pub fn is_canonical_uuid(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 36 {
        return false;
    }

    for (index, byte) in bytes.iter().enumerate() {
        let valid = if HYPHEN_POSITIONS.contains(&index) {
            *byte == b'-'
        } else if index == VERSION_POSITION {
            matches!(byte, b'1'..=b'5')
        } else if index == VARIANT_POSITION {
            matches!(byte.to_ascii_lowercase(), b'8' | b'9' | b'a' | b'b')
        } else {
            byte.is_ascii_hexdigit()
        };
        if !valid {
            return false;
        }
    }

    true
}

/// Parses `value` as a canonical UUID, naming `field` in the error.
pub fn parse_identifier(field: &'static str, value: &str) -> Result<Uuid, DomainError> {
    let trimmed = value.trim();
    if !is_canonical_uuid(trimmed) {
        return Err(DomainError::InvalidIdentifier { field, value: value.to_string() });
    }
    Uuid::parse_str(trimmed)
        .map_err(|_| DomainError::InvalidIdentifier { field, value: value.to_string() })
}

#[cfg(test)]
mod tests {
    use super::{is_canonical_uuid, parse_identifier};
    use crate::errors::DomainError;

    #[test]
    fn accepts_versions_one_through_five() {
        assert!(is_canonical_uuid("123e4567-e89b-12d3-a456-426614174000"));
        assert!(is_canonical_uuid("6F9619FF-8B86-4011-B42D-00C04FC964FF"));
        assert!(is_canonical_uuid("9c5b94b1-35ad-49bb-b118-8e8fc24abf80"));
        assert!(is_canonical_uuid("886313e1-3b8a-5372-9b90-0c9aee199e5d"));
    }

    #[test]
    fn rejects_names_and_non_canonical_forms() {
        assert!(!is_canonical_uuid("abc"));
        assert!(!is_canonical_uuid("Widget"));
        assert!(!is_canonical_uuid("123e4567e89b12d3a456426614174000"));
        assert!(!is_canonical_uuid("{123e4567-e89b-12d3-a456-426614174000}"));
        assert!(!is_canonical_uuid("urn:uuid:123e4567-e89b-12d3-a456-426614174000"));
    }

    #[test]
    fn rejects_bad_version_or_variant_nibbles() {
        assert!(!is_canonical_uuid("123e4567-e89b-02d3-a456-426614174000"));
        assert!(!is_canonical_uuid("123e4567-e89b-72d3-a456-426614174000"));
        assert!(!is_canonical_uuid("123e4567-e89b-12d3-c456-426614174000"));
        assert!(!is_canonical_uuid("00000000-0000-0000-0000-000000000000"));
    }

    #[test]
    fn parse_identifier_names_the_field() {
        let error = parse_identifier("userId", "abc").expect_err("abc is not a uuid");
        assert_eq!(
            error,
            DomainError::InvalidIdentifier { field: "userId", value: "abc".to_string() }
        );
    }

    #[test]
    fn parse_identifier_tolerates_surrounding_whitespace() {
        let parsed = parse_identifier("productId", " 9c5b94b1-35ad-49bb-b118-8e8fc24abf80 ")
            .expect("valid uuid");
        assert_eq!(parsed.to_string(), "9c5b94b1-35ad-49bb-b118-8e8fc24abf80");
    }
}
