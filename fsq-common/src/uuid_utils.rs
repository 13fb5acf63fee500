//! UUID utilities

use uuid::Uuid;

/// Generate a new UUIDv4
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Parse UUID from a stored TEXT column
pub fn parse(s: &str) -> crate::Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| crate::Error::Internal(format!("Invalid UUID '{}': {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_unique() {
        assert_ne!(generate(), generate());
    }

    #[test]
    fn test_parse_round_trip() {
        let id = generate();
        assert_eq!(parse(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(parse("not-a-uuid"), Err(crate::Error::Internal(_))));
    }
}
