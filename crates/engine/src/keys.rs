use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("key must not be empty")]
    Empty,
    #[error("key must not start with '/'")]
    LeadingSlash,
    #[error("key must not contain '\\\\'")]
    Backslash,
    #[error("key must not contain '..'")]
    ParentTraversal,
    #[error("key contains invalid character '{character}'")]
    InvalidCharacter { character: char },
}

/// Map ids name a single file inside the maps directory, so `/` is rejected.
pub(crate) fn validate_map_id(key: &str) -> Result<(), KeyError> {
    validate_key(key, false)
}

/// Image keys may address nested folders below the sprites directory.
pub(crate) fn validate_image_key(key: &str) -> Result<(), KeyError> {
    validate_key(key, true)
}

fn validate_key(key: &str, allow_slash: bool) -> Result<(), KeyError> {
    if key.is_empty() {
        return Err(KeyError::Empty);
    }
    if key.starts_with('/') {
        return Err(KeyError::LeadingSlash);
    }
    if key.contains('\\') {
        return Err(KeyError::Backslash);
    }
    if key.contains("..") {
        return Err(KeyError::ParentTraversal);
    }
    for ch in key.chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '-') {
            continue;
        }
        if ch == '/' && allow_slash {
            continue;
        }
        return Err(KeyError::InvalidCharacter { character: ch });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_map_ids() {
        for key in ["classroom", "hallway_2", "floor-b1"] {
            assert!(validate_map_id(key).is_ok(), "key={key}");
        }
    }

    #[test]
    fn rejects_nested_map_ids() {
        assert_eq!(
            validate_map_id("maps/classroom"),
            Err(KeyError::InvalidCharacter { character: '/' })
        );
    }

    #[test]
    fn accepts_nested_image_keys() {
        for key in ["desk", "furniture/desk_1", "a-b/c_d"] {
            assert!(validate_image_key(key).is_ok(), "key={key}");
        }
    }

    #[test]
    fn rejects_invalid_keys() {
        for key in ["", "/a", "..", "a/../b", r"a\b", "A", "a.b", "机"] {
            assert!(validate_image_key(key).is_err(), "key={key}");
            assert!(validate_map_id(key).is_err(), "key={key}");
        }
    }
}
