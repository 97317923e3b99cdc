//! Canonical value encoding
//!
//! Cached values travel to the store as strings. The default encoding is
//! canonical JSON: object keys are sorted, so two structurally-equal values
//! whose fields were produced in different orders encode to the identical
//! string. That matters beyond storage, because encoded values also feed the
//! argument hasher.
//!
//! Types that want a say in their own encoding implement [`Model`]; the
//! trait's canonical form is then used both for persistence and for hash
//! normalization.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CacheError, Result};

/// Encode a value as canonical JSON.
///
/// The value is first lifted into a `serde_json::Value`; its map type keeps
/// keys sorted (the `preserve_order` feature must stay off), which makes the
/// rendered string canonical.
pub fn to_canonical_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let tree = serde_json::to_value(value).map_err(|e| {
        CacheError::Serialization(format!(
            "value is not JSON-encodable ({e}); implement `Model` for the type you \
             want to cache (i.e. the function result) or make sure it serializes \
             to plain JSON"
        ))
    })?;
    serde_json::to_string(&tree).map_err(|e| CacheError::Serialization(e.to_string()))
}

/// Decode a value from its JSON encoding.
pub fn from_json<T: DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|e| CacheError::Serialization(e.to_string()))
}

/// A structured domain value with a canonical string form.
///
/// The default methods derive the canonical form from the type's serde
/// implementation; override them when the wire form differs from the serde
/// form. The canonical string is used for both storage and argument hashing,
/// so two structurally-equal values must produce the same string regardless
/// of how they were constructed.
pub trait Model: Serialize + DeserializeOwned + Send + Sync {
    /// Canonical JSON encoding of this value.
    fn canonical_json(&self) -> Result<String> {
        to_canonical_json(self)
    }

    /// Rebuild a value from its canonical encoding.
    fn from_canonical_json(raw: &str) -> Result<Self> {
        from_json(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Holding {
        ticker: String,
        quantity: u32,
    }

    impl Model for Holding {}

    #[test]
    fn test_canonical_json_sorts_keys() {
        let out = to_canonical_json(&serde_json::json!({"zeta": 1, "alpha": 2})).unwrap();
        assert_eq!(out, r#"{"alpha":2,"zeta":1}"#);
    }

    #[test]
    fn test_model_round_trip() {
        let holding = Holding {
            ticker: "VT".to_string(),
            quantity: 12,
        };

        let raw = holding.canonical_json().unwrap();
        let back = Holding::from_canonical_json(&raw).unwrap();
        assert_eq!(holding, back);
    }

    #[test]
    fn test_unencodable_value_is_a_contract_violation() {
        // Tuple map keys have no JSON representation.
        let mut bad: HashMap<(u8, u8), u8> = HashMap::new();
        bad.insert((1, 2), 3);

        let err = to_canonical_json(&bad).unwrap_err();
        assert!(matches!(err, CacheError::Serialization(_)));
        assert!(err.to_string().contains("implement `Model`"));
    }

    #[test]
    fn test_decode_failure_surfaces() {
        let err = from_json::<Holding>("not json").unwrap_err();
        assert!(matches!(err, CacheError::Serialization(_)));
    }
}
