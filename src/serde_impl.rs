//! Serde support for `Maybe` (feature-gated)
//!
//! A `Maybe` is encoded exactly like the `Result` it converts to, so
//! `Success(v)` is `{"Ok": v}` and `Failure(e)` is `{"Err": e}`.
//!
//! Deserializing does not re-assert cancellation; it builds the variants
//! directly and needs no `Raise` bound on the failure type.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::maybe::Maybe;

impl<T, E> Serialize for Maybe<T, E>
where
    T: Serialize,
    E: Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_ref().into_result().serialize(serializer)
    }
}

impl<'de, T, E> Deserialize<'de> for Maybe<T, E>
where
    T: Deserialize<'de>,
    E: Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Result::<T, E>::deserialize(deserializer)? {
            Ok(value) => Maybe::Success(value),
            Err(failure) => Maybe::Failure(failure),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Row {
        id: u32,
        parsed: Maybe<i64, String>,
    }

    #[test]
    fn test_serialize_success() {
        let row = Row {
            id: 1,
            parsed: Maybe::success(42),
        };
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"id":1,"parsed":{"Ok":42}}"#);
    }

    #[test]
    fn test_serialize_failure() {
        let row = Row {
            id: 2,
            parsed: Maybe::failure("not a number".to_string()),
        };
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"id":2,"parsed":{"Err":"not a number"}}"#);
    }

    #[test]
    fn test_roundtrip() {
        let original = Row {
            id: 3,
            parsed: Maybe::failure("bad".to_string()),
        };
        let json = serde_json::to_string(&original).unwrap();
        let restored: Row = serde_json::from_str(&json).unwrap();
        assert_eq!(original, restored);
    }

    #[test]
    fn test_deserialize_rejects_unknown_tag() {
        let result: Result<Row, _> = serde_json::from_str(r#"{"id":1,"parsed":{"Maybe":1}}"#);
        assert!(result.is_err());
    }
}
