//! Entity identifiers.
//!
//! Backend payloads carry ids either as JSON strings or as JSON numbers
//! depending on the table they come from.  [`EntityId`] normalises both
//! to a string so that entity-keyed caches can hash them uniformly.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ModelError;

/// Identifier of a single entity (request, role holder, notification…).
///
/// # Examples
///
/// ```
/// use portal_models::EntityId;
///
/// let a = EntityId::from(42u64);
/// let b: EntityId = "42".parse().unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "42");
/// ```
/// The default id is empty and only appears in placeholder values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(String);

impl EntityId {
    /// Create a new `EntityId` from a string slice.
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    /// Return the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u64> for EntityId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl From<i64> for EntityId {
    fn from(n: i64) -> Self {
        Self(n.to_string())
    }
}

impl FromStr for EntityId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ModelError::InvalidEntityId {
                value: s.to_string(),
                reason: "must not be empty".into(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl Serialize for EntityId {
    /// Numeric ids go back out as JSON numbers so that request bodies
    /// match what the backend handed us.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.parse::<i64>() {
            Ok(n) => serializer.serialize_i64(n),
            Err(_) => serializer.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Uint(u64),
            Str(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(n) => Self::from(n),
            Raw::Uint(n) => Self::from(n),
            Raw::Str(s) => Self(s),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_number_and_string() {
        let a: EntityId = serde_json::from_str("7").unwrap();
        let b: EntityId = serde_json::from_str("\"7\"").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn numeric_ids_serialize_as_numbers() {
        assert_eq!(serde_json::to_string(&EntityId::from(7u64)).unwrap(), "7");
        assert_eq!(
            serde_json::to_string(&EntityId::new("req-7")).unwrap(),
            "\"req-7\""
        );
    }

    #[test]
    fn parse_rejects_blank() {
        assert!("  ".parse::<EntityId>().is_err());
        assert_eq!(" 12 ".parse::<EntityId>().unwrap().as_str(), "12");
    }
}
