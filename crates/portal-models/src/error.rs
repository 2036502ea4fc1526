//! Error types for the `portal-models` crate.
//!
//! All fallible constructors and `FromStr` implementations in this crate
//! return variants of [`ModelError`].

/// Errors produced when constructing or validating model types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// An entity identifier was empty.
    #[error("invalid entity id \"{value}\": {reason}")]
    InvalidEntityId {
        /// The value that failed validation.
        value: String,
        /// Human-readable explanation.
        reason: String,
    },

    /// A persistence mode string was not one of `session`, `local`, `both`.
    #[error("invalid persist mode \"{value}\": expected session, local or both")]
    InvalidPersistMode {
        /// The value that failed validation.
        value: String,
    },

    /// A required field was missing from a payload.
    #[error("missing required field: {field}")]
    MissingField {
        /// The name of the missing field.
        field: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_entity_id() {
        let err = ModelError::InvalidEntityId {
            value: "".into(),
            reason: "must not be empty".into(),
        };
        assert_eq!(err.to_string(), "invalid entity id \"\": must not be empty");
    }

    #[test]
    fn error_display_persist_mode() {
        let err = ModelError::InvalidPersistMode {
            value: "disk".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid persist mode \"disk\": expected session, local or both"
        );
    }

    #[test]
    fn error_display_missing_field() {
        let err = ModelError::MissingField {
            field: "accessToken".into(),
        };
        assert_eq!(err.to_string(), "missing required field: accessToken");
    }
}
