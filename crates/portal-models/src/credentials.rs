//! Credential pair and storage-slot types.
//!
//! The credential store itself lives in the SDK; these are the plain
//! values it moves around.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

// ---------------------------------------------------------------------------
// TokenKind
// ---------------------------------------------------------------------------

/// One of the two logical credential slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum TokenKind {
    /// Short-lived bearer credential attached to authenticated requests.
    #[strum(serialize = "accessToken")]
    Access,
    /// Longer-lived credential exchanged for a new access token.
    #[strum(serialize = "refreshToken")]
    Refresh,
}

impl TokenKind {
    /// Key under which the token is kept in a key-value store.
    pub fn storage_key(self) -> &'static str {
        match self {
            Self::Access => "accessToken",
            Self::Refresh => "refreshToken",
        }
    }
}

// ---------------------------------------------------------------------------
// PersistMode
// ---------------------------------------------------------------------------

/// Which storage scope(s) a credential write goes to.
///
/// ```
/// use portal_models::PersistMode;
///
/// let mode: PersistMode = "local".parse().unwrap();
/// assert!(mode.durable() && !mode.session());
/// assert_eq!(PersistMode::default(), PersistMode::Both);
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PersistMode {
    /// Session-scoped storage only (gone when the session ends).
    Session,
    /// Durable storage only.
    Local,
    /// Both scopes.
    #[default]
    Both,
}

impl FromStr for PersistMode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "session" => Ok(Self::Session),
            "local" => Ok(Self::Local),
            "both" => Ok(Self::Both),
            _ => Err(ModelError::InvalidPersistMode {
                value: s.to_string(),
            }),
        }
    }
}

impl PersistMode {
    /// Whether the session-scoped store is written.
    pub fn session(self) -> bool {
        matches!(self, Self::Session | Self::Both)
    }

    /// Whether the durable store is written.
    pub fn durable(self) -> bool {
        matches!(self, Self::Local | Self::Both)
    }
}

// ---------------------------------------------------------------------------
// CredentialPair
// ---------------------------------------------------------------------------

/// An access/refresh token pair.
///
/// Either both tokens are absent (logged out) or the access token is
/// present.  The refresh token may be missing when the issuer does not
/// hand one out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    /// Bearer credential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Renewal credential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl CredentialPair {
    /// Pair with an access token and optional refresh token.
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token,
        }
    }

    /// The logged-out pair.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Token stored in the given slot, if any.
    pub fn get(&self, kind: TokenKind) -> Option<&str> {
        match kind {
            TokenKind::Access => self.access_token.as_deref(),
            TokenKind::Refresh => self.refresh_token.as_deref(),
        }
    }

    /// `true` when both tokens are absent.
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }

    /// Check the pair invariant (a refresh token never travels alone).
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.access_token.is_none() && self.refresh_token.is_some() {
            return Err(ModelError::MissingField {
                field: TokenKind::Access.storage_key().to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_keys_match_display() {
        assert_eq!(TokenKind::Access.storage_key(), "accessToken");
        assert_eq!(TokenKind::Refresh.to_string(), "refreshToken");
    }

    #[test]
    fn persist_mode_parse() {
        assert_eq!("session".parse::<PersistMode>().unwrap(), PersistMode::Session);
        assert_eq!("both".parse::<PersistMode>().unwrap(), PersistMode::Both);
        assert!(matches!(
            "disk".parse::<PersistMode>(),
            Err(ModelError::InvalidPersistMode { .. })
        ));
    }

    #[test]
    fn pair_invariant() {
        assert!(CredentialPair::empty().validate().is_ok());
        assert!(CredentialPair::new("a", None).validate().is_ok());
        let orphan = CredentialPair {
            access_token: None,
            refresh_token: Some("r".into()),
        };
        assert!(orphan.validate().is_err());
    }

    #[test]
    fn pair_serializes_camel_case() {
        let pair = CredentialPair::new("a", Some("r".into()));
        let json = serde_json::to_value(&pair).unwrap();
        assert_eq!(json["accessToken"], "a");
        assert_eq!(json["refreshToken"], "r");
    }
}
