//! Login / refresh payloads and the authenticated user.

use serde::{Deserialize, Serialize};

use crate::credentials::CredentialPair;
use crate::error::ModelError;
use crate::ids::EntityId;

/// Portal role of the signed-in user.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    /// Regular employee.
    #[default]
    Employee,
    /// Administrator of a single company.
    CompanyAdmin,
    /// Platform-wide administrator.
    SuperAdmin,
}

/// User block returned alongside a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    /// User id.
    pub id: EntityId,
    /// Login email.
    pub email: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Portal role.
    pub role: Role,
    /// Owning company, absent for super-admins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<EntityId>,
}

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Login email.
    pub email: String,
    /// Plain-text password (sent over TLS only).
    pub password: String,
}

/// Body of `POST /auth/refresh`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    /// The refresh credential being exchanged.
    pub refresh_token: String,
}

/// Token-bearing response of `/auth/login` and `/auth/refresh`.
///
/// The backend has shipped the access token as both `accessToken` and
/// `access_token` over time, sometimes both in one body.  The two
/// spellings are kept as separate fields and [`TokenGrant::access`]
/// picks the first non-empty one.
///
/// ```
/// use portal_models::TokenGrant;
///
/// let a: TokenGrant = serde_json::from_str(r#"{"accessToken":"x","refreshToken":"r"}"#).unwrap();
/// let b: TokenGrant = serde_json::from_str(r#"{"access_token":"x","refreshToken":"r"}"#).unwrap();
/// assert_eq!(a.access(), b.access());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
    /// New access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// New access token, legacy snake_case spelling.
    #[serde(default, rename = "access_token", skip_serializing_if = "Option::is_none")]
    pub legacy_access_token: Option<String>,
    /// New (possibly rotated) refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Signed-in user, present on login responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
}

impl TokenGrant {
    /// The issued access token under either spelling, `accessToken`
    /// first.  Blank values count as absent.
    pub fn access(&self) -> Option<&str> {
        [&self.access_token, &self.legacy_access_token]
            .into_iter()
            .filter_map(|t| t.as_deref())
            .find(|t| !t.is_empty())
    }

    /// Convert into a credential pair, failing when no access token was
    /// issued.
    pub fn credentials(&self) -> Result<CredentialPair, ModelError> {
        let access = self.access().ok_or_else(|| ModelError::MissingField {
            field: "accessToken".into(),
        })?;
        let refresh = self.refresh_token.clone().filter(|t| !t.is_empty());
        Ok(CredentialPair::new(access, refresh))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_without_access_token_is_rejected() {
        let grant: TokenGrant = serde_json::from_str(r#"{"refreshToken":"r"}"#).unwrap();
        assert!(grant.credentials().is_err());

        let blank: TokenGrant = serde_json::from_str(r#"{"accessToken":""}"#).unwrap();
        assert!(blank.credentials().is_err());
    }

    #[test]
    fn grant_keeps_missing_refresh_token_absent() {
        let grant: TokenGrant = serde_json::from_str(r#"{"access_token":"a"}"#).unwrap();
        let pair = grant.credentials().unwrap();
        assert_eq!(pair.access_token.as_deref(), Some("a"));
        assert!(pair.refresh_token.is_none());
    }

    #[test]
    fn grant_tolerates_both_spellings_in_one_body() {
        let both: TokenGrant =
            serde_json::from_str(r#"{"accessToken":"a","access_token":"a","refreshToken":"r"}"#)
                .unwrap();
        assert_eq!(both.credentials().unwrap(), CredentialPair::new("a", Some("r".into())));

        let legacy_only: TokenGrant =
            serde_json::from_str(r#"{"accessToken":null,"access_token":"b"}"#).unwrap();
        assert_eq!(legacy_only.access(), Some("b"));

        let blank_camel: TokenGrant =
            serde_json::from_str(r#"{"accessToken":"","access_token":"c"}"#).unwrap();
        assert_eq!(blank_camel.access(), Some("c"));
    }

    #[test]
    fn grant_serializes_a_single_spelling() {
        let grant = TokenGrant {
            access_token: Some("a".into()),
            ..TokenGrant::default()
        };
        let body = serde_json::to_value(&grant).unwrap();
        assert_eq!(body["accessToken"], "a");
        assert!(body.get("access_token").is_none());
    }

    #[test]
    fn login_grant_carries_user() {
        let raw = r#"{
            "accessToken": "a",
            "refreshToken": "r",
            "user": {"id": 3, "email": "ana@example.com", "role": "company_admin", "companyId": 9}
        }"#;
        let grant: TokenGrant = serde_json::from_str(raw).unwrap();
        let user = grant.user.unwrap();
        assert_eq!(user.role, Role::CompanyAdmin);
        assert_eq!(user.company_id, Some(EntityId::from(9u64)));
    }

    #[test]
    fn role_string_forms() {
        assert_eq!(Role::SuperAdmin.to_string(), "super_admin");
        assert_eq!("employee".parse::<Role>().unwrap(), Role::Employee);
    }

    #[test]
    fn refresh_request_is_camel_case() {
        let body = serde_json::to_value(RefreshRequest {
            refresh_token: "r".into(),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"refreshToken": "r"}));
    }
}
