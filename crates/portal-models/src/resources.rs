//! Payload types for the cached portal resources.
//!
//! Only the fields the portal actually renders are typed; anything else
//! the backend sends is ignored on deserialisation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::EntityId;
use crate::session::Role;

// ---------------------------------------------------------------------------
// Work requests
// ---------------------------------------------------------------------------

/// Row of the "assigned to me" request list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkRequest {
    /// Request id.
    pub id: EntityId,
    /// Short title.
    #[serde(default)]
    pub title: String,
    /// Workflow status (`"pending"`, `"approved"`…).
    #[serde(default)]
    pub status: String,
    /// Request category.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Name of the employee who filed it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester_name: Option<String>,
    /// Filing time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A state change recorded against a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEvent {
    /// New status.
    pub status: String,
    /// Free-text note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Who made the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    /// When.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<DateTime<Utc>>,
}

/// File attached to a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Attachment id.
    pub id: EntityId,
    /// Original file name.
    pub file_name: String,
    /// Download URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Full view of a single request, fetched by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDetails {
    /// The list-row fields.
    #[serde(flatten)]
    pub summary: WorkRequest,
    /// Long description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Status history, oldest first.
    #[serde(default)]
    pub history: Vec<RequestEvent>,
    /// Attached files.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

// ---------------------------------------------------------------------------
// Role summaries
// ---------------------------------------------------------------------------

/// Aggregated counters for one role holder (employee or admin).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleSummary {
    /// Role-holder id.
    pub id: EntityId,
    /// Role.
    pub role: Role,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Requests still open.
    #[serde(default)]
    pub open_requests: u32,
    /// Requests closed.
    #[serde(default)]
    pub completed_requests: u32,
}

// ---------------------------------------------------------------------------
// Reference options
// ---------------------------------------------------------------------------

/// A value/label pair used to populate selects (departments, request types…).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceOption {
    /// Submitted value.
    pub value: String,
    /// Human-readable label.
    pub label: String,
}

// ---------------------------------------------------------------------------
// Admin credentials
// ---------------------------------------------------------------------------

/// A service credential managed by a company admin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminCredential {
    /// Credential id.
    pub id: EntityId,
    /// Label shown in the list.
    pub name: String,
    /// Credential category (`"api_key"`, `"smtp"`…).
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of `POST /api/admin/credentials`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAdminCredential {
    /// Label.
    pub name: String,
    /// Category.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Secret material; never returned by the backend.
    pub secret: String,
}

// ---------------------------------------------------------------------------
// Employee profile
// ---------------------------------------------------------------------------

/// The signed-in employee's profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeProfile {
    /// Employee id.
    pub id: Option<EntityId>,
    /// Full name.
    #[serde(default)]
    pub name: String,
    /// Work email.
    #[serde(default)]
    pub email: String,
    /// Department label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    /// Job title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    /// Contact phone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Body of `PUT /api/employee/profile`; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    /// New full name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New department.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    /// New phone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn details_flatten_summary() {
        let raw = r#"{
            "id": 12,
            "title": "Laptop",
            "status": "pending",
            "type": "equipment",
            "description": "New laptop",
            "history": [{"status": "pending", "actor": "ana"}]
        }"#;
        let details: RequestDetails = serde_json::from_str(raw).unwrap();
        assert_eq!(details.summary.id, EntityId::from(12u64));
        assert_eq!(details.summary.kind.as_deref(), Some("equipment"));
        assert_eq!(details.history.len(), 1);
        assert!(details.attachments.is_empty());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let raw = r#"{"id": "c1", "name": "SMTP", "type": "smtp", "ownerId": 4}"#;
        let cred: AdminCredential = serde_json::from_str(raw).unwrap();
        assert_eq!(cred.name, "SMTP");
    }

    #[test]
    fn profile_update_skips_absent_fields() {
        let update = ProfileUpdate {
            phone: Some("555".into()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(update).unwrap(),
            serde_json::json!({"phone": "555"})
        );
    }
}
