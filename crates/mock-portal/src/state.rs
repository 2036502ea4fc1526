//! Shared in-memory backend state and test knobs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Duration, Utc};
use portal_models::{
    AdminCredential, Attachment, CredentialPair, EmployeeProfile, EntityId, Notification,
    ReferenceOption, RequestDetails, RequestEvent, Role, RoleSummary, SessionUser, WorkRequest,
};
use uuid::Uuid;

/// A seeded account.
#[derive(Debug, Clone)]
pub struct Account {
    pub user: SessionUser,
    pub password: String,
}

/// Failure injection, all off by default.
#[derive(Debug, Clone, Copy, Default)]
pub struct Knobs {
    /// `POST /auth/refresh` always answers 401.
    pub reject_refresh: bool,
    /// Every protected endpoint answers 401, even with a fresh token.
    pub reject_all: bool,
    /// Token grants use `access_token` instead of `accessToken`.
    pub legacy_token_field: bool,
    /// Both read-acknowledgement endpoints answer 500.
    pub fail_mark_read: bool,
}

pub(crate) struct Data {
    pub accounts: Vec<Account>,
    /// access token -> account email
    pub access: HashMap<String, String>,
    /// refresh token -> account email
    pub refresh: HashMap<String, String>,
    pub notifications: Vec<Notification>,
    pub requests: Vec<RequestDetails>,
    pub role_summaries: Vec<RoleSummary>,
    pub options: HashMap<String, Vec<ReferenceOption>>,
    pub credentials: Vec<AdminCredential>,
    pub profile: EmployeeProfile,
    pub knobs: Knobs,
    pub hits: Vec<String>,
}

/// Handle to the backend state; clones share it.
#[derive(Clone)]
pub struct MockState {
    inner: Arc<Mutex<Data>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self::seeded()
    }
}

impl MockState {
    /// State with two accounts and a handful of entities.
    ///
    /// * `ana@example.com` / `secret`: employee, notifications 4 (read)
    ///   and 5 (unread), 6 (unread)
    /// * `admin@example.com` / `admin`: company admin
    pub fn seeded() -> Self {
        Self {
            inner: Arc::new(Mutex::new(seed())),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Data> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    // ------------------------------------------------------------------
    // Tokens
    // ------------------------------------------------------------------

    /// Mint a fresh pair for `email` without going through login.
    pub fn issue_tokens(&self, email: &str) -> CredentialPair {
        let mut data = self.lock();
        data.issue(email)
    }

    /// Invalidate every access token; refresh tokens stay valid.
    pub fn revoke_access_tokens(&self) {
        self.lock().access.clear();
    }

    // ------------------------------------------------------------------
    // Knobs
    // ------------------------------------------------------------------

    pub fn knobs(&self) -> Knobs {
        self.lock().knobs
    }

    pub fn set_knobs(&self, knobs: Knobs) {
        self.lock().knobs = knobs;
    }

    pub fn set_reject_refresh(&self, on: bool) {
        self.lock().knobs.reject_refresh = on;
    }

    pub fn set_reject_all(&self, on: bool) {
        self.lock().knobs.reject_all = on;
    }

    pub fn set_legacy_token_field(&self, on: bool) {
        self.lock().knobs.legacy_token_field = on;
    }

    pub fn set_fail_mark_read(&self, on: bool) {
        self.lock().knobs.fail_mark_read = on;
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// Every request seen so far, as `"METHOD /path"`.
    pub fn hits(&self) -> Vec<String> {
        self.lock().hits.clone()
    }

    /// How many times `"METHOD /path"` was requested.
    pub fn count(&self, hit: &str) -> usize {
        self.lock().hits.iter().filter(|h| *h == hit).count()
    }

    pub fn clear_hits(&self) {
        self.lock().hits.clear();
    }

    /// Server-side notification list.
    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().notifications.clone()
    }

    pub fn set_notifications(&self, notifications: Vec<Notification>) {
        self.lock().notifications = notifications;
    }

    pub(crate) fn record(&self, hit: String) {
        self.lock().hits.push(hit);
    }
}

impl Data {
    pub fn issue(&mut self, email: &str) -> CredentialPair {
        let access = format!("at-{}", Uuid::new_v4());
        let refresh = format!("rt-{}", Uuid::new_v4());
        self.access.insert(access.clone(), email.to_owned());
        self.refresh.insert(refresh.clone(), email.to_owned());
        CredentialPair::new(access, Some(refresh))
    }

    pub fn account(&self, email: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.user.email == email)
    }
}

// ---------------------------------------------------------------------------
// Seed data
// ---------------------------------------------------------------------------

pub fn notification(id: u64, title: &str, read: bool) -> Notification {
    Notification {
        id: EntityId::from(id),
        title: title.to_owned(),
        message: format!("{title}."),
        read,
        kind: Some("request".into()),
        link: None,
        created_at: Some(Utc::now() - Duration::minutes(i64::try_from(id).unwrap_or(0))),
    }
}

fn request(id: u64, title: &str, status: &str, requester: &str) -> WorkRequest {
    WorkRequest {
        id: EntityId::from(id),
        title: title.to_owned(),
        status: status.to_owned(),
        kind: Some("leave".into()),
        requester_name: Some(requester.to_owned()),
        created_at: Some(Utc::now() - Duration::days(i64::try_from(id).unwrap_or(0))),
    }
}

fn option(value: &str, label: &str) -> ReferenceOption {
    ReferenceOption {
        value: value.to_owned(),
        label: label.to_owned(),
    }
}

fn seed() -> Data {
    let ana = SessionUser {
        id: EntityId::from(1u64),
        email: "ana@example.com".into(),
        name: Some("Ana Costa".into()),
        role: Role::Employee,
        company_id: Some(EntityId::from(10u64)),
    };
    let admin = SessionUser {
        id: EntityId::from(2u64),
        email: "admin@example.com".into(),
        name: Some("Bruno Admin".into()),
        role: Role::CompanyAdmin,
        company_id: Some(EntityId::from(10u64)),
    };

    let requests = vec![
        RequestDetails {
            summary: request(12, "Vacation in March", "pending", "Ana Costa"),
            description: Some("Two weeks starting March 3rd".into()),
            history: vec![RequestEvent {
                status: "pending".into(),
                note: None,
                actor: Some("Ana Costa".into()),
                at: Some(Utc::now() - Duration::days(12)),
            }],
            attachments: vec![Attachment {
                id: EntityId::from(1u64),
                file_name: "schedule.pdf".into(),
                url: Some("/files/schedule.pdf".into()),
            }],
        },
        RequestDetails {
            summary: request(13, "New laptop", "approved", "Carla Dias"),
            description: None,
            history: Vec::new(),
            attachments: Vec::new(),
        },
    ];

    let options = HashMap::from([
        (
            "departments".to_owned(),
            vec![option("eng", "Engineering"), option("ops", "Operations")],
        ),
        (
            "request-types".to_owned(),
            vec![option("leave", "Leave"), option("equipment", "Equipment")],
        ),
    ]);

    Data {
        accounts: vec![
            Account {
                user: ana.clone(),
                password: "secret".into(),
            },
            Account {
                user: admin.clone(),
                password: "admin".into(),
            },
        ],
        access: HashMap::new(),
        refresh: HashMap::new(),
        notifications: vec![
            notification(4, "Request approved", true),
            notification(5, "New comment", false),
            notification(6, "Request assigned", false),
        ],
        requests,
        role_summaries: vec![
            RoleSummary {
                id: ana.id.clone(),
                role: ana.role,
                name: "Ana Costa".into(),
                open_requests: 1,
                completed_requests: 4,
            },
            RoleSummary {
                id: admin.id.clone(),
                role: admin.role,
                name: "Bruno Admin".into(),
                open_requests: 0,
                completed_requests: 17,
            },
        ],
        options,
        credentials: vec![AdminCredential {
            id: EntityId::from(1u64),
            name: "payroll-export".into(),
            kind: Some("api_key".into()),
            created_at: Some(Utc::now() - Duration::days(30)),
        }],
        profile: EmployeeProfile {
            id: Some(ana.id.clone()),
            name: "Ana Costa".into(),
            email: ana.email.clone(),
            department: Some("eng".into()),
            position: Some("Developer".into()),
            phone: None,
        },
        knobs: Knobs::default(),
        hits: Vec::new(),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_are_live_until_revoked() {
        let state = MockState::seeded();
        let pair = state.issue_tokens("ana@example.com");
        let access = pair.access_token.unwrap();
        let refresh = pair.refresh_token.unwrap();

        assert!(state.lock().access.contains_key(&access));
        state.revoke_access_tokens();
        assert!(!state.lock().access.contains_key(&access));
        assert_eq!(
            state.lock().refresh.get(&refresh).map(String::as_str),
            Some("ana@example.com")
        );
    }

    #[test]
    fn knobs_start_off() {
        let state = MockState::seeded();
        let knobs = state.knobs();
        assert!(!knobs.reject_refresh && !knobs.reject_all);
        assert!(!knobs.legacy_token_field && !knobs.fail_mark_read);

        state.set_fail_mark_read(true);
        assert!(state.knobs().fail_mark_read);
    }

    #[test]
    fn hit_log_counts_exact_matches() {
        let state = MockState::seeded();
        state.record("GET /api/notifications".into());
        state.record("GET /api/notifications".into());
        state.record("PATCH /api/notifications/5/read".into());

        assert_eq!(state.count("GET /api/notifications"), 2);
        state.clear_hits();
        assert!(state.hits().is_empty());
    }

    #[test]
    fn seed_has_two_unread_notifications() {
        let unread = MockState::seeded()
            .notifications()
            .iter()
            .filter(|n| !n.read)
            .count();
        assert_eq!(unread, 2);
    }
}
