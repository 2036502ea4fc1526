//! Canonical API paths consumed by the SDK.
//!
//! Every path the SDK requests is built through [`ApiRoutes`], so the
//! gateway, the facades and the mock backend agree on one layout.
//!
//! # Path layout
//!
//! ```text
//! POST   /auth/login
//! POST   /auth/refresh
//! GET    /api/notifications
//! PATCH  /api/notifications/{id}/read
//! PATCH  /api/notifications/read-all
//! GET    /api/requests/assigned
//! GET    /api/requests/{id}
//! GET    /api/roles/{id}/summary
//! GET    /api/options/{group}
//! GET    /api/admin/credentials          (POST to create)
//! DELETE /api/admin/credentials/{id}
//! GET    /api/employee/profile           (PUT to update)
//! ```
//!
//! Ids and group names are percent-encoded as a single path segment.

use std::fmt::Display;

/// Central authority for API paths.
///
/// # Examples
///
/// ```
/// use portal_sdk::ApiRoutes;
///
/// assert_eq!(ApiRoutes::notification_read(5), "/api/notifications/5/read");
/// assert_eq!(ApiRoutes::request(12), "/api/requests/12");
/// ```
pub struct ApiRoutes;

impl ApiRoutes {
    /// Credential login.
    pub const LOGIN: &'static str = "/auth/login";
    /// Access-token renewal.
    pub const REFRESH: &'static str = "/auth/refresh";
    /// Notification list.
    pub const NOTIFICATIONS: &'static str = "/api/notifications";
    /// Acknowledge every notification.
    pub const NOTIFICATIONS_READ_ALL: &'static str = "/api/notifications/read-all";
    /// Requests assigned to the signed-in user.
    pub const ASSIGNED_REQUESTS: &'static str = "/api/requests/assigned";
    /// Company admin credential list.
    pub const ADMIN_CREDENTIALS: &'static str = "/api/admin/credentials";
    /// Signed-in employee's profile.
    pub const EMPLOYEE_PROFILE: &'static str = "/api/employee/profile";

    /// Acknowledge one notification.
    pub fn notification_read(id: impl Display) -> String {
        format!("{}/{}/read", Self::NOTIFICATIONS, segment(id))
    }

    /// One request's details.
    pub fn request(id: impl Display) -> String {
        format!("/api/requests/{}", segment(id))
    }

    /// Aggregated counters for one role holder.
    pub fn role_summary(id: impl Display) -> String {
        format!("/api/roles/{}/summary", segment(id))
    }

    /// One group of select options (`departments`, `request-types`…).
    pub fn reference_options(group: impl Display) -> String {
        format!("/api/options/{}", segment(group))
    }

    /// One admin credential.
    pub fn admin_credential(id: impl Display) -> String {
        format!("{}/{}", Self::ADMIN_CREDENTIALS, segment(id))
    }
}

fn segment(value: impl Display) -> String {
    urlencoding::encode(&value.to_string()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_models::EntityId;

    #[test]
    fn entity_ids_render_into_paths() {
        let id = EntityId::new("req-9");
        assert_eq!(ApiRoutes::request(&id), "/api/requests/req-9");
        assert_eq!(ApiRoutes::role_summary(&id), "/api/roles/req-9/summary");
        assert_eq!(
            ApiRoutes::admin_credential(3),
            "/api/admin/credentials/3"
        );
    }

    #[test]
    fn reserved_characters_stay_inside_one_segment() {
        assert_eq!(
            ApiRoutes::reference_options("a/b c?"),
            "/api/options/a%2Fb%20c%3F"
        );
        assert_eq!(
            ApiRoutes::notification_read("x/../y"),
            "/api/notifications/x%2F..%2Fy/read"
        );
        assert_eq!(ApiRoutes::request("#1"), "/api/requests/%231");
    }

    #[test]
    fn option_groups() {
        assert_eq!(
            ApiRoutes::reference_options("departments"),
            "/api/options/departments"
        );
    }
}
