//! Endpoint handlers.

use axum::extract::{Json, Path, Request, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, Method, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use portal_models::{
    AdminCredential, CredentialPair, EmployeeProfile, EntityId, LoginRequest, NewAdminCredential,
    Notification, ProfileUpdate, ReferenceOption, RefreshRequest, RequestDetails, RoleSummary,
    SessionUser, TokenGrant, WorkRequest,
};
use serde_json::{json, Value};
use tracing::info;

use crate::error::MockError;
use crate::state::MockState;

// ---------------------------------------------------------------------------
// Middleware
// ---------------------------------------------------------------------------

/// Append `"METHOD /path"` to the hit log.
pub async fn record_hit(State(state): State<MockState>, request: Request, next: Next) -> Response {
    let hit = format!("{} {}", request.method(), request.uri().path());
    tracing::debug!(%hit, "mock request");
    state.record(hit);
    next.run(request).await
}

/// Reject requests without a live bearer token.
pub async fn require_bearer(
    State(state): State<MockState>,
    request: Request,
    next: Next,
) -> Result<Response, MockError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    {
        let data = state.lock();
        if data.knobs.reject_all {
            return Err(MockError::Unauthorized);
        }
        if !token.is_some_and(|t| data.access.contains_key(t)) {
            return Err(MockError::Unauthorized);
        }
    }

    Ok(next.run(request).await)
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

fn grant_body(legacy: bool, pair: CredentialPair, user: Option<SessionUser>) -> Value {
    let grant = if legacy {
        TokenGrant {
            legacy_access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            user,
            ..TokenGrant::default()
        }
    } else {
        TokenGrant {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            user,
            ..TokenGrant::default()
        }
    };
    json!(grant)
}

/// `POST /auth/login`
pub async fn login(
    State(state): State<MockState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<Value>, MockError> {
    let mut data = state.lock();
    let user = data
        .account(&req.email)
        .filter(|a| a.password == req.password)
        .map(|a| a.user.clone())
        .ok_or(MockError::InvalidLogin)?;

    let pair = data.issue(&user.email);
    info!(email = %user.email, "login");
    Ok(Json(grant_body(data.knobs.legacy_token_field, pair, Some(user))))
}

/// `POST /auth/refresh`: rotates the refresh token.
pub async fn refresh(
    State(state): State<MockState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<Value>, MockError> {
    let mut data = state.lock();
    if data.knobs.reject_refresh {
        return Err(MockError::RefreshRejected);
    }
    let email = data
        .refresh
        .remove(&req.refresh_token)
        .ok_or(MockError::RefreshRejected)?;

    let pair = data.issue(&email);
    info!(%email, "tokens refreshed");
    Ok(Json(grant_body(data.knobs.legacy_token_field, pair, None)))
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// `GET /api/notifications`
pub async fn notifications(State(state): State<MockState>) -> Json<Vec<Notification>> {
    Json(state.lock().notifications.clone())
}

/// `PATCH /api/notifications/{id}/read`
pub async fn mark_read(
    State(state): State<MockState>,
    Path(id): Path<String>,
) -> Result<StatusCode, MockError> {
    let mut data = state.lock();
    if data.knobs.fail_mark_read {
        return Err(MockError::Injected("could not mark notification as read".into()));
    }
    let item = data
        .notifications
        .iter_mut()
        .find(|n| n.id.as_str() == id)
        .ok_or_else(|| MockError::NotFound(format!("notification {id}")))?;
    item.read = true;
    Ok(StatusCode::NO_CONTENT)
}

/// `PATCH /api/notifications/read-all`
pub async fn mark_all_read(State(state): State<MockState>) -> Result<StatusCode, MockError> {
    let mut data = state.lock();
    if data.knobs.fail_mark_read {
        return Err(MockError::Injected("could not mark notifications as read".into()));
    }
    for item in &mut data.notifications {
        item.read = true;
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Requests, roles, options
// ---------------------------------------------------------------------------

/// `GET /api/requests/assigned`
pub async fn assigned_requests(State(state): State<MockState>) -> Json<Vec<WorkRequest>> {
    let data = state.lock();
    Json(data.requests.iter().map(|r| r.summary.clone()).collect())
}

/// `GET /api/requests/{id}`
pub async fn request_details(
    State(state): State<MockState>,
    Path(id): Path<String>,
) -> Result<Json<RequestDetails>, MockError> {
    state
        .lock()
        .requests
        .iter()
        .find(|r| r.summary.id.as_str() == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| MockError::NotFound(format!("request {id}")))
}

/// `GET /api/roles/{id}/summary`
pub async fn role_summary(
    State(state): State<MockState>,
    Path(id): Path<String>,
) -> Result<Json<RoleSummary>, MockError> {
    state
        .lock()
        .role_summaries
        .iter()
        .find(|r| r.id.as_str() == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| MockError::NotFound(format!("role holder {id}")))
}

/// `GET /api/options/{group}`
pub async fn reference_options(
    State(state): State<MockState>,
    Path(group): Path<String>,
) -> Result<Json<Vec<ReferenceOption>>, MockError> {
    state
        .lock()
        .options
        .get(&group)
        .cloned()
        .map(Json)
        .ok_or_else(|| MockError::NotFound(format!("option group {group}")))
}

// ---------------------------------------------------------------------------
// Admin credentials
// ---------------------------------------------------------------------------

/// `GET /api/admin/credentials`
pub async fn list_credentials(State(state): State<MockState>) -> Json<Vec<AdminCredential>> {
    Json(state.lock().credentials.clone())
}

/// `POST /api/admin/credentials`
pub async fn create_credential(
    State(state): State<MockState>,
    Json(req): Json<NewAdminCredential>,
) -> (StatusCode, Json<AdminCredential>) {
    let mut data = state.lock();
    let next = data
        .credentials
        .iter()
        .filter_map(|c| c.id.as_str().parse::<u64>().ok())
        .max()
        .unwrap_or(0)
        + 1;
    let created = AdminCredential {
        id: EntityId::from(next),
        name: req.name,
        kind: req.kind,
        created_at: Some(Utc::now()),
    };
    data.credentials.push(created.clone());
    (StatusCode::CREATED, Json(created))
}

/// `DELETE /api/admin/credentials/{id}`
pub async fn delete_credential(
    State(state): State<MockState>,
    Path(id): Path<String>,
) -> Result<StatusCode, MockError> {
    let mut data = state.lock();
    let before = data.credentials.len();
    data.credentials.retain(|c| c.id.as_str() != id);
    if data.credentials.len() == before {
        return Err(MockError::NotFound(format!("credential {id}")));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// `GET /api/employee/profile`
pub async fn profile(State(state): State<MockState>) -> Json<EmployeeProfile> {
    Json(state.lock().profile.clone())
}

/// `PUT /api/employee/profile`
pub async fn update_profile(
    State(state): State<MockState>,
    Json(update): Json<ProfileUpdate>,
) -> Json<EmployeeProfile> {
    let mut data = state.lock();
    let profile = &mut data.profile;
    if let Some(name) = update.name {
        profile.name = name;
    }
    if let Some(department) = update.department {
        profile.department = Some(department);
    }
    if let Some(phone) = update.phone {
        profile.phone = Some(phone);
    }
    Json(profile.clone())
}

// ---------------------------------------------------------------------------
// Debug
// ---------------------------------------------------------------------------

/// Reflect what the client sent.
pub async fn echo(method: Method, headers: HeaderMap, body: String) -> Json<Value> {
    let header = |name: HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    };
    Json(json!({
        "method": method.as_str(),
        "authorization": header(AUTHORIZATION),
        "contentType": header(CONTENT_TYPE),
        "body": body,
    }))
}
