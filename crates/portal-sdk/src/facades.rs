//! Thin per-domain wrappers over [`ResourceCache`].
//!
//! Each facade supplies one fetch function (status-checked JSON `GET`)
//! and exposes the same surface: `snapshot`, `refresh`, `set_data`.
//! Write operations that return the changed entity splice it in with
//! `set_data` instead of refetching the list.

use std::fmt::{Debug, Display};
use std::hash::Hash;

use portal_models::{
    AdminCredential, EmployeeProfile, EntityId, NewAdminCredential, ProfileUpdate,
    ReferenceOption, RequestDetails, RoleSummary, WorkRequest,
};
use serde::de::DeserializeOwned;
use tracing::info;

use crate::cache::{CacheEntry, ResourceCache};
use crate::client::GatewayClient;
use crate::error::SdkError;
use crate::request::RequestOptions;
use crate::routes::ApiRoutes;

/// Requests assigned to the signed-in user.
pub type AssignedRequests = Resource<Vec<WorkRequest>>;
/// Company admin credential list.
pub type AdminCredentials = Resource<Vec<AdminCredential>>;
/// Signed-in employee's profile.
pub type ProfileResource = Resource<EmployeeProfile>;
/// Request details, one entry per request id.
pub type RequestDetailsCache = KeyedResource<EntityId, RequestDetails>;
/// Role-holder summaries, one entry per id.
pub type RoleSummaries = KeyedResource<EntityId, RoleSummary>;
/// Select options, one entry per option group.
pub type ReferenceOptions = KeyedResource<String, Vec<ReferenceOption>>;

// ---------------------------------------------------------------------------
// Resource
// ---------------------------------------------------------------------------

/// An unkeyed cached resource.
pub struct Resource<T> {
    client: GatewayClient,
    cache: ResourceCache<(), T>,
}

impl<T> Clone for Resource<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<T> Resource<T>
where
    T: DeserializeOwned + Clone + Default + Send + Sync + 'static,
{
    /// Resource fetched with an authenticated `GET path`.
    pub fn from_path(name: &str, client: &GatewayClient, path: &'static str) -> Self {
        let http = client.clone();
        let cache = ResourceCache::authenticated(name, client.credentials().clone(), move |()| {
            let http = http.clone();
            async move { http.fetch_json(path, RequestOptions::get()).await }
        });
        Self {
            client: client.clone(),
            cache,
        }
    }

    /// Current `{data, loading, loaded, error}`.
    pub fn snapshot(&self) -> CacheEntry<T> {
        self.cache.entry()
    }

    /// Serve from cache, join the in-flight fetch, or fetch.
    pub async fn refresh(&self, force: bool) -> Result<T, SdkError> {
        self.cache.load(force).await
    }

    /// Splice a local change into the cached data.
    pub fn set_data(&self, update: impl FnOnce(&mut Option<T>)) {
        self.cache.update(update)
    }

    /// Back to the default entry.
    pub fn reset(&self) {
        self.cache.reset()
    }

    /// The underlying coordinator.
    pub fn cache(&self) -> &ResourceCache<(), T> {
        &self.cache
    }

    fn require_session(&self) -> Result<(), SdkError> {
        if self.client.credentials().is_authenticated() {
            Ok(())
        } else {
            Err(SdkError::Unauthenticated)
        }
    }
}

impl Resource<Vec<WorkRequest>> {
    /// `GET /api/requests/assigned`.
    pub fn new(client: &GatewayClient) -> Self {
        Self::from_path("assigned requests", client, ApiRoutes::ASSIGNED_REQUESTS)
    }
}

impl Resource<Vec<AdminCredential>> {
    /// `GET /api/admin/credentials`.
    pub fn new(client: &GatewayClient) -> Self {
        Self::from_path("admin credentials", client, ApiRoutes::ADMIN_CREDENTIALS)
    }

    /// Create a credential and append it to the cached list.
    pub async fn create(&self, new: &NewAdminCredential) -> Result<AdminCredential, SdkError> {
        self.require_session()?;
        let created: AdminCredential = self
            .client
            .fetch_json(ApiRoutes::ADMIN_CREDENTIALS, RequestOptions::post().json(new)?)
            .await?;

        info!(id = %created.id, "admin credential created");
        let appended = created.clone();
        self.set_data(move |data| data.get_or_insert_with(Vec::new).push(appended));
        Ok(created)
    }

    /// Delete a credential and drop it from the cached list.
    pub async fn delete(&self, id: &EntityId) -> Result<(), SdkError> {
        self.require_session()?;
        self.client
            .execute(&ApiRoutes::admin_credential(id), RequestOptions::delete())
            .await?;

        info!(%id, "admin credential deleted");
        self.set_data(|data| {
            if let Some(list) = data {
                list.retain(|c| &c.id != id);
            }
        });
        Ok(())
    }
}

impl Resource<EmployeeProfile> {
    /// `GET /api/employee/profile`.
    pub fn new(client: &GatewayClient) -> Self {
        Self::from_path("employee profile", client, ApiRoutes::EMPLOYEE_PROFILE)
    }

    /// Update the profile and replace the cached copy with the server's.
    pub async fn update(&self, changes: &ProfileUpdate) -> Result<EmployeeProfile, SdkError> {
        self.require_session()?;
        let updated: EmployeeProfile = self
            .client
            .fetch_json(ApiRoutes::EMPLOYEE_PROFILE, RequestOptions::put().json(changes)?)
            .await?;

        let replacement = updated.clone();
        self.set_data(move |data| *data = Some(replacement));
        Ok(updated)
    }
}

// ---------------------------------------------------------------------------
// KeyedResource
// ---------------------------------------------------------------------------

/// A cached resource partitioned by entity key.
///
/// Loading and error state are tracked per key, so fetching one entity
/// never blocks or clobbers another.
pub struct KeyedResource<K, T> {
    cache: ResourceCache<K, T>,
}

impl<K, T> Clone for KeyedResource<K, T> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
        }
    }
}

impl<K, T> KeyedResource<K, T>
where
    K: Eq + Hash + Clone + Debug + Display + Send + Sync + 'static,
    T: DeserializeOwned + Clone + Default + Send + Sync + 'static,
{
    /// Resource fetched with an authenticated `GET route(key)`.
    pub fn from_route(name: &str, client: &GatewayClient, route: fn(&K) -> String) -> Self {
        let http = client.clone();
        let cache = ResourceCache::authenticated(name, client.credentials().clone(), move |key: K| {
            let http = http.clone();
            let path = route(&key);
            async move { http.fetch_json(&path, RequestOptions::get()).await }
        });
        Self { cache }
    }

    /// Current state for `key`.
    pub fn snapshot(&self, key: &K) -> CacheEntry<T> {
        self.cache.snapshot(key)
    }

    /// Serve, join or fetch the entity `key`.
    pub async fn refresh(&self, key: K, force: bool) -> Result<T, SdkError> {
        self.cache.refresh(key, force).await
    }

    /// Splice a local change into one entity.
    pub fn set_data(&self, key: &K, update: impl FnOnce(&mut Option<T>)) {
        self.cache.set_data(key, update)
    }

    /// Drop every entity back to the default entry.
    pub fn reset(&self) {
        self.cache.reset()
    }

    /// The underlying coordinator.
    pub fn cache(&self) -> &ResourceCache<K, T> {
        &self.cache
    }
}

impl KeyedResource<EntityId, RequestDetails> {
    /// `GET /api/requests/{id}`.
    pub fn new(client: &GatewayClient) -> Self {
        Self::from_route("request details", client, |id| ApiRoutes::request(id))
    }
}

impl KeyedResource<EntityId, RoleSummary> {
    /// `GET /api/roles/{id}/summary`.
    pub fn new(client: &GatewayClient) -> Self {
        Self::from_route("role summaries", client, |id| ApiRoutes::role_summary(id))
    }
}

impl KeyedResource<String, Vec<ReferenceOption>> {
    /// `GET /api/options/{group}`.
    pub fn new(client: &GatewayClient) -> Self {
        Self::from_route("reference options", client, |group| {
            ApiRoutes::reference_options(group)
        })
    }
}
