//! Everything the front end needs, wired to one client.

use crate::client::GatewayClient;
use crate::config::GatewayConfig;
use crate::credentials::CredentialStore;
use crate::facades::{
    AdminCredentials, AssignedRequests, ProfileResource, ReferenceOptions, RequestDetailsCache,
    RoleSummaries,
};
use crate::notifications::NotificationCenter;
use crate::session::Session;

/// One gateway client plus every facade built on it.
///
/// All facades share the client's credential store, so a login or logout
/// through [`Portal::session`] is seen by each of them.
#[derive(Clone)]
pub struct Portal {
    pub client: GatewayClient,
    pub session: Session,
    pub notifications: NotificationCenter,
    pub assigned_requests: AssignedRequests,
    pub request_details: RequestDetailsCache,
    pub role_summaries: RoleSummaries,
    pub reference_options: ReferenceOptions,
    pub admin_credentials: AdminCredentials,
    pub profile: ProfileResource,
}

impl Portal {
    pub fn new(config: GatewayConfig, credentials: CredentialStore) -> Self {
        Self::from_client(GatewayClient::new(config, credentials))
    }

    /// Configuration from the environment, in-memory credentials.
    pub fn from_env() -> Self {
        Self::new(GatewayConfig::from_env(), CredentialStore::in_memory())
    }

    pub fn from_client(client: GatewayClient) -> Self {
        Self {
            session: Session::new(&client),
            notifications: NotificationCenter::new(&client),
            assigned_requests: AssignedRequests::new(&client),
            request_details: RequestDetailsCache::new(&client),
            role_summaries: RoleSummaries::new(&client),
            reference_options: ReferenceOptions::new(&client),
            admin_credentials: AdminCredentials::new(&client),
            profile: ProfileResource::new(&client),
            client,
        }
    }

    /// Sign out and forget every cached resource.
    pub fn logout(&self) {
        self.session.logout();
        self.reset_caches();
    }

    pub fn reset_caches(&self) {
        self.notifications.reset();
        self.assigned_requests.reset();
        self.request_details.reset();
        self.role_summaries.reset();
        self.reference_options.reset();
        self.admin_credentials.reset();
        self.profile.reset();
    }
}
