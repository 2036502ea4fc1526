//! # Portal SDK
//!
//! Client-side data layer for the internal portal front end.
//!
//! The SDK provides:
//!
//! * [`CredentialStore`]: access/refresh tokens in a session scope and a
//!   durable scope, with a change broadcast.
//! * [`GatewayClient`]: attaches the bearer credential and renews it
//!   once on a 401 through `POST /auth/refresh`.
//! * [`ResourceCache`]: per-resource loading state with request
//!   de-duplication, forced refresh and keyed entries.
//! * [`NotificationCenter`]: polls the notification feed while signed in
//!   and applies read-acknowledgements locally.
//! * Domain facades ([`AssignedRequests`], [`RequestDetailsCache`], …)
//!   and a [`Portal`] bundle wiring all of them to one client.
//!
//! Models from [`portal_models`] are re-exported for convenience.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use portal_sdk::{PersistMode, Portal};
//!
//! # async fn run() -> Result<(), portal_sdk::SdkError> {
//! let portal = Portal::from_env();
//! portal.session.login("ana@example.com", "secret", PersistMode::Both).await?;
//!
//! // Poll notifications every 30 s while signed in
//! let _poller = portal.notifications.start();
//! let requests = portal.assigned_requests.refresh(false).await?;
//! println!("{} assigned requests", requests.len());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod facades;
pub mod notifications;
pub mod portal;
pub mod request;
pub mod routes;
pub mod session;
pub mod storage;

pub use cache::{CacheEntry, CacheState, ResourceCache};
pub use client::{error_for_status, GatewayClient};
pub use config::GatewayConfig;
pub use credentials::{CredentialChanges, CredentialStore};
pub use error::SdkError;
pub use facades::{
    AdminCredentials, AssignedRequests, KeyedResource, ProfileResource, ReferenceOptions,
    RequestDetailsCache, Resource, RoleSummaries,
};
pub use notifications::{NotificationCenter, PollHandle, ReadAckPolicy};
pub use portal::Portal;
pub use request::{MultipartPart, RequestBody, RequestOptions, SendOptions};
pub use routes::ApiRoutes;
pub use session::Session;
pub use storage::{KeyValueStore, MemoryStore};

// Re-export the shared models for ergonomic usage.
pub use portal_models::*;
