//! Notification poll synchronizer.
//!
//! [`NotificationCenter`] keeps the notification feed fresh with a
//! fixed-period background refresh while the session is authenticated,
//! and applies read-acknowledgements to the local feed without waiting
//! for a refetch.
//!
//! The poll loop follows the credential store's change notification:
//! as soon as an access token appears it fetches immediately, then once
//! per period; when the token goes away the timer is dropped and no
//! further fetch is issued until the next login.

use std::time::Duration;

use portal_models::{Acknowledgement, EntityId, NotificationFeed, NotificationList};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::cache::{CacheEntry, ResourceCache};
use crate::client::GatewayClient;
use crate::credentials::CredentialStore;
use crate::error::SdkError;
use crate::request::RequestOptions;
use crate::routes::ApiRoutes;

/// What to do with a local read-acknowledgement when the server write
/// fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ReadAckPolicy {
    /// Keep the local change and log the failure.  The local unread
    /// counter may then disagree with the server until the next poll.
    #[default]
    KeepOptimistic,
    /// Undo exactly what the acknowledgement changed.
    Rollback,
}

/// Notification feed with polling and read-acknowledgement.
#[derive(Clone)]
pub struct NotificationCenter {
    client: GatewayClient,
    cache: ResourceCache<(), NotificationFeed>,
    period: Duration,
    policy: ReadAckPolicy,
}

impl NotificationCenter {
    /// Center polling at the client's configured period.
    pub fn new(client: &GatewayClient) -> Self {
        let http = client.clone();
        let cache = ResourceCache::authenticated(
            "notifications",
            client.credentials().clone(),
            move |()| {
                let http = http.clone();
                async move {
                    let list: NotificationList = http
                        .fetch_json(ApiRoutes::NOTIFICATIONS, RequestOptions::get())
                        .await?;
                    Ok(NotificationFeed::from_items(list.into_items()))
                }
            },
        );

        Self {
            client: client.clone(),
            cache,
            period: client.config().poll_period,
            policy: ReadAckPolicy::default(),
        }
    }

    /// Override the poll period.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Override the failure policy for read-acknowledgements.
    pub fn with_policy(mut self, policy: ReadAckPolicy) -> Self {
        self.policy = policy;
        self
    }

    // ------------------------------------------------------------------
    // Cache surface
    // ------------------------------------------------------------------

    /// Current `{data, loading, loaded, error}`.
    pub fn snapshot(&self) -> CacheEntry<NotificationFeed> {
        self.cache.entry()
    }

    /// Unread counter of the cached feed (0 before the first load).
    pub fn unread(&self) -> usize {
        self.cache.entry().data.map_or(0, |feed| feed.unread)
    }

    /// Serve, join or fetch the feed.
    pub async fn refresh(&self, force: bool) -> Result<NotificationFeed, SdkError> {
        self.cache.load(force).await
    }

    /// Splice a local change into the feed.
    pub fn set_data(&self, update: impl FnOnce(&mut Option<NotificationFeed>)) {
        self.cache.update(update)
    }

    /// Back to the default entry.
    pub fn reset(&self) {
        self.cache.reset()
    }

    // ------------------------------------------------------------------
    // Read acknowledgement
    // ------------------------------------------------------------------

    /// Acknowledge one notification.
    ///
    /// The local feed flips the item to read and decrements the unread
    /// counter (never below zero) as the request goes out.  Failures are
    /// logged, not returned; what happens to the local change is decided
    /// by the [`ReadAckPolicy`].  Returns whether the server accepted.
    pub async fn mark_read(&self, id: &EntityId) -> bool {
        let ack = self.acknowledge(|feed| feed.mark_read(id));
        let result = self
            .client
            .execute(&ApiRoutes::notification_read(id), RequestOptions::patch())
            .await;
        self.settle_ack(result, ack, "mark-read")
    }

    /// Acknowledge every notification and zero the unread counter.
    pub async fn mark_all_read(&self) -> bool {
        let ack = self.acknowledge(NotificationFeed::mark_all_read);
        let result = self
            .client
            .execute(ApiRoutes::NOTIFICATIONS_READ_ALL, RequestOptions::patch())
            .await;
        self.settle_ack(result, ack, "mark-all-read")
    }

    fn acknowledge(
        &self,
        apply: impl FnOnce(&mut NotificationFeed) -> Acknowledgement,
    ) -> Acknowledgement {
        let mut ack = Acknowledgement::default();
        self.cache.update(|data| {
            if let Some(feed) = data {
                ack = apply(feed);
            }
        });
        ack
    }

    fn settle_ack(&self, result: Result<(), SdkError>, ack: Acknowledgement, action: &str) -> bool {
        let Err(error) = result else {
            return true;
        };

        match self.policy {
            ReadAckPolicy::KeepOptimistic => {
                warn!(%error, action, "notification acknowledgement failed, keeping local state");
            }
            ReadAckPolicy::Rollback => {
                warn!(%error, action, "notification acknowledgement failed, rolling back");
                if !ack.is_noop() {
                    self.cache.update(|data| {
                        if let Some(feed) = data {
                            feed.revert(&ack);
                        }
                    });
                }
            }
        }
        false
    }

    // ------------------------------------------------------------------
    // Polling
    // ------------------------------------------------------------------

    /// Start the background poll loop.
    ///
    /// The loop lives until the returned handle is stopped or dropped.
    pub fn start(&self) -> PollHandle {
        let center = self.clone();
        let credentials = self.client.credentials().clone();
        PollHandle {
            task: tokio::spawn(poll_loop(center, credentials)),
        }
    }
}

async fn poll_loop(center: NotificationCenter, credentials: CredentialStore) {
    let mut changes = credentials.subscribe();

    loop {
        while !credentials.is_authenticated() {
            if !changes.changed().await {
                return;
            }
        }

        info!(period = ?center.period, "notification polling started");
        let mut ticker = tokio::time::interval(center.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(error) = center.refresh(true).await {
                        warn!(%error, "notification poll failed");
                    }
                }
                alive = changes.changed() => {
                    if !alive {
                        return;
                    }
                    if !credentials.is_authenticated() {
                        break;
                    }
                }
            }
        }

        info!("notification polling stopped");
    }
}

/// Handle to a running poll loop; dropping it stops the loop.
pub struct PollHandle {
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Stop polling.  No fetch is started after this returns.
    pub fn stop(self) {
        // Drop does the work.
    }

    /// Whether the loop is still running.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
