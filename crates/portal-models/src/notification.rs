//! In-app notifications and the locally derived unread counter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::EntityId;

/// A single notification as returned by `GET /api/notifications`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Notification id.
    pub id: EntityId,
    /// Short headline.
    #[serde(default)]
    pub title: String,
    /// Body text.
    #[serde(default)]
    pub message: String,
    /// Whether the user has acknowledged it.
    #[serde(default)]
    pub read: bool,
    /// Category reported by the backend (e.g. `"request_assigned"`).
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// In-app link the notification points to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body shapes the notification endpoint has been seen to return.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NotificationList {
    /// A bare JSON array.
    Bare(Vec<Notification>),
    /// An object wrapping the array.
    Wrapped {
        /// The notifications.
        notifications: Vec<Notification>,
    },
}

impl NotificationList {
    /// Unwrap into the item list.
    pub fn into_items(self) -> Vec<Notification> {
        match self {
            Self::Bare(items) => items,
            Self::Wrapped { notifications } => notifications,
        }
    }
}

/// Notification list plus unread counter.
///
/// The counter is derived by counting unread items whenever the list is
/// replaced from the server; local acknowledgements adjust it in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFeed {
    /// Notifications, newest first as delivered.
    pub items: Vec<Notification>,
    /// Number of unread notifications.
    pub unread: usize,
}

impl NotificationFeed {
    /// Build a feed from a freshly fetched list.
    pub fn from_items(items: Vec<Notification>) -> Self {
        let unread = items.iter().filter(|n| !n.read).count();
        Self { items, unread }
    }

    /// Flip one item to read and decrement the counter, floored at zero.
    ///
    /// An item that is already read leaves the counter alone.  An id that
    /// is not in the local list still decrements: the server knows about
    /// it even if this page does not.
    pub fn mark_read(&mut self, id: &EntityId) -> Acknowledgement {
        let mut ack = Acknowledgement::default();
        match self.items.iter_mut().find(|n| &n.id == id) {
            Some(item) if item.read => {}
            Some(item) => {
                item.read = true;
                ack.flipped.push(item.id.clone());
                ack.decremented = self.decrement(1);
            }
            None => ack.decremented = self.decrement(1),
        }
        ack
    }

    /// Flip every item to read and zero the counter.
    pub fn mark_all_read(&mut self) -> Acknowledgement {
        let flipped = self
            .items
            .iter_mut()
            .filter(|n| !n.read)
            .map(|n| {
                n.read = true;
                n.id.clone()
            })
            .collect();
        let decremented = std::mem::take(&mut self.unread);
        Acknowledgement {
            flipped,
            decremented,
        }
    }

    /// Undo a previous acknowledgement.
    ///
    /// Only the items the acknowledgement flipped are touched, so a list
    /// refreshed in the meantime keeps its newer entries.
    pub fn revert(&mut self, ack: &Acknowledgement) {
        for item in self.items.iter_mut().filter(|n| ack.flipped.contains(&n.id)) {
            item.read = false;
        }
        self.unread += ack.decremented;
    }

    fn decrement(&mut self, by: usize) -> usize {
        let applied = by.min(self.unread);
        self.unread -= applied;
        applied
    }
}

/// What a local read-acknowledgement changed, so it can be reverted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Acknowledgement {
    /// Items flipped from unread to read.
    pub flipped: Vec<EntityId>,
    /// Amount taken off the unread counter.
    pub decremented: usize,
}

impl Acknowledgement {
    /// `true` when nothing changed.
    pub fn is_noop(&self) -> bool {
        self.flipped.is_empty() && self.decremented == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(id: u64, read: bool) -> Notification {
        Notification {
            id: EntityId::from(id),
            title: format!("n{id}"),
            message: String::new(),
            read,
            kind: None,
            link: None,
            created_at: None,
        }
    }

    #[test]
    fn unread_is_counted_from_items() {
        let feed = NotificationFeed::from_items(vec![note(1, false), note(2, true), note(3, false)]);
        assert_eq!(feed.unread, 2);
    }

    #[test]
    fn mark_read_decrements_once() {
        let mut feed = NotificationFeed::from_items(vec![note(5, false), note(6, false)]);
        feed.mark_read(&EntityId::from(5u64));
        assert!(feed.items[0].read);
        assert_eq!(feed.unread, 1);

        feed.mark_read(&EntityId::from(5u64));
        assert_eq!(feed.unread, 1);
    }

    #[test]
    fn mark_read_never_goes_negative() {
        let mut feed = NotificationFeed::from_items(vec![note(1, true)]);
        feed.mark_read(&EntityId::from(99u64));
        assert_eq!(feed.unread, 0);
    }

    #[test]
    fn revert_restores_flipped_items_only() {
        let mut feed = NotificationFeed::from_items(vec![note(1, false), note(2, true)]);
        let ack = feed.mark_all_read();
        assert_eq!(ack.flipped, vec![EntityId::from(1u64)]);
        feed.revert(&ack);
        assert!(!feed.items[0].read);
        assert!(feed.items[1].read);
        assert_eq!(feed.unread, 1);
    }

    #[test]
    fn already_read_is_noop() {
        let mut feed = NotificationFeed::from_items(vec![note(1, true)]);
        assert!(feed.mark_read(&EntityId::from(1u64)).is_noop());
    }

    #[test]
    fn mark_all_read_zeroes() {
        let mut feed = NotificationFeed::from_items(vec![note(1, false), note(2, false)]);
        feed.mark_all_read();
        assert_eq!(feed.unread, 0);
        assert!(feed.items.iter().all(|n| n.read));
    }

    #[test]
    fn list_accepts_bare_and_wrapped() {
        let bare: NotificationList = serde_json::from_str(r#"[{"id":1,"read":false}]"#).unwrap();
        let wrapped: NotificationList =
            serde_json::from_str(r#"{"notifications":[{"id":"1","read":true}]}"#).unwrap();
        assert_eq!(bare.into_items()[0].id, EntityId::from(1u64));
        assert!(wrapped.into_items()[0].read);
    }
}
