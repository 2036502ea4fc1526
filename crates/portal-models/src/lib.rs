#![deny(missing_docs)]

//! # Portal Models
//!
//! Data types exchanged between the portal front end and its HTTP
//! gateway.
//!
//! ## Module layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`ids`] | `EntityId`, the string-or-number key used by entity caches |
//! | [`credentials`] | `CredentialPair`, `TokenKind`, `PersistMode` |
//! | [`session`] | `Role`, `SessionUser`, login / refresh response shapes |
//! | [`notification`] | `Notification`, `NotificationFeed` |
//! | [`resources`] | Work requests, role summaries, reference options, admin credentials, employee profile |
//! | [`error`] | `ModelError` |

pub mod credentials;
pub mod error;
pub mod ids;
pub mod notification;
pub mod resources;
pub mod session;

// Re-export all public types at crate root for convenience.
pub use credentials::*;
pub use error::*;
pub use ids::*;
pub use notification::*;
pub use resources::*;
pub use session::*;
