//! Degradation notifications for linkwatch.
//!
//! - [`ActionHandler`] -- the capability every notification backend implements.
//! - [`NotificationDispatcher`] -- ordered registry that invokes each handler.
//! - [`delivery`] -- built-in backends (SMTP mail, webhook, log-only).

pub mod delivery;
pub mod dispatcher;
pub mod handler;

pub use delivery::email::{EmailError, MailConfig, MailHandler};
pub use delivery::log::LogHandler;
pub use delivery::webhook::{WebhookConfig, WebhookError, WebhookHandler};
pub use dispatcher::{DispatchError, DispatchPolicy, NotificationDispatcher};
pub use handler::{ActionHandler, DeliveryError, Notification};
