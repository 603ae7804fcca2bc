//! Built-in notification backends.
//!
//! Each backend implements [`ActionHandler`](crate::ActionHandler) and is
//! registered with the dispatcher at startup; adding a backend never
//! requires touching the dispatcher.

pub mod email;
pub mod log;
pub mod webhook;
