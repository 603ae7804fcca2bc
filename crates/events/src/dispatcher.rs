//! Ordered fan-out of a notification to every registered handler.

use crate::handler::{ActionHandler, DeliveryError, Notification};

/// What to do when a handler fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DispatchPolicy {
    /// Abort at the first failing handler; later handlers are not invoked.
    #[default]
    FailFast,
    /// Invoke every handler, then report the first failure (if any).
    ContinueOnError,
}

/// A handler failure, tagged with the handler's name.
#[derive(Debug, thiserror::Error)]
#[error("Handler '{handler}' failed: {source}")]
pub struct DispatchError {
    pub handler: String,
    #[source]
    pub source: DeliveryError,
}

/// Holds the registered handlers and invokes them in registration order.
#[derive(Default)]
pub struct NotificationDispatcher {
    handlers: Vec<Box<dyn ActionHandler>>,
    policy: DispatchPolicy,
}

impl NotificationDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: DispatchPolicy) -> Self {
        Self {
            handlers: Vec::new(),
            policy,
        }
    }

    pub fn policy(&self) -> DispatchPolicy {
        self.policy
    }

    /// Append a handler to the end of the invocation order.
    pub fn register(&mut self, handler: impl ActionHandler + 'static) {
        self.register_boxed(Box::new(handler));
    }

    pub fn register_boxed(&mut self, handler: Box<dyn ActionHandler>) {
        tracing::debug!(handler = handler.name(), "Registered notification handler");
        self.handlers.push(handler);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn handler_names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Invoke every handler in order.
    ///
    /// Returns the number of handlers that completed successfully.
    pub async fn dispatch(&self, notification: &Notification<'_>) -> Result<usize, DispatchError> {
        let mut delivered = 0;
        let mut first_error: Option<DispatchError> = None;

        for handler in &self.handlers {
            tracing::debug!(handler = handler.name(), "Invoking notification handler");

            match handler.perform_action(notification).await {
                Ok(()) => delivered += 1,
                Err(source) => {
                    let err = DispatchError {
                        handler: handler.name().to_string(),
                        source,
                    };
                    match self.policy {
                        DispatchPolicy::FailFast => return Err(err),
                        DispatchPolicy::ContinueOnError => {
                            tracing::error!(
                                error = %err,
                                "Notification handler failed, continuing"
                            );
                            if first_error.is_none() {
                                first_error = Some(err);
                            }
                        }
                    }
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(delivered),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
