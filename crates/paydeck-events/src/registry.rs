//! Subscription registry, independent of channel lifetime
//!
//! Handlers are keyed by notification kind and outlive any single websocket
//! connection: registering before a channel exists is fine (the handler is
//! retained and serviced once one opens), and a reconnect reuses the same
//! registrations. Dispatch reads the registry at delivery time.

use std::collections::HashMap;
use std::sync::RwLock;

use tracing::debug;

use crate::notification::{Notification, NotificationKind};

type Handler = Box<dyn Fn(&Notification) + Send + Sync>;

/// Fan-out table: many handlers per notification kind.
#[derive(Default)]
pub struct SubscriptionRegistry {
    handlers: RwLock<HashMap<NotificationKind, Vec<Handler>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one notification kind.
    pub fn subscribe<F>(&self, kind: NotificationKind, handler: F)
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        let mut handlers = self.handlers.write().unwrap_or_else(|e| e.into_inner());
        handlers.entry(kind).or_default().push(Box::new(handler));
        debug!(?kind, "subscription registered");
    }

    /// Invoke every handler registered for the notification's kind.
    /// Returns the number of handlers called.
    pub fn dispatch(&self, notification: &Notification) -> usize {
        let handlers = self.handlers.read().unwrap_or_else(|e| e.into_inner());
        match handlers.get(&notification.kind()) {
            Some(registered) => {
                for handler in registered {
                    handler(notification);
                }
                registered.len()
            }
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::{RefillFailure, RefillOutcome};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn refill_succeeded(id: &str) -> Notification {
        Notification::RefillSucceeded(RefillOutcome {
            transaction_id: id.into(),
            account_id: "acc-1".into(),
            amount: 42.0,
            currency: "RUB".into(),
        })
    }

    #[test]
    fn dispatch_reaches_every_handler_of_the_kind() {
        let registry = SubscriptionRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = calls.clone();
            registry.subscribe(NotificationKind::RefillSucceeded, move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            });
        }

        let delivered = registry.dispatch(&refill_succeeded("tx-1"));
        assert_eq!(delivered, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn dispatch_skips_other_kinds() {
        let registry = SubscriptionRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        {
            let calls = calls.clone();
            registry.subscribe(NotificationKind::RefillFailedByGateway, move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            });
        }

        let delivered = registry.dispatch(&refill_succeeded("tx-2"));
        assert_eq!(delivered, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn handler_receives_the_payload() {
        let registry = SubscriptionRegistry::new();
        let seen = Arc::new(std::sync::Mutex::new(None));
        {
            let seen = seen.clone();
            registry.subscribe(NotificationKind::RefillFailedByBackend, move |n| {
                *seen.lock().unwrap() = Some(n.clone());
            });
        }

        let notification = Notification::RefillFailedByBackend(RefillFailure {
            transaction_id: "tx-3".into(),
            reason: Some("insufficient funds".into()),
        });
        registry.dispatch(&notification);

        assert_eq!(seen.lock().unwrap().clone(), Some(notification));
    }
}
