//! Topic-keyed, synchronous publish/subscribe.
//!
//! Subscribers are invoked in subscription order before [`NotificationBus::publish`]
//! returns. The subscriber list of a topic is snapshotted when a publish
//! starts, so a handler may subscribe, unsubscribe, or publish again while
//! it runs: changes take effect from the next publish on.
//!
//! A handler that returns an error does not stop dispatch. The failure is
//! logged, recorded in the [`DispatchReport`], and the remaining
//! subscribers still run. Panics are not caught.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Name of a notification channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Topic(pub &'static str);

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// An immutable (topic, payload) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification<P> {
    /// Topic the notification was published on.
    pub topic: Topic,
    /// Application payload.
    pub payload: P,
}

/// A subscriber's report that it could not handle a notification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    /// Wrap a failure message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// What a subscriber returns.
pub type HandlerResult = Result<(), HandlerError>;

type Handler<P> = Rc<dyn Fn(&Notification<P>) -> HandlerResult>;

/// Token returned by [`NotificationBus::subscribe`]; pass it back to
/// [`NotificationBus::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    topic: Topic,
    id: u64,
}

impl Subscription {
    /// The topic this subscription listens on.
    pub fn topic(&self) -> Topic {
        self.topic
    }
}

/// Outcome of one publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// Topic that was published.
    pub topic: Topic,
    /// Subscribers that handled the notification without error.
    pub delivered: usize,
    /// Errors returned by the remaining subscribers, in invocation order.
    pub failures: Vec<HandlerError>,
}

impl DispatchReport {
    /// `true` when no subscriber failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of subscribers invoked.
    pub fn invoked(&self) -> usize {
        self.delivered + self.failures.len()
    }
}

/// Synchronous topic-based notification bus.
///
/// All methods take `&self`; share the bus with `Rc` between the publishers
/// and the subscribers that need to publish in turn.
pub struct NotificationBus<P> {
    subscribers: RefCell<HashMap<Topic, Vec<(u64, Handler<P>)>>>,
    next_id: Cell<u64>,
}

impl<P> Default for NotificationBus<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> fmt::Debug for NotificationBus<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subscribers = self.subscribers.borrow();
        let mut topics: Vec<_> = subscribers.iter().map(|(t, s)| (t.0, s.len())).collect();
        topics.sort_unstable();
        f.debug_struct("NotificationBus")
            .field("topics", &topics)
            .finish()
    }
}

impl<P> NotificationBus<P> {
    /// Create a bus with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: RefCell::new(HashMap::new()),
            next_id: Cell::new(1),
        }
    }

    /// Register `handler` for `topic`. Handlers of a topic run in the order
    /// they subscribed.
    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> Subscription
    where
        F: Fn(&Notification<P>) -> HandlerResult + 'static,
    {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.subscribers
            .borrow_mut()
            .entry(topic)
            .or_default()
            .push((id, Rc::new(handler)));
        Subscription { topic, id }
    }

    /// Remove a subscription. Returns `false` if it was already removed.
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        let Some(handlers) = subscribers.get_mut(&subscription.topic) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(id, _)| *id != subscription.id);
        let removed = handlers.len() != before;
        if handlers.is_empty() {
            subscribers.remove(&subscription.topic);
        }
        removed
    }

    /// Deliver `payload` to every current subscriber of `topic`.
    pub fn publish(&self, topic: Topic, payload: P) -> DispatchReport {
        let snapshot: Vec<Handler<P>> = self
            .subscribers
            .borrow()
            .get(&topic)
            .map(|handlers| handlers.iter().map(|(_, h)| Rc::clone(h)).collect())
            .unwrap_or_default();

        let notification = Notification { topic, payload };
        let mut report = DispatchReport {
            topic,
            delivered: 0,
            failures: Vec::new(),
        };
        for handler in snapshot {
            match handler(&notification) {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    tracing::warn!(%topic, error = %err, "subscriber failed");
                    report.failures.push(err);
                }
            }
        }
        report
    }

    /// Number of current subscribers of `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.subscribers
            .borrow()
            .get(&topic)
            .map(Vec::len)
            .unwrap_or(0)
    }
}
