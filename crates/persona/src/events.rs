//! Profile events and the subscriber registry.
//!
//! The manager publishes a [`ProfileEvent`] after every lifecycle
//! operation, every successful option write, and every failed config load.
//! Subscribers run synchronously on the caller's thread, in no particular
//! order.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::error::LoadError;
use crate::outcome::{AddOutcome, DeleteOutcome, SwitchOutcome};

/// Something that happened to the profile set or the active profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProfileEvent {
    /// `add` ran.
    Added(AddOutcome),
    /// `switch_to` ran, or `init` activated a profile.
    Switched(SwitchOutcome),
    /// `del` ran.
    Deleted(DeleteOutcome),
    /// A value in the active profile was written or reset.
    OptionChanged {
        /// Attribute key.
        key: String,
        /// New exposed value.
        value: Value,
        /// Exposed value before the change.
        former: Option<Value>,
    },
    /// The active profile's config file could not be loaded.
    Error(LoadError),
}

impl ProfileEvent {
    /// Short name of the event kind.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Added(_) => "added",
            Self::Switched(_) => "switched",
            Self::Deleted(_) => "deleted",
            Self::OptionChanged { .. } => "option_changed",
            Self::Error(_) => "error",
        }
    }

    /// Whether the event reports a failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        match self {
            Self::Added(o) => o.err.is_some(),
            Self::Switched(o) => o.err.is_some(),
            Self::Deleted(o) => o.err.is_some(),
            Self::OptionChanged { .. } => false,
            Self::Error(_) => true,
        }
    }
}

/// Receiver of profile events.
///
/// Closures taking `&ProfileEvent` implement this trait.
pub trait EventSubscriber: Send + Sync {
    /// Called once per published event. Should return quickly.
    fn on_event(&self, event: &ProfileEvent);

    /// Name used in logs.
    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "anonymous"
    }
}

impl<F> EventSubscriber for F
where
    F: Fn(&ProfileEvent) + Send + Sync,
{
    fn on_event(&self, event: &ProfileEvent) {
        self(event);
    }
}

/// Handle returned by [`SubscriberRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Set of subscribers that receive every published event.
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: DashMap<SubscriberId, Arc<dyn EventSubscriber>>,
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("subscriber_count", &self.subscribers.len())
            .finish()
    }
}

impl SubscriberRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber.
    pub fn register(&self, subscriber: Arc<dyn EventSubscriber>) -> SubscriberId {
        let id = SubscriberId::new();
        debug!(subscriber_name = %subscriber.name(), "Subscriber registered");
        self.subscribers.insert(id, subscriber);
        id
    }

    /// Remove a subscriber. Returns `true` if it was registered.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let removed = self.subscribers.remove(&id).is_some();
        if removed {
            debug!("Subscriber unregistered");
        }
        removed
    }

    /// Deliver `event` to every subscriber.
    ///
    /// A panicking subscriber is logged and does not stop delivery to the
    /// others. Subscribers may register or unregister from inside
    /// `on_event`; the change applies from the next event.
    pub fn notify(&self, event: &ProfileEvent) {
        let targets: Vec<(SubscriberId, Arc<dyn EventSubscriber>)> = self
            .subscribers
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();

        for (id, subscriber) in targets {
            trace!(
                subscriber_name = %subscriber.name(),
                event_type = event.event_type(),
                "Notifying subscriber"
            );
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                subscriber.on_event(event);
            }));
            if let Err(e) = result {
                warn!(
                    subscriber_id = ?id,
                    subscriber_name = %subscriber.name(),
                    error = ?e,
                    "Subscriber panicked"
                );
            }
        }
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Whether no subscriber is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Remove every subscriber.
    pub fn clear(&self) {
        self.subscribers.clear();
        debug!("All subscribers cleared");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::LifecycleError;

    fn added(name: &str) -> ProfileEvent {
        ProfileEvent::Added(AddOutcome {
            err: None,
            name: name.to_owned(),
        })
    }

    #[test]
    fn test_register_notify_unregister() {
        let registry = SubscriberRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = registry.register(Arc::new(move |event: &ProfileEvent| {
            sink.lock().unwrap().push(event.clone());
        }));
        assert_eq!(registry.len(), 1);

        registry.notify(&added("work"));
        assert_eq!(seen.lock().unwrap().as_slice(), &[added("work")]);

        assert!(registry.unregister(id));
        assert!(!registry.unregister(id));
        registry.notify(&added("home"));
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_panicking_subscriber_does_not_block_others() {
        let registry = SubscriberRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        registry.register(Arc::new(|_: &ProfileEvent| panic!("boom")));
        let counter = Arc::clone(&count);
        registry.register(Arc::new(move |_: &ProfileEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        registry.notify(&added("x"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_event_metadata() {
        let failed = ProfileEvent::Deleted(DeleteOutcome {
            err: Some(LifecycleError::NotFound("x".into())),
            name: "x".into(),
        });
        assert_eq!(failed.event_type(), "deleted");
        assert!(failed.is_failure());
        assert!(!added("y").is_failure());

        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["type"], "deleted");
        assert_eq!(json["err"]["code"], "not_found");
    }
}
