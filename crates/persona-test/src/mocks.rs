//! Mock event subscribers.

use std::sync::{Arc, Mutex, PoisonError};

use persona::{EventSubscriber, ProfileEvent};

/// Subscriber that records every event it receives.
///
/// Clones share the same log, so a clone can be handed to the manager
/// while the test keeps the original.
#[derive(Debug, Clone, Default)]
pub struct RecordingSubscriber {
    events: Arc<Mutex<Vec<ProfileEvent>>>,
}

impl RecordingSubscriber {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorder as a shareable subscriber.
    #[must_use]
    pub fn shared(&self) -> Arc<dyn EventSubscriber> {
        Arc::new(self.clone())
    }

    /// Every event received so far.
    #[must_use]
    pub fn events(&self) -> Vec<ProfileEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Events whose [`event_type`](ProfileEvent::event_type) is `kind`.
    #[must_use]
    pub fn of_type(&self, kind: &str) -> Vec<ProfileEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.event_type() == kind)
            .collect()
    }

    /// The most recent event.
    #[must_use]
    pub fn last(&self) -> Option<ProfileEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Forget every recorded event.
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl EventSubscriber for RecordingSubscriber {
    fn on_event(&self, event: &ProfileEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "recording"
    }
}
