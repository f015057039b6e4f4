//! Application event listeners
//!
//! Applications register callbacks by their callback name (`onCallRinging`).
//! The two-character prefix is stripped to find the event (`CallRinging`),
//! and every matching call event is delivered as an [`EventMessage`].

use std::sync::Arc;

use dashmap::DashMap;
use leenphone_call_core::events::EventIterator;
use leenphone_call_core::{CallEvent, CallEventKind, SyncEvent};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{BridgeError, BridgeResult};

/// Event as delivered to application callbacks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMessage {
    pub name: String,
    pub body: serde_json::Value,
}

impl EventMessage {
    pub fn from_event(event: &CallEvent) -> Self {
        let body = serde_json::to_value(&event.payload).unwrap_or_else(|e| {
            warn!(event = event.name(), error = %e, "Event payload not serializable");
            serde_json::Value::Null
        });
        Self {
            name: event.name().to_string(),
            body,
        }
    }
}

/// Application callback
pub type Listener = Arc<dyn Fn(&EventMessage) + Send + Sync>;

struct Registration {
    kind: CallEventKind,
    listener: Listener,
}

/// Registry of application callbacks keyed by registration id
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    registrations: Arc<DashMap<Uuid, Registration>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` under an application callback name
    ///
    /// Fails for names that do not map to a known event.
    pub fn add_listener<F>(&self, callback_name: &str, listener: F) -> BridgeResult<ListenerHandle>
    where
        F: Fn(&EventMessage) + Send + Sync + 'static,
    {
        let kind = CallEventKind::from_callback_name(callback_name).ok_or_else(|| {
            BridgeError::invalid_argument("callback_name", format!("no event for callback {}", callback_name))
        })?;

        let id = Uuid::new_v4();
        self.registrations.insert(
            id,
            Registration {
                kind,
                listener: Arc::new(listener),
            },
        );
        debug!(%id, event = kind.name(), "Listener added");

        Ok(ListenerHandle {
            id,
            kind,
            registrations: Arc::clone(&self.registrations),
        })
    }

    /// Deliver one call event to every listener registered for it
    ///
    /// Returns the number of listeners called.
    pub fn dispatch(&self, event: &CallEvent) -> usize {
        // Collect first so callbacks may add or remove listeners
        let listeners: Vec<Listener> = self
            .registrations
            .iter()
            .filter(|entry| entry.kind == event.kind)
            .map(|entry| Arc::clone(&entry.listener))
            .collect();
        if listeners.is_empty() {
            return 0;
        }

        let message = EventMessage::from_event(event);
        for listener in &listeners {
            listener(&message);
        }
        listeners.len()
    }

    pub fn listener_count(&self) -> usize {
        self.registrations.len()
    }

    pub fn listener_count_for(&self, kind: CallEventKind) -> usize {
        self.registrations.iter().filter(|entry| entry.kind == kind).count()
    }

    /// Forward call events from the reconciler to listeners until the channel closes
    pub fn spawn_forwarder(&self, mut events: EventIterator) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if let SyncEvent::Call(event) = event {
                    registry.dispatch(&event);
                }
            }
            debug!("Event forwarder stopped");
        })
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.registrations.len())
            .finish()
    }
}

/// Keeps a listener registered until [`ListenerHandle::remove`] is called
pub struct ListenerHandle {
    id: Uuid,
    kind: CallEventKind,
    registrations: Arc<DashMap<Uuid, Registration>>,
}

impl ListenerHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn event(&self) -> CallEventKind {
        self.kind
    }

    /// Unregister the listener; returns `false` if it was already gone
    pub fn remove(self) -> bool {
        self.registrations.remove(&self.id).is_some()
    }
}

impl std::fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("id", &self.id)
            .field("event", &self.kind)
            .finish()
    }
}
