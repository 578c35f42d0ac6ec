//! Fan-out of simulation messages to WebSocket sessions.
//!
//! Every session subscribes to the same channel and filters on its own endpoint. The hub also
//! keeps the last few messages per endpoint so the progress page can show them.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tracing::debug;

use crate::constants::{HISTORY_LIMIT, HUB_CHANNEL_CAPACITY};
use crate::simulation::Endpoint;

/// What sessions receive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HubEvent {
    /// A line for the sessions on `endpoint`
    Message {
        /// which channel
        endpoint: Endpoint,
        /// the text to forward
        text: String,
    },
    /// Every session should close normally
    CloseAll,
}

#[derive(Debug)]
struct HubInner {
    events: broadcast::Sender<HubEvent>,
    sessions: Mutex<HashMap<Endpoint, usize>>,
    history: Mutex<HashMap<Endpoint, VecDeque<String>>>,
    established: AtomicBool,
}

/// Shared handle; clones point at the same hub.
#[derive(Clone, Debug)]
pub struct SimulationHub {
    inner: Arc<HubInner>,
}

impl Default for SimulationHub {
    fn default() -> Self {
        Self::new()
    }
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SimulationHub {
    /// A hub with no sessions and no history.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(HUB_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(HubInner {
                events,
                sessions: Mutex::new(HashMap::new()),
                history: Mutex::new(HashMap::new()),
                established: AtomicBool::new(false),
            }),
        }
    }

    /// Receive every event from now on. Subscribe before [`SimulationHub::connect`] so nothing
    /// sent in between is missed.
    pub fn subscribe(&self) -> broadcast::Receiver<HubEvent> {
        self.inner.events.subscribe()
    }

    /// Register an open session on `endpoint`. Dropping the guard unregisters it.
    pub fn connect(&self, endpoint: Endpoint) -> SessionGuard {
        *locked(&self.inner.sessions).entry(endpoint).or_default() += 1;
        self.inner.established.store(true, Ordering::SeqCst);
        debug!("WebSocket connection established on {endpoint}");
        SessionGuard {
            hub: self.clone(),
            endpoint,
        }
    }

    fn disconnect(&self, endpoint: Endpoint) {
        let mut sessions = locked(&self.inner.sessions);
        if let Some(count) = sessions.get_mut(&endpoint) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                sessions.remove(&endpoint);
            }
        }
        debug!("WebSocket connection closed on {endpoint}");
    }

    /// Whether a session is open on `endpoint` right now.
    pub fn has_sessions(&self, endpoint: Endpoint) -> bool {
        locked(&self.inner.sessions)
            .get(&endpoint)
            .is_some_and(|count| *count > 0)
    }

    /// Number of open sessions across all endpoints.
    pub fn session_count(&self) -> usize {
        locked(&self.inner.sessions).values().sum()
    }

    /// Whether any session has ever connected.
    pub fn is_connection_established(&self) -> bool {
        self.inner.established.load(Ordering::SeqCst)
    }

    /// Record `text` in the endpoint's history and send it to its sessions.
    pub fn broadcast(&self, endpoint: Endpoint, text: &str) {
        {
            let mut history = locked(&self.inner.history);
            let lines = history.entry(endpoint).or_default();
            if lines.len() == HISTORY_LIMIT {
                lines.pop_front();
            }
            lines.push_back(text.to_string());
        }
        // no receivers is fine; the message is still in the history
        let _ = self.inner.events.send(HubEvent::Message {
            endpoint,
            text: text.to_string(),
        });
    }

    /// Ask every session to close.
    pub fn close_all(&self) {
        let _ = self.inner.events.send(HubEvent::CloseAll);
    }

    /// The messages kept for `endpoint`, oldest first.
    pub fn history(&self, endpoint: Endpoint) -> Vec<String> {
        locked(&self.inner.history)
            .get(&endpoint)
            .map(|lines| lines.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Forget what was said on `endpoint`.
    pub fn clear_history(&self, endpoint: Endpoint) {
        locked(&self.inner.history).remove(&endpoint);
    }
}

/// Keeps a session registered for as long as it lives.
#[derive(Debug)]
pub struct SessionGuard {
    hub: SimulationHub,
    endpoint: Endpoint,
}

impl SessionGuard {
    /// The endpoint this session is registered on.
    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.hub.disconnect(self.endpoint);
    }
}
