//! One service per mode: holds the current scenario, starts it once somebody is watching,
//! and stops it on request.

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::task::announce;
use super::{Endpoint, Kind, Mode, SimulationTask, Stage, build, launch};
use crate::constants::{NO_SIMULATION, SIMULATION_STOPPED};
use crate::hub::SimulationHub;

#[derive(Debug)]
struct Current {
    stage: Stage,
    task: SimulationTask,
}

/// Snapshot of what the current scenario has said so far.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// Started, not interrupted, and at least one worker still going
    pub running: bool,
    /// WebSocket path of the current scenario, if there is one
    pub endpoint: Option<String>,
    /// Messages so far, oldest first
    pub messages: Vec<String>,
}

impl Progress {
    /// Plain-text rendition: one message per line.
    pub fn text(&self) -> String {
        if self.endpoint.is_none() {
            return NO_SIMULATION.to_string();
        }
        self.messages.join("\n")
    }
}

/// Runs at most one scenario at a time for its mode.
#[derive(Debug)]
pub struct SimulationService {
    mode: Mode,
    hub: SimulationHub,
    db: Option<Arc<DatabaseConnection>>,
    current: Mutex<Option<Current>>,
}

impl SimulationService {
    /// Scenarios record reservations in `db` when one is given.
    pub fn new(mode: Mode, hub: SimulationHub, db: Option<Arc<DatabaseConnection>>) -> Self {
        Self {
            mode,
            hub,
            db,
            current: Mutex::new(None),
        }
    }

    /// Replace the current scenario with `kind`. It starts now if a session is watching its
    /// endpoint, otherwise when one connects.
    pub async fn launch(&self, kind: Kind) {
        let endpoint = Endpoint::new(self.mode, kind);
        let mut current = self.current.lock().await;
        if let Some(previous) = current.take() {
            debug!("Interrupting {} to make way for {endpoint}", previous.stage.endpoint());
            previous.task.interrupt_all();
            // the old workers' last words must land before the history is wiped
            previous.task.join().await;
        }

        self.hub.clear_history(endpoint);
        let stage = Stage::new(self.hub.clone(), endpoint, self.db.clone());
        let mut task = build(&stage);

        debug!("Simulation set. Checking WebSocket connection status...");
        if self.hub.has_sessions(endpoint) {
            info!("WebSocket connection is ready. Starting {endpoint} immediately.");
            launch(&stage, &mut task);
        } else if self.hub.is_connection_established() {
            info!("No session on {endpoint} yet. Waiting...");
        } else {
            info!("WebSocket connection not yet established. Waiting...");
        }
        *current = Some(Current { stage, task });
    }

    /// Start the pending scenario if it belongs to `endpoint`. Returns whether it started.
    pub async fn start_pending(&self, endpoint: Endpoint) -> bool {
        let mut current = self.current.lock().await;
        match current.as_mut() {
            Some(Current { stage, task })
                if stage.endpoint() == endpoint
                    && !task.is_started()
                    && !task.is_interrupted() =>
            {
                info!("Starting simulation on {endpoint}...");
                launch(stage, task);
                true
            }
            _ => {
                debug!("No simulation to start on {endpoint}.");
                false
            }
        }
    }

    /// Interrupt the current scenario, tell its watchers, and close every session.
    /// Returns the kind that was stopped.
    pub async fn stop(&self) -> Option<Kind> {
        let Current { stage, task } = self.current.lock().await.take()?;
        task.interrupt_all();
        task.join().await;
        announce(&self.hub, stage.endpoint(), SIMULATION_STOPPED);
        self.hub.close_all();
        Some(stage.endpoint().kind)
    }

    /// The kind currently set, started or not.
    pub async fn current_kind(&self) -> Option<Kind> {
        self.current
            .lock()
            .await
            .as_ref()
            .map(|current| current.stage.endpoint().kind)
    }

    /// What the current scenario has said.
    pub async fn progress(&self) -> Progress {
        let current = self.current.lock().await;
        match current.as_ref() {
            None => Progress {
                running: false,
                endpoint: None,
                messages: Vec::new(),
            },
            Some(Current { stage, task }) => Progress {
                running: task.is_started() && !task.is_interrupted() && !task.is_finished(),
                endpoint: Some(stage.endpoint().path()),
                messages: self.hub.history(stage.endpoint()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::hub::HubEvent;

    fn service(mode: Mode) -> (SimulationHub, SimulationService) {
        let hub = SimulationHub::new();
        let service = SimulationService::new(mode, hub.clone(), None);
        (hub, service)
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_a_session_before_starting() {
        let (hub, service) = service(Mode::Problems);
        let endpoint = Endpoint::new(Mode::Problems, Kind::Deadlock);

        service.launch(Kind::Deadlock).await;
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(hub.history(endpoint).is_empty());
        let progress = service.progress().await;
        assert!(!progress.running);
        assert_eq!(progress.endpoint.as_deref(), Some("/ws/problems/deadlock"));
        assert_eq!(progress.text(), "");

        let other = Endpoint::new(Mode::Problems, Kind::Livelock);
        assert!(!service.start_pending(other).await);

        let _session = hub.connect(endpoint);
        assert!(service.start_pending(endpoint).await);
        assert!(!service.start_pending(endpoint).await);
        tokio::time::sleep(Duration::from_millis(10)).await;

        let progress = service.progress().await;
        assert!(progress.running);
        assert_eq!(progress.messages[0], "Deadlock simulation started...");
        assert!(progress.text().contains("Thread 1: Locked Resource A."));
    }

    #[tokio::test(start_paused = true)]
    async fn starts_immediately_when_someone_is_watching() {
        let (hub, service) = service(Mode::Solutions);
        let endpoint = Endpoint::new(Mode::Solutions, Kind::Livelock);
        let _session = hub.connect(endpoint);

        service.launch(Kind::Livelock).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(
            hub.history(endpoint)[0],
            "Livelock solutions simulation started..."
        );
        assert_eq!(service.current_kind().await, Some(Kind::Livelock));
    }

    #[tokio::test(start_paused = true)]
    async fn relaunching_interrupts_the_previous_scenario() {
        let (hub, service) = service(Mode::Problems);
        let deadlock = Endpoint::new(Mode::Problems, Kind::Deadlock);
        let starvation = Endpoint::new(Mode::Problems, Kind::Starvation);
        let _a = hub.connect(deadlock);
        let _b = hub.connect(starvation);

        service.launch(Kind::Deadlock).await;
        tokio::time::sleep(Duration::from_secs(3)).await;
        service.launch(Kind::Starvation).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        let old = hub.history(deadlock);
        assert!(old.contains(&"Thread 1 interrupted.".to_string()));
        assert!(old.contains(&"Thread 2 interrupted.".to_string()));
        assert_eq!(service.current_kind().await, Some(Kind::Starvation));
    }

    #[tokio::test(start_paused = true)]
    async fn relaunching_the_same_kind_starts_with_a_clean_history() {
        let (hub, service) = service(Mode::Problems);
        let deadlock = Endpoint::new(Mode::Problems, Kind::Deadlock);
        let _session = hub.connect(deadlock);

        service.launch(Kind::Deadlock).await;
        tokio::time::sleep(Duration::from_secs(3)).await;
        service.launch(Kind::Deadlock).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        let history = hub.history(deadlock);
        assert_eq!(history[0], "Deadlock simulation started...");
        assert!(
            !history.iter().any(|line| line.ends_with("interrupted.")),
            "previous run leaked into {history:?}"
        );
        assert!(history.contains(&"Thread 1: Locked Resource A.".to_string()));
        assert!(history.contains(&"Thread 2: Locked Resource B.".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_announces_and_closes_sessions() {
        let (hub, service) = service(Mode::Problems);
        let endpoint = Endpoint::new(Mode::Problems, Kind::Starvation);
        let _session = hub.connect(endpoint);
        let mut events = hub.subscribe();

        assert_eq!(service.stop().await, None);
        service.launch(Kind::Starvation).await;
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(service.stop().await, Some(Kind::Starvation));

        let mut saw_stopped = false;
        loop {
            match events.recv().await {
                Ok(HubEvent::Message { text, .. }) if text == SIMULATION_STOPPED => {
                    saw_stopped = true;
                }
                Ok(HubEvent::Message { text, .. }) if text.ends_with("interrupted.") => {
                    assert!(!saw_stopped, "worker spoke after the stop announcement");
                }
                Ok(HubEvent::CloseAll) => break,
                Ok(_) => {}
                Err(err) => panic!("hub closed early: {err}"),
            }
        }
        assert!(saw_stopped);
        assert_eq!(service.progress().await.text(), NO_SIMULATION);
        assert_eq!(service.current_kind().await, None);
    }
}
