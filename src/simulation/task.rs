//! A group of workers that start together and are interrupted together.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use sea_orm::DatabaseConnection;
use tokio::sync::{Mutex, MutexGuard, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::Endpoint;
use crate::db::entities::reservations;
use crate::hub::SimulationHub;

type PendingWorker = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Returned by [`Worker`] operations once the task has been interrupted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Interrupted;

impl std::fmt::Display for Interrupted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("interrupted")
    }
}

impl std::error::Error for Interrupted {}

/// Log a simulation message and fan it out to the endpoint's sessions.
pub(crate) fn announce(hub: &SimulationHub, endpoint: Endpoint, message: &str) {
    info!("[{endpoint}] {message}");
    hub.broadcast(endpoint, message);
}

/// Workers are registered first, then started all at once.
pub struct SimulationTask {
    pending: Vec<PendingWorker>,
    running: Vec<JoinHandle<()>>,
    stop: watch::Sender<bool>,
}

impl std::fmt::Debug for SimulationTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationTask")
            .field("pending", &self.pending.len())
            .field("running", &self.running.len())
            .field("interrupted", &*self.stop.borrow())
            .finish()
    }
}

impl Default for SimulationTask {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationTask {
    /// An empty task.
    pub fn new() -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            pending: Vec::new(),
            running: Vec::new(),
            stop,
        }
    }

    /// A context for a worker of this task. It sees this task's stop signal.
    pub fn worker(
        &self,
        hub: SimulationHub,
        endpoint: Endpoint,
        db: Option<Arc<DatabaseConnection>>,
    ) -> Worker {
        Worker {
            stop: self.stop.subscribe(),
            hub,
            endpoint,
            db,
        }
    }

    /// Register a worker. It won't run until [`SimulationTask::start_all`].
    pub fn add_worker<F>(&mut self, worker: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.pending.push(Box::pin(worker));
    }

    /// Spawn every registered worker. Must be called from within a tokio runtime.
    pub fn start_all(&mut self) {
        for worker in self.pending.drain(..) {
            self.running.push(tokio::spawn(worker));
        }
    }

    /// Raise the stop signal; workers notice it at their next pause or lock.
    pub fn interrupt_all(&self) {
        self.stop.send_replace(true);
    }

    /// Whether [`SimulationTask::interrupt_all`] has been called.
    pub fn is_interrupted(&self) -> bool {
        *self.stop.borrow()
    }

    /// Whether the workers have been spawned.
    pub fn is_started(&self) -> bool {
        !self.running.is_empty()
    }

    /// Number of registered workers, started or not.
    pub fn worker_count(&self) -> usize {
        self.pending.len() + self.running.len()
    }

    /// True once every started worker has returned.
    pub fn is_finished(&self) -> bool {
        self.running.iter().all(JoinHandle::is_finished)
    }

    /// Wait for every started worker to return.
    pub async fn join(self) {
        // dropping the sender early would read as an interrupt
        let Self { running, stop, .. } = self;
        for handle in running {
            if let Err(err) = handle.await {
                warn!("Simulation worker failed: {err}");
            }
        }
        drop(stop);
    }
}

/// What a worker holds: the stop signal and somewhere to report to.
#[derive(Debug)]
pub struct Worker {
    stop: watch::Receiver<bool>,
    hub: SimulationHub,
    endpoint: Endpoint,
    db: Option<Arc<DatabaseConnection>>,
}

impl Worker {
    /// Broadcast a message on this worker's endpoint.
    pub fn say(&self, message: &str) {
        announce(&self.hub, self.endpoint, message);
    }

    /// Whether the task has been interrupted.
    pub fn is_interrupted(&self) -> bool {
        *self.stop.borrow()
    }

    async fn stopped(&mut self) {
        // a dropped task counts as an interrupt
        let _ = self.stop.wait_for(|stop| *stop).await;
    }

    /// Sleep, unless interrupted first.
    pub async fn pause(&mut self, duration: Duration) -> Result<(), Interrupted> {
        if self.is_interrupted() {
            return Err(Interrupted);
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => Ok(()),
            _ = self.stopped() => Err(Interrupted),
        }
    }

    /// Wait for `lock`, unless interrupted first.
    pub async fn acquire<'a, T>(
        &mut self,
        lock: &'a Mutex<T>,
    ) -> Result<MutexGuard<'a, T>, Interrupted> {
        if self.is_interrupted() {
            return Err(Interrupted);
        }
        tokio::select! {
            guard = lock.lock() => Ok(guard),
            _ = self.stopped() => Err(Interrupted),
        }
    }

    /// Persist a booked slot, if this worker has a database. Failures are logged, not fatal.
    pub async fn record_reservation(&self, username: &str, slot: &str) {
        let Some(db) = self.db.as_deref() else {
            return;
        };
        if let Err(err) = reservations::record(db, username, slot, reservations::STATUS_BOOKED).await
        {
            warn!("[{}] Failed to record reservation: {err}", self.endpoint);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{Kind, Mode};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn endpoint() -> Endpoint {
        Endpoint::new(Mode::Problems, Kind::Deadlock)
    }

    #[tokio::test(start_paused = true)]
    async fn workers_wait_for_start_all() {
        let started = Arc::new(AtomicUsize::new(0));
        let mut task = SimulationTask::new();
        for _ in 0..2 {
            let started = started.clone();
            task.add_worker(async move {
                started.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(task.worker_count(), 2);
        tokio::task::yield_now().await;
        assert_eq!(started.load(Ordering::SeqCst), 0);
        assert!(!task.is_started());

        task.start_all();
        assert!(task.is_started());
        task.join().await;
        assert_eq!(started.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_cuts_a_pause_short() {
        let hub = SimulationHub::new();
        let mut task = SimulationTask::new();
        let mut worker = task.worker(hub.clone(), endpoint(), None);
        task.add_worker(async move {
            match worker.pause(Duration::from_secs(3600)).await {
                Ok(()) => worker.say("slept"),
                Err(Interrupted) => worker.say("woken"),
            }
        });
        task.start_all();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!task.is_finished());

        task.interrupt_all();
        assert!(task.is_interrupted());
        task.join().await;
        assert_eq!(hub.history(endpoint()), vec!["woken".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_cuts_a_lock_wait_short() {
        let hub = SimulationHub::new();
        let lock = Arc::new(Mutex::new(()));
        let held = lock.clone().lock_owned().await;

        let mut task = SimulationTask::new();
        let mut worker = task.worker(hub.clone(), endpoint(), None);
        let contended = lock.clone();
        task.add_worker(async move {
            if worker.acquire(&contended).await.is_err() {
                worker.say("gave up");
            }
        });
        task.start_all();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!task.is_finished());

        task.interrupt_all();
        task.join().await;
        drop(held);
        assert_eq!(hub.history(endpoint()), vec!["gave up".to_string()]);
    }

    #[tokio::test]
    async fn dropping_the_task_interrupts_workers() {
        let task = SimulationTask::new();
        let mut worker = task.worker(SimulationHub::new(), endpoint(), None);
        drop(task);
        assert_eq!(
            worker.pause(Duration::from_secs(3600)).await,
            Err(Interrupted)
        );
    }
}
