//! The fixed versions of each scenario.

use std::sync::Arc;

use tokio::sync::Mutex;

use super::{Agent, Kind, SimulationTask, Stage};
use crate::constants::{
    DEADLOCK_HOLD, FAIR_HIGH_HOLD, FAIR_LOW_HOLD, LIVELOCK_ADJUST, LIVELOCK_BACKOFF,
    LIVELOCK_MAX_ATTEMPTS,
};

pub(super) fn build(stage: &Stage) -> SimulationTask {
    match stage.endpoint().kind {
        Kind::Deadlock => deadlock(stage),
        Kind::Starvation => starvation(stage),
        Kind::Livelock => livelock(stage),
    }
}

/// Both threads take A before B, so neither can hold what the other is waiting on.
fn deadlock(stage: &Stage) -> SimulationTask {
    let mut task = SimulationTask::new();
    let resource_a = Arc::new(Mutex::new(()));
    let resource_b = Arc::new(Mutex::new(()));

    for thread in 1..=2 {
        let mut worker = stage.worker(&task);
        let resource_a = resource_a.clone();
        let resource_b = resource_b.clone();
        task.add_worker(async move {
            let Ok(_a) = worker.acquire(&resource_a).await else {
                worker.say(&format!("Thread {thread} interrupted."));
                return;
            };
            worker.say(&format!("Thread {thread}: Locked Resource A."));
            if worker.pause(DEADLOCK_HOLD).await.is_err() {
                worker.say(&format!("Thread {thread} interrupted."));
                return;
            }
            let Ok(_b) = worker.acquire(&resource_b).await else {
                worker.say(&format!("Thread {thread} interrupted."));
                return;
            };
            worker.say(&format!("Thread {thread}: Locked Resource B."));
        });
    }
    task
}

/// tokio's mutex hands the lock out in FIFO order, so the low-priority user gets its turn.
fn starvation(stage: &Stage) -> SimulationTask {
    let mut task = SimulationTask::new();
    let reservation_lock = Arc::new(Mutex::new(0u32));

    for (label, username, hold) in [
        ("High-priority user", "high-priority", FAIR_HIGH_HOLD),
        ("Low-priority user", "low-priority", FAIR_LOW_HOLD),
    ] {
        let mut worker = stage.worker(&task);
        let reservation_lock = reservation_lock.clone();
        task.add_worker(async move {
            loop {
                let Ok(mut booked) = worker.acquire(&reservation_lock).await else {
                    worker.say(&format!("{label} interrupted."));
                    return;
                };
                *booked += 1;
                worker.say(&format!("{label}: Reserved a slot."));
                worker
                    .record_reservation(username, &format!("Slot {}", *booked))
                    .await;
                if worker.pause(hold).await.is_err() {
                    worker.say(&format!("{label} interrupted."));
                    return;
                }
            }
        });
    }
    task
}

/// Same dance as the problem, but each thread gives up after a bounded number of attempts.
fn livelock(stage: &Stage) -> SimulationTask {
    let mut task = SimulationTask::new();
    let agents = [Arc::new(Agent::new()), Arc::new(Agent::new())];

    for (thread, me, other) in [
        (1, agents[0].clone(), agents[1].clone()),
        (2, agents[1].clone(), agents[0].clone()),
    ] {
        let mut worker = stage.worker(&task);
        task.add_worker(async move {
            let mut attempts = 0;
            loop {
                let paused = if other.is_acting() {
                    worker.pause(LIVELOCK_BACKOFF).await
                } else {
                    me.act();
                    worker.say(&format!("Thread {thread}: Adjusting..."));
                    worker.pause(LIVELOCK_ADJUST).await
                };
                if paused.is_err() {
                    worker.say(&format!("Thread {thread} interrupted."));
                    return;
                }
                attempts += 1;
                if attempts > LIVELOCK_MAX_ATTEMPTS {
                    worker.say(&format!("Thread {thread}: Breaking livelock."));
                    return;
                }
            }
        });
    }
    task
}
