//! The broken versions: each scenario exhibits its problem and runs until stopped.

use std::sync::Arc;

use tokio::sync::Mutex;

use super::{Agent, Kind, SimulationTask, Stage};
use crate::constants::{
    DEADLOCK_HOLD, LIVELOCK_ADJUST, LIVELOCK_BACKOFF, STARVATION_HIGH_HOLD, STARVATION_LOW_RETRY,
};

pub(super) fn build(stage: &Stage) -> SimulationTask {
    match stage.endpoint().kind {
        Kind::Deadlock => deadlock(stage),
        Kind::Starvation => starvation(stage),
        Kind::Livelock => livelock(stage),
    }
}

/// Thread 1 takes A then wants B, thread 2 takes B then wants A.
fn deadlock(stage: &Stage) -> SimulationTask {
    let mut task = SimulationTask::new();
    let resource_a = Arc::new(Mutex::new(()));
    let resource_b = Arc::new(Mutex::new(()));

    let plans = [
        (1, resource_a.clone(), "A", resource_b.clone(), "B"),
        (2, resource_b, "B", resource_a, "A"),
    ];
    for (thread, first, first_name, second, second_name) in plans {
        let mut worker = stage.worker(&task);
        task.add_worker(async move {
            let Ok(_first) = worker.acquire(&first).await else {
                worker.say(&format!("Thread {thread} interrupted."));
                return;
            };
            worker.say(&format!("Thread {thread}: Locked Resource {first_name}."));
            if worker.pause(DEADLOCK_HOLD).await.is_err() {
                worker.say(&format!("Thread {thread} interrupted."));
                return;
            }
            worker.say(&format!(
                "Thread {thread}: Waiting to lock Resource {second_name}..."
            ));
            match worker.acquire(&second).await {
                Ok(_second) => {
                    worker.say(&format!("Thread {thread}: Locked Resource {second_name}."))
                }
                Err(_) => worker.say(&format!("Thread {thread} interrupted.")),
            }
        });
    }
    task
}

/// The high-priority user never lets go of the lock; the low-priority user only gets to wait.
fn starvation(stage: &Stage) -> SimulationTask {
    let mut task = SimulationTask::new();
    let reservation_lock = Arc::new(Mutex::new(0u32));

    let mut high = stage.worker(&task);
    task.add_worker(async move {
        loop {
            let Ok(mut booked) = high.acquire(&reservation_lock).await else {
                high.say("High-priority user interrupted.");
                return;
            };
            *booked += 1;
            high.say("High-priority user: Reserved a slot.");
            high.record_reservation("high-priority", &format!("Slot {}", *booked))
                .await;
            if high.pause(STARVATION_HIGH_HOLD).await.is_err() {
                high.say("High-priority user interrupted.");
                return;
            }
        }
    });

    let mut low = stage.worker(&task);
    task.add_worker(async move {
        loop {
            low.say("Low-priority user: Waiting for a chance to book...");
            if low.pause(STARVATION_LOW_RETRY).await.is_err() {
                low.say("Low-priority user interrupted.");
                return;
            }
        }
    });

    task
}

/// Each agent only acts while the other is idle, so they keep stepping around each other.
fn livelock(stage: &Stage) -> SimulationTask {
    let mut task = SimulationTask::new();
    let agents = [Arc::new(Agent::new()), Arc::new(Agent::new())];

    for (thread, me, other) in [
        (1, agents[0].clone(), agents[1].clone()),
        (2, agents[1].clone(), agents[0].clone()),
    ] {
        let mut worker = stage.worker(&task);
        task.add_worker(async move {
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
            }
        });
    }
    task
}
