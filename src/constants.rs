//! Shared constants for pacing, paths and page text
//!

use std::time::Duration;

/// How long a deadlocking worker holds its first resource before reaching for the second.
pub const DEADLOCK_HOLD: Duration = Duration::from_millis(1000);

/// How long the greedy user in the starvation problem sits on the reservation lock.
pub const STARVATION_HIGH_HOLD: Duration = Duration::from_millis(1000);

/// How often the starved user complains.
pub const STARVATION_LOW_RETRY: Duration = Duration::from_millis(1500);

/// Hold times for the fair-lock starvation fix.
pub const FAIR_HIGH_HOLD: Duration = Duration::from_millis(500);
/// See [`FAIR_HIGH_HOLD`].
pub const FAIR_LOW_HOLD: Duration = Duration::from_millis(1000);

/// Pause after a livelock agent adjusts.
pub const LIVELOCK_ADJUST: Duration = Duration::from_millis(1000);

/// Back-off while the other agent is acting, so a waiting worker never hogs the runtime.
pub const LIVELOCK_BACKOFF: Duration = Duration::from_millis(50);

/// Attempts a livelock worker makes before giving up, in the fixed scenario.
pub const LIVELOCK_MAX_ATTEMPTS: u32 = 5;

/// Messages kept per WebSocket endpoint for the progress page.
pub const HISTORY_LIMIT: usize = 200;

/// Buffer size of the hub's fan-out channel.
pub const HUB_CHANNEL_CAPACITY: usize = 1024;

/// Rows shown on the reservations page.
pub const RESERVATIONS_PAGE_SIZE: u64 = 50;

/// Progress text returned when nothing has been launched.
pub const NO_SIMULATION: &str = "No simulation is running.";

/// Broadcast on the running endpoint when a simulation is stopped.
pub const SIMULATION_STOPPED: &str = "Simulation stopped.";

/// Database file used when none is configured.
pub const DEFAULT_DATABASE_PATH: &str = "parallelization.sqlite";
