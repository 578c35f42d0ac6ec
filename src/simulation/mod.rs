//! Concurrency problem scenarios and the machinery that runs them.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::error::IssuesError;
use crate::hub::SimulationHub;

pub mod agent;
mod problems;
pub mod service;
mod solutions;
pub mod task;

pub use agent::Agent;
pub use service::SimulationService;
pub use task::{Interrupted, SimulationTask, Worker};

/// Whether a scenario shows the problem or its fix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    /// The broken version
    Problems,
    /// The fixed version
    Solutions,
}

impl Mode {
    /// URL segment, eg `/ws/problems/...`
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Problems => "problems",
            Mode::Solutions => "solutions",
        }
    }

    /// Where the controller for this mode lives, eg `/simulate-problems`
    pub fn route_prefix(self) -> &'static str {
        match self {
            Mode::Problems => "/simulate-problems",
            Mode::Solutions => "/simulate-solutions",
        }
    }

    /// The listing page for this mode, where stop redirects to.
    pub fn index_path(self) -> &'static str {
        match self {
            Mode::Problems => "/problems",
            Mode::Solutions => "/solutions",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = IssuesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "problems" => Ok(Mode::Problems),
            "solutions" => Ok(Mode::Solutions),
            other => Err(IssuesError::NotFound(format!("mode {other}"))),
        }
    }
}

/// Which concurrency problem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Two workers each hold what the other needs
    Deadlock,
    /// One worker never gets the lock
    Starvation,
    /// Workers keep yielding to each other without progress
    Livelock,
}

impl Kind {
    /// All kinds, in the order they're listed on the index pages.
    pub const ALL: [Kind; 3] = [Kind::Deadlock, Kind::Starvation, Kind::Livelock];

    /// URL segment, eg `deadlock`
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Deadlock => "deadlock",
            Kind::Starvation => "starvation",
            Kind::Livelock => "livelock",
        }
    }

    /// Capitalised name for messages, eg `Deadlock`
    pub fn title(self) -> &'static str {
        match self {
            Kind::Deadlock => "Deadlock",
            Kind::Starvation => "Starvation",
            Kind::Livelock => "Livelock",
        }
    }

    /// Parse a page segment like `deadlock-page`.
    pub fn from_page(page: &str) -> Result<Self, IssuesError> {
        page.strip_suffix("-page")
            .ok_or_else(|| IssuesError::NotFound(format!("page {page}")))?
            .parse()
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = IssuesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Kind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| IssuesError::NotFound(format!("simulation {s}")))
    }
}

/// A WebSocket channel: one per (mode, kind).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Endpoint {
    /// problems or solutions
    pub mode: Mode,
    /// which scenario
    pub kind: Kind,
}

impl Endpoint {
    /// Pair a mode and a kind.
    pub fn new(mode: Mode, kind: Kind) -> Self {
        Self { mode, kind }
    }

    /// eg `/ws/problems/deadlock`
    pub fn path(self) -> String {
        format!("/ws/{}/{}", self.mode, self.kind)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/ws/{}/{}", self.mode, self.kind)
    }
}

/// What a scenario needs from the outside world.
#[derive(Clone, Debug)]
pub struct Stage {
    hub: SimulationHub,
    endpoint: Endpoint,
    db: Option<Arc<DatabaseConnection>>,
}

impl Stage {
    /// Without a database, reservations are not recorded.
    pub fn new(
        hub: SimulationHub,
        endpoint: Endpoint,
        db: Option<Arc<DatabaseConnection>>,
    ) -> Self {
        Self { hub, endpoint, db }
    }

    /// Where this scenario's messages go.
    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    fn say(&self, message: &str) {
        task::announce(&self.hub, self.endpoint, message);
    }

    fn worker(&self, task: &SimulationTask) -> Worker {
        task.worker(self.hub.clone(), self.endpoint, self.db.clone())
    }
}

/// The opening line broadcast when a scenario starts.
pub fn intro(endpoint: Endpoint) -> String {
    match endpoint.mode {
        Mode::Problems => format!("{} simulation started...", endpoint.kind.title()),
        Mode::Solutions => format!("{} solutions simulation started...", endpoint.kind.title()),
    }
}

/// Build the scenario for `stage`'s endpoint, with its workers registered but not started.
pub fn build(stage: &Stage) -> SimulationTask {
    match stage.endpoint.mode {
        Mode::Problems => problems::build(stage),
        Mode::Solutions => solutions::build(stage),
    }
}

/// Announce the intro and start every worker.
pub fn launch(stage: &Stage, task: &mut SimulationTask) {
    stage.say(&intro(stage.endpoint));
    task.start_all();
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub(crate) fn stage(mode: Mode, kind: Kind) -> (SimulationHub, Stage) {
        let hub = SimulationHub::new();
        let stage = Stage::new(hub.clone(), Endpoint::new(mode, kind), None);
        (hub, stage)
    }

    pub(crate) fn count(history: &[String], message: &str) -> usize {
        history.iter().filter(|line| *line == message).count()
    }
}
