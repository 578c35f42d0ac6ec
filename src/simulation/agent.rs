//! A participant in the livelock scenarios.

use std::sync::atomic::{AtomicBool, Ordering};

/// Tracks whether it is currently acting; each [`Agent::act`] flips that.
#[derive(Debug, Default)]
pub struct Agent {
    acting: AtomicBool,
}

impl Agent {
    /// A new agent is not acting.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start acting if idle, stop if acting.
    pub fn act(&self) {
        self.acting.fetch_xor(true, Ordering::SeqCst);
    }

    /// Whether the agent is currently acting.
    pub fn is_acting(&self) -> bool {
        self.acting.load(Ordering::SeqCst)
    }
}
