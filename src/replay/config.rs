//! Scenario file format
//!
//! Defines the data structures for deserializing YAML replay scenarios.

use serde::Deserialize;

use crate::facade::{Breakpoint, ThreadId};
use crate::view::ColorBar;

/// A complete scenario loaded from a YAML file
#[derive(Deserialize, Debug)]
pub struct Scenario {
    /// Name of the scenario
    pub name: String,
    /// Optional description of what the scenario verifies
    pub description: Option<String>,
    /// Threads that exist in the session before it is bound
    #[serde(default)]
    pub threads: Vec<ThreadSpec>,
    /// Current thread before the session is bound
    pub current: Option<ThreadId>,
    /// The sequence of steps to execute
    pub steps: Vec<Step>,
}

/// A thread present before the session is bound
#[derive(Deserialize, Debug)]
pub struct ThreadSpec {
    pub id: ThreadId,
    pub name: String,
    /// Breakpoint the thread is already suspended at
    pub stopped_at: Option<Breakpoint>,
}

/// A single step of the scenario
///
/// Engine steps always drive the scenario's own session, even after
/// `bind_other` switched the registry away from it.
#[derive(Deserialize, Debug)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Bind the registry to the scenario session
    Bind,
    /// Bind the registry to a fresh, empty session
    BindOther { session: u64 },
    /// Bind nothing
    Unbind,
    StartThread { thread: ThreadId, name: String },
    KillThread { thread: ThreadId },
    HitBreakpoint { thread: ThreadId, breakpoint: Breakpoint },
    Suspend { thread: ThreadId },
    Resume { thread: ThreadId },
    MakeCurrent { thread: Option<ThreadId> },
    Lockers {
        thread: ThreadId,
        lockers: Option<Vec<ThreadId>>,
    },
    StepInterrupted {
        thread: ThreadId,
        breakpoint: Option<Breakpoint>,
    },
    /// Report deadlocks; an empty list clears them
    Deadlock { groups: Vec<Vec<ThreadId>> },
    Disconnect,
    /// Press "go to hit"
    GoToHit {
        /// Thread expected to become current
        expect_thread: Option<ThreadId>,
        /// Whether the action is expected to fail (no hits)
        #[serde(default)]
        expect_error: bool,
    },
    /// Press "resume blocking threads"
    ResumeLockers,
    Filters { show: bool },
    /// Check registry and banner state
    Expect(Expectation),
}

/// Assertions on registry and view state
#[derive(Deserialize, Debug, Default)]
pub struct Expectation {
    /// Hit threads, most recent first
    pub hits: Option<Vec<ThreadId>>,
    /// Current-thread history, most recent first
    pub history: Option<Vec<ThreadId>>,
    /// Tracked threads in id order
    pub tracked: Option<Vec<ThreadId>>,
    /// Top banner name, or `none`
    pub top_banner: Option<String>,
    /// Visible banner names, lowest rank first
    pub visible: Option<Vec<String>>,
    /// Hits banner count
    pub hits_count: Option<usize>,
    /// Hits banner text
    pub hits_text: Option<String>,
    /// Whether any session is bound
    pub bound: Option<bool>,
    /// Lockers of the recorded lock relation, empty when there is none
    pub lockers: Option<Vec<ThreadId>>,
    /// Row bars of the tracked threads, in id order
    pub bars: Option<Vec<ColorBar>>,
}
