//! Identities and notification payloads exchanged with the debug engine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a debug session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

/// Identity of a debuggee thread
///
/// Carries no state of its own: suspension, breakpoint and lock information
/// is always read back from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(pub u64);

/// Handle returned by listener registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Debug session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Connection is being established
    Starting,
    /// Debuggee is running
    Running,
    /// At least one thread is suspended
    Stopped,
    /// Terminal: the connection is gone
    Disconnected,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting => write!(f, "starting"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
            Self::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// A breakpoint a thread is suspended at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub id: u32,
    /// Human readable location, e.g. `Main.java:42`
    pub description: String,
}

impl Breakpoint {
    pub fn new(id: u32, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
        }
    }
}

/// A group of threads that block each other
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deadlock {
    pub threads: Vec<ThreadId>,
}

impl Deadlock {
    pub fn contains(&self, thread: ThreadId) -> bool {
        self.threads.contains(&thread)
    }
}

/// Session-level notifications
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    CurrentThreadChanged,
    ThreadStarted(ThreadId),
    ThreadDied(ThreadId),
    StateChanged(SessionState),
    DeadlockDetected(Vec<Deadlock>),
}

/// Per-thread notifications
///
/// Most variants only say *what* changed; the new value is read back from the
/// engine. Step interruption is carried in the event because the engine clears
/// it as soon as the thread resumes.
#[derive(Debug, Clone, PartialEq)]
pub enum ThreadEvent {
    BreakpointChanged,
    SuspendedChanged,
    LockerThreadsChanged,
    StepSuspendedByBreakpoint(Option<Breakpoint>),
}
