//! Debug engine facade
//!
//! The thread view never talks to a debugger directly. An engine binding
//! implements [`DebugSupport`] for each session and delivers change
//! notifications to registered [`SessionListener`]s, on whatever thread the
//! engine happens to be running.

pub mod scripted;
mod types;

use std::sync::Arc;

use crate::common::Result;

pub use types::{
    Breakpoint, Deadlock, ListenerId, SessionEvent, SessionId, SessionState, ThreadEvent, ThreadId,
};

/// One debug session as seen through the engine
pub trait DebugSupport: Send + Sync {
    /// Stable identity of this session
    fn id(&self) -> SessionId;

    fn state(&self) -> Result<SessionState>;

    /// The thread in focus for stepping and evaluation
    fn current_thread(&self) -> Result<Option<ThreadId>>;

    fn all_threads(&self) -> Result<Vec<ThreadId>>;

    fn deadlocks(&self) -> Result<Vec<Deadlock>>;

    fn thread_name(&self, thread: ThreadId) -> Result<String>;

    fn is_suspended(&self, thread: ThreadId) -> Result<bool>;

    /// Breakpoint the thread is suspended at, if any
    fn current_breakpoint(&self, thread: ThreadId) -> Result<Option<Breakpoint>>;

    /// Threads holding monitors this thread waits for, when they were
    /// suspended by the debugger
    fn locker_threads(&self, thread: ThreadId) -> Result<Option<Vec<ThreadId>>>;

    fn make_current(&self, thread: ThreadId) -> Result<()>;

    fn resume(&self, thread: ThreadId) -> Result<()>;

    fn add_listener(&self, listener: Arc<dyn SessionListener>) -> ListenerId;

    fn remove_listener(&self, id: ListenerId);

    fn add_thread_listener(
        &self,
        thread: ThreadId,
        listener: Arc<dyn SessionListener>,
    ) -> ListenerId;

    fn remove_thread_listener(&self, thread: ThreadId, id: ListenerId);
}

/// Receiver of engine notifications
pub trait SessionListener: Send + Sync {
    fn session_event(&self, session: SessionId, event: SessionEvent);

    fn thread_event(&self, session: SessionId, thread: ThreadId, event: ThreadEvent);
}
