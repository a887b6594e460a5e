//! Scripted in-memory debug session
//!
//! Stands in for a real engine binding when replaying scenarios and in tests.
//! Every mutator updates the model first and then delivers the notification a
//! real engine would send, with no internal lock held, so listeners are free
//! to query the session back.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::common::{Error, Result};

use super::{
    Breakpoint, DebugSupport, Deadlock, ListenerId, SessionEvent, SessionId, SessionListener,
    SessionState, ThreadEvent, ThreadId,
};

#[derive(Debug, Clone)]
struct ScriptedThread {
    name: String,
    suspended: bool,
    breakpoint: Option<Breakpoint>,
    lockers: Option<Vec<ThreadId>>,
}

#[derive(Default)]
struct Model {
    state: Option<SessionState>,
    threads: BTreeMap<ThreadId, ScriptedThread>,
    current: Option<ThreadId>,
    deadlocks: Vec<Deadlock>,
    listeners: Vec<(ListenerId, Arc<dyn SessionListener>)>,
    thread_listeners: HashMap<ThreadId, Vec<(ListenerId, Arc<dyn SessionListener>)>>,
    next_listener: u64,
}

/// In-memory [`DebugSupport`] driven by explicit calls
pub struct ScriptedSession {
    id: SessionId,
    model: Mutex<Model>,
    /// When set, every query fails as if the engine connection broke
    failing: AtomicBool,
}

impl ScriptedSession {
    pub fn new(id: u64) -> Arc<Self> {
        Arc::new(Self {
            id: SessionId(id),
            model: Mutex::new(Model {
                state: Some(SessionState::Running),
                ..Model::default()
            }),
            failing: AtomicBool::new(false),
        })
    }

    fn model(&self) -> MutexGuard<'_, Model> {
        // A panicking listener must not wedge the scripted engine
        self.model.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(Error::facade(format!("{} is not responding", self.id)))
        } else {
            Ok(())
        }
    }

    /// Make every query fail until switched back
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Add a thread without notifying anyone, as if it existed before attach
    pub fn seed_thread(&self, thread: ThreadId, name: &str) {
        self.model().threads.insert(
            thread,
            ScriptedThread {
                name: name.to_string(),
                suspended: false,
                breakpoint: None,
                lockers: None,
            },
        );
    }

    /// Suspend a thread at a breakpoint without notifying anyone
    pub fn seed_hit(&self, thread: ThreadId, breakpoint: Breakpoint) {
        if let Some(t) = self.model().threads.get_mut(&thread) {
            t.suspended = true;
            t.breakpoint = Some(breakpoint);
        }
    }

    /// Set the current thread without notifying anyone
    pub fn seed_current(&self, thread: Option<ThreadId>) {
        self.model().current = thread;
    }

    pub fn start_thread(&self, thread: ThreadId, name: &str) {
        self.seed_thread(thread, name);
        self.fire_session(SessionEvent::ThreadStarted(thread));
    }

    pub fn kill_thread(&self, thread: ThreadId) {
        let was_current = {
            let mut model = self.model();
            model.threads.remove(&thread);
            model.thread_listeners.remove(&thread);
            if model.current == Some(thread) {
                model.current = None;
                true
            } else {
                false
            }
        };
        self.fire_session(SessionEvent::ThreadDied(thread));
        if was_current {
            self.fire_session(SessionEvent::CurrentThreadChanged);
        }
    }

    /// Suspend a thread at a breakpoint
    pub fn hit_breakpoint(&self, thread: ThreadId, breakpoint: Breakpoint) {
        {
            let mut model = self.model();
            let Some(t) = model.threads.get_mut(&thread) else {
                return;
            };
            t.suspended = true;
            t.breakpoint = Some(breakpoint);
            model.state = Some(SessionState::Stopped);
        }
        self.fire_thread(thread, ThreadEvent::SuspendedChanged);
        self.fire_thread(thread, ThreadEvent::BreakpointChanged);
    }

    /// Suspend a thread without a breakpoint (e.g. pause)
    pub fn suspend_thread(&self, thread: ThreadId) {
        {
            let mut model = self.model();
            let Some(t) = model.threads.get_mut(&thread) else {
                return;
            };
            t.suspended = true;
        }
        self.fire_thread(thread, ThreadEvent::SuspendedChanged);
    }

    pub fn resume_thread(&self, thread: ThreadId) {
        let had_breakpoint = {
            let mut model = self.model();
            let Some(t) = model.threads.get_mut(&thread) else {
                return;
            };
            t.suspended = false;
            t.breakpoint.take().is_some()
        };
        if had_breakpoint {
            self.fire_thread(thread, ThreadEvent::BreakpointChanged);
        }
        self.fire_thread(thread, ThreadEvent::SuspendedChanged);
    }

    pub fn set_current(&self, thread: Option<ThreadId>) {
        self.seed_current(thread);
        self.fire_session(SessionEvent::CurrentThreadChanged);
    }

    pub fn set_lockers(&self, thread: ThreadId, lockers: Option<Vec<ThreadId>>) {
        {
            let mut model = self.model();
            let Some(t) = model.threads.get_mut(&thread) else {
                return;
            };
            t.lockers = lockers;
        }
        self.fire_thread(thread, ThreadEvent::LockerThreadsChanged);
    }

    pub fn interrupt_step(&self, thread: ThreadId, breakpoint: Option<Breakpoint>) {
        self.fire_thread(thread, ThreadEvent::StepSuspendedByBreakpoint(breakpoint));
    }

    pub fn report_deadlocks(&self, deadlocks: Vec<Deadlock>) {
        self.model().deadlocks = deadlocks.clone();
        self.fire_session(SessionEvent::DeadlockDetected(deadlocks));
    }

    pub fn disconnect(&self) {
        self.model().state = Some(SessionState::Disconnected);
        self.fire_session(SessionEvent::StateChanged(SessionState::Disconnected));
    }

    /// Deliver a session notification without touching the model
    pub fn fire_session(&self, event: SessionEvent) {
        let listeners: Vec<_> = self
            .model()
            .listeners
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener.session_event(self.id, event.clone());
        }
    }

    /// Deliver a thread notification without touching the model
    pub fn fire_thread(&self, thread: ThreadId, event: ThreadEvent) {
        let listeners: Vec<_> = self
            .model()
            .thread_listeners
            .get(&thread)
            .map(|ls| ls.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default();
        for listener in listeners {
            listener.thread_event(self.id, thread, event.clone());
        }
    }

    pub fn listener_count(&self) -> usize {
        self.model().listeners.len()
    }

    pub fn thread_listener_count(&self, thread: ThreadId) -> usize {
        self.model()
            .thread_listeners
            .get(&thread)
            .map_or(0, Vec::len)
    }

    fn with_thread<T>(&self, thread: ThreadId, f: impl FnOnce(&ScriptedThread) -> T) -> Result<T> {
        self.check()?;
        self.model()
            .threads
            .get(&thread)
            .map(f)
            .ok_or(Error::ThreadNotFound(thread))
    }
}

impl DebugSupport for ScriptedSession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn state(&self) -> Result<SessionState> {
        self.check()?;
        self.model()
            .state
            .ok_or_else(|| Error::Internal("session state not set".to_string()))
    }

    fn current_thread(&self) -> Result<Option<ThreadId>> {
        self.check()?;
        Ok(self.model().current)
    }

    fn all_threads(&self) -> Result<Vec<ThreadId>> {
        self.check()?;
        Ok(self.model().threads.keys().copied().collect())
    }

    fn deadlocks(&self) -> Result<Vec<Deadlock>> {
        self.check()?;
        Ok(self.model().deadlocks.clone())
    }

    fn thread_name(&self, thread: ThreadId) -> Result<String> {
        self.with_thread(thread, |t| t.name.clone())
    }

    fn is_suspended(&self, thread: ThreadId) -> Result<bool> {
        self.with_thread(thread, |t| t.suspended)
    }

    fn current_breakpoint(&self, thread: ThreadId) -> Result<Option<Breakpoint>> {
        self.with_thread(thread, |t| t.breakpoint.clone())
    }

    fn locker_threads(&self, thread: ThreadId) -> Result<Option<Vec<ThreadId>>> {
        self.with_thread(thread, |t| t.lockers.clone())
    }

    fn make_current(&self, thread: ThreadId) -> Result<()> {
        self.with_thread(thread, |_| ())?;
        self.set_current(Some(thread));
        Ok(())
    }

    fn resume(&self, thread: ThreadId) -> Result<()> {
        self.with_thread(thread, |_| ())?;
        self.resume_thread(thread);
        Ok(())
    }

    fn add_listener(&self, listener: Arc<dyn SessionListener>) -> ListenerId {
        let mut model = self.model();
        model.next_listener += 1;
        let id = ListenerId(model.next_listener);
        model.listeners.push((id, listener));
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.model().listeners.retain(|(lid, _)| *lid != id);
    }

    fn add_thread_listener(
        &self,
        thread: ThreadId,
        listener: Arc<dyn SessionListener>,
    ) -> ListenerId {
        let mut model = self.model();
        model.next_listener += 1;
        let id = ListenerId(model.next_listener);
        model
            .thread_listeners
            .entry(thread)
            .or_default()
            .push((id, listener));
        id
    }

    fn remove_thread_listener(&self, thread: ThreadId, id: ListenerId) {
        if let Some(listeners) = self.model().thread_listeners.get_mut(&thread) {
            listeners.retain(|(lid, _)| *lid != id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl SessionListener for Recorder {
        fn session_event(&self, _session: SessionId, event: SessionEvent) {
            self.events.lock().unwrap().push(format!("{:?}", event));
        }

        fn thread_event(&self, _session: SessionId, thread: ThreadId, event: ThreadEvent) {
            self.events
                .lock()
                .unwrap()
                .push(format!("{} {:?}", thread, event));
        }
    }

    #[test]
    fn test_hit_updates_model_and_notifies() {
        let session = ScriptedSession::new(1);
        let recorder = Arc::new(Recorder::default());
        session.seed_thread(ThreadId(1), "main");
        session.add_thread_listener(ThreadId(1), recorder.clone());

        session.hit_breakpoint(ThreadId(1), Breakpoint::new(3, "Main.java:10"));

        assert!(session.is_suspended(ThreadId(1)).unwrap());
        assert_eq!(
            session.current_breakpoint(ThreadId(1)).unwrap().map(|b| b.id),
            Some(3)
        );
        assert_eq!(session.state().unwrap(), SessionState::Stopped);
        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec!["#1 SuspendedChanged", "#1 BreakpointChanged"]
        );
    }

    #[test]
    fn test_removed_listener_is_silent() {
        let session = ScriptedSession::new(1);
        let recorder = Arc::new(Recorder::default());
        let id = session.add_listener(recorder.clone());
        session.remove_listener(id);

        session.start_thread(ThreadId(2), "worker");
        assert!(recorder.events.lock().unwrap().is_empty());
        assert_eq!(session.listener_count(), 0);
    }

    #[test]
    fn test_failing_mode() {
        let session = ScriptedSession::new(1);
        session.seed_thread(ThreadId(1), "main");
        session.set_failing(true);
        assert!(session.is_suspended(ThreadId(1)).unwrap_err().is_facade());
        session.set_failing(false);
        assert!(!session.is_suspended(ThreadId(1)).unwrap());
    }

    #[test]
    fn test_killing_current_thread_clears_current() {
        let session = ScriptedSession::new(1);
        session.seed_thread(ThreadId(1), "main");
        session.seed_current(Some(ThreadId(1)));
        session.kill_thread(ThreadId(1));
        assert_eq!(session.current_thread().unwrap(), None);
        assert!(matches!(
            session.thread_name(ThreadId(1)),
            Err(Error::ThreadNotFound(ThreadId(1)))
        ));
    }
}
