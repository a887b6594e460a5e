//! Thread registry
//!
//! Follows exactly one debug session at a time and derives, from its change
//! notifications, which threads are sitting at an unacknowledged breakpoint,
//! which threads were recently current, and what the lock/deadlock/step
//! banners should say.
//!
//! Notifications arrive on engine threads. Every shared resource has its own
//! mutex and they are always taken in the order
//! `binding -> tracked -> hits -> history -> lock_relation -> step_breakpoint
//! -> deadlocks`. Engine queries and view updates happen with no
//! registry lock held.

mod hits;
mod history;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::common::config::ViewConfig;
use crate::common::{Error, Result};
use crate::facade::{
    Breakpoint, DebugSupport, Deadlock, ListenerId, SessionEvent, SessionId, SessionListener,
    SessionState, ThreadEvent, ThreadId,
};
use crate::view::{decorate, HitMenuItem, RowDecoration, ThreadRow, ViewNode, ViewSink};

pub use hits::BreakpointHitSet;
pub use history::CurrentThreadHistory;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A thread waiting on monitors held by debugger-suspended threads
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockRelation {
    pub thread: ThreadId,
    pub lockers: Vec<ThreadId>,
}

/// A step that was cut short because the thread hit a breakpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepInterruption {
    pub thread: ThreadId,
    pub breakpoint: Breakpoint,
}

/// Serializable point-in-time view of the registry
#[derive(Debug, Clone, Serialize)]
pub struct RegistrySnapshot {
    pub session: Option<SessionId>,
    pub tracked: Vec<ThreadId>,
    pub hits: Vec<ThreadId>,
    pub history: Vec<ThreadId>,
    pub lock_relation: Option<LockRelation>,
    pub step_breakpoint: Option<StepInterruption>,
    pub deadlocks: Vec<Deadlock>,
}

struct Binding {
    session: Arc<dyn DebugSupport>,
    /// Set once the session listener is registered
    listener: Option<ListenerId>,
}

fn bound_to(binding: &Option<Binding>, session: SessionId) -> bool {
    binding.as_ref().is_some_and(|b| b.session.id() == session)
}

struct Inner {
    config: ViewConfig,
    view: Mutex<Option<Arc<dyn ViewSink>>>,
    binding: Mutex<Option<Binding>>,
    /// Tracked threads and their per-thread listener
    tracked: Mutex<HashMap<ThreadId, ListenerId>>,
    hits: Mutex<BreakpointHitSet>,
    history: Mutex<CurrentThreadHistory>,
    lock_relation: Mutex<Option<LockRelation>>,
    step_breakpoint: Mutex<Option<StepInterruption>>,
    deadlocks: Mutex<Vec<Deadlock>>,
}

/// Hit-set change to publish once locks are released
struct HitChange {
    thread: ThreadId,
    added: bool,
    count: usize,
    snapshot: Vec<ThreadId>,
}

/// Thread/breakpoint state aggregator for one debugging view
///
/// Cloning yields another handle to the same registry. While a session is
/// bound, the session holds a listener that points back here; call
/// [`ThreadRegistry::dispose`] (or bind `None`) to cut that link.
#[derive(Clone)]
pub struct ThreadRegistry {
    inner: Arc<Inner>,
}

impl ThreadRegistry {
    pub fn new(config: ViewConfig, view: Arc<dyn ViewSink>) -> Self {
        let history = CurrentThreadHistory::new(config.history_limit);
        Self {
            inner: Arc::new(Inner {
                config,
                view: Mutex::new(Some(view)),
                binding: Mutex::new(None),
                tracked: Mutex::new(HashMap::new()),
                hits: Mutex::new(BreakpointHitSet::new()),
                history: Mutex::new(history),
                lock_relation: Mutex::new(None),
                step_breakpoint: Mutex::new(None),
                deadlocks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Follow `session`, or nothing
    ///
    /// Binding the session that is already bound does nothing. Otherwise the
    /// previous session's listeners are removed and all per-session state is
    /// dropped; the current-thread history only survives when no session was
    /// bound before.
    pub fn bind_session(&self, session: Option<Arc<dyn DebugSupport>>) {
        self.inner.bind_session(session);
    }

    /// Unbind and detach from the view
    pub fn dispose(&self) {
        self.inner.bind_session(None);
        *lock(&self.inner.view) = None;
    }

    pub fn on_thread_started(&self, session: SessionId, thread: ThreadId) {
        self.inner.on_thread_started(session, thread);
    }

    pub fn on_thread_died(&self, session: SessionId, thread: ThreadId) {
        self.inner.on_thread_died(session, thread);
    }

    pub fn on_current_thread_changed(&self, session: SessionId) {
        self.inner.on_current_thread_changed(session);
    }

    pub fn on_thread_breakpoint_changed(&self, session: SessionId, thread: ThreadId) {
        self.inner.on_thread_breakpoint_changed(session, thread);
    }

    pub fn on_thread_suspension_changed(&self, session: SessionId, thread: ThreadId) {
        self.inner.on_thread_suspension_changed(session, thread);
    }

    pub fn on_locker_threads_changed(
        &self,
        session: SessionId,
        thread: ThreadId,
        lockers: Option<Vec<ThreadId>>,
    ) {
        self.inner.on_locker_threads_changed(session, thread, lockers);
    }

    pub fn on_step_interrupted_by_breakpoint(
        &self,
        session: SessionId,
        thread: ThreadId,
        breakpoint: Option<Breakpoint>,
    ) {
        self.inner
            .on_step_interrupted_by_breakpoint(session, thread, breakpoint);
    }

    pub fn on_deadlocks_detected(&self, session: SessionId, deadlocks: Vec<Deadlock>) {
        self.inner.on_deadlocks_detected(session, deadlocks);
    }

    pub fn on_session_disconnected(&self, session: SessionId) {
        self.inner.on_session_disconnected(session);
    }

    // === Snapshots ===

    pub fn bound_session(&self) -> Option<SessionId> {
        lock(&self.inner.binding).as_ref().map(|b| b.session.id())
    }

    /// Hit threads, most recent first
    pub fn breakpoint_hits(&self) -> Vec<ThreadId> {
        lock(&self.inner.hits).snapshot()
    }

    /// Recently current threads, most recent first
    ///
    /// With `suspended_only`, threads the engine reports as running (or cannot
    /// answer for) are left out.
    pub fn current_threads_history(&self, suspended_only: bool) -> Vec<ThreadId> {
        let history = lock(&self.inner.history).snapshot();
        if !suspended_only {
            return history;
        }
        let Some(session) = self.inner.session() else {
            return Vec::new();
        };
        history
            .into_iter()
            .filter(|t| match session.is_suspended(*t) {
                Ok(suspended) => suspended,
                Err(e) => {
                    tracing::warn!(thread = %t, error = %e, "Could not read suspension state");
                    false
                }
            })
            .collect()
    }

    /// Tracked threads in id order
    pub fn tracked_threads(&self) -> Vec<ThreadId> {
        let mut threads: Vec<_> = lock(&self.inner.tracked).keys().copied().collect();
        threads.sort();
        threads
    }

    pub fn lock_relation(&self) -> Option<LockRelation> {
        lock(&self.inner.lock_relation).clone()
    }

    pub fn step_breakpoint(&self) -> Option<StepInterruption> {
        lock(&self.inner.step_breakpoint).clone()
    }

    pub fn deadlocks(&self) -> Vec<Deadlock> {
        lock(&self.inner.deadlocks).clone()
    }

    /// Derived per-thread state for the thread tree
    pub fn thread_rows(&self) -> Vec<ThreadRow> {
        let Some(session) = self.inner.session() else {
            return Vec::new();
        };
        let threads = self.tracked_threads();
        let hits = lock(&self.inner.hits).clone();
        let deadlocks = self.deadlocks();
        let current = match session.current_thread() {
            Ok(current) => current,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read current thread");
                None
            }
        };

        threads
            .into_iter()
            .map(|thread| ThreadRow {
                thread,
                name: session
                    .thread_name(thread)
                    .unwrap_or_else(|_| format!("Thread {thread}")),
                current: current == Some(thread),
                suspended: session.is_suspended(thread).unwrap_or(false),
                at_hit: hits.contains(thread),
                in_deadlock: deadlocks.iter().any(|d| d.contains(thread)),
            })
            .collect()
    }

    /// Thread rows with the bar and icon the tree paints for them
    pub fn decorated_rows(&self) -> Vec<(ThreadRow, RowDecoration)> {
        self.thread_rows()
            .into_iter()
            .map(|row| {
                let decoration = decorate(&ViewNode::Thread(row.clone()));
                (row, decoration)
            })
            .collect()
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            session: self.bound_session(),
            tracked: self.tracked_threads(),
            hits: self.breakpoint_hits(),
            history: self.current_threads_history(false),
            lock_relation: self.lock_relation(),
            step_breakpoint: self.step_breakpoint(),
            deadlocks: self.deadlocks(),
        }
    }

    // === Banner actions ===

    /// Make the most recent hit thread current
    pub fn go_to_most_recent_hit(&self) -> Result<ThreadId> {
        let session = self.inner.session().ok_or(Error::SessionNotBound)?;
        let thread = lock(&self.inner.hits).most_recent()?;
        tracing::info!(%thread, "Going to most recent breakpoint hit");
        session.make_current(thread)?;
        Ok(thread)
    }

    /// Resume the threads blocking the recorded lock relation
    ///
    /// Returns how many threads were resumed.
    pub fn resume_locker_threads(&self) -> Result<usize> {
        let session = self.inner.session().ok_or(Error::SessionNotBound)?;
        let Some(relation) = self.lock_relation() else {
            return Ok(0);
        };
        for locker in &relation.lockers {
            tracing::info!(thread = %relation.thread, locker = %locker, "Resuming locker thread");
            session.resume(*locker)?;
        }
        Ok(relation.lockers.len())
    }

    /// Make the thread whose step was interrupted current
    pub fn go_to_step_breakpoint_thread(&self) -> Result<Option<ThreadId>> {
        let session = self.inner.session().ok_or(Error::SessionNotBound)?;
        let Some(step) = self.step_breakpoint() else {
            return Ok(None);
        };
        session.make_current(step.thread)?;
        Ok(Some(step.thread))
    }
}

impl Inner {
    fn listener(self: &Arc<Self>) -> Arc<dyn SessionListener> {
        Arc::new(RegistryListener {
            inner: Arc::clone(self),
        })
    }

    fn view(&self) -> Option<Arc<dyn ViewSink>> {
        lock(&self.view).clone()
    }

    fn session(&self) -> Option<Arc<dyn DebugSupport>> {
        lock(&self.binding).as_ref().map(|b| Arc::clone(&b.session))
    }

    /// The bound session if it is `session`
    fn session_for(&self, session: SessionId) -> Option<Arc<dyn DebugSupport>> {
        let binding = lock(&self.binding);
        match binding.as_ref() {
            Some(b) if b.session.id() == session => Some(Arc::clone(&b.session)),
            _ => {
                tracing::trace!(%session, "Ignoring notification from unbound session");
                None
            }
        }
    }

    fn is_tracked(&self, thread: ThreadId) -> bool {
        lock(&self.tracked).contains_key(&thread)
    }

    fn bind_session(self: &Arc<Self>, session: Option<Arc<dyn DebugSupport>>) {
        let (previous, old_tracked, old_relation, old_step) = {
            let mut binding = lock(&self.binding);
            match (binding.as_ref(), session.as_ref()) {
                (Some(b), Some(s)) if b.session.id() == s.id() => return,
                (None, None) => return,
                _ => {}
            }
            let previous = binding.take();
            *binding = session.as_ref().map(|s| Binding {
                session: Arc::clone(s),
                listener: None,
            });

            let old_tracked: Vec<_> = lock(&self.tracked).drain().collect();
            lock(&self.hits).clear();
            if previous.is_some() {
                lock(&self.history).clear();
            }
            lock(&self.deadlocks).clear();
            (
                previous,
                old_tracked,
                lock(&self.lock_relation).take(),
                lock(&self.step_breakpoint).take(),
            )
        };

        if let Some(previous) = previous {
            tracing::info!(session = %previous.session.id(), "Unbinding debug session");
            if let Some(listener) = previous.listener {
                previous.session.remove_listener(listener);
            }
            for (thread, listener) in old_tracked {
                previous.session.remove_thread_listener(thread, listener);
            }
            if let Some(view) = self.view() {
                view.clear_breakpoint_hits();
                view.recompute_menu_items(&[]);
                view.set_show_deadlock(false);
                if let Some(relation) = old_relation {
                    view.set_show_thread_locks(relation.thread, None);
                }
                if old_step.is_some() {
                    view.set_show_step_breakpoint(None, None);
                }
            }
        }

        if let Some(session) = session {
            self.attach(session);
        }

        if let Some(view) = self.view() {
            view.refresh();
        }
    }

    fn attach(self: &Arc<Self>, session: Arc<dyn DebugSupport>) {
        let id = session.id();
        tracing::info!(session = %id, "Binding debug session");

        let listener = session.add_listener(self.listener());
        {
            let mut binding = lock(&self.binding);
            match binding.as_mut() {
                Some(b) if b.session.id() == id => b.listener = Some(listener),
                _ => {
                    drop(binding);
                    tracing::debug!(session = %id, "Session rebound while attaching");
                    session.remove_listener(listener);
                    return;
                }
            }
        }

        let threads = session.all_threads().unwrap_or_else(|e| {
            tracing::warn!(session = %id, error = %e, "Could not list threads");
            Vec::new()
        });
        let current = session.current_thread().unwrap_or_else(|e| {
            tracing::warn!(session = %id, error = %e, "Could not read current thread");
            None
        });
        let deadlocks = session.deadlocks().unwrap_or_else(|e| {
            tracing::warn!(session = %id, error = %e, "Could not read deadlocks");
            Vec::new()
        });

        let mut subscribed = Vec::with_capacity(threads.len());
        let mut initial_hits = Vec::new();
        for thread in threads {
            let listener = session.add_thread_listener(thread, self.listener());
            subscribed.push((thread, listener));
            if Some(thread) == current {
                continue;
            }
            match session.current_breakpoint(thread) {
                Ok(Some(_)) => initial_hits.push(thread),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(%thread, error = %e, "Could not read thread breakpoint")
                }
            }
        }

        let mut duplicates = Vec::new();
        let hits = {
            let binding = lock(&self.binding);
            if !bound_to(&binding, id) {
                drop(binding);
                for (thread, listener) in subscribed {
                    session.remove_thread_listener(thread, listener);
                }
                return;
            }
            let mut tracked = lock(&self.tracked);
            for (thread, listener) in subscribed {
                // A ThreadStarted may have raced us and subscribed already
                if tracked.contains_key(&thread) {
                    duplicates.push((thread, listener));
                } else {
                    tracked.insert(thread, listener);
                }
            }
            let mut hits = lock(&self.hits);
            for thread in initial_hits {
                hits.add(thread);
            }
            if let Some(current) = current.filter(|c| tracked.contains_key(c)) {
                lock(&self.history).touch(current);
            }
            *lock(&self.deadlocks) = deadlocks.clone();
            hits.snapshot()
        };
        for (thread, listener) in duplicates {
            session.remove_thread_listener(thread, listener);
        }

        tracing::debug!(session = %id, hits = hits.len(), "Session state seeded");
        if let Some(view) = self.view() {
            view.set_breakpoint_hits(&hits);
            view.recompute_menu_items(&self.menu_items(session.as_ref(), &hits));
            view.set_show_deadlock(!deadlocks.is_empty());
        }
    }

    fn on_thread_started(self: &Arc<Self>, session: SessionId, thread: ThreadId) {
        let Some(support) = self.session_for(session) else {
            return;
        };
        if self.is_tracked(thread) {
            return;
        }
        let listener = support.add_thread_listener(thread, self.listener());
        let inserted = {
            let binding = lock(&self.binding);
            if bound_to(&binding, session) {
                let mut tracked = lock(&self.tracked);
                if tracked.contains_key(&thread) {
                    false
                } else {
                    tracked.insert(thread, listener);
                    true
                }
            } else {
                false
            }
        };
        if inserted {
            tracing::debug!(%session, %thread, "Thread started");
            if let Some(view) = self.view() {
                view.refresh();
            }
        } else {
            support.remove_thread_listener(thread, listener);
        }
    }

    fn on_thread_died(&self, session: SessionId, thread: ThreadId) {
        let Some(support) = self.session_for(session) else {
            return;
        };
        let (listener, hit_change, relation_cleared, step_cleared) = {
            let binding = lock(&self.binding);
            if !bound_to(&binding, session) {
                return;
            }
            let listener = lock(&self.tracked).remove(&thread);
            let hit_change = {
                let mut hits = lock(&self.hits);
                hits.remove(thread).then(|| HitChange {
                    thread,
                    added: false,
                    count: hits.len(),
                    snapshot: hits.snapshot(),
                })
            };
            lock(&self.history).remove(thread);

            let mut relation = lock(&self.lock_relation);
            let relation_cleared = relation
                .as_ref()
                .is_some_and(|r| r.thread == thread || r.lockers.contains(&thread));
            if relation_cleared {
                *relation = None;
            }
            let mut step = lock(&self.step_breakpoint);
            let step_cleared = step.as_ref().is_some_and(|s| s.thread == thread);
            if step_cleared {
                *step = None;
            }
            (listener, hit_change, relation_cleared, step_cleared)
        };

        tracing::debug!(%session, %thread, "Thread died");
        if let Some(listener) = listener {
            support.remove_thread_listener(thread, listener);
        }
        if let Some(change) = hit_change {
            self.publish_hit_change(support.as_ref(), change);
        }
        if let Some(view) = self.view() {
            if relation_cleared {
                view.set_show_thread_locks(thread, None);
            }
            if step_cleared {
                view.set_show_step_breakpoint(None, None);
            }
            view.refresh();
        }
    }

    fn on_current_thread_changed(&self, session: SessionId) {
        let Some(support) = self.session_for(session) else {
            return;
        };
        let current = match support.current_thread() {
            Ok(current) => current,
            Err(e) => {
                tracing::warn!(%session, error = %e, "Could not read current thread");
                return;
            }
        };

        let hit_change = {
            let binding = lock(&self.binding);
            if !bound_to(&binding, session) {
                return;
            }
            let Some(thread) = current else {
                drop(binding);
                self.refresh();
                return;
            };
            let tracked = lock(&self.tracked).contains_key(&thread);
            let mut hits = lock(&self.hits);
            let change = hits.remove(thread).then(|| HitChange {
                thread,
                added: false,
                count: hits.len(),
                snapshot: hits.snapshot(),
            });
            if tracked {
                lock(&self.history).touch(thread);
            }
            change
        };

        tracing::debug!(%session, thread = ?current, "Current thread changed");
        if let Some(change) = hit_change {
            self.publish_hit_change(support.as_ref(), change);
        }
        self.refresh();
    }

    fn on_thread_breakpoint_changed(&self, session: SessionId, thread: ThreadId) {
        let Some(support) = self.session_for(session) else {
            return;
        };
        if !self.is_tracked(thread) {
            return;
        }
        let current = match support.current_thread() {
            Ok(current) => current,
            Err(e) => {
                tracing::warn!(%session, error = %e, "Could not read current thread");
                return;
            }
        };
        // The current thread is never reported as a new hit
        let at_hit = if current == Some(thread) {
            false
        } else {
            match support.current_breakpoint(thread) {
                Ok(breakpoint) => breakpoint.is_some(),
                Err(e) => {
                    tracing::warn!(%thread, error = %e, "Could not read thread breakpoint");
                    return;
                }
            }
        };

        let hit_change = {
            let binding = lock(&self.binding);
            if !bound_to(&binding, session) || !lock(&self.tracked).contains_key(&thread) {
                return;
            }
            let mut hits = lock(&self.hits);
            let changed = if at_hit {
                hits.add(thread)
            } else {
                hits.remove(thread)
            };
            changed.then(|| HitChange {
                thread,
                added: at_hit,
                count: hits.len(),
                snapshot: hits.snapshot(),
            })
        };

        if let Some(change) = hit_change {
            self.publish_hit_change(support.as_ref(), change);
        }
    }

    fn on_thread_suspension_changed(&self, session: SessionId, thread: ThreadId) {
        let Some(support) = self.session_for(session) else {
            return;
        };
        if !self.is_tracked(thread) {
            return;
        }
        let suspended = match support.is_suspended(thread) {
            Ok(suspended) => suspended,
            Err(e) => {
                tracing::warn!(%thread, error = %e, "Could not read suspension state");
                return;
            }
        };

        let hit_change = if suspended {
            None
        } else {
            let binding = lock(&self.binding);
            if !bound_to(&binding, session) {
                return;
            }
            let mut hits = lock(&self.hits);
            hits.remove(thread).then(|| HitChange {
                thread,
                added: false,
                count: hits.len(),
                snapshot: hits.snapshot(),
            })
        };

        tracing::trace!(%thread, suspended, "Suspension changed");
        if let Some(change) = hit_change {
            self.publish_hit_change(support.as_ref(), change);
        }
        self.refresh();
    }

    fn on_locker_threads_changed(
        &self,
        session: SessionId,
        thread: ThreadId,
        lockers: Option<Vec<ThreadId>>,
    ) {
        let lockers = lockers.filter(|l| !l.is_empty());
        let publish = {
            let binding = lock(&self.binding);
            if !bound_to(&binding, session) {
                return;
            }
            let mut relation = lock(&self.lock_relation);
            match lockers {
                // Suppressed while a real deadlock is reported
                Some(_) if !lock(&self.deadlocks).is_empty() => {
                    tracing::debug!(%thread, "Deadlock reported, ignoring locker threads");
                    None
                }
                Some(lockers) => {
                    *relation = Some(LockRelation {
                        thread,
                        lockers: lockers.clone(),
                    });
                    Some(Some(lockers))
                }
                None if relation.as_ref().is_some_and(|r| r.thread == thread) => {
                    *relation = None;
                    Some(None)
                }
                // Another thread's relation stays on display
                None => None,
            }
        };

        if let Some(lockers) = publish {
            tracing::debug!(%thread, lockers = ?lockers, "Locker threads changed");
            if let Some(view) = self.view() {
                view.set_show_thread_locks(thread, lockers.as_deref());
            }
        }
    }

    fn on_step_interrupted_by_breakpoint(
        &self,
        session: SessionId,
        thread: ThreadId,
        breakpoint: Option<Breakpoint>,
    ) {
        let publish = {
            let binding = lock(&self.binding);
            if !bound_to(&binding, session) {
                return;
            }
            let mut step = lock(&self.step_breakpoint);
            match breakpoint {
                Some(breakpoint) => {
                    *step = Some(StepInterruption {
                        thread,
                        breakpoint: breakpoint.clone(),
                    });
                    Some(Some(breakpoint))
                }
                None if step.as_ref().is_some_and(|s| s.thread == thread) => {
                    *step = None;
                    Some(None)
                }
                None => None,
            }
        };

        if let Some(breakpoint) = publish {
            tracing::debug!(%thread, breakpoint = ?breakpoint, "Step interrupted by breakpoint");
            if let Some(view) = self.view() {
                match &breakpoint {
                    Some(bp) => view.set_show_step_breakpoint(Some(thread), Some(bp)),
                    None => view.set_show_step_breakpoint(None, None),
                }
            }
        }
    }

    fn on_deadlocks_detected(&self, session: SessionId, deadlocks: Vec<Deadlock>) {
        let show = {
            let binding = lock(&self.binding);
            if !bound_to(&binding, session) {
                return;
            }
            let show = !deadlocks.is_empty();
            let mut relation = lock(&self.lock_relation);
            if show && relation.take().is_some() {
                tracing::debug!(%session, "Deadlock supersedes locker threads");
            }
            *lock(&self.deadlocks) = deadlocks;
            show
        };
        if show {
            tracing::info!(%session, "Deadlock detected");
        }
        if let Some(view) = self.view() {
            view.set_show_deadlock(show);
            view.refresh();
        }
    }

    fn on_session_disconnected(self: &Arc<Self>, session: SessionId) {
        if self.session_for(session).is_none() {
            return;
        }
        tracing::info!(%session, "Debug session disconnected");
        let threads: Vec<_> = lock(&self.tracked).keys().copied().collect();
        for thread in threads {
            self.on_thread_died(session, thread);
        }
        let still_bound = bound_to(&lock(&self.binding), session);
        if still_bound {
            self.bind_session(None);
        }
    }

    fn refresh(&self) {
        if let Some(view) = self.view() {
            view.refresh();
        }
    }

    fn publish_hit_change(&self, session: &dyn DebugSupport, change: HitChange) {
        let Some(view) = self.view() else {
            return;
        };
        if change.added {
            view.add_breakpoint_hit(change.thread, change.count);
        } else {
            view.remove_breakpoint_hit(change.thread, change.count);
        }
        view.recompute_menu_items(&self.menu_items(session, &change.snapshot));
    }

    fn menu_items(&self, session: &dyn DebugSupport, hits: &[ThreadId]) -> Vec<HitMenuItem> {
        hits.iter()
            .take(self.config.max_menu_items)
            .map(|&thread| {
                let name = session
                    .thread_name(thread)
                    .unwrap_or_else(|_| format!("Thread {thread}"));
                let label = match session.current_breakpoint(thread) {
                    Ok(Some(bp)) => format!("{name} ({})", bp.description),
                    _ => name,
                };
                HitMenuItem { thread, label }
            })
            .collect()
    }
}

/// Engine-facing listener; owns a handle to the registry state until the
/// engine drops it on unbind
struct RegistryListener {
    inner: Arc<Inner>,
}

impl SessionListener for RegistryListener {
    fn session_event(&self, session: SessionId, event: SessionEvent) {
        tracing::trace!(%session, ?event, "Session event");
        let inner = &self.inner;
        match event {
            SessionEvent::CurrentThreadChanged => inner.on_current_thread_changed(session),
            SessionEvent::ThreadStarted(thread) => inner.on_thread_started(session, thread),
            SessionEvent::ThreadDied(thread) => inner.on_thread_died(session, thread),
            SessionEvent::StateChanged(SessionState::Disconnected) => {
                inner.on_session_disconnected(session)
            }
            SessionEvent::StateChanged(_) => inner.refresh(),
            SessionEvent::DeadlockDetected(deadlocks) => {
                inner.on_deadlocks_detected(session, deadlocks)
            }
        }
    }

    fn thread_event(&self, session: SessionId, thread: ThreadId, event: ThreadEvent) {
        tracing::trace!(%session, %thread, ?event, "Thread event");
        let inner = &self.inner;
        match event {
            ThreadEvent::BreakpointChanged => inner.on_thread_breakpoint_changed(session, thread),
            ThreadEvent::SuspendedChanged => inner.on_thread_suspension_changed(session, thread),
            ThreadEvent::LockerThreadsChanged => {
                let Some(support) = inner.session_for(session) else {
                    return;
                };
                match support.locker_threads(thread) {
                    Ok(lockers) => inner.on_locker_threads_changed(session, thread, lockers),
                    Err(e) => {
                        tracing::warn!(%thread, error = %e, "Could not read locker threads")
                    }
                }
            }
            ThreadEvent::StepSuspendedByBreakpoint(breakpoint) => {
                inner.on_step_interrupted_by_breakpoint(session, thread, breakpoint)
            }
        }
    }
}
