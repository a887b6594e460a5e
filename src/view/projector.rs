//! Banner state projection
//!
//! Five banners stack above the thread tree. Each has a fixed rank; the
//! highest-ranked visible one is "top" and gets the full-height treatment.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::mpsc;

use crate::facade::{Breakpoint, ThreadId};

use super::{HitMenuItem, ViewSink};

/// Banners in rank order, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Banner {
    Filters,
    Hits,
    Deadlocks,
    DeadlocksByDebugger,
    StepBreakpoint,
}

impl Banner {
    pub const ALL: [Banner; 5] = [
        Banner::Filters,
        Banner::Hits,
        Banner::Deadlocks,
        Banner::DeadlocksByDebugger,
        Banner::StepBreakpoint,
    ];

    pub fn rank(self) -> usize {
        self as usize
    }

    /// Parse the snake_case name used in scenarios
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.to_string() == name)
    }
}

impl fmt::Display for Banner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filters => write!(f, "filters"),
            Self::Hits => write!(f, "hits"),
            Self::Deadlocks => write!(f, "deadlocks"),
            Self::DeadlocksByDebugger => write!(f, "deadlocks_by_debugger"),
            Self::StepBreakpoint => write!(f, "step_breakpoint"),
        }
    }
}

/// Which banners are showing and which one is on top
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BannerLayout {
    /// Visible banners, lowest rank first
    pub visible: Vec<Banner>,
    pub top: Option<Banner>,
}

/// A change handed to the UI thread
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewUpdate {
    Layout(BannerLayout),
    HitsText { text: Option<String> },
    ThreadLocks {
        thread: ThreadId,
        lockers: Option<Vec<ThreadId>>,
    },
    StepBreakpoint {
        thread: Option<ThreadId>,
        breakpoint: Option<Breakpoint>,
    },
    MenuItems { items: Vec<HitMenuItem> },
    Refresh,
}

/// Text of the hits banner
pub fn hits_message(count: usize) -> Option<String> {
    match count {
        0 => None,
        1 => Some("One new breakpoint hit".to_string()),
        n => Some(format!("{n} new breakpoint hits")),
    }
}

#[derive(Debug, Default)]
struct State {
    visible: [bool; 5],
    top: Option<Banner>,
    hit_count: usize,
    thread_locks: Option<(ThreadId, Vec<ThreadId>)>,
    step_breakpoint: Option<(ThreadId, Breakpoint)>,
    menu_items: Vec<HitMenuItem>,
}

impl State {
    fn is_visible(&self, banner: Banner) -> bool {
        self.visible[banner.rank()]
    }

    fn highest_visible(&self) -> Option<Banner> {
        Banner::ALL
            .into_iter()
            .rev()
            .find(|b| self.is_visible(*b))
    }

    /// Returns whether the layout changed
    fn show(&mut self, banner: Banner) -> bool {
        if self.is_visible(banner) {
            return false;
        }
        let outranked = self
            .highest_visible()
            .is_some_and(|b| b.rank() > banner.rank());
        self.visible[banner.rank()] = true;
        if !outranked {
            self.top = Some(banner);
        }
        true
    }

    fn hide(&mut self, banner: Banner) -> bool {
        if !self.is_visible(banner) {
            return false;
        }
        self.visible[banner.rank()] = false;
        if self.top == Some(banner) {
            self.top = self.highest_visible();
        }
        true
    }

    fn layout(&self) -> BannerLayout {
        BannerLayout {
            visible: Banner::ALL
                .into_iter()
                .filter(|b| self.is_visible(*b))
                .collect(),
            top: self.top,
        }
    }
}

/// Decides banner visibility and forwards changes to the UI thread
pub struct ViewStateProjector {
    state: Mutex<State>,
    ui: mpsc::UnboundedSender<ViewUpdate>,
}

impl ViewStateProjector {
    /// Create a projector and the receiving end the UI thread drains
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ViewUpdate>) {
        let (ui, rx) = mpsc::unbounded_channel();
        (
            Self {
                state: Mutex::new(State::default()),
                ui,
            },
            rx,
        )
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn post(&self, update: ViewUpdate) {
        if self.ui.send(update).is_err() {
            tracing::trace!("UI receiver gone, dropping view update");
        }
    }

    fn post_layout_if(&self, changed: bool, state: &State) {
        if changed {
            let layout = state.layout();
            tracing::debug!(visible = ?layout.visible, top = ?layout.top, "Banner layout changed");
            self.post(ViewUpdate::Layout(layout));
        }
    }

    pub fn layout(&self) -> BannerLayout {
        self.state().layout()
    }

    pub fn is_visible(&self, banner: Banner) -> bool {
        self.state().is_visible(banner)
    }

    pub fn top(&self) -> Option<Banner> {
        self.state().top
    }

    pub fn hit_count(&self) -> usize {
        self.state().hit_count
    }

    pub fn hits_text(&self) -> Option<String> {
        hits_message(self.state().hit_count)
    }

    pub fn thread_locks(&self) -> Option<(ThreadId, Vec<ThreadId>)> {
        self.state().thread_locks.clone()
    }

    pub fn step_breakpoint(&self) -> Option<(ThreadId, Breakpoint)> {
        self.state().step_breakpoint.clone()
    }

    pub fn menu_items(&self) -> Vec<HitMenuItem> {
        self.state().menu_items.clone()
    }

    /// Show or hide the filters bar
    pub fn set_show_filters(&self, show: bool) {
        let mut state = self.state();
        let changed = if show {
            state.show(Banner::Filters)
        } else {
            state.hide(Banner::Filters)
        };
        self.post_layout_if(changed, &state);
    }

    fn update_hits(&self, count: usize) {
        let mut state = self.state();
        state.hit_count = count;
        let changed = if count > 0 {
            state.show(Banner::Hits)
        } else {
            state.hide(Banner::Hits)
        };
        self.post(ViewUpdate::HitsText {
            text: hits_message(count),
        });
        self.post_layout_if(changed, &state);
    }
}

impl ViewSink for ViewStateProjector {
    fn set_breakpoint_hits(&self, hits: &[ThreadId]) {
        self.update_hits(hits.len());
    }

    fn add_breakpoint_hit(&self, thread: ThreadId, count: usize) {
        tracing::debug!(%thread, count, "Breakpoint hit added");
        self.update_hits(count);
    }

    fn remove_breakpoint_hit(&self, thread: ThreadId, count: usize) {
        tracing::debug!(%thread, count, "Breakpoint hit removed");
        self.update_hits(count);
    }

    fn clear_breakpoint_hits(&self) {
        self.update_hits(0);
    }

    fn set_show_deadlock(&self, show: bool) {
        let mut state = self.state();
        let changed = if show {
            // A real deadlock supersedes the debugger-induced one
            let hid = state.hide(Banner::DeadlocksByDebugger);
            if hid {
                state.thread_locks = None;
            }
            state.show(Banner::Deadlocks) | hid
        } else {
            state.hide(Banner::Deadlocks)
        };
        self.post_layout_if(changed, &state);
    }

    fn set_show_thread_locks(&self, thread: ThreadId, lockers: Option<&[ThreadId]>) {
        let mut state = self.state();
        let changed = match lockers {
            Some(lockers) if !lockers.is_empty() => {
                if state.is_visible(Banner::Deadlocks) {
                    tracing::debug!(%thread, "Deadlock banner visible, ignoring thread locks");
                    return;
                }
                state.thread_locks = Some((thread, lockers.to_vec()));
                self.post(ViewUpdate::ThreadLocks {
                    thread,
                    lockers: Some(lockers.to_vec()),
                });
                state.show(Banner::DeadlocksByDebugger)
            }
            _ => {
                if state.thread_locks.take().is_some() {
                    self.post(ViewUpdate::ThreadLocks {
                        thread,
                        lockers: None,
                    });
                }
                state.hide(Banner::DeadlocksByDebugger)
            }
        };
        self.post_layout_if(changed, &state);
    }

    fn set_show_step_breakpoint(&self, thread: Option<ThreadId>, breakpoint: Option<&Breakpoint>) {
        let mut state = self.state();
        let changed = match (thread, breakpoint) {
            (Some(thread), Some(breakpoint)) => {
                state.step_breakpoint = Some((thread, breakpoint.clone()));
                self.post(ViewUpdate::StepBreakpoint {
                    thread: Some(thread),
                    breakpoint: Some(breakpoint.clone()),
                });
                state.show(Banner::StepBreakpoint)
            }
            _ => {
                if state.step_breakpoint.take().is_some() {
                    self.post(ViewUpdate::StepBreakpoint {
                        thread: None,
                        breakpoint: None,
                    });
                }
                state.hide(Banner::StepBreakpoint)
            }
        };
        self.post_layout_if(changed, &state);
    }

    fn recompute_menu_items(&self, items: &[HitMenuItem]) {
        let mut state = self.state();
        state.menu_items = items.to_vec();
        self.post(ViewUpdate::MenuItems {
            items: items.to_vec(),
        });
    }

    fn refresh(&self) {
        self.post(ViewUpdate::Refresh);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(id: u64) -> ThreadId {
        ThreadId(id)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ViewUpdate>) -> Vec<ViewUpdate> {
        let mut out = Vec::new();
        while let Ok(update) = rx.try_recv() {
            out.push(update);
        }
        out
    }

    #[test]
    fn test_hits_message() {
        assert_eq!(hits_message(0), None);
        assert_eq!(hits_message(1).as_deref(), Some("One new breakpoint hit"));
        assert_eq!(hits_message(4).as_deref(), Some("4 new breakpoint hits"));
    }

    #[test]
    fn test_banner_names_round_trip() {
        for banner in Banner::ALL {
            assert_eq!(Banner::from_name(&banner.to_string()), Some(banner));
        }
        assert_eq!(Banner::from_name("nope"), None);
    }

    #[test]
    fn test_lower_banner_does_not_take_top() {
        let (projector, _rx) = ViewStateProjector::new();
        projector.set_show_deadlock(true);
        projector.add_breakpoint_hit(t(1), 1);

        assert_eq!(projector.top(), Some(Banner::Deadlocks));
        assert_eq!(
            projector.layout().visible,
            vec![Banner::Hits, Banner::Deadlocks]
        );
    }

    #[test]
    fn test_higher_banner_takes_top_and_hiding_promotes() {
        let (projector, _rx) = ViewStateProjector::new();
        projector.set_show_filters(true);
        projector.add_breakpoint_hit(t(1), 1);
        assert_eq!(projector.top(), Some(Banner::Hits));

        projector.set_show_step_breakpoint(Some(t(2)), Some(&Breakpoint::new(1, "A.java:3")));
        assert_eq!(projector.top(), Some(Banner::StepBreakpoint));

        projector.set_show_step_breakpoint(None, None);
        assert_eq!(projector.top(), Some(Banner::Hits));

        projector.remove_breakpoint_hit(t(1), 0);
        assert_eq!(projector.top(), Some(Banner::Filters));

        projector.set_show_filters(false);
        assert_eq!(projector.top(), None);
        assert!(projector.layout().visible.is_empty());
    }

    #[test]
    fn test_real_deadlock_suppresses_debugger_deadlock() {
        let (projector, _rx) = ViewStateProjector::new();
        projector.set_show_deadlock(true);
        projector.set_show_thread_locks(t(1), Some(&[t(2)]));

        assert!(!projector.is_visible(Banner::DeadlocksByDebugger));
        assert!(projector.thread_locks().is_none());

        projector.set_show_deadlock(false);
        projector.set_show_thread_locks(t(1), Some(&[t(2)]));
        assert!(projector.is_visible(Banner::DeadlocksByDebugger));
        assert_eq!(projector.top(), Some(Banner::DeadlocksByDebugger));
    }

    #[test]
    fn test_real_deadlock_hides_visible_debugger_deadlock() {
        let (projector, _rx) = ViewStateProjector::new();
        projector.set_show_thread_locks(t(1), Some(&[t(2)]));
        assert!(projector.is_visible(Banner::DeadlocksByDebugger));

        projector.set_show_deadlock(true);
        assert!(!projector.is_visible(Banner::DeadlocksByDebugger));
        assert_eq!(projector.top(), Some(Banner::Deadlocks));
    }

    #[test]
    fn test_step_banner_does_not_suppress_thread_locks() {
        let (projector, _rx) = ViewStateProjector::new();
        projector.set_show_step_breakpoint(Some(t(3)), Some(&Breakpoint::new(1, "A.java:3")));
        projector.set_show_thread_locks(t(1), Some(&[t(2)]));
        assert!(projector.is_visible(Banner::DeadlocksByDebugger));
        assert_eq!(projector.top(), Some(Banner::StepBreakpoint));
    }

    #[test]
    fn test_empty_lockers_hide() {
        let (projector, _rx) = ViewStateProjector::new();
        projector.set_show_thread_locks(t(1), Some(&[t(2)]));
        projector.set_show_thread_locks(t(1), Some(&[]));
        assert!(!projector.is_visible(Banner::DeadlocksByDebugger));
    }

    #[test]
    fn test_updates_are_posted_in_order() {
        let (projector, mut rx) = ViewStateProjector::new();
        projector.add_breakpoint_hit(t(1), 1);
        projector.add_breakpoint_hit(t(2), 2);
        projector.refresh();

        let updates = drain(&mut rx);
        assert_eq!(
            updates,
            vec![
                ViewUpdate::HitsText {
                    text: Some("One new breakpoint hit".to_string())
                },
                ViewUpdate::Layout(BannerLayout {
                    visible: vec![Banner::Hits],
                    top: Some(Banner::Hits),
                }),
                ViewUpdate::HitsText {
                    text: Some("2 new breakpoint hits".to_string())
                },
                ViewUpdate::Refresh,
            ]
        );
    }

    #[test]
    fn test_dropped_receiver_is_harmless() {
        let (projector, rx) = ViewStateProjector::new();
        drop(rx);
        projector.add_breakpoint_hit(t(1), 1);
        assert_eq!(projector.hit_count(), 1);
    }

    #[tokio::test]
    async fn test_ui_task_receives_updates() {
        let (projector, mut rx) = ViewStateProjector::new();
        let ui = tokio::spawn(async move {
            let mut seen = 0;
            while let Some(update) = rx.recv().await {
                seen += 1;
                if update == ViewUpdate::Refresh {
                    break;
                }
            }
            seen
        });

        std::thread::spawn(move || {
            projector.set_show_deadlock(true);
            projector.refresh();
        })
        .join()
        .unwrap();

        assert_eq!(ui.await.unwrap(), 2);
    }
}
