//! Debugging view side of the aggregator
//!
//! [`ViewSink`] is what the registry talks to. [`ViewStateProjector`] is the
//! in-crate implementation: it keeps banner visibility state and hands every
//! change to the UI thread as a [`ViewUpdate`] over a channel. It never renders.

mod projector;
pub mod rows;

use serde::Serialize;

use crate::facade::{Breakpoint, ThreadId};

pub use projector::{hits_message, Banner, BannerLayout, ViewStateProjector, ViewUpdate};
pub use rows::{decorate, ColorBar, RowDecoration, RowIcon, ThreadRow, ViewNode};

/// Entry of the "go to hit" quick navigation list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HitMenuItem {
    pub thread: ThreadId,
    pub label: String,
}

/// Updates the registry publishes to the debugging view
///
/// Called from engine notification threads; implementations must not block
/// and must not call back into the registry.
pub trait ViewSink: Send + Sync {
    /// Replace the hit list wholesale (after binding a session)
    fn set_breakpoint_hits(&self, hits: &[ThreadId]);

    fn add_breakpoint_hit(&self, thread: ThreadId, count: usize);

    fn remove_breakpoint_hit(&self, thread: ThreadId, count: usize);

    fn clear_breakpoint_hits(&self);

    fn set_show_deadlock(&self, show: bool);

    /// `None` hides the "resume blocking threads" banner
    fn set_show_thread_locks(&self, thread: ThreadId, lockers: Option<&[ThreadId]>);

    fn set_show_step_breakpoint(&self, thread: Option<ThreadId>, breakpoint: Option<&Breakpoint>);

    fn recompute_menu_items(&self, items: &[HitMenuItem]);

    /// Thread rows need repainting
    fn refresh(&self);
}
