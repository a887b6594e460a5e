//! Thread view - breakpoint-hit, current-thread and deadlock tracking for
//! debugger thread views
//!
//! A [`ThreadRegistry`] follows one debug session through the [`facade`]
//! traits and publishes derived state to a [`view::ViewSink`]. The
//! [`view::ViewStateProjector`] turns that into banner visibility and hands
//! every change to the UI thread over a channel.

pub mod commands;
pub mod common;
pub mod facade;
pub mod registry;
pub mod replay;
pub mod view;

pub use common::{Error, Result};
pub use registry::{BreakpointHitSet, CurrentThreadHistory, ThreadRegistry};
pub use view::{ViewSink, ViewStateProjector};
