//! Scenario replay
//!
//! Reads YAML scenarios that script a debug session's notifications and
//! checks the registry and banner state the way a debugging view would see
//! them.

mod config;
mod runner;

pub use config::*;
pub use runner::{load_scenario, run, run_scenario, ScenarioResult};
