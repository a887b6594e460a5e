//! Scenario runner implementation
//!
//! Drives a scripted session, a real registry and a real projector. View
//! updates are consumed on a separate task, the way a UI thread would.

use std::path::Path;
use std::sync::Arc;

use colored::Colorize;

use crate::common::config::ViewConfig;
use crate::common::{Error, Result};
use crate::facade::scripted::ScriptedSession;
use crate::facade::{DebugSupport, Deadlock, ThreadId};
use crate::registry::{RegistrySnapshot, ThreadRegistry};
use crate::view::{Banner, ColorBar, ViewStateProjector, ViewUpdate};

use super::config::{Expectation, Scenario, Step};

/// Session id of the scenario's own session
const SCENARIO_SESSION: u64 = 1;

/// Result of a scenario run
#[derive(Debug)]
pub struct ScenarioResult {
    pub name: String,
    pub passed: bool,
    pub steps_run: usize,
    pub steps_total: usize,
    pub error: Option<String>,
    /// View updates the UI task received
    pub view_updates: usize,
    pub snapshot: RegistrySnapshot,
}

/// Load a scenario from a YAML file
pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, &e))?;
    let scenario = serde_yaml::from_str(&content)?;
    Ok(scenario)
}

/// Run a scenario from a YAML file
pub async fn run_scenario(
    path: &Path,
    config: &ViewConfig,
    verbose: bool,
) -> Result<ScenarioResult> {
    let scenario = load_scenario(path)?;
    run(scenario, config, verbose).await
}

/// Run an already parsed scenario
pub async fn run(scenario: Scenario, config: &ViewConfig, verbose: bool) -> Result<ScenarioResult> {
    let steps_total = scenario.steps.len();

    println!(
        "\n{} {}",
        "Replaying:".blue().bold(),
        scenario.name.white().bold()
    );
    if let Some(desc) = &scenario.description {
        println!("  {}", desc.dimmed());
    }

    let (projector, mut updates) = ViewStateProjector::new();
    let projector = Arc::new(projector);
    let registry = ThreadRegistry::new(config.clone(), projector.clone());

    let ui = tokio::spawn(async move {
        let mut received = 0usize;
        while let Some(update) = updates.recv().await {
            received += 1;
            if verbose && update != ViewUpdate::Refresh {
                match serde_json::to_string(&update) {
                    Ok(json) => println!("    {} {}", "ui".magenta(), json.dimmed()),
                    Err(e) => tracing::warn!(error = %e, "Could not serialize view update"),
                }
            }
        }
        received
    });

    let session = ScriptedSession::new(SCENARIO_SESSION);
    for spec in &scenario.threads {
        session.seed_thread(spec.id, &spec.name);
        if let Some(bp) = &spec.stopped_at {
            session.seed_hit(spec.id, bp.clone());
        }
    }
    session.seed_current(scenario.current);

    let ctx = Context {
        session,
        registry: registry.clone(),
        projector: projector.clone(),
    };

    println!("\n{}", "Steps:".cyan());
    let mut failure = None;
    let mut steps_run = 0;
    for (i, step) in scenario.steps.iter().enumerate() {
        steps_run = i + 1;
        match ctx.execute(step) {
            Ok(summary) => {
                println!("  {} Step {}: {}", "✓".green(), steps_run, summary.dimmed());
            }
            Err(e) => {
                println!("  {} Step {}: {}", "✗".red(), steps_run, e);
                failure = Some(e.to_string());
                break;
            }
        }
    }

    let snapshot = registry.snapshot();
    registry.dispose();
    drop(ctx);
    drop(registry);
    drop(projector);
    let view_updates = ui
        .await
        .map_err(|e| Error::Internal(format!("UI task failed: {}", e)))?;

    let passed = failure.is_none();
    if passed {
        println!("\n{} {}\n", "✓".green().bold(), "Scenario Passed".green().bold());
    }

    Ok(ScenarioResult {
        name: scenario.name,
        passed,
        steps_run,
        steps_total,
        error: failure,
        view_updates,
        snapshot,
    })
}

struct Context {
    session: Arc<ScriptedSession>,
    registry: ThreadRegistry,
    projector: Arc<ViewStateProjector>,
}

impl Context {
    /// Execute one step, returning a one-line summary
    fn execute(&self, step: &Step) -> Result<String> {
        let session = &self.session;
        match step {
            Step::Bind => {
                self.registry
                    .bind_session(Some(session.clone() as Arc<dyn DebugSupport>));
                Ok(format!("bind {}", session.id()))
            }
            Step::BindOther { session: id } => {
                let other = ScriptedSession::new(*id);
                self.registry.bind_session(Some(other as Arc<dyn DebugSupport>));
                Ok(format!("bind session-{}", id))
            }
            Step::Unbind => {
                self.registry.bind_session(None);
                Ok("unbind".to_string())
            }
            Step::StartThread { thread, name } => {
                session.start_thread(*thread, name);
                Ok(format!("start {} ({})", thread, name))
            }
            Step::KillThread { thread } => {
                session.kill_thread(*thread);
                Ok(format!("kill {}", thread))
            }
            Step::HitBreakpoint { thread, breakpoint } => {
                session.hit_breakpoint(*thread, breakpoint.clone());
                Ok(format!("{} hits {}", thread, breakpoint.description))
            }
            Step::Suspend { thread } => {
                session.suspend_thread(*thread);
                Ok(format!("suspend {}", thread))
            }
            Step::Resume { thread } => {
                session.resume_thread(*thread);
                Ok(format!("resume {}", thread))
            }
            Step::MakeCurrent { thread } => {
                session.set_current(*thread);
                Ok(format!("current {:?}", thread.map(|t| t.0)))
            }
            Step::Lockers { thread, lockers } => {
                session.set_lockers(*thread, lockers.clone());
                Ok(format!("{} locked by {:?}", thread, lockers))
            }
            Step::StepInterrupted { thread, breakpoint } => {
                session.interrupt_step(*thread, breakpoint.clone());
                Ok(format!("step of {} interrupted", thread))
            }
            Step::Deadlock { groups } => {
                let deadlocks = groups
                    .iter()
                    .map(|threads| Deadlock {
                        threads: threads.clone(),
                    })
                    .collect();
                session.report_deadlocks(deadlocks);
                Ok(format!("{} deadlock(s)", groups.len()))
            }
            Step::Disconnect => {
                session.disconnect();
                Ok("disconnect".to_string())
            }
            Step::GoToHit {
                expect_thread,
                expect_error,
            } => self.go_to_hit(*expect_thread, *expect_error),
            Step::ResumeLockers => {
                let resumed = self.registry.resume_locker_threads()?;
                Ok(format!("resumed {} locker thread(s)", resumed))
            }
            Step::Filters { show } => {
                self.projector.set_show_filters(*show);
                Ok(format!("filters {}", if *show { "on" } else { "off" }))
            }
            Step::Expect(expect) => {
                self.check(expect)?;
                Ok("expect".to_string())
            }
        }
    }

    fn go_to_hit(&self, expect_thread: Option<ThreadId>, expect_error: bool) -> Result<String> {
        match self.registry.go_to_most_recent_hit() {
            Ok(thread) => {
                if expect_error {
                    return Err(Error::TestAssertion(format!(
                        "Expected go to hit to fail, it went to {}",
                        thread
                    )));
                }
                if let Some(expected) = expect_thread {
                    if expected != thread {
                        return Err(Error::TestAssertion(format!(
                            "Expected go to hit to select {}, got {}",
                            expected, thread
                        )));
                    }
                }
                Ok(format!("go to hit {}", thread))
            }
            Err(e) if expect_error => Ok(format!("go to hit (expected failure: {})", e)),
            Err(e) => Err(e),
        }
    }

    fn check(&self, expect: &Expectation) -> Result<()> {
        if let Some(expected) = &expect.hits {
            check_eq("hits", expected, &self.registry.breakpoint_hits())?;
        }
        if let Some(expected) = &expect.history {
            check_eq("history", expected, &self.registry.current_threads_history(false))?;
        }
        if let Some(expected) = &expect.tracked {
            check_eq("tracked", expected, &self.registry.tracked_threads())?;
        }
        if let Some(expected) = &expect.top_banner {
            let actual = self
                .projector
                .top()
                .map_or_else(|| "none".to_string(), |b| b.to_string());
            check_eq("top banner", expected, &actual)?;
        }
        if let Some(expected) = &expect.visible {
            for name in expected {
                if Banner::from_name(name).is_none() {
                    return Err(Error::Config(format!("Unknown banner '{}'", name)));
                }
            }
            let actual: Vec<String> = self
                .projector
                .layout()
                .visible
                .iter()
                .map(|b| b.to_string())
                .collect();
            check_eq("visible banners", expected, &actual)?;
        }
        if let Some(expected) = expect.hits_count {
            check_eq("hits count", &expected, &self.projector.hit_count())?;
        }
        if let Some(expected) = &expect.hits_text {
            let actual = self.projector.hits_text().unwrap_or_default();
            check_eq("hits text", expected, &actual)?;
        }
        if let Some(expected) = expect.bound {
            check_eq("bound", &expected, &self.registry.bound_session().is_some())?;
        }
        if let Some(expected) = &expect.lockers {
            let actual = self
                .registry
                .lock_relation()
                .map(|r| r.lockers)
                .unwrap_or_default();
            check_eq("lockers", expected, &actual)?;
            // The banner is only up while there is a relation to act on
            check_eq(
                "blocking threads banner",
                &!expected.is_empty(),
                &self.projector.is_visible(Banner::DeadlocksByDebugger),
            )?;
        }
        if let Some(expected) = &expect.bars {
            let actual: Vec<ColorBar> = self
                .registry
                .decorated_rows()
                .into_iter()
                .map(|(_, decoration)| decoration.bar)
                .collect();
            check_eq("row bars", expected, &actual)?;
        }
        Ok(())
    }
}

fn check_eq<T>(what: &str, expected: &T, actual: &T) -> Result<()>
where
    T: PartialEq + std::fmt::Debug + ?Sized,
{
    if expected == actual {
        Ok(())
    } else {
        Err(Error::TestAssertion(format!(
            "Expected {} {:?}, got {:?}",
            what, expected, actual
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Scenario {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_malformed_scenario_is_yaml_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"name: [unterminated\nsteps: 3\n").unwrap();

        let err = load_scenario(file.path()).unwrap_err();
        assert!(matches!(err, Error::Yaml(_)));
    }

    #[test]
    fn test_parse_steps() {
        let scenario = parse(
            r#"
name: parse
threads:
  - id: 1
    name: main
    stopped_at: { id: 1, description: "Main.java:5" }
steps:
  - action: bind
  - action: hit_breakpoint
    thread: 1
    breakpoint: { id: 2, description: "Main.java:9" }
  - action: lockers
    thread: 1
    lockers: [2, 3]
  - action: go_to_hit
    expect_thread: 1
  - action: expect
    hits: []
    top_banner: none
"#,
        );
        assert_eq!(scenario.steps.len(), 5);
        assert!(matches!(scenario.steps[0], Step::Bind));
        assert!(matches!(
            &scenario.steps[2],
            Step::Lockers { lockers: Some(l), .. } if l == &vec![ThreadId(2), ThreadId(3)]
        ));
        assert!(matches!(
            scenario.steps[3],
            Step::GoToHit {
                expect_thread: Some(ThreadId(1)),
                expect_error: false
            }
        ));
        assert!(scenario.threads[0].stopped_at.is_some());
    }

    #[test]
    fn test_check_eq_message() {
        let err = check_eq("hits", &vec![1], &vec![2]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Scenario assertion failed: Expected hits [1], got [2]"
        );
    }

    #[tokio::test]
    async fn test_run_passing_scenario() {
        let scenario = parse(
            r#"
name: one hit
threads:
  - { id: 1, name: main }
  - { id: 2, name: worker }
current: 1
steps:
  - action: bind
  - action: hit_breakpoint
    thread: 2
    breakpoint: { id: 1, description: "Worker.java:12" }
  - action: expect
    hits: [2]
    hits_text: "One new breakpoint hit"
    top_banner: hits
  - action: go_to_hit
    expect_thread: 2
  - action: expect
    hits: []
    history: [2, 1]
    top_banner: none
"#,
        );
        let result = run(scenario, &ViewConfig::default(), false).await.unwrap();
        assert!(result.passed, "{:?}", result.error);
        assert_eq!(result.steps_run, 5);
        assert!(result.view_updates > 0);
        assert_eq!(result.snapshot.history, vec![ThreadId(2), ThreadId(1)]);
    }

    #[tokio::test]
    async fn test_run_reports_failed_expectation() {
        let scenario = parse(
            r#"
name: wrong expectation
threads:
  - { id: 1, name: main }
steps:
  - action: bind
  - action: expect
    hits: [1]
  - action: unbind
"#,
        );
        let result = run(scenario, &ViewConfig::default(), false).await.unwrap();
        assert!(!result.passed);
        assert_eq!(result.steps_run, 2);
        assert!(result.error.unwrap().contains("Expected hits"));
    }
}
