//! Scenario runner.
//!
//! Each scenario gets its own bootstrapped wallet and browser context, so
//! scenarios can run side by side without sharing anything. The context is
//! closed whatever the outcome.

use crate::bootstrap::{bootstrap_wallet, Backend, Bootstrapped};
use crate::config::SuiteConfig;
use crate::helpers::configure_network;
use crate::page::Page;
use crate::pipeline::{FlowState, RunReport, Session};
use crate::result::ProbeResult;
use crate::scenario::{Scenario, SeedOverride};
use futures::stream::{self, StreamExt};
use serde::{Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    /// Scenario name
    pub name: String,
    /// Whether the scenario passed
    pub passed: bool,
    /// Error message if failed
    pub error: Option<String>,
    /// Wall time
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
    /// Steps executed before finishing or failing
    pub steps_run: usize,
    /// Flow state at the end, when the pipeline completed
    pub final_state: Option<FlowState>,
    /// Screenshot captured on failure
    pub screenshot: Option<PathBuf>,
}

impl ScenarioResult {
    /// Create a passing result
    #[must_use]
    pub fn pass(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            error: None,
            duration: Duration::ZERO,
            steps_run: 0,
            final_state: None,
            screenshot: None,
        }
    }

    /// Create a failing result
    #[must_use]
    pub fn fail(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            passed: false,
            error: Some(error.into()),
            ..Self::pass(name)
        }
    }

    /// Set duration
    #[must_use]
    pub const fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

/// Results from running a set of scenarios
#[derive(Debug, Clone, Serialize)]
pub struct SuiteResults {
    /// Suite name
    pub suite_name: String,
    /// Individual results, in scenario order
    pub results: Vec<ScenarioResult>,
    /// Total duration
    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
}

impl SuiteResults {
    /// Check if all scenarios passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    /// Count passed scenarios
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    /// Count failed scenarios
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.passed).count()
    }

    /// Get total scenario count
    #[must_use]
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Get failed scenarios
    #[must_use]
    pub fn failures(&self) -> Vec<&ScenarioResult> {
        self.results.iter().filter(|r| !r.passed).collect()
    }
}

/// Runs scenarios against a backend
pub struct ScenarioRunner {
    backend: Arc<dyn Backend>,
    config: SuiteConfig,
    jobs: usize,
    fail_fast: bool,
    artifacts: Option<PathBuf>,
}

impl std::fmt::Debug for ScenarioRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioRunner")
            .field("backend", &self.backend.name())
            .field("jobs", &self.jobs)
            .field("fail_fast", &self.fail_fast)
            .field("artifacts", &self.artifacts)
            .finish_non_exhaustive()
    }
}

struct Attempt {
    outcome: ProbeResult<RunReport>,
    screenshot: Option<PathBuf>,
}

impl Attempt {
    const fn failed(outcome: ProbeResult<RunReport>) -> Self {
        Self {
            outcome,
            screenshot: None,
        }
    }
}

impl ScenarioRunner {
    /// Sequential runner over `backend`
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, config: SuiteConfig) -> Self {
        Self {
            backend,
            config,
            jobs: 1,
            fail_fast: false,
            artifacts: None,
        }
    }

    /// Run up to `jobs` scenarios at once
    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Start no new scenario after the first failure
    #[must_use]
    pub const fn with_fail_fast(mut self) -> Self {
        self.fail_fast = true;
        self
    }

    /// Save failure screenshots under `dir`
    #[must_use]
    pub fn with_artifacts(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts = Some(dir.into());
        self
    }

    /// Effective configuration
    #[must_use]
    pub const fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Run one scenario
    pub async fn run_scenario(&self, scenario: &Scenario) -> ScenarioResult {
        let span = tracing::info_span!("scenario", name = %scenario.name, backend = self.backend.name());
        async {
            let started = Instant::now();
            let attempt = self.attempt(scenario).await;
            let mut result = match attempt.outcome {
                Ok(report) => {
                    tracing::info!(steps = report.steps_run, "scenario passed");
                    let mut result = ScenarioResult::pass(&scenario.name);
                    result.steps_run = report.steps_run;
                    result.final_state = Some(report.state);
                    result
                }
                Err(e) => {
                    tracing::error!(error = %e, "scenario failed");
                    ScenarioResult::fail(&scenario.name, e.to_string())
                }
            };
            result.screenshot = attempt.screenshot;
            result.with_duration(started.elapsed())
        }
        .instrument(span)
        .await
    }

    /// Run `scenarios`, calling `observer` as each one finishes
    pub async fn run_with<F>(&self, suite_name: &str, scenarios: &[Scenario], mut observer: F) -> SuiteResults
    where
        F: FnMut(&ScenarioResult),
    {
        let started = Instant::now();
        let stop = AtomicBool::new(false);
        let stop = &stop;
        let mut pending = stream::iter(scenarios)
            .map(|scenario| async move {
                if stop.load(Ordering::SeqCst) {
                    tracing::debug!(name = %scenario.name, "not started after earlier failure");
                    return None;
                }
                Some(self.run_scenario(scenario).await)
            })
            .buffered(self.jobs);

        let mut results = Vec::with_capacity(scenarios.len());
        while let Some(result) = pending.next().await {
            let Some(result) = result else { continue };
            if !result.passed && self.fail_fast {
                stop.store(true, Ordering::SeqCst);
            }
            observer(&result);
            results.push(result);
        }

        SuiteResults {
            suite_name: suite_name.to_string(),
            results,
            duration: started.elapsed(),
        }
    }

    /// Run `scenarios`
    pub async fn run(&self, suite_name: &str, scenarios: &[Scenario]) -> SuiteResults {
        self.run_with(suite_name, scenarios, |_| {}).await
    }

    async fn attempt(&self, scenario: &Scenario) -> Attempt {
        let seed = match scenario.seed.as_ref().map(SeedOverride::resolve).transpose() {
            Ok(seed) => seed,
            Err(e) => return Attempt::failed(Err(e)),
        };
        let boot_config = match self.config.bootstrap_config(seed.as_ref()) {
            Ok(c) => c,
            Err(e) => return Attempt::failed(Err(e)),
        };
        let boot = match bootstrap_wallet(self.backend.as_ref(), &boot_config).await {
            Ok(b) => b,
            Err(e) => return Attempt::failed(Err(e)),
        };

        let attempt = self.in_context(scenario, &boot).await;
        if let Err(e) = boot.context.close().await {
            tracing::warn!(error = %e, "closing the browser context failed");
        }
        attempt
    }

    async fn in_context(&self, scenario: &Scenario, boot: &Bootstrapped) -> Attempt {
        if let Err(e) = configure_network(&boot.wallet, &self.config.network, &self.config.token).await {
            return Attempt::failed(Err(e));
        }
        let page = match boot.context.new_page().await {
            Ok(p) => p,
            Err(e) => return Attempt::failed(Err(e)),
        };
        let session = Session {
            page: &page,
            wallet: &boot.wallet,
            context: &boot.context,
            config: &self.config,
        };
        let outcome = match page.goto(&self.config.app_url).await {
            Ok(()) => scenario.steps.run(session).await,
            Err(e) => Err(e),
        };
        let screenshot = match (&outcome, &self.artifacts) {
            (Err(_), Some(dir)) => capture(&page, dir, &scenario.name).await,
            _ => None,
        };
        Attempt { outcome, screenshot }
    }
}

async fn capture(page: &Page, dir: &Path, name: &str) -> Option<PathBuf> {
    let shot = match page.screenshot().await {
        Ok(shot) if shot.is_valid() => shot,
        Ok(_) => return None,
        Err(e) => {
            tracing::warn!(error = %e, "failure screenshot unavailable");
            return None;
        }
    };
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S");
    let path = dir.join(format!("{name}-{stamp}.png"));
    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        tracing::warn!(error = %e, "could not create artifact directory");
        return None;
    }
    match tokio::fs::write(&path, &shot.data).await {
        Ok(()) => {
            tracing::info!(path = %path.display(), "saved failure screenshot");
            Some(path)
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not save failure screenshot");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::bootstrap::SeedPhrase;
    use crate::mock::SimulatedBackend;
    use crate::pipeline::{Step, Target};
    use crate::scenario::catalog;
    use crate::ui;
    use crate::wait::Timeouts;

    const FUNDED: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn config() -> SuiteConfig {
        SuiteConfig {
            seed: Some(SeedPhrase::parse(FUNDED).unwrap()),
            timeouts: Timeouts::fast(),
            ..SuiteConfig::default()
        }
    }

    fn named(name: &str) -> Scenario {
        catalog().into_iter().find(|s| s.name == name).unwrap()
    }

    fn broken() -> Scenario {
        Scenario::new(
            "broken",
            vec![
                Step::EnableStaging,
                Step::ConnectWallet,
                Step::ExpectVisible(Target::Text("no such banner".into())),
            ],
        )
    }

    mod result_tests {
        use super::*;

        #[test]
        fn test_counts() {
            let results = SuiteResults {
                suite_name: "s".into(),
                results: vec![ScenarioResult::pass("a"), ScenarioResult::fail("b", "boom")],
                duration: Duration::ZERO,
            };
            assert!(!results.all_passed());
            assert_eq!(results.passed_count(), 1);
            assert_eq!(results.failed_count(), 1);
            assert_eq!(results.total(), 2);
            assert_eq!(results.failures()[0].name, "b");
        }

        #[test]
        fn test_json_duration_in_millis() {
            let result = ScenarioResult::pass("a").with_duration(Duration::from_millis(1500));
            let json = serde_json::to_value(&result).unwrap();
            assert_eq!(json["duration_ms"], 1500);
        }
    }

    mod runner_tests {
        use super::*;

        #[tokio::test]
        async fn test_single_purchase_passes() {
            let backend = Arc::new(SimulatedBackend::new());
            let runner = ScenarioRunner::new(backend.clone(), config());
            let result = runner.run_scenario(&named("purchase_single_node")).await;
            assert!(result.passed, "{:?}", result.error);
            assert_eq!(result.final_state, Some(FlowState::Idle));
            assert_eq!(backend.contexts()[0].close_count(), 1);
        }

        #[tokio::test]
        async fn test_context_closed_on_failure() {
            let backend = Arc::new(SimulatedBackend::new());
            let runner = ScenarioRunner::new(backend.clone(), config());
            let result = runner.run_scenario(&broken()).await;
            assert!(!result.passed);
            assert!(result.error.unwrap().contains("no such banner"));
            assert_eq!(backend.contexts()[0].close_count(), 1);
        }

        #[tokio::test]
        async fn test_missing_seed_fails_before_bootstrap() {
            let backend = Arc::new(SimulatedBackend::new());
            let runner = ScenarioRunner::new(backend.clone(), SuiteConfig::default());
            let result = runner.run_scenario(&named("zero_quantity")).await;
            assert!(result.error.unwrap().contains("WALLET_SEED"));
            assert!(backend.contexts().is_empty());
        }

        #[tokio::test]
        async fn test_seed_override_reaches_backend() {
            let runner = ScenarioRunner::new(Arc::new(SimulatedBackend::new()), config());
            let result = runner.run_scenario(&named("insufficient_balance_seed")).await;
            assert!(result.passed, "{:?}", result.error);
            assert_eq!(
                result.final_state,
                Some(FlowState::Blocked(ui::INSUFFICIENT_BALANCE.into()))
            );
        }

        #[tokio::test]
        async fn test_bootstrap_failure_reported() {
            let runner = ScenarioRunner::new(Arc::new(SimulatedBackend::new().with_failing_install()), config());
            let result = runner.run_scenario(&named("zero_quantity")).await;
            assert!(result.error.unwrap().contains("bootstrap"));
        }

        #[tokio::test]
        async fn test_fail_fast_stops_sequential_run() {
            let runner = ScenarioRunner::new(Arc::new(SimulatedBackend::new()), config()).with_fail_fast();
            let scenarios = vec![broken(), named("zero_quantity")];
            let results = runner.run("suite", &scenarios).await;
            assert_eq!(results.total(), 1);
            assert_eq!(results.failed_count(), 1);
        }

        #[tokio::test]
        async fn test_parallel_keeps_order() {
            let runner = ScenarioRunner::new(Arc::new(SimulatedBackend::new()), config()).with_jobs(4);
            let scenarios: Vec<_> = ["zero_quantity", "negative_quantity", "non_numeric_input", "decimal_input"]
                .into_iter()
                .map(named)
                .collect();
            let mut seen = 0;
            let results = runner.run_with("suite", &scenarios, |_| seen += 1).await;
            assert!(results.all_passed(), "{:?}", results.failures());
            assert_eq!(seen, 4);
            let names: Vec<_> = results.results.iter().map(|r| r.name.as_str()).collect();
            assert_eq!(names, ["zero_quantity", "negative_quantity", "non_numeric_input", "decimal_input"]);
        }
    }
}
