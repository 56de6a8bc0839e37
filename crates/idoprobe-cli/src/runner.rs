//! Glue between parsed arguments and the scenario runner

use crate::commands::RunArgs;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{OutputFormat, ProgressReporter};
use idoprobe::mock::SimulatedBackend;
use idoprobe::{
    catalog, select, Backend, Scenario, ScenarioFile, ScenarioRunner, SeedOverride, SeedPhrase, SuiteConfig,
    SuiteResults,
};
use std::path::Path;
use std::sync::Arc;

/// Seed used by `--simulate` when none is configured. Its first account is
/// funded in the simulation.
pub const DEMO_SEED: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

/// Built-in catalog or the scenarios of `path`, narrowed by `filter`
///
/// # Errors
///
/// File errors, or `InvalidArgument` when nothing is selected
pub fn load_scenarios(path: Option<&Path>, filter: Option<&str>) -> CliResult<Vec<Scenario>> {
    let all = match path {
        Some(path) => ScenarioFile::load(path)?.scenarios,
        None => catalog(),
    };
    let selected = select(all, filter);
    if selected.is_empty() {
        return Err(CliError::invalid_argument(format!(
            "no scenario matches '{}'",
            filter.unwrap_or_default()
        )));
    }
    Ok(selected)
}

/// Overlay run flags onto a loaded configuration
///
/// # Errors
///
/// The `--seed-env` variable is unset or holds a malformed phrase
pub fn apply_run_args(
    config: &mut SuiteConfig,
    args: &RunArgs,
    lookup: impl Fn(&str) -> Option<String>,
) -> CliResult<()> {
    if args.headless {
        config.headless = true;
    }
    if let Some(ref var) = args.seed_env {
        let seed = SeedOverride::Env { var: var.clone() }.resolve_with(lookup)?;
        config.seed = Some(seed);
    }
    if args.simulate && config.seed.is_none() {
        tracing::warn!("no seed phrase configured, simulating with the demo seed");
        config.seed = Some(SeedPhrase::parse(DEMO_SEED)?);
    }
    Ok(())
}

/// Effective suite configuration for a run
///
/// # Errors
///
/// Load, overlay or validation failures
pub fn suite_config(path: Option<&Path>, args: &RunArgs) -> CliResult<SuiteConfig> {
    let mut config = SuiteConfig::load(path)?;
    apply_run_args(&mut config, args, |key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

/// Backend for the run
///
/// # Errors
///
/// `InvalidArgument` when a browser run is requested from a build without one
pub fn backend(config: &SuiteConfig, simulate: bool) -> CliResult<Arc<dyn Backend>> {
    if simulate {
        return Ok(Arc::new(SimulatedBackend::new().with_app_url(config.app_url.clone())));
    }
    browser_backend()
}

#[cfg(feature = "browser")]
fn browser_backend() -> CliResult<Arc<dyn Backend>> {
    Ok(Arc::new(idoprobe::ChromiumBackend::new()))
}

#[cfg(not(feature = "browser"))]
fn browser_backend() -> CliResult<Arc<dyn Backend>> {
    Err(CliError::invalid_argument(
        "this build has no browser support; pass --simulate or rebuild with --features browser",
    ))
}

/// Run `scenarios`, reporting progress as they finish
pub async fn execute(
    cli: &CliConfig,
    suite: SuiteConfig,
    backend: Arc<dyn Backend>,
    scenarios: &[Scenario],
    suite_name: &str,
) -> SuiteResults {
    let mut runner = ScenarioRunner::new(backend, suite).with_jobs(cli.jobs);
    if cli.fail_fast {
        runner = runner.with_fail_fast();
    }
    if let Some(ref dir) = cli.artifacts_dir {
        runner = runner.with_artifacts(dir.clone());
    }

    let quiet = cli.verbosity.is_quiet() || cli.format == OutputFormat::Json;
    let mut reporter = ProgressReporter::new(cli.color.should_color(), quiet);
    reporter.header(&format!("{suite_name}: {} scenarios", scenarios.len()));
    reporter.start_progress(scenarios.len() as u64, suite_name);
    let results = runner
        .run_with(suite_name, scenarios, |result| reporter.scenario(result))
        .await;
    reporter.finish();
    if cli.format == OutputFormat::Text {
        reporter.summary(&results);
    }
    results
}

/// `Err` when any scenario failed
///
/// # Errors
///
/// `TestExecution` counting the failures
pub fn verdict(results: &SuiteResults) -> CliResult<()> {
    if results.all_passed() {
        Ok(())
    } else {
        Err(CliError::test_execution(format!(
            "{} of {} scenarios failed",
            results.failed_count(),
            results.total()
        )))
    }
}
