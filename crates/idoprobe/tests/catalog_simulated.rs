//! The whole built-in catalog against the in-process simulation

#![allow(clippy::unwrap_used)]

use idoprobe::mock::SimulatedBackend;
use idoprobe::{catalog, ui, FlowState, ScenarioRunner, SeedPhrase, SuiteConfig, Timeouts};
use std::sync::Arc;

const FUNDED: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

fn config() -> SuiteConfig {
    SuiteConfig {
        seed: Some(SeedPhrase::parse(FUNDED).unwrap()),
        timeouts: Timeouts::fast(),
        ..SuiteConfig::default()
    }
}

#[tokio::test]
async fn test_catalog_passes_sequentially() {
    let backend = Arc::new(SimulatedBackend::new());
    let runner = ScenarioRunner::new(backend.clone(), config());
    let scenarios = catalog();

    let results = runner.run("simulated", &scenarios).await;

    assert_eq!(results.total(), scenarios.len());
    assert!(results.all_passed(), "{:#?}", results.failures());
    let names: Vec<&str> = results.results.iter().map(|r| r.name.as_str()).collect();
    let expected: Vec<&str> = scenarios.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, expected);

    let contexts = backend.contexts();
    assert_eq!(contexts.len(), scenarios.len());
    assert!(contexts.iter().all(|c| c.close_count() == 1));
}

#[tokio::test]
async fn test_catalog_passes_in_parallel() {
    let backend = Arc::new(SimulatedBackend::new());
    let runner = ScenarioRunner::new(backend.clone(), config()).with_jobs(4);

    let results = runner.run("simulated", &catalog()).await;

    assert!(results.all_passed(), "{:#?}", results.failures());
    assert!(backend.contexts().iter().all(|c| c.close_count() == 1));
}

#[tokio::test]
async fn test_final_states() {
    let runner = ScenarioRunner::new(Arc::new(SimulatedBackend::new()), config());
    let results = runner.run("simulated", &catalog()).await;
    let state = |name: &str| {
        results
            .results
            .iter()
            .find(|r| r.name == name)
            .and_then(|r| r.final_state.clone())
            .unwrap()
    };

    assert_eq!(state("purchase_single_node"), FlowState::Idle);
    assert_eq!(state("zero_quantity"), FlowState::Blocked(ui::ENTER_AN_AMOUNT.into()));
    assert_eq!(
        state("exceeds_purchase_limit"),
        FlowState::Blocked(ui::EXCEEDED_PURCHASE_LIMIT.into())
    );
    assert_eq!(
        state("insufficient_balance_seed"),
        FlowState::Blocked(ui::INSUFFICIENT_BALANCE.into())
    );
}

#[tokio::test]
async fn test_unfunded_seed_breaks_purchases() {
    let backend = Arc::new(SimulatedBackend::new().with_unfunded_seed(FUNDED));
    let runner = ScenarioRunner::new(backend, config());
    let scenarios: Vec<_> = catalog()
        .into_iter()
        .filter(|s| s.name == "purchase_single_node")
        .collect();

    let results = runner.run("simulated", &scenarios).await;

    assert_eq!(results.failed_count(), 1);
}
