//! Named scenarios and the built-in catalog.

use crate::bootstrap::{SeedPhrase, HARDHAT_MNEMONIC};
use crate::pipeline::{Pipeline, Step, Target};
use crate::quantity::Quantity;
use crate::result::{ProbeError, ProbeResult};
use crate::ui;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Seed a scenario uses instead of the configured one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedOverride {
    /// The well-known development mnemonic (holds no TUSD)
    Hardhat,
    /// Phrase read from an environment variable when the scenario starts
    Env {
        /// Variable name
        var: String,
    },
}

impl SeedOverride {
    /// Resolve to a phrase
    ///
    /// # Errors
    ///
    /// `Config` if the variable is unset, `Bootstrap` if the phrase is malformed
    pub fn resolve(&self) -> ProbeResult<SeedPhrase> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// [`Self::resolve`] over an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// As [`Self::resolve`]
    pub fn resolve_with(&self, lookup: impl Fn(&str) -> Option<String>) -> ProbeResult<SeedPhrase> {
        match self {
            Self::Hardhat => SeedPhrase::parse(HARDHAT_MNEMONIC),
            Self::Env { var } => {
                let raw = lookup(var).ok_or_else(|| ProbeError::config(format!("{var} is not set")))?;
                SeedPhrase::parse(&raw)
            }
        }
    }
}

/// One end-to-end scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name
    pub name: String,
    /// What it demonstrates
    #[serde(default)]
    pub description: String,
    /// Seed used instead of the configured one
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "serde_yaml_ng::with::singleton_map_recursive"
    )]
    pub seed: Option<SeedOverride>,
    /// Steps
    pub steps: Pipeline,
}

impl Scenario {
    /// Scenario named `name` running `steps`
    #[must_use]
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            seed: None,
            steps: Pipeline::new(steps),
        }
    }

    /// Set the description
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Use `seed` instead of the configured phrase
    #[must_use]
    pub fn with_seed(mut self, seed: SeedOverride) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Whether `filter` selects this scenario (case-insensitive substring)
    #[must_use]
    pub fn matches(&self, filter: &str) -> bool {
        self.name.to_lowercase().contains(&filter.to_lowercase())
    }
}

/// Scenario file: a list under `scenarios:`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioFile {
    /// Scenarios in run order
    pub scenarios: Vec<Scenario>,
}

impl ScenarioFile {
    /// Parse YAML and validate every pipeline
    ///
    /// # Errors
    ///
    /// `Yaml` on malformed input, `InvalidPipeline` naming the bad scenario,
    /// `Config` on duplicate names
    pub fn from_yaml_str(yaml: &str) -> ProbeResult<Self> {
        let file: Self = serde_yaml_ng::from_str(yaml)?;
        file.validate()?;
        Ok(file)
    }

    /// Read and parse a scenario file
    ///
    /// # Errors
    ///
    /// `Io` plus everything [`Self::from_yaml_str`] returns
    pub fn load(path: &Path) -> ProbeResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Write as YAML
    ///
    /// # Errors
    ///
    /// `Yaml` or `Io`
    pub fn save(&self, path: &Path) -> ProbeResult<()> {
        std::fs::write(path, serde_yaml_ng::to_string(self)?)?;
        Ok(())
    }

    /// Check names are unique and pipelines valid
    ///
    /// # Errors
    ///
    /// First problem found
    pub fn validate(&self) -> ProbeResult<()> {
        let mut seen = std::collections::HashSet::new();
        for scenario in &self.scenarios {
            if !seen.insert(scenario.name.as_str()) {
                return Err(ProbeError::config(format!("duplicate scenario '{}'", scenario.name)));
            }
            scenario.steps.validate().map_err(|e| match e {
                ProbeError::InvalidPipeline { index, step, message } => ProbeError::InvalidPipeline {
                    index,
                    step,
                    message: format!("{}: {message}", scenario.name),
                },
                other => other,
            })?;
        }
        Ok(())
    }
}

fn connected() -> Vec<Step> {
    vec![Step::EnableStaging, Step::ConnectWallet]
}

fn with_prefix(mut steps: Vec<Step>, rest: impl IntoIterator<Item = Step>) -> Vec<Step> {
    steps.extend(rest);
    steps
}

fn purchase(quantity: i64) -> [Step; 3] {
    [
        Step::InitiatePurchase {
            quantity: quantity.into(),
        },
        Step::HandleApproval,
        Step::ClickPurchase,
    ]
}

fn button(label: &str) -> Target {
    Target::Button(label.to_string())
}

fn rejected_quantity(name: &str, quantity: Quantity, label: &str) -> Scenario {
    Scenario::new(
        name,
        with_prefix(
            connected(),
            [
                Step::InitiatePurchase { quantity },
                Step::ExpectDisabled(button(label)),
            ],
        ),
    )
}

fn cleared_input(name: &str, raw: &str) -> Scenario {
    Scenario::new(
        name,
        with_prefix(
            connected(),
            [
                Step::InitiatePurchase { quantity: raw.into() },
                Step::ExpectValue {
                    target: Target::AmountField,
                    value: String::new(),
                },
            ],
        ),
    )
}

/// Every built-in scenario, in suite order
#[must_use]
pub fn catalog() -> Vec<Scenario> {
    let mut single = connected();
    single.extend(purchase(1));
    single.extend([
        Step::AgreeIfPrompted,
        Step::SignInWallet,
        Step::DismissShareDialogIfPresent,
        Step::ExpectVisible(Target::Text(ui::purchased_text(1))),
    ]);

    let mut body = purchase(1).to_vec();
    body.extend([
        Step::AgreeIfPrompted,
        Step::SignInWallet,
        Step::DismissShareDialogIfPresent,
        Step::ExpectVisible(Target::Text(ui::purchased_text(1))),
    ]);
    let multiple = with_prefix(connected(), [Step::Repeat { times: 2, steps: body }]);

    let mut rejection = connected();
    rejection.extend(purchase(1));
    rejection.extend([
        Step::AgreeIfPrompted,
        Step::RejectInWallet,
        Step::ExpectVisible(Target::Text(ui::PURCHASE_FAILED.to_string())),
    ]);

    let new_account = vec![
        Step::CreateAccount,
        Step::SwitchAccount { index: 2 },
        Step::AddToken,
        Step::FocusApp,
        Step::EnableStaging,
        Step::ConnectWallet,
        Step::InitiatePurchase { quantity: 1.into() },
        Step::ExpectDisabled(button(ui::INSUFFICIENT_BALANCE)),
    ];

    let mut double = connected();
    double.extend(purchase(1));
    double.extend([
        Step::Agree,
        Step::CloseDialog,
        Step::ExpectDisabled(button(ui::PURCHASE)),
        Step::ExpectHidden(Target::Text(ui::WAITING_FOR_SIGNATURE.to_string())),
    ]);

    let mut agreement = connected();
    agreement.extend(purchase(1));
    agreement.extend([
        Step::CloseDialog,
        Step::ExpectHidden(Target::Text(ui::CONFIRM_PURCHASE.to_string())),
    ]);

    vec![
        Scenario::new("purchase_single_node", single)
            .describe("buy one node and see the success banner"),
        Scenario::new("purchase_multiple_nodes", multiple)
            .describe("two purchases in one session; only the first shows the terms and share dialogs"),
        Scenario::new("transaction_rejection", rejection)
            .describe("rejecting in the wallet shows the failure message"),
        Scenario::new("insufficient_balance_new_account", new_account)
            .describe("a freshly derived account holds no TUSD"),
        Scenario::new("double_submission", double)
            .describe("closing the pending dialog hides it and leaves Purchase disabled"),
        rejected_quantity("zero_quantity", 0.into(), ui::ENTER_AN_AMOUNT)
            .describe("zero is not an amount"),
        rejected_quantity("negative_quantity", (-1).into(), ui::ENTER_AN_AMOUNT)
            .describe("negative amounts are refused"),
        rejected_quantity(
            "exceeds_purchase_limit",
            i64::try_from(ui::PURCHASE_LIMIT).unwrap_or(i64::MAX).into(),
            ui::EXCEEDED_PURCHASE_LIMIT,
        )
        .describe("the limit itself is already too much"),
        cleared_input("non_numeric_input", "abc").describe("letters never reach the field"),
        cleared_input("special_characters_input", "@#$%").describe("symbols never reach the field"),
        Scenario::new(
            "decimal_input",
            with_prefix(
                connected(),
                [
                    Step::InitiatePurchase { quantity: 1.5.into() },
                    Step::ExpectWholeNumber(Target::AmountField),
                ],
            ),
        )
        .describe("decimals are truncated to whole nodes"),
        Scenario::new("agreement_rejected", agreement)
            .describe("closing the terms dialog abandons the purchase"),
        rejected_quantity("insufficient_balance_seed", 1.into(), ui::INSUFFICIENT_BALANCE)
            .with_seed(SeedOverride::Hardhat)
            .describe("a seed without TUSD cannot buy"),
    ]
}

/// Scenarios whose name contains `filter`; all of them without one
#[must_use]
pub fn select(scenarios: Vec<Scenario>, filter: Option<&str>) -> Vec<Scenario> {
    match filter {
        Some(f) => scenarios.into_iter().filter(|s| s.matches(f)).collect(),
        None => scenarios,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod catalog_tests {
        use super::*;

        #[test]
        fn test_thirteen_scenarios() {
            assert_eq!(catalog().len(), 13);
        }

        #[test]
        fn test_every_pipeline_valid() {
            ScenarioFile { scenarios: catalog() }.validate().unwrap();
        }

        #[test]
        fn test_only_seed_scenario_overrides() {
            let overridden: Vec<_> = catalog()
                .into_iter()
                .filter(|s| s.seed.is_some())
                .map(|s| s.name)
                .collect();
            assert_eq!(overridden, vec!["insufficient_balance_seed"]);
        }

        #[test]
        fn test_double_submission_checks_dialog_closed() {
            let double = catalog().into_iter().find(|s| s.name == "double_submission").unwrap();
            let steps = double.steps.steps();
            let tail = &steps[steps.len() - 2..];
            assert_eq!(
                tail,
                [
                    Step::ExpectDisabled(button(ui::PURCHASE)),
                    Step::ExpectHidden(Target::Text(ui::WAITING_FOR_SIGNATURE.to_string())),
                ]
            );
        }

        #[test]
        fn test_select() {
            assert_eq!(select(catalog(), Some("INSUFFICIENT")).len(), 2);
            assert_eq!(select(catalog(), None).len(), 13);
            assert!(select(catalog(), Some("nope")).is_empty());
        }
    }

    mod file_tests {
        use super::*;

        #[test]
        fn test_save_and_load() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("scenarios.yaml");
            let file = ScenarioFile { scenarios: catalog() };
            file.save(&path).unwrap();
            assert_eq!(ScenarioFile::load(&path).unwrap(), file);
        }

        #[test]
        fn test_hand_written() {
            let yaml = r#"
scenarios:
  - name: limit
    seed: hardhat
    steps:
      - enable_staging
      - connect_wallet
      - initiate_purchase: { quantity: 601 }
      - expect_disabled: { button: Exceeded Purchase Limit }
"#;
            let file = ScenarioFile::from_yaml_str(yaml).unwrap();
            assert_eq!(file.scenarios[0].seed, Some(SeedOverride::Hardhat));
            assert_eq!(file.scenarios[0].steps.len(), 4);
        }

        #[test]
        fn test_env_seed_and_nested_steps() {
            let yaml = r#"
scenarios:
  - name: again
    seed: { env: { var: ALT_SEED } }
    steps:
      - enable_staging
      - connect_wallet
      - repeat:
          times: 2
          steps:
            - initiate_purchase: { quantity: 1 }
            - expect_enabled: { button: Purchase }
"#;
            let file = ScenarioFile::from_yaml_str(yaml).unwrap();
            let scenario = &file.scenarios[0];
            assert_eq!(scenario.seed, Some(SeedOverride::Env { var: "ALT_SEED".into() }));
            assert!(matches!(
                &scenario.steps.steps()[2],
                Step::Repeat { times: 2, steps } if steps.len() == 2
            ));
            let again = ScenarioFile::from_yaml_str(&serde_yaml_ng::to_string(&file).unwrap()).unwrap();
            assert_eq!(again, file);
        }

        #[test]
        fn test_invalid_pipeline_names_scenario() {
            let yaml = "scenarios:\n  - name: broken\n    steps: [connect_wallet]\n";
            let err = ScenarioFile::from_yaml_str(yaml).unwrap_err();
            assert!(err.to_string().contains("broken"));
        }

        #[test]
        fn test_duplicate_names() {
            let s = Scenario::new("a", connected());
            let err = ScenarioFile {
                scenarios: vec![s.clone(), s],
            }
            .validate()
            .unwrap_err();
            assert!(err.to_string().contains("duplicate"));
        }
    }

    mod seed_tests {
        use super::*;

        #[test]
        fn test_hardhat() {
            assert_eq!(SeedOverride::Hardhat.resolve().unwrap().word_count(), 12);
        }

        #[test]
        fn test_env_lookup() {
            let seed = SeedOverride::Env { var: "ALT_SEED".into() };
            let resolved = seed
                .resolve_with(|_| Some(HARDHAT_MNEMONIC.to_string()))
                .unwrap();
            assert_eq!(resolved.phrase(), HARDHAT_MNEMONIC);
            assert!(seed.resolve_with(|_| None).is_err());
        }
    }
}
