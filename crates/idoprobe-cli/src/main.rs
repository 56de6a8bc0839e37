//! idoprobe: end-to-end purchase scenarios for the token-sale dApp
//!
//! ## Usage
//!
//! ```bash
//! idoprobe run --simulate                 # Whole catalog against the simulation
//! idoprobe run --filter quantity          # Quantity scenarios in Chromium
//! idoprobe run --format json > out.json   # Machine-readable results
//! idoprobe list --yaml > scenarios.yaml   # Export the catalog
//! idoprobe validate scenarios.yaml        # Check a scenario file
//! idoprobe config                         # Effective configuration
//! ```

use clap::Parser;
use idoprobe::{ScenarioFile, SuiteConfig};
use idoprobe_cli::{
    logging, render_list, runner, Cli, CliConfig, CliError, CliResult, ColorChoice, Commands, ListArgs,
    OutputFormat, RunArgs, ValidateArgs, Verbosity,
};
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    let config = build_config(&cli);
    logging::init(config.verbosity, cli.log_format.into(), config.color.should_color());

    let suite_path = cli.config.as_deref();
    match cli.command {
        Commands::Run(ref args) => run_scenarios(config, suite_path, args),
        Commands::List(ref args) => run_list(args),
        Commands::Validate(ref args) => run_validate(args),
        Commands::Config => run_config(suite_path),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    let color: ColorChoice = cli.color.into();
    CliConfig::new().with_verbosity(verbosity).with_color(color)
}

fn run_scenarios(config: CliConfig, suite_path: Option<&Path>, args: &RunArgs) -> CliResult<()> {
    let config = config
        .with_jobs(args.jobs)
        .with_fail_fast(args.fail_fast)
        .with_format(args.format.into())
        .with_artifacts_dir(args.artifacts.clone());

    let scenarios = runner::load_scenarios(args.scenarios.as_deref(), args.filter.as_deref())?;
    let suite = runner::suite_config(suite_path, args)?;
    let backend = runner::backend(&suite, args.simulate)?;
    let suite_name = if args.simulate { "simulated" } else { "chromium" };

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::test_execution(format!("failed to start runtime: {e}")))?;
    let results = rt.block_on(runner::execute(&config, suite, backend, &scenarios, suite_name));

    if config.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }
    runner::verdict(&results)
}

fn run_list(args: &ListArgs) -> CliResult<()> {
    let scenarios = runner::load_scenarios(args.scenarios.as_deref(), args.filter.as_deref())?;
    if args.yaml {
        let file = ScenarioFile { scenarios };
        let yaml = serde_yaml_ng::to_string(&file).map_err(|e| CliError::config(e.to_string()))?;
        print!("{yaml}");
    } else {
        println!("{}", render_list(&scenarios));
    }
    Ok(())
}

fn run_validate(args: &ValidateArgs) -> CliResult<()> {
    let file = ScenarioFile::load(&args.file)?;
    println!("{}: {} scenarios valid", args.file.display(), file.scenarios.len());
    Ok(())
}

fn run_config(suite_path: Option<&Path>) -> CliResult<()> {
    let config = SuiteConfig::load(suite_path)?;
    print!("{}", config.to_redacted_yaml()?);
    Ok(())
}
