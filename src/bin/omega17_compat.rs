use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use omega17_compat::error::log_plan_error;
use omega17_compat::framework::snapshot::SNAPSHOT_ENV;
use omega17_compat::{BuiltinSuite, CheckPlan, Fixture, FrameworkSnapshot};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(
    name = "omega17-compat",
    version,
    about = "Check that Omega17 is registered and loadable in the serving framework"
)]
struct Cli {
    /// Model identifier under test: a local model directory or config.json path.
    /// Defaults to the plan's default model.
    model: Option<String>,
    /// Built-in check suite to run.
    #[arg(long, value_enum, default_value_t = SuiteArg::Local)]
    suite: SuiteArg,
    /// Custom check plan (JSON); overrides --suite.
    #[arg(long)]
    plan: Option<PathBuf>,
    /// Framework snapshot (JSON) describing the install under test.
    #[arg(long, env = SNAPSHOT_ENV)]
    framework: Option<PathBuf>,
    /// Fixture config (JSON) used by construction checks.
    #[arg(long)]
    fixture: Option<PathBuf>,
    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum SuiteArg {
    Local,
    Config,
}

impl From<SuiteArg> for BuiltinSuite {
    fn from(arg: SuiteArg) -> Self {
        match arg {
            SuiteArg::Local => BuiltinSuite::Local,
            SuiteArg::Config => BuiltinSuite::Config,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match execute(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("omega17-compat error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn execute(cli: Cli) -> Result<ExitCode> {
    let plan = match &cli.plan {
        Some(path) => CheckPlan::load(path),
        None => BuiltinSuite::from(cli.suite).plan(),
    }
    .inspect_err(|err| log_plan_error(err, "plan loading"))
    .context("loading check plan")?;

    let framework = match &cli.framework {
        Some(path) => FrameworkSnapshot::load(path)
            .with_context(|| format!("loading framework snapshot {}", path.display()))?,
        None => {
            tracing::warn!(
                "no framework snapshot given (--framework or {}); every check will fail",
                SNAPSHOT_ENV
            );
            FrameworkSnapshot::empty()
        }
    };

    let fixture = match &cli.fixture {
        Some(path) => Fixture::load(path),
        None => Fixture::builtin(),
    }
    .context("loading fixture")?;

    let model = cli.model.unwrap_or_else(|| plan.default_model.clone());
    let mut stdout = std::io::stdout().lock();
    let status = omega17_compat::run(&framework, &plan, &fixture, &model, &mut stdout);
    Ok(status.into())
}
