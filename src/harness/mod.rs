//! Compatibility harness: runs a plan's checks in order and aggregates results.
//!
//! Checks are isolated from each other. A failing or panicking check is
//! recorded and the next one runs. The only coupling is an explicit
//! `depends_on` edge: a dependent check runs only when its prerequisite
//! passed, and is otherwise recorded as skipped without touching the
//! framework.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::io::Write;
use std::panic::{self, catch_unwind, AssertUnwindSafe};
use std::sync::Once;

use log::{debug, info, warn};

use crate::error::{log_check_error, CheckError};
use crate::fixture::Fixture;
use crate::framework::{Framework, LoadedConfig};
use crate::plan::{CheckKind, CheckPlan, CheckSpec};
use crate::report;

pub mod checks;

/// Aggregate process status of a harness run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Every non-skipped check passed.
    Success,
    /// At least one check failed.
    Failure,
}

impl ExitStatus {
    pub fn code(&self) -> u8 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Failure => 1,
        }
    }
}

impl From<ExitStatus> for std::process::ExitCode {
    fn from(status: ExitStatus) -> Self {
        std::process::ExitCode::from(status.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed,
    Skipped,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Passed => "PASS",
            Outcome::Failed => "FAIL",
            Outcome::Skipped => "SKIP",
        }
    }

    pub fn mark(&self) -> Mark {
        match self {
            Outcome::Passed => Mark::Pass,
            Outcome::Failed => Mark::Fail,
            Outcome::Skipped => Mark::Skip,
        }
    }
}

/// Leading symbol of a report line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Pass,
    Fail,
    Skip,
    /// Indented detail without a status.
    Info,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportLine {
    pub mark: Mark,
    pub text: String,
}

impl ReportLine {
    pub fn pass(text: impl Into<String>) -> Self {
        Self {
            mark: Mark::Pass,
            text: text.into(),
        }
    }

    pub fn fail(text: impl Into<String>) -> Self {
        Self {
            mark: Mark::Fail,
            text: text.into(),
        }
    }

    pub fn skip(text: impl Into<String>) -> Self {
        Self {
            mark: Mark::Skip,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self {
            mark: Mark::Info,
            text: text.into(),
        }
    }
}

/// Outcome of one check. Built once and never mutated after it is reported.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub name: String,
    pub title: String,
    pub outcome: Outcome,
    pub errors: Vec<CheckError>,
    pub lines: Vec<ReportLine>,
}

impl CheckResult {
    /// Passed when no errors were collected, failed otherwise.
    pub fn from_errors(spec: &CheckSpec, errors: Vec<CheckError>, lines: Vec<ReportLine>) -> Self {
        let outcome = if errors.is_empty() {
            Outcome::Passed
        } else {
            Outcome::Failed
        };
        Self {
            name: spec.name.clone(),
            title: spec.title.clone(),
            outcome,
            errors,
            lines,
        }
    }

    pub fn skipped(spec: &CheckSpec, dependency: &str) -> Self {
        let error = CheckError::DependencySkipped {
            dependency: dependency.to_string(),
        };
        Self {
            name: spec.name.clone(),
            title: spec.title.clone(),
            outcome: Outcome::Skipped,
            lines: vec![ReportLine::skip(format!(
                "Skipped - prerequisite '{}' did not pass",
                dependency
            ))],
            errors: vec![error],
        }
    }

    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Passed
    }

    /// All error messages joined, if any.
    pub fn detail(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }
        Some(
            self.errors
                .iter()
                .map(|err| err.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// Ordered results of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct HarnessReport {
    pub suite: String,
    pub title: String,
    pub model: String,
    results: Vec<CheckResult>,
}

impl HarnessReport {
    pub fn new(suite: &str, title: &str, model: &str) -> Self {
        Self {
            suite: suite.to_string(),
            title: title.to_string(),
            model: model.to_string(),
            results: Vec::new(),
        }
    }

    pub fn results(&self) -> &[CheckResult] {
        &self.results
    }

    pub fn get(&self, name: &str) -> Option<&CheckResult> {
        self.results.iter().find(|result| result.name == name)
    }

    pub fn passed_count(&self) -> usize {
        self.count(Outcome::Passed)
    }

    pub fn failed_count(&self) -> usize {
        self.count(Outcome::Failed)
    }

    pub fn skipped_count(&self) -> usize {
        self.count(Outcome::Skipped)
    }

    /// Checks that count toward the pass ratio; skipped checks are excluded.
    pub fn total_count(&self) -> usize {
        self.results.len() - self.skipped_count()
    }

    pub fn exit_status(&self) -> ExitStatus {
        if self.passed_count() == self.total_count() {
            ExitStatus::Success
        } else {
            ExitStatus::Failure
        }
    }

    fn count(&self, outcome: Outcome) -> usize {
        self.results
            .iter()
            .filter(|result| result.outcome == outcome)
            .count()
    }

    fn push(&mut self, result: CheckResult) {
        self.results.push(result);
    }
}

/// Runs a validated plan against a framework.
pub struct Harness<'a> {
    framework: &'a dyn Framework,
    plan: &'a CheckPlan,
    fixture: &'a Fixture,
}

impl<'a> Harness<'a> {
    pub fn new(framework: &'a dyn Framework, plan: &'a CheckPlan, fixture: &'a Fixture) -> Self {
        Self {
            framework,
            plan,
            fixture,
        }
    }

    pub fn run(&self, model: &str) -> HarnessReport {
        self.run_with_observer(model, |_| {})
    }

    /// Run every check, handing each result to `on_result` as soon as it exists.
    pub fn run_with_observer<F>(&self, model: &str, mut on_result: F) -> HarnessReport
    where
        F: FnMut(&CheckResult),
    {
        let mut report = HarnessReport::new(&self.plan.suite, &self.plan.title, model);
        let mut loaded: HashMap<String, LoadedConfig> = HashMap::new();

        for spec in &self.plan.checks {
            let span = tracing::info_span!("check", name = %spec.name);
            let _entered = span.enter();

            let result = match self.unmet_dependency(spec, &report) {
                Some(dependency) => {
                    info!("[Harness] {} skipped, {} did not pass", spec.name, dependency);
                    CheckResult::skipped(spec, dependency)
                }
                None => {
                    debug!("[Harness] Running {} ({})", spec.name, spec.title);
                    self.execute(spec, model, &mut loaded)
                }
            };

            match result.outcome {
                Outcome::Failed => {
                    for err in &result.errors {
                        log_check_error(err, &result.name);
                    }
                }
                outcome => info!("[Harness] {} {}", result.name, outcome.label()),
            }

            on_result(&result);
            report.push(result);
        }

        report
    }

    fn unmet_dependency<'s>(&self, spec: &'s CheckSpec, report: &HarnessReport) -> Option<&'s str> {
        let dependency = spec.depends_on.as_deref()?;
        match report.get(dependency) {
            Some(prior) if prior.passed() => None,
            _ => Some(dependency),
        }
    }

    fn execute(
        &self,
        spec: &CheckSpec,
        model: &str,
        loaded: &mut HashMap<String, LoadedConfig>,
    ) -> CheckResult {
        let framework = self.framework;
        install_panic_hook();
        CONTAINING_PANICS.with(|containing| containing.set(true));
        let outcome = catch_unwind(AssertUnwindSafe(|| match &spec.check {
            CheckKind::Imports { modules } => (checks::import_check(framework, spec, modules), None),
            CheckKind::Registry { registry, expect } => (
                checks::registry_check(
                    framework,
                    spec,
                    *registry,
                    expect,
                    &self.plan.similar_key_patterns,
                ),
                None,
            ),
            CheckKind::Construction { constructions } => (
                checks::construction_check(framework, spec, self.fixture, constructions),
                None,
            ),
            CheckKind::ConfigLoad { trust_remote_code } => {
                checks::config_load_check(framework, spec, model, *trust_remote_code)
            }
            CheckKind::ModelResolution => {
                let config = spec
                    .depends_on
                    .as_deref()
                    .and_then(|dependency| loaded.get(dependency));
                (checks::model_resolution_check(framework, spec, config), None)
            }
        }));
        CONTAINING_PANICS.with(|containing| containing.set(false));
        let location = PANIC_LOCATION.with(|location| location.borrow_mut().take());

        match outcome {
            Ok((result, config)) => {
                if let Some(config) = config {
                    loaded.insert(spec.name.clone(), config);
                }
                result
            }
            Err(payload) => {
                let mut reason = panic_payload_to_string(payload.as_ref());
                if let Some(location) = location {
                    reason = format!("{reason} at {location}");
                }
                warn!("[Harness] {} panicked: {}", spec.name, reason);
                CheckResult::from_errors(
                    spec,
                    vec![CheckError::CollaboratorFailed {
                        operation: spec.name.clone(),
                        reason: format!("panicked: {reason}"),
                    }],
                    vec![ReportLine::fail(format!("{} panicked: {}", spec.title, reason))],
                )
            }
        }
    }
}

thread_local! {
    static CONTAINING_PANICS: Cell<bool> = const { Cell::new(false) };
    static PANIC_LOCATION: RefCell<Option<String>> = const { RefCell::new(None) };
}

static PANIC_HOOK: Once = Once::new();

/// Wraps the current panic hook once per process. Panics raised while a check
/// runs on this thread are recorded in the check result instead of printed.
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if CONTAINING_PANICS.with(Cell::get) {
                let location = info
                    .location()
                    .map(|location| format!("{}:{}", location.file(), location.line()));
                PANIC_LOCATION.with(|slot| *slot.borrow_mut() = location);
            } else {
                previous(info);
            }
        }));
    });
}

fn panic_payload_to_string(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Run the whole plan, render the report to `out` and return the exit status.
///
/// Rendering failures are logged; they never change the status.
pub fn run(
    framework: &dyn Framework,
    plan: &CheckPlan,
    fixture: &Fixture,
    model: &str,
    out: &mut dyn Write,
) -> ExitStatus {
    if let Err(err) = report::render_banner(out, plan, model) {
        warn!("[Harness] Failed to write report banner: {}", err);
    }

    let harness = Harness::new(framework, plan, fixture);
    let mut index = 0usize;
    let report = harness.run_with_observer(model, |result| {
        index += 1;
        if let Err(err) = report::render_check(out, index, result) {
            warn!("[Harness] Failed to write {} section: {}", result.name, err);
        }
    });

    if let Err(err) = report::render_summary(out, &report, plan) {
        warn!("[Harness] Failed to write summary: {}", err);
    }
    report.exit_status()
}
