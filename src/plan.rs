//! Check plans: which checks run, in what order, against which identifiers.
//!
//! Expected registrations differ between framework revisions, so they live in
//! JSON plans rather than in code. Two suites ship embedded in the binary and
//! any other plan can be loaded from disk. Plans are validated once at load
//! time; the harness assumes a validated plan.

use std::collections::HashSet;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PlanError;
use crate::framework::RegistryKind;

const LOCAL_PLAN: &str = include_str!("../plans/local.json");
const CONFIG_PLAN: &str = include_str!("../plans/config.json");

/// Suites embedded in the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinSuite {
    /// Fixture-driven checks that need no model download.
    Local,
    /// Registry expectations plus loading a real model config.
    Config,
}

impl BuiltinSuite {
    pub fn plan(&self) -> Result<CheckPlan, PlanError> {
        match self {
            BuiltinSuite::Local => CheckPlan::from_json(LOCAL_PLAN, "builtin local plan"),
            BuiltinSuite::Config => CheckPlan::from_json(CONFIG_PLAN, "builtin config plan"),
        }
    }
}

/// Ordered list of checks plus report metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckPlan {
    pub version: u32,
    pub suite: String,
    pub title: String,
    pub default_model: String,
    #[serde(default)]
    pub similar_key_patterns: Vec<String>,
    /// Printed after a fully passing run; `{model}` is substituted.
    #[serde(default)]
    pub success_hint: Option<String>,
    pub checks: Vec<CheckSpec>,
}

impl CheckPlan {
    pub fn load(path: &Path) -> Result<Self, PlanError> {
        let contents = std::fs::read_to_string(path).map_err(|err| PlanError::ReadFailed {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        let plan = Self::from_json(&contents, &path.display().to_string())?;
        info!(
            "[Plan] Loaded suite {} ({} checks) from {}",
            plan.suite,
            plan.checks.len(),
            path.display()
        );
        Ok(plan)
    }

    /// Parse plan contents from JSON and validate invariants.
    pub fn from_json(data: &str, source: &str) -> Result<Self, PlanError> {
        let plan: CheckPlan = serde_json::from_str(data).map_err(|err| PlanError::ParseFailed {
            source: source.to_string(),
            reason: err.to_string(),
        })?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn find(&self, name: &str) -> Option<&CheckSpec> {
        self.checks.iter().find(|check| check.name == name)
    }

    fn validate(&self) -> Result<(), PlanError> {
        if self.version == 0 {
            return Err(PlanError::invalid("plan version must be > 0"));
        }
        if self.checks.is_empty() {
            return Err(PlanError::invalid("plan must contain at least one check"));
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for check in &self.checks {
            if check.name.trim().is_empty() {
                return Err(PlanError::invalid("check name cannot be empty"));
            }
            if let Some(dependency) = &check.depends_on {
                // Only earlier checks count, which also rules out cycles.
                if !seen.contains(dependency.as_str()) {
                    return Err(PlanError::invalid(format!(
                        "check {} depends on {}, which is not declared before it",
                        check.name, dependency
                    )));
                }
            }
            if !seen.insert(check.name.as_str()) {
                return Err(PlanError::invalid(format!(
                    "duplicate check name detected: {}",
                    check.name
                )));
            }
            check.check.validate(&check.name)?;

            if matches!(check.check, CheckKind::ModelResolution) {
                let loads_config = check
                    .depends_on
                    .as_deref()
                    .and_then(|dependency| self.find(dependency))
                    .is_some_and(|dependency| {
                        matches!(dependency.check, CheckKind::ConfigLoad { .. })
                    });
                if !loads_config {
                    return Err(PlanError::invalid(format!(
                        "model resolution check {} must depend on a config load check",
                        check.name
                    )));
                }
            }
        }
        Ok(())
    }
}

/// One entry of a plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckSpec {
    pub name: String,
    pub title: String,
    pub check: CheckKind,
    #[serde(default)]
    pub depends_on: Option<String>,
    /// Recommendation printed when this check fails.
    #[serde(default)]
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckKind {
    Imports {
        modules: Vec<ImportExpectation>,
    },
    Registry {
        registry: RegistryKind,
        expect: Vec<ExpectedRegistration>,
    },
    Construction {
        constructions: Vec<ConstructionSpec>,
    },
    ConfigLoad {
        #[serde(default)]
        trust_remote_code: bool,
    },
    ModelResolution,
}

impl CheckKind {
    fn validate(&self, name: &str) -> Result<(), PlanError> {
        match self {
            CheckKind::Imports { modules } => {
                if modules.is_empty() {
                    return Err(PlanError::invalid(format!(
                        "import check {name} lists no modules"
                    )));
                }
                for module in modules {
                    if module.module.trim().is_empty() || module.symbols.is_empty() {
                        return Err(PlanError::invalid(format!(
                            "import check {name} needs a module path and at least one symbol"
                        )));
                    }
                }
            }
            CheckKind::Registry { expect, .. } => {
                if expect.is_empty() {
                    return Err(PlanError::invalid(format!(
                        "registry check {name} lists no expected registrations"
                    )));
                }
            }
            CheckKind::Construction { constructions } => {
                if constructions.is_empty() {
                    return Err(PlanError::invalid(format!(
                        "construction check {name} lists no constructions"
                    )));
                }
            }
            CheckKind::ConfigLoad { .. } | CheckKind::ModelResolution => {}
        }
        Ok(())
    }
}

/// Symbols that must be importable from one module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportExpectation {
    pub module: String,
    pub symbols: Vec<String>,
}

/// What a registry lookup should return.
///
/// Without `expected` the lookup only asserts membership.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpectedRegistration {
    pub key: String,
    #[serde(default)]
    pub expected: Option<String>,
}

/// Config class to build from part of the fixture.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConstructionSpec {
    pub class: String,
    /// Dotted path into the fixture; empty selects the whole fixture.
    #[serde(default)]
    pub fixture_path: String,
    /// attribute path -> expected value; `null` only requires the attribute to exist
    #[serde(default)]
    pub expect: Map<String, Value>,
}
