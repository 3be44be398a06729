//! Harness behaviour against a scripted framework.
//!
//! The mock counts every collaborator call so the tests can assert which
//! checks actually reached the framework.

use std::cell::Cell;
use std::collections::BTreeMap;

use omega17_compat::error::{CheckError, FrameworkError};
use omega17_compat::framework::{ConfigObject, LoadedConfig, ResolvedModel};
use omega17_compat::harness::Mark;
use omega17_compat::{
    CheckPlan, ExitStatus, Fixture, Framework, Harness, Outcome, RegistryKind,
};
use serde_json::{json, Map, Value};

#[derive(Default)]
struct ScriptedFramework {
    config_registry: BTreeMap<String, String>,
    model_registry: BTreeMap<String, String>,
    symbols: Vec<(String, String)>,
    required_fields: Vec<String>,
    registry_fails: bool,
    load_fails: bool,
    construct_panics: bool,
    load_calls: Cell<usize>,
    resolve_calls: Cell<usize>,
    construct_calls: Cell<usize>,
}

impl ScriptedFramework {
    fn healthy() -> Self {
        Self {
            config_registry: BTreeMap::from([("alpha".to_string(), "X".to_string())]),
            model_registry: BTreeMap::from([(
                "Omega17VLExpForConditionalGeneration".to_string(),
                "Omega17VLExpForConditionalGeneration".to_string(),
            )]),
            symbols: vec![
                ("vllm.configs".to_string(), "AlphaConfig".to_string()),
                ("vllm.models".to_string(), "AlphaModel".to_string()),
            ],
            ..Self::default()
        }
    }
}

impl Framework for ScriptedFramework {
    fn resolve_symbol(&self, module: &str, symbol: &str) -> Result<(), FrameworkError> {
        if !self.symbols.iter().any(|(m, _)| m == module) {
            return Err(FrameworkError::ModuleNotFound {
                module: module.to_string(),
            });
        }
        if self.symbols.iter().any(|(m, s)| m == module && s == symbol) {
            Ok(())
        } else {
            Err(FrameworkError::SymbolMissing {
                module: module.to_string(),
                symbol: symbol.to_string(),
            })
        }
    }

    fn registry(&self, kind: RegistryKind) -> Result<BTreeMap<String, String>, FrameworkError> {
        if self.registry_fails {
            return Err(FrameworkError::Io {
                path: "registry".to_string(),
                reason: "registry import failed".to_string(),
            });
        }
        Ok(match kind {
            RegistryKind::ConfigTypes => self.config_registry.clone(),
            RegistryKind::ModelArchitectures => self.model_registry.clone(),
        })
    }

    fn construct_config(
        &self,
        class: &str,
        fields: &Map<String, Value>,
    ) -> Result<ConfigObject, FrameworkError> {
        self.construct_calls.set(self.construct_calls.get() + 1);
        if self.construct_panics {
            panic!("constructor exploded");
        }
        if let Some(field) = self.required_fields.iter().find(|f| !fields.contains_key(*f)) {
            return Err(FrameworkError::MissingField {
                class: class.to_string(),
                field: field.clone(),
            });
        }
        Ok(ConfigObject::new(class, fields.clone()))
    }

    fn load_config(
        &self,
        identifier: &str,
        _trust_remote_code: bool,
    ) -> Result<LoadedConfig, FrameworkError> {
        self.load_calls.set(self.load_calls.get() + 1);
        if self.load_fails {
            return Err(FrameworkError::ConfigNotFound {
                identifier: identifier.to_string(),
            });
        }
        let fields = json!({
            "model_type": "alpha",
            "architectures": ["Omega17VLExpForConditionalGeneration"]
        });
        Ok(LoadedConfig {
            source: format!("{identifier}/config.json"),
            architectures: vec!["Omega17VLExpForConditionalGeneration".to_string()],
            config: ConfigObject::new("X", fields.as_object().cloned().unwrap_or_default()),
        })
    }

    fn resolve_model(
        &self,
        architectures: &[String],
        _config: &LoadedConfig,
    ) -> Result<ResolvedModel, FrameworkError> {
        self.resolve_calls.set(self.resolve_calls.get() + 1);
        let architecture = architectures
            .first()
            .cloned()
            .ok_or_else(|| FrameworkError::ArchitectureNotSupported {
                architectures: Vec::new(),
            })?;
        Ok(ResolvedModel {
            class_name: architecture.clone(),
            architecture,
            module: "vllm.models".to_string(),
        })
    }
}

fn plan(checks: Value) -> CheckPlan {
    let json = json!({
        "version": 1,
        "suite": "properties",
        "title": "PROPERTIES",
        "default_model": "omega",
        "similar_key_patterns": ["alp"],
        "checks": checks
    });
    CheckPlan::from_json(&json.to_string(), "inline").expect("valid plan")
}

fn full_plan() -> CheckPlan {
    plan(json!([
        {
            "name": "imports",
            "title": "Import Validation",
            "check": {"kind": "imports", "modules": [
                {"module": "vllm.configs", "symbols": ["AlphaConfig"]},
                {"module": "vllm.models", "symbols": ["AlphaModel"]}
            ]}
        },
        {
            "name": "registry",
            "title": "Config Registry",
            "check": {"kind": "registry", "registry": "config_types",
                      "expect": [{"key": "alpha", "expected": "X"}]}
        },
        {
            "name": "config_parsing",
            "title": "Config Parsing",
            "check": {"kind": "construction", "constructions": [
                {"class": "TextConfig", "fixture_path": "text_config",
                 "expect": {"hidden_size": 2048}}
            ]}
        },
        {"name": "config", "title": "Config Loading", "check": {"kind": "config_load"}},
        {
            "name": "model_registry",
            "title": "Model Architecture Registry",
            "check": {"kind": "model_resolution"},
            "depends_on": "config"
        }
    ]))
}

fn registry_plan(key: &str, expected: &str) -> CheckPlan {
    plan(json!([{
        "name": "registry",
        "title": "Config Registry",
        "check": {"kind": "registry", "registry": "config_types",
                  "expect": [{"key": key, "expected": expected}]}
    }]))
}

#[test]
fn every_declared_check_produces_exactly_one_result() {
    let framework = ScriptedFramework::healthy();
    let plan = full_plan();
    let fixture = Fixture::builtin().unwrap();
    let report = Harness::new(&framework, &plan, &fixture).run("omega");

    let names: Vec<&str> = report.results().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["imports", "registry", "config_parsing", "config", "model_registry"]
    );
}

#[test]
fn all_passing_checks_exit_zero() {
    let framework = ScriptedFramework::healthy();
    let plan = full_plan();
    let fixture = Fixture::builtin().unwrap();
    let report = Harness::new(&framework, &plan, &fixture).run("omega");

    assert!(report.results().iter().all(|r| r.outcome == Outcome::Passed));
    assert_eq!(report.passed_count(), 5);
    assert_eq!(report.exit_status(), ExitStatus::Success);
    assert_eq!(framework.resolve_calls.get(), 1);
}

#[test]
fn one_failure_among_passes_exits_one() {
    let mut framework = ScriptedFramework::healthy();
    framework.symbols.pop();
    let plan = full_plan();
    let fixture = Fixture::builtin().unwrap();
    let report = Harness::new(&framework, &plan, &fixture).run("omega");

    assert_eq!(report.failed_count(), 1);
    assert_eq!(report.passed_count(), 4);
    assert_eq!(report.exit_status(), ExitStatus::Failure);
    let imports = report.get("imports").unwrap();
    match &imports.errors[0] {
        CheckError::ImportUnavailable { missing } => {
            assert_eq!(missing, &vec!["vllm.models.AlphaModel".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn dependent_check_is_skipped_without_calling_framework() {
    let framework = ScriptedFramework {
        load_fails: true,
        ..ScriptedFramework::healthy()
    };
    let plan = full_plan();
    let fixture = Fixture::builtin().unwrap();
    let report = Harness::new(&framework, &plan, &fixture).run("omega");

    assert_eq!(framework.load_calls.get(), 1);
    assert_eq!(framework.resolve_calls.get(), 0);

    let dependent = report.get("model_registry").unwrap();
    assert_eq!(dependent.outcome, Outcome::Skipped);
    assert_eq!(dependent.lines[0].mark, Mark::Skip);
    assert_eq!(report.skipped_count(), 1);
    assert_eq!(report.failed_count(), 1);
    assert_eq!(report.total_count(), 4);
    assert_eq!(report.exit_status(), ExitStatus::Failure);
}

#[test]
fn registry_key_present_and_matching_passes() {
    let framework = ScriptedFramework::healthy();
    let plan = registry_plan("alpha", "X");
    let fixture = Fixture::builtin().unwrap();
    let report = Harness::new(&framework, &plan, &fixture).run("omega");
    assert_eq!(report.get("registry").unwrap().outcome, Outcome::Passed);
    assert_eq!(report.exit_status(), ExitStatus::Success);
}

#[test]
fn registry_key_absent_reports_not_found() {
    let framework = ScriptedFramework::healthy();
    let plan = registry_plan("beta", "X");
    let fixture = Fixture::builtin().unwrap();
    let report = Harness::new(&framework, &plan, &fixture).run("omega");

    let result = report.get("registry").unwrap();
    assert_eq!(result.outcome, Outcome::Failed);
    assert!(result.detail().unwrap().contains("not found"));
    // similar keys are listed for missing entries
    assert!(result.lines.iter().any(|line| line.text.contains("alpha")));
}

#[test]
fn registry_value_mismatch_reports_both_values() {
    let framework = ScriptedFramework::healthy();
    let plan = registry_plan("alpha", "Y");
    let fixture = Fixture::builtin().unwrap();
    let report = Harness::new(&framework, &plan, &fixture).run("omega");

    let result = report.get("registry").unwrap();
    assert_eq!(result.outcome, Outcome::Failed);
    let detail = result.detail().unwrap();
    assert!(detail.contains("'X'"));
    assert!(detail.contains("'Y'"));
    assert!(!detail.contains("not found"));
}

#[test]
fn unreadable_registry_fails_check_and_run_continues() {
    let framework = ScriptedFramework {
        registry_fails: true,
        ..ScriptedFramework::healthy()
    };
    let plan = plan(json!([
        {
            "name": "registry",
            "title": "Config Registry",
            "check": {"kind": "registry", "registry": "config_types",
                      "expect": [{"key": "alpha", "expected": "X"}]}
        },
        {
            "name": "imports",
            "title": "Import Validation",
            "check": {"kind": "imports", "modules": [
                {"module": "vllm.configs", "symbols": ["AlphaConfig"]}
            ]}
        }
    ]));
    let fixture = Fixture::builtin().unwrap();
    let report = Harness::new(&framework, &plan, &fixture).run("omega");

    let registry = report.get("registry").unwrap();
    assert_eq!(registry.outcome, Outcome::Failed);
    assert!(matches!(
        registry.errors.as_slice(),
        [CheckError::CollaboratorFailed { .. }]
    ));
    assert!(registry.detail().unwrap().contains("registry import failed"));
    assert_eq!(report.get("imports").unwrap().outcome, Outcome::Passed);
    assert_eq!(report.exit_status(), ExitStatus::Failure);
}

#[test]
fn construction_missing_field_fails_and_later_checks_still_run() {
    let framework = ScriptedFramework {
        required_fields: vec!["hidden_size".to_string()],
        ..ScriptedFramework::healthy()
    };
    let plan = plan(json!([
        {
            "name": "config_parsing",
            "title": "Config Parsing",
            "check": {"kind": "construction", "constructions": [
                {"class": "VisionConfig", "fixture_path": "text_config.rope_scaling"}
            ]}
        },
        {
            "name": "registry",
            "title": "Config Registry",
            "check": {"kind": "registry", "registry": "config_types",
                      "expect": [{"key": "alpha", "expected": "X"}]}
        }
    ]));
    let fixture = Fixture::builtin().unwrap();
    let report = Harness::new(&framework, &plan, &fixture).run("omega");

    let parsing = report.get("config_parsing").unwrap();
    assert_eq!(parsing.outcome, Outcome::Failed);
    let detail = parsing.detail().unwrap();
    assert!(!detail.is_empty());
    assert!(detail.contains("hidden_size"));
    assert_eq!(report.get("registry").unwrap().outcome, Outcome::Passed);
}

#[test]
fn construction_attribute_mismatch_fails() {
    let framework = ScriptedFramework::healthy();
    let plan = plan(json!([{
        "name": "config_parsing",
        "title": "Config Parsing",
        "check": {"kind": "construction", "constructions": [
            {"class": "TextConfig", "fixture_path": "text_config",
             "expect": {"hidden_size": 4096}}
        ]}
    }]));
    let fixture = Fixture::builtin().unwrap();
    let report = Harness::new(&framework, &plan, &fixture).run("omega");

    let result = report.get("config_parsing").unwrap();
    assert_eq!(result.outcome, Outcome::Failed);
    assert!(result.detail().unwrap().contains("4096"));
}

#[test]
fn panicking_collaborator_is_contained() {
    let framework = ScriptedFramework {
        construct_panics: true,
        ..ScriptedFramework::healthy()
    };
    let plan = full_plan();
    let fixture = Fixture::builtin().unwrap();
    let report = Harness::new(&framework, &plan, &fixture).run("omega");

    assert_eq!(framework.construct_calls.get(), 1);
    let parsing = report.get("config_parsing").unwrap();
    assert_eq!(parsing.outcome, Outcome::Failed);
    assert!(parsing.detail().unwrap().contains("constructor exploded"));
    assert_eq!(report.get("model_registry").unwrap().outcome, Outcome::Passed);
}

#[test]
fn rendered_report_lists_summary_and_recommendations() {
    let framework = ScriptedFramework {
        load_fails: true,
        ..ScriptedFramework::healthy()
    };
    let json = json!({
        "version": 1,
        "suite": "properties",
        "title": "PROPERTIES",
        "default_model": "omega",
        "checks": [
            {"name": "config", "title": "Config Loading", "check": {"kind": "config_load"},
             "hint": "Check the model path"},
            {"name": "model_registry", "title": "Model Architecture Registry",
             "check": {"kind": "model_resolution"}, "depends_on": "config"}
        ]
    });
    let plan = CheckPlan::from_json(&json.to_string(), "inline").unwrap();
    let fixture = Fixture::builtin().unwrap();

    let mut buffer = Vec::new();
    let status = omega17_compat::run(&framework, &plan, &fixture, "omega", &mut buffer);
    let text = String::from_utf8(buffer).unwrap();

    assert_eq!(status, ExitStatus::Failure);
    assert!(text.contains("TEST 1: Config Loading"));
    assert!(text.contains("⊘ SKIP: Model Registry"));
    assert!(text.contains("✗ FAIL: Config"));
    assert!(text.contains("Results: 0/1 checks passed"));
    assert!(text.contains("(1 skipped)"));
    assert!(text.contains("1. Check the model path"));
}
