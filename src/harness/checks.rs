//! Individual check operations.
//!
//! Each function turns framework answers into a [`CheckResult`]. None of them
//! return errors: every failure is converted at this boundary.

use std::collections::BTreeMap;

use serde_json::Value;

use super::{CheckResult, ReportLine};
use crate::error::CheckError;
use crate::fixture::Fixture;
use crate::framework::{ConfigObject, Framework, LoadedConfig, RegistryKind};
use crate::plan::{CheckSpec, ConstructionSpec, ExpectedRegistration, ImportExpectation};

/// Resolve every listed symbol; an unresolvable module fails all its symbols.
pub fn import_check(
    framework: &dyn Framework,
    spec: &CheckSpec,
    modules: &[ImportExpectation],
) -> CheckResult {
    let mut lines = Vec::new();
    let mut missing = Vec::new();
    let mut passed = 0usize;

    for expectation in modules {
        for symbol in &expectation.symbols {
            let target = format!("{}.{}", expectation.module, symbol);
            match framework.resolve_symbol(&expectation.module, symbol) {
                Ok(()) => {
                    passed += 1;
                    lines.push(ReportLine::pass(target));
                }
                Err(err) => {
                    lines.push(ReportLine::fail(format!("{target} - {err}")));
                    missing.push(target);
                }
            }
        }
    }

    let summary = format!("({} passed, {} failed)", passed, missing.len());
    let errors = if missing.is_empty() {
        lines.push(ReportLine::pass(format!("Imports: PASS {summary}")));
        Vec::new()
    } else {
        lines.push(ReportLine::fail(format!("Imports: FAIL {summary}")));
        vec![CheckError::ImportUnavailable { missing }]
    };
    CheckResult::from_errors(spec, errors, lines)
}

/// Compare registry entries against expectations.
///
/// Distinguishes a missing key from a key mapped to the wrong value. When
/// keys are missing, registry keys matching `similar_patterns` are listed.
pub fn registry_check(
    framework: &dyn Framework,
    spec: &CheckSpec,
    kind: RegistryKind,
    expectations: &[ExpectedRegistration],
    similar_patterns: &[String],
) -> CheckResult {
    let registry = match framework.registry(kind) {
        Ok(registry) => registry,
        Err(err) => {
            return CheckResult::from_errors(
                spec,
                vec![CheckError::CollaboratorFailed {
                    operation: format!("reading the {kind}"),
                    reason: err.to_string(),
                }],
                vec![ReportLine::fail(format!("FAILED to check {kind}: {err}"))],
            );
        }
    };

    let mut lines = Vec::new();
    let mut errors = Vec::new();
    for expectation in expectations {
        match lookup(&registry, kind, expectation) {
            Ok(actual) => lines.push(ReportLine::pass(format!(
                "{} → {}",
                expectation.key, actual
            ))),
            Err(err) => {
                let line = match &err {
                    CheckError::RegistryValueMismatch {
                        expected, actual, ..
                    } => format!("{} → {} (expected {})", expectation.key, actual, expected),
                    _ => format!("{} NOT FOUND in {}", expectation.key, kind),
                };
                lines.push(ReportLine::fail(line));
                errors.push(err);
            }
        }
    }

    let any_missing = errors
        .iter()
        .any(|err| matches!(err, CheckError::RegistryKeyMissing { .. }));
    if any_missing && !similar_patterns.is_empty() {
        let similar = similar_keys(&registry, similar_patterns);
        if similar.is_empty() {
            lines.push(ReportLine::info("No similar keys registered"));
        } else {
            lines.push(ReportLine::info("Similar keys registered:"));
            lines.extend(similar.into_iter().map(|key| ReportLine::info(format!("  {key}"))));
        }
    }

    CheckResult::from_errors(spec, errors, lines)
}

/// Three-way lookup: absent, mismatched or matching.
pub fn lookup<'r>(
    registry: &'r BTreeMap<String, String>,
    kind: RegistryKind,
    expectation: &ExpectedRegistration,
) -> Result<&'r str, CheckError> {
    let actual = registry
        .get(&expectation.key)
        .ok_or_else(|| CheckError::RegistryKeyMissing {
            registry: kind.label().to_string(),
            key: expectation.key.clone(),
        })?;
    match &expectation.expected {
        Some(expected) if expected != actual => Err(CheckError::RegistryValueMismatch {
            registry: kind.label().to_string(),
            key: expectation.key.clone(),
            expected: expected.clone(),
            actual: actual.clone(),
        }),
        _ => Ok(actual.as_str()),
    }
}

fn similar_keys(registry: &BTreeMap<String, String>, patterns: &[String]) -> Vec<String> {
    let patterns: Vec<String> = patterns.iter().map(|p| p.to_lowercase()).collect();
    registry
        .keys()
        .filter(|key| {
            let lower = key.to_lowercase();
            patterns.iter().any(|pattern| lower.contains(pattern.as_str()))
        })
        .cloned()
        .collect()
}

/// Build each config from its fixture subset and check expected attributes.
pub fn construction_check(
    framework: &dyn Framework,
    spec: &CheckSpec,
    fixture: &Fixture,
    constructions: &[ConstructionSpec],
) -> CheckResult {
    let mut lines = Vec::new();
    let mut errors = Vec::new();

    for construction in constructions {
        match construct_one(framework, fixture, construction, &mut lines) {
            Ok(()) => {}
            Err(reason) => {
                lines.push(ReportLine::fail(format!(
                    "FAILED to parse {}: {}",
                    construction.class, reason
                )));
                errors.push(CheckError::ConstructionFailed {
                    target: construction.class.clone(),
                    reason,
                });
            }
        }
    }

    CheckResult::from_errors(spec, errors, lines)
}

fn construct_one(
    framework: &dyn Framework,
    fixture: &Fixture,
    construction: &ConstructionSpec,
    lines: &mut Vec<ReportLine>,
) -> Result<(), String> {
    let fields = fixture.subset(&construction.fixture_path).ok_or_else(|| {
        format!(
            "fixture has no object at '{}'",
            construction.fixture_path
        )
    })?;
    let config = framework
        .construct_config(&construction.class, fields)
        .map_err(|err| err.to_string())?;
    lines.push(ReportLine::pass(format!(
        "{} parsed successfully",
        construction.class
    )));

    for (path, expected) in &construction.expect {
        let shown = attribute_display(&config, path)
            .ok_or_else(|| format!("attribute '{path}' is not reachable"))?;
        if !expected.is_null() && config.attr(path) != Some(expected) {
            return Err(format!(
                "attribute '{path}' is {shown} (expected {expected})"
            ));
        }
        lines.push(ReportLine::info(format!("{path}: {shown}")));
    }
    Ok(())
}

fn attribute_display(config: &ConfigObject, path: &str) -> Option<String> {
    if let Some(value) = config.attr(path) {
        return Some(value.to_string());
    }
    config.sub_config(path).map(|sub| sub.class_name.clone())
}

/// Load the model config without custom code. Returns the config for
/// dependent checks when loading succeeds.
pub fn config_load_check(
    framework: &dyn Framework,
    spec: &CheckSpec,
    model: &str,
    trust_remote_code: bool,
) -> (CheckResult, Option<LoadedConfig>) {
    let mut lines = vec![
        ReportLine::info(format!("Loading config from: {model}")),
        ReportLine::info(format!("Using trust_remote_code={trust_remote_code}")),
    ];

    match framework.load_config(model, trust_remote_code) {
        Ok(loaded) => {
            lines.push(ReportLine::pass("Config loaded successfully!"));
            lines.push(ReportLine::info(format!("Config source: {}", loaded.source)));
            describe_config(&loaded.config, &mut lines);
            (CheckResult::from_errors(spec, Vec::new(), lines), Some(loaded))
        }
        Err(err) => {
            lines.push(ReportLine::fail(format!("FAILED to load config: {err}")));
            let error = CheckError::CollaboratorFailed {
                operation: "config loading".to_string(),
                reason: err.to_string(),
            };
            (CheckResult::from_errors(spec, vec![error], lines), None)
        }
    }
}

fn describe_config(config: &ConfigObject, lines: &mut Vec<ReportLine>) {
    lines.push(ReportLine::info(format!("Config class: {}", config.class_name)));
    lines.push(ReportLine::info(format!(
        "Model type: {}",
        config.model_type().unwrap_or("(none)")
    )));
    for (field, sub) in &config.sub_configs {
        lines.push(ReportLine::info(format!("{field} class: {}", sub.class_name)));
        lines.push(ReportLine::info(format!(
            "{field} model type: {}",
            sub.model_type().unwrap_or("(none)")
        )));
    }
    if let Some(Value::Array(architectures)) = config.fields.get("architectures") {
        lines.push(ReportLine::info(format!(
            "Architectures: {}",
            Value::Array(architectures.clone())
        )));
    }
}

/// Resolve the model implementation for a previously loaded config.
pub fn model_resolution_check(
    framework: &dyn Framework,
    spec: &CheckSpec,
    config: Option<&LoadedConfig>,
) -> CheckResult {
    let Some(loaded) = config else {
        return CheckResult::from_errors(
            spec,
            vec![CheckError::CollaboratorFailed {
                operation: "model resolution".to_string(),
                reason: "no loaded config available".to_string(),
            }],
            vec![ReportLine::fail("No loaded config available")],
        );
    };

    let mut lines = vec![ReportLine::info(format!(
        "Model architectures: {:?}",
        loaded.architectures
    ))];
    match framework.resolve_model(&loaded.architectures, loaded) {
        Ok(resolved) => {
            lines.push(ReportLine::pass("Model architecture resolved!"));
            lines.push(ReportLine::info(format!(
                "Architecture: {}",
                resolved.architecture
            )));
            lines.push(ReportLine::info(format!("Model class: {}", resolved.class_name)));
            lines.push(ReportLine::info(format!("Module: {}", resolved.module)));
            CheckResult::from_errors(spec, Vec::new(), lines)
        }
        Err(err) => {
            lines.push(ReportLine::fail(format!(
                "FAILED to resolve model architecture: {err}"
            )));
            CheckResult::from_errors(
                spec,
                vec![CheckError::CollaboratorFailed {
                    operation: "model resolution".to_string(),
                    reason: err.to_string(),
                }],
                lines,
            )
        }
    }
}
