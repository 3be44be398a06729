//! JSON snapshot of a framework install.
//!
//! A snapshot records which modules export which symbols, the contents of
//! both registries, the shape of each config class and the registered model
//! implementations. It is enough to answer every [`Framework`] query without
//! importing the framework itself. Model configs are read from local disk.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{ConfigObject, Framework, LoadedConfig, RegistryKind, ResolvedModel};
use crate::error::{FrameworkError, PlanError};

/// Environment variable consulted by the CLI when `--framework` is absent.
pub const SNAPSHOT_ENV: &str = "OMEGA17_FRAMEWORK_SNAPSHOT";

/// File looked up inside a model directory.
const MODEL_CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FrameworkSnapshot {
    #[serde(default)]
    pub framework: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub modules: BTreeMap<String, BTreeSet<String>>,
    #[serde(default)]
    pub config_registry: BTreeMap<String, String>,
    #[serde(default)]
    pub config_classes: BTreeMap<String, ConfigClassSpec>,
    #[serde(default)]
    pub models: BTreeMap<String, ModelEntry>,
}

/// Constructor contract of one config class.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigClassSpec {
    /// Filled in when the input omits `model_type`.
    #[serde(default)]
    pub model_type: Option<String>,
    #[serde(default)]
    pub required: Vec<String>,
    /// field name -> config class built from that field's object
    #[serde(default)]
    pub sub_configs: BTreeMap<String, String>,
}

/// Registered model implementation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelEntry {
    pub module: String,
    pub class: String,
}

impl FrameworkSnapshot {
    /// Snapshot of a framework with nothing installed.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, PlanError> {
        let contents = std::fs::read_to_string(path).map_err(|err| PlanError::ReadFailed {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        let snapshot = Self::from_json(&contents, &path.display().to_string())?;
        info!(
            "[Snapshot] Loaded {} {} from {}",
            snapshot.framework.as_deref().unwrap_or("framework"),
            snapshot.version.as_deref().unwrap_or("(unversioned)"),
            path.display()
        );
        Ok(snapshot)
    }

    /// Parse a snapshot and check that class references resolve.
    pub fn from_json(data: &str, source: &str) -> Result<Self, PlanError> {
        let snapshot: FrameworkSnapshot =
            serde_json::from_str(data).map_err(|err| PlanError::ParseFailed {
                source: source.to_string(),
                reason: err.to_string(),
            })?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    fn validate(&self) -> Result<(), PlanError> {
        for (class, spec) in &self.config_classes {
            for (field, sub_class) in &spec.sub_configs {
                if !self.config_classes.contains_key(sub_class) {
                    return Err(PlanError::invalid(format!(
                        "config class {class} declares sub-config {field} of undeclared class {sub_class}"
                    )));
                }
            }
        }
        Ok(())
    }

    fn build(
        &self,
        class: &str,
        fields: &Map<String, Value>,
        depth: usize,
    ) -> Result<ConfigObject, FrameworkError> {
        let spec = self
            .config_classes
            .get(class)
            .ok_or_else(|| FrameworkError::UnknownConfigClass {
                class: class.to_string(),
            })?;

        if let Some(field) = spec.required.iter().find(|f| !fields.contains_key(*f)) {
            return Err(FrameworkError::MissingField {
                class: class.to_string(),
                field: field.clone(),
            });
        }

        let mut own_fields = fields.clone();
        if !own_fields.contains_key("model_type") {
            if let Some(model_type) = &spec.model_type {
                own_fields.insert("model_type".into(), Value::String(model_type.clone()));
            }
        }

        let mut sub_configs = BTreeMap::new();
        for (field, sub_class) in &spec.sub_configs {
            match own_fields.remove(field) {
                None | Some(Value::Null) => {}
                Some(Value::Object(nested)) => {
                    // Self-referencing classes would recurse forever.
                    if depth > 8 {
                        return Err(FrameworkError::InvalidField {
                            class: class.to_string(),
                            field: field.clone(),
                            reason: "sub-config nesting too deep".to_string(),
                        });
                    }
                    let sub = self.build(sub_class, &nested, depth + 1)?;
                    sub_configs.insert(field.clone(), sub);
                }
                Some(other) => {
                    return Err(FrameworkError::InvalidField {
                        class: class.to_string(),
                        field: field.clone(),
                        reason: format!("expected an object, got {}", json_kind(&other)),
                    });
                }
            }
        }

        Ok(ConfigObject {
            class_name: class.to_string(),
            fields: own_fields,
            sub_configs,
        })
    }
}

impl Framework for FrameworkSnapshot {
    fn resolve_symbol(&self, module: &str, symbol: &str) -> Result<(), FrameworkError> {
        let symbols = self
            .modules
            .get(module)
            .ok_or_else(|| FrameworkError::ModuleNotFound {
                module: module.to_string(),
            })?;
        if symbols.contains(symbol) {
            Ok(())
        } else {
            Err(FrameworkError::SymbolMissing {
                module: module.to_string(),
                symbol: symbol.to_string(),
            })
        }
    }

    fn registry(&self, kind: RegistryKind) -> Result<BTreeMap<String, String>, FrameworkError> {
        Ok(match kind {
            RegistryKind::ConfigTypes => self.config_registry.clone(),
            RegistryKind::ModelArchitectures => self
                .models
                .iter()
                .map(|(arch, entry)| (arch.clone(), entry.class.clone()))
                .collect(),
        })
    }

    fn construct_config(
        &self,
        class: &str,
        fields: &Map<String, Value>,
    ) -> Result<ConfigObject, FrameworkError> {
        self.build(class, fields, 0)
    }

    fn load_config(
        &self,
        identifier: &str,
        trust_remote_code: bool,
    ) -> Result<LoadedConfig, FrameworkError> {
        let path = locate_model_config(identifier)?;
        debug!(
            "[Snapshot] Reading model config {} (trust_remote_code={})",
            path.display(),
            trust_remote_code
        );
        let contents = std::fs::read_to_string(&path).map_err(|err| FrameworkError::Io {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        let value: Value = serde_json::from_str(&contents).map_err(|err| FrameworkError::Parse {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        let fields = match value {
            Value::Object(fields) => fields,
            other => {
                return Err(FrameworkError::Parse {
                    path: path.display().to_string(),
                    reason: format!("expected a JSON object, got {}", json_kind(&other)),
                });
            }
        };

        let model_type = fields
            .get("model_type")
            .and_then(Value::as_str)
            .ok_or_else(|| FrameworkError::MissingField {
                class: MODEL_CONFIG_FILE.to_string(),
                field: "model_type".to_string(),
            })?;
        // Snapshots carry no custom code, so trust_remote_code cannot supply
        // an unregistered model type.
        let class = self.config_registry.get(model_type).ok_or_else(|| {
            FrameworkError::UnrecognizedModelType {
                model_type: model_type.to_string(),
            }
        })?;

        let config = self.build(class, &fields, 0)?;
        let architectures = match config.fields.get("architectures") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        };

        Ok(LoadedConfig {
            source: path.display().to_string(),
            architectures,
            config,
        })
    }

    fn resolve_model(
        &self,
        architectures: &[String],
        _config: &LoadedConfig,
    ) -> Result<ResolvedModel, FrameworkError> {
        architectures
            .iter()
            .find_map(|arch| {
                self.models.get(arch).map(|entry| ResolvedModel {
                    architecture: arch.clone(),
                    class_name: entry.class.clone(),
                    module: entry.module.clone(),
                })
            })
            .ok_or_else(|| FrameworkError::ArchitectureNotSupported {
                architectures: architectures.to_vec(),
            })
    }
}

fn locate_model_config(identifier: &str) -> Result<PathBuf, FrameworkError> {
    let path = Path::new(identifier);
    if path.is_dir() {
        let candidate = path.join(MODEL_CONFIG_FILE);
        if candidate.is_file() {
            return Ok(candidate);
        }
    } else if path.is_file() {
        return Ok(path.to_path_buf());
    }
    Err(FrameworkError::ConfigNotFound {
        identifier: identifier.to_string(),
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
