//! Contract between the harness and the framework under test.
//!
//! The harness never reaches into framework state directly. Every query goes
//! through [`Framework`], so the collaborator can be a snapshot exported from
//! a real install or a mock in tests.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

use crate::error::FrameworkError;

pub mod snapshot;

pub use snapshot::{ConfigClassSpec, FrameworkSnapshot, ModelEntry};

/// The two registries the framework exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryKind {
    /// model type -> config class name
    ConfigTypes,
    /// architecture -> model implementation class name
    ModelArchitectures,
}

impl RegistryKind {
    pub fn label(&self) -> &'static str {
        match self {
            RegistryKind::ConfigTypes => "config registry",
            RegistryKind::ModelArchitectures => "model registry",
        }
    }
}

impl fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Capabilities the harness expects from the framework under test.
pub trait Framework {
    /// Resolve `symbol` from `module`.
    fn resolve_symbol(&self, module: &str, symbol: &str) -> Result<(), FrameworkError>;

    /// Live view of one of the framework registries.
    fn registry(&self, kind: RegistryKind) -> Result<BTreeMap<String, String>, FrameworkError>;

    /// Build a config object of `class` from keyword-style fields.
    fn construct_config(
        &self,
        class: &str,
        fields: &Map<String, Value>,
    ) -> Result<ConfigObject, FrameworkError>;

    /// Load the config for a model identifier.
    fn load_config(
        &self,
        identifier: &str,
        trust_remote_code: bool,
    ) -> Result<LoadedConfig, FrameworkError>;

    /// Pick the model implementation for the first supported architecture.
    fn resolve_model(
        &self,
        architectures: &[String],
        config: &LoadedConfig,
    ) -> Result<ResolvedModel, FrameworkError>;
}

/// Config instance produced by a framework constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigObject {
    pub class_name: String,
    pub fields: Map<String, Value>,
    pub sub_configs: BTreeMap<String, ConfigObject>,
}

impl ConfigObject {
    pub fn new(class_name: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            class_name: class_name.into(),
            fields,
            sub_configs: BTreeMap::new(),
        }
    }

    pub fn model_type(&self) -> Option<&str> {
        self.fields.get("model_type").and_then(Value::as_str)
    }

    /// Dotted attribute access, e.g. `text_config.rope_scaling.rope_type`.
    ///
    /// Sub-configs are walked first; once inside plain field values, nested
    /// JSON objects are walked by key.
    pub fn attr(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self;
        let mut segment = segments.next()?;
        loop {
            match current.sub_configs.get(segment) {
                Some(sub) => {
                    current = sub;
                    segment = segments.next()?;
                }
                None => break,
            }
        }

        let mut value = current.fields.get(segment)?;
        for segment in segments {
            value = value.as_object()?.get(segment)?;
        }
        Some(value)
    }

    /// Whether `path` names a nested sub-config rather than a plain value.
    pub fn sub_config(&self, path: &str) -> Option<&ConfigObject> {
        let mut current = self;
        for segment in path.split('.') {
            current = current.sub_configs.get(segment)?;
        }
        Some(current)
    }
}

/// Result of [`Framework::load_config`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    /// Where the config was actually read from.
    pub source: String,
    pub architectures: Vec<String>,
    pub config: ConfigObject,
}

/// Result of [`Framework::resolve_model`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModel {
    pub architecture: String,
    pub class_name: String,
    pub module: String,
}
