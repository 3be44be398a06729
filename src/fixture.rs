//! Literal config payloads fed to construction checks.
//!
//! The default fixture is the published `config.json` of the Omega17
//! `omega17_vl_exp` checkpoint, embedded at compile time so construction
//! checks run without downloading anything.

use std::path::Path;

use serde_json::{Map, Value};

use crate::error::PlanError;

const DEFAULT_FIXTURE: &str = include_str!("../fixtures/omega17_vl_exp.json");

/// Immutable field-name -> value mapping standing in for a real config.
#[derive(Debug, Clone, PartialEq)]
pub struct Fixture {
    fields: Map<String, Value>,
}

impl Fixture {
    /// The embedded Omega17 checkpoint config.
    pub fn builtin() -> Result<Self, PlanError> {
        Self::from_json(DEFAULT_FIXTURE, "builtin fixture")
    }

    pub fn load(path: &Path) -> Result<Self, PlanError> {
        let contents = std::fs::read_to_string(path).map_err(|err| PlanError::ReadFailed {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        Self::from_json(&contents, &path.display().to_string())
    }

    pub fn from_json(data: &str, source: &str) -> Result<Self, PlanError> {
        let value: Value = serde_json::from_str(data).map_err(|err| PlanError::ParseFailed {
            source: source.to_string(),
            reason: err.to_string(),
        })?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, PlanError> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(PlanError::InvalidFixture {
                reason: "fixture must be a JSON object".to_string(),
            }),
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Nested object at a dotted path; the empty path selects the whole fixture.
    pub fn subset(&self, path: &str) -> Option<&Map<String, Value>> {
        if path.is_empty() {
            return Some(&self.fields);
        }
        let mut segments = path.split('.');
        let mut current = self.fields.get(segments.next()?)?.as_object()?;
        for segment in segments {
            current = current.get(segment)?.as_object()?;
        }
        Some(current)
    }
}
