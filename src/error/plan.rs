// Plan, snapshot and fixture loading errors

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Plan error code constants
///
/// Error code range: 4001-4004
pub struct PlanErrorCodes {}

impl PlanErrorCodes {
    /// Input file could not be read
    pub const READ_FAILED: i32 = 4001;

    /// Input was not valid JSON for the expected schema
    pub const PARSE_FAILED: i32 = 4002;

    /// Parsed input violates a structural invariant
    pub const INVALID: i32 = 4003;

    /// Fixture document is not a JSON object
    pub const INVALID_FIXTURE: i32 = 4004;
}

/// Log a plan loading error with structured context
pub fn log_plan_error(err: &PlanError, context: &str) {
    error!(
        "Plan error in {}: code={}, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised while loading harness inputs, before any check runs.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanError {
    /// File could not be read
    ReadFailed { path: String, reason: String },

    /// JSON did not match the schema
    ParseFailed { source: String, reason: String },

    /// Document parsed but is inconsistent
    Invalid { reason: String },

    /// Fixture document is not an object
    InvalidFixture { reason: String },
}

impl PlanError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        PlanError::Invalid {
            reason: reason.into(),
        }
    }
}

impl ErrorCode for PlanError {
    fn code(&self) -> i32 {
        match self {
            PlanError::ReadFailed { .. } => PlanErrorCodes::READ_FAILED,
            PlanError::ParseFailed { .. } => PlanErrorCodes::PARSE_FAILED,
            PlanError::Invalid { .. } => PlanErrorCodes::INVALID,
            PlanError::InvalidFixture { .. } => PlanErrorCodes::INVALID_FIXTURE,
        }
    }

    fn message(&self) -> String {
        match self {
            PlanError::ReadFailed { path, reason } => {
                format!("Failed to read {}: {}", path, reason)
            }
            PlanError::ParseFailed { source, reason } => {
                format!("Failed to parse {}: {}", source, reason)
            }
            PlanError::Invalid { reason } => format!("Invalid plan: {}", reason),
            PlanError::InvalidFixture { reason } => format!("Invalid fixture: {}", reason),
        }
    }
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PlanError::{} (code {}): {}",
            self.variant_name(),
            self.code(),
            self.message()
        )
    }
}

impl PlanError {
    fn variant_name(&self) -> &'static str {
        match self {
            PlanError::ReadFailed { .. } => "ReadFailed",
            PlanError::ParseFailed { .. } => "ParseFailed",
            PlanError::Invalid { .. } => "Invalid",
            PlanError::InvalidFixture { .. } => "InvalidFixture",
        }
    }
}

impl std::error::Error for PlanError {}
