// Check error types and constants

use crate::error::ErrorCode;
use log::warn;
use std::fmt;

/// Check error code constants
///
/// Error code range: 3001-3006
pub struct CheckErrorCodes {}

impl CheckErrorCodes {
    /// A module or symbol could not be resolved
    pub const IMPORT_UNAVAILABLE: i32 = 3001;

    /// A registry has no entry for the expected key
    pub const REGISTRY_KEY_MISSING: i32 = 3002;

    /// A registry entry exists but maps to another value
    pub const REGISTRY_VALUE_MISMATCH: i32 = 3003;

    /// Building a config object from the fixture failed
    pub const CONSTRUCTION_FAILED: i32 = 3004;

    /// The prerequisite check did not pass
    pub const DEPENDENCY_SKIPPED: i32 = 3005;

    /// Any other failure reported by the framework under test
    pub const COLLABORATOR_FAILED: i32 = 3006;
}

/// Log a check failure with structured context
pub fn log_check_error(err: &CheckError, check: &str) {
    warn!(
        "Check {} failed: code={}, message={}",
        check,
        err.code(),
        err.message()
    );
}

/// Failure recorded against a single check.
///
/// Every variant is produced at a check boundary and stored in the
/// report; none of them propagate out of a harness run.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckError {
    /// One or more `module.symbol` targets could not be resolved
    ImportUnavailable { missing: Vec<String> },

    /// Registry lookup found nothing for `key`
    RegistryKeyMissing { registry: String, key: String },

    /// Registry lookup found `actual` where `expected` was required
    RegistryValueMismatch {
        registry: String,
        key: String,
        expected: String,
        actual: String,
    },

    /// Config construction or attribute access failed
    ConstructionFailed { target: String, reason: String },

    /// Prerequisite check did not pass, so this one never ran
    DependencySkipped { dependency: String },

    /// The framework raised an error during `operation`
    CollaboratorFailed { operation: String, reason: String },
}

impl ErrorCode for CheckError {
    fn code(&self) -> i32 {
        match self {
            CheckError::ImportUnavailable { .. } => CheckErrorCodes::IMPORT_UNAVAILABLE,
            CheckError::RegistryKeyMissing { .. } => CheckErrorCodes::REGISTRY_KEY_MISSING,
            CheckError::RegistryValueMismatch { .. } => CheckErrorCodes::REGISTRY_VALUE_MISMATCH,
            CheckError::ConstructionFailed { .. } => CheckErrorCodes::CONSTRUCTION_FAILED,
            CheckError::DependencySkipped { .. } => CheckErrorCodes::DEPENDENCY_SKIPPED,
            CheckError::CollaboratorFailed { .. } => CheckErrorCodes::COLLABORATOR_FAILED,
        }
    }

    fn message(&self) -> String {
        match self {
            CheckError::ImportUnavailable { missing } => {
                format!("unresolved imports: {}", missing.join(", "))
            }
            CheckError::RegistryKeyMissing { registry, key } => {
                format!("'{}' not found in {}", key, registry)
            }
            CheckError::RegistryValueMismatch {
                registry,
                key,
                expected,
                actual,
            } => format!(
                "{} maps '{}' to '{}' (expected '{}')",
                registry, key, actual, expected
            ),
            CheckError::ConstructionFailed { target, reason } => {
                format!("failed to construct {}: {}", target, reason)
            }
            CheckError::DependencySkipped { dependency } => {
                format!("skipped, prerequisite '{}' did not pass", dependency)
            }
            CheckError::CollaboratorFailed { operation, reason } => {
                format!("{} failed: {}", operation, reason)
            }
        }
    }
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message(), self.code())
    }
}

impl std::error::Error for CheckError {}
