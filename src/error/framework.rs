// Errors raised by the framework under test

use std::fmt;

/// Failure reported by a [`Framework`](crate::framework::Framework) call.
///
/// The harness never inspects the variant to decide pass/fail; any error
/// fails the check and its text is kept for the report.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameworkError {
    /// No module with this path is importable
    ModuleNotFound { module: String },

    /// Module exists but does not export the symbol
    SymbolMissing { module: String, symbol: String },

    /// Constructor requested for an undeclared config class
    UnknownConfigClass { class: String },

    /// Constructor input lacks a required field
    MissingField { class: String, field: String },

    /// Constructor input holds a value of the wrong shape
    InvalidField {
        class: String,
        field: String,
        reason: String,
    },

    /// No config could be located for the model identifier
    ConfigNotFound { identifier: String },

    /// Loaded config declares a model type the config registry lacks
    UnrecognizedModelType { model_type: String },

    /// None of the architectures has a registered implementation
    ArchitectureNotSupported { architectures: Vec<String> },

    /// Filesystem failure while reading framework inputs
    Io { path: String, reason: String },

    /// Framework input was not valid JSON
    Parse { path: String, reason: String },
}

impl fmt::Display for FrameworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameworkError::ModuleNotFound { module } => {
                write!(f, "No module named '{}'", module)
            }
            FrameworkError::SymbolMissing { module, symbol } => {
                write!(f, "module '{}' has no attribute '{}'", module, symbol)
            }
            FrameworkError::UnknownConfigClass { class } => {
                write!(f, "unknown config class '{}'", class)
            }
            FrameworkError::MissingField { class, field } => {
                write!(f, "{} missing required field '{}'", class, field)
            }
            FrameworkError::InvalidField {
                class,
                field,
                reason,
            } => write!(f, "{}.{} is invalid: {}", class, field, reason),
            FrameworkError::ConfigNotFound { identifier } => write!(
                f,
                "no config found for '{}' (expected a config.json file or a directory containing one)",
                identifier
            ),
            FrameworkError::UnrecognizedModelType { model_type } => write!(
                f,
                "the checkpoint has model type '{}' but the framework does not recognize this architecture",
                model_type
            ),
            FrameworkError::ArchitectureNotSupported { architectures } => {
                if architectures.is_empty() {
                    write!(f, "config declares no architectures")
                } else {
                    write!(
                        f,
                        "model architectures {:?} are not supported",
                        architectures
                    )
                }
            }
            FrameworkError::Io { path, reason } => {
                write!(f, "failed to read {}: {}", path, reason)
            }
            FrameworkError::Parse { path, reason } => {
                write!(f, "failed to parse {}: {}", path, reason)
            }
        }
    }
}

impl std::error::Error for FrameworkError {}
