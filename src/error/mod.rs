// Error types for the compatibility harness
//
// Check failures, collaborator failures and plan loading failures each get
// their own enum. All of them carry numeric codes so the report and the logs
// can refer to a failure without parsing its text.

mod check;
mod framework;
mod plan;

pub use check::{log_check_error, CheckError, CheckErrorCodes};
pub use framework::FrameworkError;
pub use plan::{log_plan_error, PlanError, PlanErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
