// Omega17 compatibility harness
// Verifies that the Omega17 multimodal model is registered and loadable in an
// inference framework's config and model registries.

pub mod error;
pub mod fixture;
pub mod framework;
pub mod harness;
pub mod plan;
pub mod report;

// Re-exports for convenience
pub use fixture::Fixture;
pub use framework::{Framework, FrameworkSnapshot, RegistryKind};
pub use harness::{run, CheckResult, ExitStatus, Harness, HarnessReport, Outcome};
pub use plan::{BuiltinSuite, CheckPlan};
