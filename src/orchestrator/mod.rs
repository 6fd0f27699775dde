pub mod decommission;
pub mod onboarding;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use decommission::{DecommissionOrchestrator, DecommissionOutcome, UninstallRequest};
pub use onboarding::{CreateResourceRequest, OnboardingOrchestrator, OnboardingOutcome};
pub use store::{PgResourceStore, ResourceStore, StoreError};
