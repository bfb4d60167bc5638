pub mod reconciliation;
pub mod registry;
pub mod status;
