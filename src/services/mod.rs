pub mod analytics;
pub mod premium;

pub use premium::{reconcile, ReconcileError, Reconciliation};
