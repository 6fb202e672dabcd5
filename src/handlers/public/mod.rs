// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Anonymous browsing of public content, registration, role lookup and the
// payment reconciliation callbacks.
//
// Security Level: None
// Middleware: None

pub mod analytics;
pub mod health;
pub mod lessons;
pub mod payments;
pub mod users;
