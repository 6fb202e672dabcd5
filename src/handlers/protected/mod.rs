// handlers/protected/mod.rs - Protected handlers (bearer principal required)
//
// Every route here sits behind `verify_principal`, so handlers read the
// caller from the `AuthUser` extension.
//
// Security Level: verified identity token
// Middleware: verify_principal

pub mod lessons;
pub mod payments;
pub mod reactions;
pub mod users;
