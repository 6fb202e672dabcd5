// handlers/elevated/mod.rs - Elevated handlers (admin role required)
//
// Routes here sit behind `verify_principal` and then `verify_admin`; the
// admin's own record is available as the `AdminUser` extension.
//
// Security Level: verified identity + role `admin`
// Middleware: verify_principal → verify_admin

pub mod lessons;
pub mod overview;
pub mod users;
