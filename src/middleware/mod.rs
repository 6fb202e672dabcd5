pub mod admin;
pub mod auth;
pub mod response;

pub use admin::{verify_admin, AdminUser};
pub use auth::{verify_principal, AuthUser};
pub use response::{ApiResponse, ApiResult};
