// handlers/mod.rs - 3-Tier Handler Architecture
//
// Public (no auth) → Protected (bearer principal) → Elevated (admin role)
//
pub mod public; // Tier 1: anonymous browsing, registration, reconciliation
pub mod protected; // Tier 2: verified principal required
pub mod elevated; // Tier 3: principal whose user record has role `admin`

use uuid::Uuid;

use crate::error::ApiError;

/// Parse a path id, rejecting malformed values with 400
pub(crate) fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::bad_request(format!("Invalid {} id '{}'", what, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_ids_are_bad_requests() {
        let err = parse_id("not-a-uuid", "lesson").unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(parse_id(&Uuid::new_v4().to_string(), "lesson").is_ok());
    }
}
