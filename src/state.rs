use std::sync::Arc;

use crate::auth::IdentityVerifier;
use crate::config::AppConfig;
use crate::database::{LessonRepository, UserRepository};
use crate::payments::PaymentGateway;

/// Shared handles every handler and middleware receives. Built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub lessons: Arc<dyn LessonRepository>,
    pub identity: Arc<dyn IdentityVerifier>,
    pub payments: Arc<dyn PaymentGateway>,
    pub config: Arc<AppConfig>,
}
