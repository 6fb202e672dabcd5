use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    pub lesson_id: Uuid,
    pub reporter_email: String,
    pub reason: String,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Client body for PATCH /report/:id
#[derive(Debug, Clone, Deserialize)]
pub struct ReportRequest {
    pub reason: String,
    pub details: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewReport {
    pub lesson_id: Uuid,
    pub reporter_email: String,
    pub reason: String,
    pub details: Option<String>,
}
