use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Placeholder stored when a summary is created without text. Generating
/// real summaries is an external collaborator's job.
pub const PLACEHOLDER_SUMMARY: &str = "dummy summary";

/// Summary row as persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub id: i64,
    pub url: String,
    pub summary: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Body for POST /summaries/.
#[derive(Debug, Deserialize)]
pub struct SummaryPayload {
    pub url: String,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Body for PUT /summaries/{id}/. Both fields are required.
#[derive(Debug, Deserialize)]
pub struct SummaryUpdatePayload {
    pub url: String,
    pub summary: String,
}

/// Response for POST /summaries/.
#[derive(Debug, Serialize)]
pub struct SummaryCreatedResponse {
    pub id: i64,
    pub url: String,
}

/// Validate that a submitted url is a well-formed http(s) URL.
pub fn validate_url(raw: &str) -> Result<(), ApiError> {
    let parsed = url::Url::parse(raw)
        .map_err(|_| ApiError::Validation(format!("Invalid url: {}", raw)))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(ApiError::Validation(format!("Invalid url: {}", raw)));
    }
    Ok(())
}
