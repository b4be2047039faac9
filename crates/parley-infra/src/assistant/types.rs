//! Wire types for the assistant service JSON API.

use serde::{Deserialize, Serialize};

/// Response of `POST /threads` and `POST /analysis-threads`.
#[derive(Debug, Deserialize)]
pub struct ThreadCreated {
    pub thread_id: String,
}

/// Body of `POST /analyze`.
#[derive(Debug, Serialize)]
pub struct AnalyzeRequest<'a> {
    pub thread_id: &'a str,
    pub message: &'a str,
}

/// Body of `POST /generate`.
#[derive(Debug, Serialize)]
pub struct GenerateRequest<'a> {
    pub thread_id: &'a str,
    pub phone: &'a str,
    pub message: &'a str,
}

/// Response of `POST /analyze` and `POST /generate`.
#[derive(Debug, Deserialize)]
pub struct TextResponse {
    pub response: String,
}
