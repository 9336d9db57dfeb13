// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types specific to the HTTP strategies.

use serde::Deserialize;

/// Error body returned by the assistant and upload services.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    #[serde(rename = "type")]
    pub type_: String,
    pub message: String,
}

/// Render a non-success response body as an error message.
pub(crate) fn describe_failure(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(api_err) => format!("service error ({}): {}", api_err.error.type_, api_err.error.message),
        Err(_) => format!("service returned {status}: {body}"),
    }
}
