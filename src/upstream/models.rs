// Upstream wire format
// Author: kelexine (https://github.com/kelexine)

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body posted to the backend.
#[derive(Debug, Clone, Serialize)]
pub struct RespondRequest<'a> {
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<&'a Value>,
}

/// Body returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondResponse {
    pub response: String,
}
