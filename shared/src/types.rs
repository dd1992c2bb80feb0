//! Common types used across the platform

use serde::{Deserialize, Serialize};

/// Response envelope returned by every operation.
///
/// * happy path: `success = true` with `data`
/// * rule violation: `success = false` with a human readable `message` and `code`
/// * unexpected failure: `success = false` with an opaque `error`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

/// Detail attached to unexpected failures
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub code: String,
    pub detail: String,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            code: None,
            error: None,
        }
    }

    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            code: Some(code.into()),
            error: None,
        }
    }

    pub fn failed(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: None,
            code: None,
            error: Some(ErrorBody {
                code: code.into(),
                detail: detail.into(),
            }),
        }
    }

    /// True when the failure was a rule violation rather than an infrastructure error
    pub fn is_rejection(&self) -> bool {
        !self.success && self.message.is_some()
    }
}
