use serde::{Deserialize, Serialize};

/// Fixed message returned to callers when something unexpected breaks. The
/// real error text lives only in the audit trail.
pub const INTERNAL_ERROR_MESSAGE: &str =
    "An internal error occurred while handling the request. The incident has been recorded.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseStatus {
    #[serde(rename = "SUCCESS")]
    Success,
    #[serde(rename = "NOT_FOUND")]
    NotFound,
    #[serde(rename = "VALIDATION_FAILED")]
    ValidationFailed,
    #[serde(rename = "REQUIRES_CONFIRMATION")]
    RequiresConfirmation,
    #[serde(rename = "ERROR")]
    Error,
    #[serde(rename = "ACCESS_DENIED")]
    AccessDenied,
}

/// Uniform envelope every capability invocation returns, whatever the
/// outcome. `correlation_id` ties the response back to the audit trail when
/// the call got far enough to be recorded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityResponse {
    pub status: ResponseStatus,
    pub content: String,
    pub correlation_id: Option<String>,
    pub requires_confirmation: bool,
}

impl CapabilityResponse {
    pub fn success(content: impl Into<String>, correlation_id: Option<String>) -> Self {
        Self {
            status: ResponseStatus::Success,
            content: content.into(),
            correlation_id,
            requires_confirmation: false,
        }
    }

    pub fn not_found(content: impl Into<String>, correlation_id: Option<String>) -> Self {
        Self {
            status: ResponseStatus::NotFound,
            content: content.into(),
            correlation_id,
            requires_confirmation: false,
        }
    }

    pub fn validation_failed(content: impl Into<String>, correlation_id: Option<String>) -> Self {
        Self {
            status: ResponseStatus::ValidationFailed,
            content: content.into(),
            correlation_id,
            requires_confirmation: false,
        }
    }

    pub fn requires_confirmation(content: impl Into<String>, correlation_id: String) -> Self {
        Self {
            status: ResponseStatus::RequiresConfirmation,
            content: content.into(),
            correlation_id: Some(correlation_id),
            requires_confirmation: true,
        }
    }

    pub fn error(correlation_id: Option<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            content: INTERNAL_ERROR_MESSAGE.to_owned(),
            correlation_id,
            requires_confirmation: false,
        }
    }

    pub fn access_denied(
        capability: &str,
        role: &str,
        correlation_id: Option<String>,
    ) -> Self {
        Self {
            status: ResponseStatus::AccessDenied,
            content: format!("Access denied: role {role} may not invoke {capability}"),
            correlation_id,
            requires_confirmation: false,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}
