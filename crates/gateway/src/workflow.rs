use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use custodian_core::audit::AuditTrail;
use custodian_core::capability::Capability;
use custodian_core::confirm::TicketIssuer;
use custodian_core::security::SecurityContext;

use crate::error::ServiceError;
use crate::response::CapabilityResponse;

/// One mutating capability, expressed as the three steps the confirmation
/// protocol needs: check it could run, describe what it would do, and do it.
#[async_trait]
pub trait ConfirmableAction: Send + Sync {
    fn capability(&self) -> Capability;

    /// The exact request the confirmation ticket binds. A `confirmed=true`
    /// call whose payload digests differently is refused.
    fn payload(&self) -> Value;

    /// `Ok(Some(explanation))` when the action cannot proceed. Runs in both
    /// phases: state may drift between preview and confirmation.
    async fn validate(&self) -> Result<Option<String>, ServiceError>;

    /// Human-readable description of what confirming would execute.
    async fn summarize(&self) -> Result<String, ServiceError>;

    /// Executes the mutation and returns the completion summary.
    async fn apply(&self) -> Result<String, ServiceError>;
}

/// Drives the two-phase confirm-before-mutate protocol. Phase one validates,
/// summarizes, and hands back a signed ticket; nothing is stored server-side.
/// Phase two verifies the ticket against the presented payload, re-validates,
/// and only then applies the mutation.
pub struct ConfirmationWorkflow {
    audit: Arc<AuditTrail>,
    issuer: TicketIssuer,
}

impl ConfirmationWorkflow {
    pub fn new(audit: Arc<AuditTrail>, issuer: TicketIssuer) -> Self {
        Self { audit, issuer }
    }

    pub async fn execute<A: ConfirmableAction>(
        &self,
        context: &SecurityContext,
        action: &A,
        confirmed: bool,
        ticket: Option<&str>,
    ) -> CapabilityResponse {
        let capability = action.capability();
        let payload = action.payload();
        let correlation_id =
            self.audit.start_call(context, capability, &payload_params(&payload));

        if !confirmed {
            // A ticket with confirmed=false is an explicit rejection of the
            // previewed action.
            if let Some(token) = ticket {
                return self.reject(context, capability, &correlation_id, token, &payload);
            }
            return self.preview(action, capability, &correlation_id, &payload).await;
        }

        let Some(token) = ticket else {
            let message = "A confirmation ticket is required. Call without confirmed=true first \
                           to preview the action and obtain one.";
            return self.validation_failed(&correlation_id, capability, message.to_string());
        };

        let issued_id = match self.issuer.verify(token, &payload, Utc::now()) {
            Ok(issued_id) => issued_id,
            Err(error) => {
                return self.validation_failed(&correlation_id, capability, error.to_string())
            }
        };

        // CONFIRMED is only recorded once re-validation has passed; a
        // drift-refused confirmation must not read as confirmed.
        match action.validate().await {
            Ok(None) => {}
            Ok(Some(explanation)) => {
                return self.validation_failed(&correlation_id, capability, explanation)
            }
            Err(error) => return self.internal_error(&correlation_id, capability, error),
        }
        self.audit.log_confirmation_received(&issued_id, true, &context.actor_name);

        match action.apply().await {
            Ok(summary) => {
                self.audit.complete_call(&correlation_id, capability, summary.clone());
                CapabilityResponse::success(summary, Some(correlation_id))
            }
            Err(error) => self.internal_error(&correlation_id, capability, error),
        }
    }

    async fn preview<A: ConfirmableAction>(
        &self,
        action: &A,
        capability: Capability,
        correlation_id: &str,
        payload: &Value,
    ) -> CapabilityResponse {
        match action.validate().await {
            Ok(None) => {}
            Ok(Some(explanation)) => {
                return self.validation_failed(correlation_id, capability, explanation)
            }
            Err(error) => return self.internal_error(correlation_id, capability, error),
        }

        let summary = match action.summarize().await {
            Ok(summary) => summary,
            Err(error) => return self.internal_error(correlation_id, capability, error),
        };
        self.audit.log_confirmation_required(correlation_id, capability, &summary);

        let ticket = self.issuer.issue(correlation_id, payload);
        let content = format!(
            "{summary}\n\nNothing has been executed. To proceed, repeat the call with \
             confirmed=true and this ticket:\n{}",
            ticket.token
        );
        CapabilityResponse::requires_confirmation(content, correlation_id.to_owned())
    }

    fn reject(
        &self,
        context: &SecurityContext,
        capability: Capability,
        correlation_id: &str,
        token: &str,
        payload: &Value,
    ) -> CapabilityResponse {
        match self.issuer.verify(token, payload, Utc::now()) {
            Ok(issued_id) => {
                self.audit.log_confirmation_received(&issued_id, false, &context.actor_name);
                let summary = "Action rejected; nothing was executed.";
                self.audit.complete_call(correlation_id, capability, summary);
                CapabilityResponse::success(summary, Some(correlation_id.to_owned()))
            }
            Err(error) => {
                self.validation_failed(correlation_id, capability, error.to_string())
            }
        }
    }

    /// Rule violations are ordinary outcomes: the call completes with a
    /// failure summary. FAILED entries are reserved for unexpected errors.
    fn validation_failed(
        &self,
        correlation_id: &str,
        capability: Capability,
        explanation: String,
    ) -> CapabilityResponse {
        self.audit.complete_call(
            correlation_id,
            capability,
            format!("VALIDATION FAILED: {explanation}"),
        );
        CapabilityResponse::validation_failed(explanation, Some(correlation_id.to_owned()))
    }

    fn internal_error(
        &self,
        correlation_id: &str,
        capability: Capability,
        error: ServiceError,
    ) -> CapabilityResponse {
        self.audit.fail_call(correlation_id, capability, error.to_string());
        CapabilityResponse::error(Some(correlation_id.to_owned()))
    }
}

/// Audit parameters are the payload's top-level fields.
pub(crate) fn payload_params(payload: &Value) -> BTreeMap<String, Value> {
    match payload {
        Value::Object(map) => map.iter().map(|(key, value)| (key.clone(), value.clone())).collect(),
        other => BTreeMap::from([("payload".to_string(), other.clone())]),
    }
}
