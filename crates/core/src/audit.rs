use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::capability::Capability;
use crate::security::SecurityContext;

const MASK: &str = "***MASKED***";

/// Parameter keys whose values are masked before the entry is written.
/// Matching is exact and case-sensitive; no semantic matching is attempted.
const SENSITIVE_KEYS: [&str; 5] = ["password", "creditCard", "ssn", "token", "secret"];

const SUMMARY_LOG_LIMIT: usize = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditStatus {
    Started,
    Completed,
    Failed,
    AccessDenied,
    PendingConfirmation,
    Confirmed,
    Rejected,
}

/// One lifecycle event of a capability call. Entries are append-only: once
/// written they are never mutated or removed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub correlation_id: String,
    pub timestamp: DateTime<Utc>,
    pub actor_id: Option<String>,
    pub actor_name: Option<String>,
    pub role: Option<String>,
    pub session_id: Option<String>,
    pub client_addr: Option<String>,
    pub capability: Option<String>,
    pub parameters: BTreeMap<String, Value>,
    pub result_summary: Option<String>,
    pub error_message: Option<String>,
    pub status: AuditStatus,
}

impl AuditEntry {
    fn bare(correlation_id: impl Into<String>, status: AuditStatus) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            timestamp: Utc::now(),
            actor_id: None,
            actor_name: None,
            role: None,
            session_id: None,
            client_addr: None,
            capability: None,
            parameters: BTreeMap::new(),
            result_summary: None,
            error_message: None,
            status,
        }
    }

    fn with_actor(mut self, context: &SecurityContext) -> Self {
        self.actor_id = Some(context.actor_id.clone());
        self.actor_name = Some(context.actor_name.clone());
        self.role = Some(context.role_name().to_owned());
        self.session_id = Some(context.session_id.clone());
        self.client_addr = Some(context.client_addr.clone());
        self
    }
}

/// Append-only record of every capability call's lifecycle, plus usage
/// counters. The trail is the only shared mutable resource in the gateway:
/// appends from concurrent invocations go through a short mutex-guarded
/// critical section, counters are atomics.
pub struct AuditTrail {
    log: Mutex<Vec<AuditEntry>>,
    usage: HashMap<&'static str, AtomicU64>,
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditTrail {
    pub fn new() -> Self {
        let usage = Capability::ALL
            .iter()
            .map(|capability| (capability.name(), AtomicU64::new(0)))
            .collect();
        Self { log: Mutex::new(Vec::new()), usage }
    }

    /// Appends a STARTED entry with sanitized parameters, bumps the usage
    /// counter, and returns the correlation id tying the call's entries
    /// together.
    pub fn start_call(
        &self,
        context: &SecurityContext,
        capability: Capability,
        parameters: &BTreeMap<String, Value>,
    ) -> String {
        let correlation_id = new_correlation_id();
        let sanitized = sanitize_parameters(parameters);

        // Rendered outside the macro: tracing's own `Value` trait shadows
        // the serde_json type inside the expansion.
        let rendered = Value::Object(sanitized.clone().into_iter().collect());
        info!(
            correlation_id = %correlation_id,
            capability = capability.name(),
            actor = %context.actor_name,
            role = context.role_name(),
            params = %rendered,
            "capability call started"
        );

        let mut entry =
            AuditEntry::bare(correlation_id.clone(), AuditStatus::Started).with_actor(context);
        entry.capability = Some(capability.name().to_owned());
        entry.parameters = sanitized;
        self.append(entry);

        if let Some(counter) = self.usage.get(capability.name()) {
            counter.fetch_add(1, Ordering::Relaxed);
        }

        correlation_id
    }

    pub fn complete_call(
        &self,
        correlation_id: &str,
        capability: Capability,
        result_summary: impl Into<String>,
    ) {
        let result_summary = result_summary.into();
        info!(
            correlation_id,
            capability = capability.name(),
            result = %truncate(&result_summary, SUMMARY_LOG_LIMIT),
            "capability call completed"
        );

        let mut entry = AuditEntry::bare(correlation_id, AuditStatus::Completed);
        entry.capability = Some(capability.name().to_owned());
        entry.result_summary = Some(result_summary);
        self.append(entry);
    }

    /// Also the landing point for unexpected runtime errors: the raw error
    /// text is retained here and never surfaced to the caller.
    pub fn fail_call(&self, correlation_id: &str, capability: Capability, error: impl Into<String>) {
        let error = error.into();
        error!(
            correlation_id,
            capability = capability.name(),
            error = %error,
            "capability call failed"
        );

        let mut entry = AuditEntry::bare(correlation_id, AuditStatus::Failed);
        entry.capability = Some(capability.name().to_owned());
        entry.error_message = Some(error);
        self.append(entry);
    }

    /// Denials never reach `start_call`; they get their own correlation id.
    pub fn log_access_denied(&self, context: &SecurityContext, capability: Capability) -> String {
        let correlation_id = new_correlation_id();
        warn!(
            correlation_id = %correlation_id,
            capability = capability.name(),
            actor = %context.actor_name,
            role = context.role_name(),
            "capability access denied"
        );

        let mut entry =
            AuditEntry::bare(correlation_id.clone(), AuditStatus::AccessDenied).with_actor(context);
        entry.capability = Some(capability.name().to_owned());
        self.append(entry);

        correlation_id
    }

    pub fn log_confirmation_required(
        &self,
        correlation_id: &str,
        capability: Capability,
        action_summary: impl Into<String>,
    ) {
        let action_summary = action_summary.into();
        info!(
            correlation_id,
            capability = capability.name(),
            action = %truncate(&action_summary, SUMMARY_LOG_LIMIT),
            "confirmation required"
        );

        let mut entry = AuditEntry::bare(correlation_id, AuditStatus::PendingConfirmation);
        entry.capability = Some(capability.name().to_owned());
        entry.result_summary = Some(format!("CONFIRMATION REQUIRED: {action_summary}"));
        self.append(entry);
    }

    pub fn log_confirmation_received(
        &self,
        correlation_id: &str,
        confirmed: bool,
        confirmed_by: &str,
    ) {
        info!(correlation_id, confirmed, confirmed_by, "confirmation received");

        let status = if confirmed { AuditStatus::Confirmed } else { AuditStatus::Rejected };
        let mut entry = AuditEntry::bare(correlation_id, status);
        entry.result_summary = Some(if confirmed {
            format!("CONFIRMED by {confirmed_by}")
        } else {
            format!("REJECTED by {confirmed_by}")
        });
        self.append(entry);
    }

    /// The `n` most recent entries, newest first.
    pub fn recent_entries(&self, n: usize) -> Vec<AuditEntry> {
        let log = match self.log.lock() {
            Ok(log) => log,
            Err(poisoned) => poisoned.into_inner(),
        };
        log.iter().rev().take(n).cloned().collect()
    }

    /// Point-in-time snapshot of the per-capability invocation counters.
    pub fn usage_statistics(&self) -> BTreeMap<String, u64> {
        self.usage
            .iter()
            .map(|(name, counter)| ((*name).to_owned(), counter.load(Ordering::Relaxed)))
            .collect()
    }

    fn append(&self, entry: AuditEntry) {
        match self.log.lock() {
            Ok(mut log) => log.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}

fn new_correlation_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("CAP-{}-{}", Utc::now().timestamp_millis(), suffix)
}

fn sanitize_parameters(parameters: &BTreeMap<String, Value>) -> BTreeMap<String, Value> {
    let mut sanitized = parameters.clone();
    for key in SENSITIVE_KEYS {
        if let Some(value) = sanitized.get_mut(key) {
            *value = Value::String(MASK.to_owned());
        }
    }
    sanitized
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use serde_json::{json, Value};

    use super::{AuditStatus, AuditTrail, MASK};
    use crate::capability::{Capability, Role};
    use crate::security::SecurityContext;

    fn context() -> SecurityContext {
        SecurityContext::new("u-1", "alex", Role::Manager, "sess-9", "10.1.2.3")
    }

    fn params(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs.iter().map(|(key, value)| ((*key).to_string(), value.clone())).collect()
    }

    #[test]
    fn start_call_masks_sensitive_keys_only() {
        let trail = AuditTrail::new();
        trail.start_call(
            &context(),
            Capability::FindOrder,
            &params(&[("password", json!("x")), ("orderNumber", json!("ORD-1"))]),
        );

        let entries = trail.recent_entries(1);
        assert_eq!(entries[0].parameters["password"], json!(MASK));
        assert_eq!(entries[0].parameters["orderNumber"], json!("ORD-1"));
    }

    #[test]
    fn sanitization_is_case_sensitive_on_the_key() {
        let trail = AuditTrail::new();
        trail.start_call(
            &context(),
            Capability::FindOrder,
            &params(&[("Password", json!("x")), ("creditCard", json!("4111"))]),
        );

        let entries = trail.recent_entries(1);
        assert_eq!(entries[0].parameters["Password"], json!("x"));
        assert_eq!(entries[0].parameters["creditCard"], json!(MASK));
    }

    #[test]
    fn lifecycle_entries_share_the_correlation_id() {
        let trail = AuditTrail::new();
        let id = trail.start_call(&context(), Capability::CreateOrder, &BTreeMap::new());
        trail.log_confirmation_required(&id, Capability::CreateOrder, "order for CUST-1");
        trail.log_confirmation_received(&id, true, "alex");
        trail.complete_call(&id, Capability::CreateOrder, "order created");

        let entries = trail.recent_entries(10);
        assert_eq!(entries.len(), 4);
        assert!(entries.iter().all(|entry| entry.correlation_id == id));
        // Newest first.
        assert_eq!(entries[0].status, AuditStatus::Completed);
        assert_eq!(entries[3].status, AuditStatus::Started);
    }

    #[test]
    fn access_denied_uses_its_own_correlation_id() {
        let trail = AuditTrail::new();
        let started = trail.start_call(&context(), Capability::FindOrder, &BTreeMap::new());
        let denied = trail.log_access_denied(&context(), Capability::RecordPayment);
        assert_ne!(started, denied);

        let entries = trail.recent_entries(2);
        assert_eq!(entries[0].status, AuditStatus::AccessDenied);
        assert_eq!(entries[0].role.as_deref(), Some("MANAGER"));
    }

    #[test]
    fn usage_statistics_count_started_calls() {
        let trail = AuditTrail::new();
        trail.start_call(&context(), Capability::FindOrder, &BTreeMap::new());
        trail.start_call(&context(), Capability::FindOrder, &BTreeMap::new());
        trail.start_call(&context(), Capability::AnalyzeInvoice, &BTreeMap::new());

        let stats = trail.usage_statistics();
        assert_eq!(stats["findOrder"], 2);
        assert_eq!(stats["analyzeInvoice"], 1);
        assert_eq!(stats["createOrder"], 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn correlation_ids_are_unique_under_concurrency() {
        let trail = Arc::new(AuditTrail::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let trail = Arc::clone(&trail);
            handles.push(tokio::spawn(async move {
                let context = context();
                let mut ids = Vec::new();
                for _ in 0..50 {
                    ids.push(trail.start_call(&context, Capability::FindOrder, &BTreeMap::new()));
                }
                ids
            }));
        }

        let mut all = std::collections::HashSet::new();
        for handle in handles {
            for id in handle.await.expect("task should not panic") {
                assert!(all.insert(id), "correlation id issued twice");
            }
        }
        assert_eq!(all.len(), 16 * 50);
        assert_eq!(trail.usage_statistics()["findOrder"], 16 * 50);
    }
}
