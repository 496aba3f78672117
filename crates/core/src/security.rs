use tracing::warn;

use crate::capability::{Capability, Role};
use crate::errors::GatewayError;

/// Per-call identity binding. A context is built fresh for every inbound
/// invocation, passed explicitly through the call chain, and discarded when
/// the call ends. It is never stored in any ambient scope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SecurityContext {
    pub actor_id: String,
    pub actor_name: String,
    pub role: Option<Role>,
    pub session_id: String,
    pub client_addr: String,
}

impl SecurityContext {
    pub fn new(
        actor_id: impl Into<String>,
        actor_name: impl Into<String>,
        role: Role,
        session_id: impl Into<String>,
        client_addr: impl Into<String>,
    ) -> Self {
        Self {
            actor_id: actor_id.into(),
            actor_name: actor_name.into(),
            role: Some(role),
            session_id: session_id.into(),
            client_addr: client_addr.into(),
        }
    }

    /// A context with no role bound; every capability check fails.
    pub fn unbound(
        actor_id: impl Into<String>,
        actor_name: impl Into<String>,
        session_id: impl Into<String>,
        client_addr: impl Into<String>,
    ) -> Self {
        Self {
            actor_id: actor_id.into(),
            actor_name: actor_name.into(),
            role: None,
            session_id: session_id.into(),
            client_addr: client_addr.into(),
        }
    }

    pub fn role_name(&self) -> &'static str {
        self.role.map_or("NONE", |role| role.name())
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        let Some(role) = self.role else {
            warn!(capability = capability.name(), actor = %self.actor_name, "capability check without a bound role");
            return false;
        };

        let allowed = role.allows(capability);
        if !allowed {
            warn!(
                capability = capability.name(),
                actor = %self.actor_name,
                role = role.name(),
                "capability denied for role"
            );
        }
        allowed
    }

    /// Gate that must pass before any business logic runs for a capability
    /// invocation. There is no bypass path.
    pub fn require_capability(&self, capability: Capability) -> Result<(), GatewayError> {
        if self.has_capability(capability) {
            return Ok(());
        }

        Err(GatewayError::AccessDenied {
            capability: capability.name(),
            role: self.role_name().to_owned(),
        })
    }

    pub fn audit_line(&self) -> String {
        format!(
            "actor[id={}, name={}, role={}, session={}, addr={}]",
            self.actor_id,
            self.actor_name,
            self.role_name(),
            self.session_id,
            self.client_addr
        )
    }
}
