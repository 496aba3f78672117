use serde::{Deserialize, Serialize};

use crate::errors::GatewayError;

/// A single named operation an automated caller may request. The set is
/// closed: adding a variant forces every match in the gateway to be updated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    FindOrder,
    AnalyzeInvoice,
    SummarizeCustomerActivity,
    CreateOrder,
    ValidateOrder,
    CancelOrder,
    RecordPayment,
}

impl Capability {
    pub const ALL: [Capability; 7] = [
        Capability::FindOrder,
        Capability::AnalyzeInvoice,
        Capability::SummarizeCustomerActivity,
        Capability::CreateOrder,
        Capability::ValidateOrder,
        Capability::CancelOrder,
        Capability::RecordPayment,
    ];

    /// Wire name used by the transport layer and the audit trail.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FindOrder => "findOrder",
            Self::AnalyzeInvoice => "analyzeInvoice",
            Self::SummarizeCustomerActivity => "summarizeCustomerActivity",
            Self::CreateOrder => "createOrder",
            Self::ValidateOrder => "validateOrder",
            Self::CancelOrder => "cancelOrder",
            Self::RecordPayment => "recordPayment",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::FindOrder => "Look up an order by its order number",
            Self::AnalyzeInvoice => "Analyze an invoice with payment risk indicators",
            Self::SummarizeCustomerActivity => "Summarize a customer's commercial activity",
            Self::CreateOrder => "Create a new customer order",
            Self::ValidateOrder => "Validate an order awaiting validation",
            Self::CancelOrder => "Cancel an order",
            Self::RecordPayment => "Record a payment against an invoice",
        }
    }

    /// Mutating capabilities go through the two-phase confirmation workflow.
    pub fn is_mutating(&self) -> bool {
        match self {
            Self::FindOrder | Self::AnalyzeInvoice | Self::SummarizeCustomerActivity => false,
            Self::CreateOrder | Self::ValidateOrder | Self::CancelOrder | Self::RecordPayment => {
                true
            }
        }
    }

    pub fn from_name(name: &str) -> Result<Self, GatewayError> {
        Self::ALL
            .iter()
            .copied()
            .find(|capability| capability.name() == name)
            .ok_or_else(|| GatewayError::UnknownCapability { name: name.to_owned() })
    }

    pub fn describe(&self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            name: self.name(),
            description: self.description(),
            requires_confirmation: self.is_mutating(),
        }
    }
}

/// What an orchestrating caller sees when listing the capabilities its role
/// may legally attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub requires_confirmation: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Read-only access: lookups and summaries.
    Support,
    /// Support capabilities plus order creation and validation.
    Manager,
    /// Every capability in the registry, by construction.
    Admin,
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Support => "SUPPORT",
            Self::Manager => "MANAGER",
            Self::Admin => "ADMIN",
        }
    }

    /// Admin derives its set from `Capability::ALL` so a newly added
    /// capability can never be silently excluded from it.
    pub fn allowed_capabilities(&self) -> &'static [Capability] {
        match self {
            Self::Support => &[
                Capability::FindOrder,
                Capability::AnalyzeInvoice,
                Capability::SummarizeCustomerActivity,
            ],
            Self::Manager => &[
                Capability::FindOrder,
                Capability::AnalyzeInvoice,
                Capability::SummarizeCustomerActivity,
                Capability::CreateOrder,
                Capability::ValidateOrder,
            ],
            Self::Admin => &Capability::ALL,
        }
    }

    pub fn allows(&self, capability: Capability) -> bool {
        self.allowed_capabilities().contains(&capability)
    }
}
