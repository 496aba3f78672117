//! The capability gateway: a mediation layer between automated callers and
//! the order/invoice/customer domain. Every invocation flows through one
//! authorization gate, lands in the audit trail, and mutations only execute
//! after an explicit, ticket-bound confirmation.

pub mod error;
pub mod handler;
pub mod response;
pub mod services;
pub mod workflow;

pub use error::ServiceError;
pub use handler::CapabilityGateway;
pub use response::{CapabilityResponse, ResponseStatus};
pub use services::{
    CustomerActivitySummary, CustomerService, InvoiceAnalysis, InvoiceService, OrderService,
    RiskLevel,
};
pub use workflow::{ConfirmableAction, ConfirmationWorkflow};
