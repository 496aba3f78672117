pub mod audit;
pub mod capability;
pub mod config;
pub mod confirm;
pub mod domain;
pub mod errors;
pub mod orders;
pub mod security;

pub use audit::{AuditEntry, AuditStatus, AuditTrail};
pub use capability::{Capability, CapabilityDescriptor, Role};
pub use config::{ConfigError, GatewayConfig};
pub use confirm::{ConfirmationTicket, TicketError, TicketIssuer};
pub use domain::customer::{Customer, CustomerSegment, CustomerStatus};
pub use domain::invoice::{Invoice, InvoiceStatus};
pub use domain::order::{Order, OrderLine, OrderStatus};
pub use domain::product::{Product, ProductCategory, ProductStatus};
pub use errors::{DomainError, GatewayError};
pub use orders::{CreateOrderRequest, OrderLineRequest, OrderValidationResult};
pub use security::SecurityContext;
