pub mod customers;
pub mod invoices;
pub mod orders;

pub use customers::{CustomerActivitySummary, CustomerService};
pub use invoices::{InvoiceAnalysis, InvoiceService, RiskLevel};
pub use orders::{format_order, OrderService};
