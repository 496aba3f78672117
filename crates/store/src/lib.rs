//! Repository seams the gateway core consumes. The stores are opaque
//! collaborators: the gateway only relies on the contracts below, never on
//! storage mechanics. In-memory implementations back tests and demos.

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use custodian_core::domain::customer::Customer;
use custodian_core::domain::invoice::Invoice;
use custodian_core::domain::order::Order;
use custodian_core::domain::product::Product;

pub mod memory;

pub use memory::{
    InMemoryCustomerRepository, InMemoryInvoiceRepository, InMemoryOrderRepository,
    InMemoryProductRepository,
};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn find_by_code(&self, customer_code: &str) -> Result<Option<Customer>, RepositoryError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_number(&self, order_number: &str) -> Result<Option<Order>, RepositoryError>;
    /// Persists the order and its lines as a single unit; a partially
    /// written order must never be observable.
    async fn save(&self, order: Order) -> Result<(), RepositoryError>;
    /// Most recent orders first.
    async fn recent_for_customer(
        &self,
        customer_code: &str,
        limit: usize,
    ) -> Result<Vec<Order>, RepositoryError>;
    async fn count_for_customer(&self, customer_code: &str) -> Result<u64, RepositoryError>;
    /// Lifetime revenue: delivered orders only, tax included.
    async fn total_revenue_for_customer(
        &self,
        customer_code: &str,
    ) -> Result<Decimal, RepositoryError>;
}

#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    async fn find_by_number(
        &self,
        invoice_number: &str,
    ) -> Result<Option<Invoice>, RepositoryError>;
    async fn save(&self, invoice: Invoice) -> Result<(), RepositoryError>;
    /// Most recent invoices first.
    async fn recent_for_customer(
        &self,
        customer_code: &str,
        limit: usize,
    ) -> Result<Vec<Invoice>, RepositoryError>;
    async fn unpaid_for_customer(
        &self,
        customer_code: &str,
    ) -> Result<Vec<Invoice>, RepositoryError>;
    async fn count_for_customer(&self, customer_code: &str) -> Result<u64, RepositoryError>;
    async fn total_paid_for_customer(
        &self,
        customer_code: &str,
    ) -> Result<Decimal, RepositoryError>;
    /// Sum of remaining amounts over unpaid, non-cancelled invoices: the
    /// customer's current credit exposure before any pending order.
    async fn total_outstanding_for_customer(
        &self,
        customer_code: &str,
    ) -> Result<Decimal, RepositoryError>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_code(&self, product_code: &str) -> Result<Option<Product>, RepositoryError>;
    async fn save(&self, product: Product) -> Result<(), RepositoryError>;
}
