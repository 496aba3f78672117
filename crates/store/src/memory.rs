use std::collections::HashMap;

use rust_decimal::Decimal;
use tokio::sync::RwLock;

use custodian_core::domain::customer::Customer;
use custodian_core::domain::invoice::Invoice;
use custodian_core::domain::order::{Order, OrderStatus};
use custodian_core::domain::product::Product;

use super::{
    CustomerRepository, InvoiceRepository, OrderRepository, ProductRepository, RepositoryError,
};

#[derive(Default)]
pub struct InMemoryCustomerRepository {
    customers: RwLock<HashMap<String, Customer>>,
}

impl InMemoryCustomerRepository {
    pub async fn insert(&self, customer: Customer) {
        let mut customers = self.customers.write().await;
        customers.insert(customer.customer_code.clone(), customer);
    }
}

#[async_trait::async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn find_by_code(&self, customer_code: &str) -> Result<Option<Customer>, RepositoryError> {
        let customers = self.customers.read().await;
        Ok(customers.get(customer_code).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<String, Order>>,
}

#[async_trait::async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn find_by_number(&self, order_number: &str) -> Result<Option<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders.get(order_number).cloned())
    }

    async fn save(&self, order: Order) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        orders.insert(order.order_number.clone(), order);
        Ok(())
    }

    async fn recent_for_customer(
        &self,
        customer_code: &str,
        limit: usize,
    ) -> Result<Vec<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        let mut matching: Vec<Order> =
            orders.values().filter(|order| order.customer_code == customer_code).cloned().collect();
        matching.sort_by(|left, right| right.order_date.cmp(&left.order_date));
        matching.truncate(limit);
        Ok(matching)
    }

    async fn count_for_customer(&self, customer_code: &str) -> Result<u64, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders.values().filter(|order| order.customer_code == customer_code).count() as u64)
    }

    async fn total_revenue_for_customer(
        &self,
        customer_code: &str,
    ) -> Result<Decimal, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .filter(|order| {
                order.customer_code == customer_code && order.status == OrderStatus::Delivered
            })
            .map(Order::grand_total)
            .sum())
    }
}

#[derive(Default)]
pub struct InMemoryInvoiceRepository {
    invoices: RwLock<HashMap<String, Invoice>>,
}

#[async_trait::async_trait]
impl InvoiceRepository for InMemoryInvoiceRepository {
    async fn find_by_number(
        &self,
        invoice_number: &str,
    ) -> Result<Option<Invoice>, RepositoryError> {
        let invoices = self.invoices.read().await;
        Ok(invoices.get(invoice_number).cloned())
    }

    async fn save(&self, invoice: Invoice) -> Result<(), RepositoryError> {
        let mut invoices = self.invoices.write().await;
        invoices.insert(invoice.invoice_number.clone(), invoice);
        Ok(())
    }

    async fn recent_for_customer(
        &self,
        customer_code: &str,
        limit: usize,
    ) -> Result<Vec<Invoice>, RepositoryError> {
        let invoices = self.invoices.read().await;
        let mut matching: Vec<Invoice> = invoices
            .values()
            .filter(|invoice| invoice.customer_code == customer_code)
            .cloned()
            .collect();
        matching.sort_by(|left, right| right.issue_date.cmp(&left.issue_date));
        matching.truncate(limit);
        Ok(matching)
    }

    async fn unpaid_for_customer(
        &self,
        customer_code: &str,
    ) -> Result<Vec<Invoice>, RepositoryError> {
        let invoices = self.invoices.read().await;
        Ok(invoices
            .values()
            .filter(|invoice| {
                invoice.customer_code == customer_code && invoice.status.is_outstanding()
            })
            .cloned()
            .collect())
    }

    async fn count_for_customer(&self, customer_code: &str) -> Result<u64, RepositoryError> {
        let invoices = self.invoices.read().await;
        Ok(invoices.values().filter(|invoice| invoice.customer_code == customer_code).count()
            as u64)
    }

    async fn total_paid_for_customer(
        &self,
        customer_code: &str,
    ) -> Result<Decimal, RepositoryError> {
        let invoices = self.invoices.read().await;
        Ok(invoices
            .values()
            .filter(|invoice| invoice.customer_code == customer_code)
            .map(|invoice| invoice.paid_amount)
            .sum())
    }

    async fn total_outstanding_for_customer(
        &self,
        customer_code: &str,
    ) -> Result<Decimal, RepositoryError> {
        let invoices = self.invoices.read().await;
        Ok(invoices
            .values()
            .filter(|invoice| {
                invoice.customer_code == customer_code && invoice.status.is_outstanding()
            })
            .map(|invoice| invoice.remaining_amount)
            .sum())
    }
}

#[derive(Default)]
pub struct InMemoryProductRepository {
    products: RwLock<HashMap<String, Product>>,
}

#[async_trait::async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_by_code(&self, product_code: &str) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products.get(product_code).cloned())
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        products.insert(product.product_code.clone(), product);
        Ok(())
    }
}
