use std::fmt::Write as _;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;

use custodian_core::domain::customer::Customer;
use custodian_core::domain::invoice::Invoice;
use custodian_core::domain::order::Order;
use custodian_store::{CustomerRepository, InvoiceRepository, OrderRepository};

use crate::error::ServiceError;

const RECENT_LIMIT: usize = 5;

#[derive(Clone, Debug)]
pub struct CustomerActivitySummary {
    pub customer: Customer,
    pub order_count: u64,
    pub total_revenue: Decimal,
    pub recent_orders: Vec<Order>,
    pub invoice_count: u64,
    pub total_paid: Decimal,
    pub total_outstanding: Decimal,
    pub recent_invoices: Vec<Invoice>,
    pub has_overdue_invoices: bool,
}

impl CustomerActivitySummary {
    pub fn to_summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Customer {} - {} ({}, {} segment)",
            self.customer.customer_code,
            self.customer.company_name,
            self.customer.status.label(),
            self.customer.segment.label()
        );
        if let Some(credit_limit) = self.customer.credit_limit {
            let _ = writeln!(out, "Credit limit: {credit_limit:.2}");
        }
        let _ = writeln!(
            out,
            "Orders: {} total, {:.2} lifetime revenue",
            self.order_count, self.total_revenue
        );
        let _ = writeln!(
            out,
            "Invoices: {} total, {:.2} paid, {:.2} outstanding",
            self.invoice_count, self.total_paid, self.total_outstanding
        );
        if self.has_overdue_invoices {
            let _ = writeln!(out, "ATTENTION: this customer has overdue invoices.");
        }
        if !self.recent_orders.is_empty() {
            let _ = writeln!(out, "Recent orders:");
            for order in &self.recent_orders {
                let _ = writeln!(
                    out,
                    "  - {} on {} ({}, {:.2})",
                    order.order_number,
                    order.order_date.format("%Y-%m-%d"),
                    order.status.label(),
                    order.grand_total()
                );
            }
        }
        if !self.recent_invoices.is_empty() {
            let _ = writeln!(out, "Recent invoices:");
            for invoice in &self.recent_invoices {
                let _ = writeln!(
                    out,
                    "  - {} due {} ({}, remaining {:.2})",
                    invoice.invoice_number,
                    invoice.due_date,
                    invoice.status.label(),
                    invoice.remaining_amount
                );
            }
        }
        out
    }
}

pub struct CustomerService {
    customers: Arc<dyn CustomerRepository>,
    orders: Arc<dyn OrderRepository>,
    invoices: Arc<dyn InvoiceRepository>,
}

impl CustomerService {
    pub fn new(
        customers: Arc<dyn CustomerRepository>,
        orders: Arc<dyn OrderRepository>,
        invoices: Arc<dyn InvoiceRepository>,
    ) -> Self {
        Self { customers, orders, invoices }
    }

    pub async fn summarize_activity(
        &self,
        customer_code: &str,
    ) -> Result<Option<CustomerActivitySummary>, ServiceError> {
        let Some(customer) = self.customers.find_by_code(customer_code).await? else {
            return Ok(None);
        };

        let today = Utc::now().date_naive();
        let unpaid = self.invoices.unpaid_for_customer(customer_code).await?;
        let has_overdue_invoices = unpaid.iter().any(|invoice| invoice.is_overdue(today));

        Ok(Some(CustomerActivitySummary {
            order_count: self.orders.count_for_customer(customer_code).await?,
            total_revenue: self.orders.total_revenue_for_customer(customer_code).await?,
            recent_orders: self.orders.recent_for_customer(customer_code, RECENT_LIMIT).await?,
            invoice_count: self.invoices.count_for_customer(customer_code).await?,
            total_paid: self.invoices.total_paid_for_customer(customer_code).await?,
            total_outstanding: self
                .invoices
                .total_outstanding_for_customer(customer_code)
                .await?,
            recent_invoices: self
                .invoices
                .recent_for_customer(customer_code, RECENT_LIMIT)
                .await?,
            has_overdue_invoices,
            customer,
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use custodian_core::domain::customer::{Customer, CustomerSegment, CustomerStatus};
    use custodian_core::domain::invoice::{Invoice, InvoiceStatus};
    use custodian_core::domain::order::{Order, OrderLine, OrderStatus};
    use custodian_store::{
        InMemoryCustomerRepository, InMemoryInvoiceRepository, InMemoryOrderRepository,
        InvoiceRepository, OrderRepository,
    };

    use super::CustomerService;

    async fn service_with_history() -> CustomerService {
        let customers = Arc::new(InMemoryCustomerRepository::default());
        customers
            .insert(Customer {
                customer_code: "CUST-1".to_string(),
                company_name: "Acme Industries".to_string(),
                contact_name: None,
                email: None,
                address: None,
                status: CustomerStatus::Active,
                segment: CustomerSegment::Premium,
                credit_limit: Some(Decimal::from(50_000)),
                created_at: Utc::now(),
            })
            .await;

        let orders = Arc::new(InMemoryOrderRepository::default());
        for index in 0..7 {
            let mut order = Order::new(format!("ORD-{index}"), "CUST-1", "alex");
            order.order_date = Utc::now() - Duration::days(index);
            order.add_line(OrderLine {
                product_code: "P-1".to_string(),
                product_name: "Widget".to_string(),
                quantity: 1,
                unit_price: Decimal::new(100_000, 2),
                discount_percent: None,
                notes: None,
            });
            order.calculate_totals();
            if index < 3 {
                order.status = OrderStatus::Delivered;
            }
            orders.save(order).await.expect("save order");
        }

        let invoices = Arc::new(InMemoryInvoiceRepository::default());
        let today = Utc::now().date_naive();
        invoices
            .save(Invoice {
                invoice_number: "INV-1".to_string(),
                order_number: None,
                customer_code: "CUST-1".to_string(),
                status: InvoiceStatus::Sent,
                total_amount: Decimal::new(100_000, 2),
                paid_amount: Decimal::ZERO,
                remaining_amount: Decimal::new(100_000, 2),
                issue_date: today - Duration::days(60),
                due_date: today - Duration::days(30),
                paid_date: None,
                notes: None,
            })
            .await
            .expect("save invoice");

        CustomerService::new(customers, orders, invoices)
    }

    #[tokio::test]
    async fn unknown_customer_summarizes_to_none() {
        let service = service_with_history().await;
        let summary = service.summarize_activity("CUST-404").await.expect("query runs");
        assert!(summary.is_none());
    }

    #[tokio::test]
    async fn summary_aggregates_and_flags_overdue() {
        let service = service_with_history().await;
        let summary = service
            .summarize_activity("CUST-1")
            .await
            .expect("query runs")
            .expect("customer exists");

        assert_eq!(summary.order_count, 7);
        assert_eq!(summary.recent_orders.len(), 5);
        // Revenue covers the three delivered orders only, tax included.
        assert_eq!(summary.total_revenue, Decimal::new(360_000, 2));
        assert_eq!(summary.total_outstanding, Decimal::new(100_000, 2));
        assert!(summary.has_overdue_invoices);

        let text = summary.to_summary();
        assert!(text.contains("Acme Industries"));
        assert!(text.contains("overdue invoices"));
        assert!(text.contains("ORD-0"));
        assert!(!text.contains("ORD-6"), "older orders fall outside the recent window");
    }
}
