use std::fmt::Write as _;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;
use uuid::Uuid;

use custodian_core::domain::order::{Order, OrderLine, OrderStatus};
use custodian_core::errors::DomainError;
use custodian_core::orders::{validate_order, CreateOrderRequest, OrderValidationResult};
use custodian_store::{
    CustomerRepository, InvoiceRepository, OrderRepository, ProductRepository,
};

use crate::error::ServiceError;

pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    customers: Arc<dyn CustomerRepository>,
    invoices: Arc<dyn InvoiceRepository>,
    products: Arc<dyn ProductRepository>,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        customers: Arc<dyn CustomerRepository>,
        invoices: Arc<dyn InvoiceRepository>,
        products: Arc<dyn ProductRepository>,
    ) -> Self {
        Self { orders, customers, invoices, products }
    }

    pub async fn find_by_number(
        &self,
        order_number: &str,
    ) -> Result<Option<Order>, ServiceError> {
        Ok(self.orders.find_by_number(order_number).await?)
    }

    /// Re-prices every line against the catalog. The catalog is
    /// authoritative for known products, whatever price the caller supplied;
    /// a line whose product is unknown keeps the caller's price, or stays
    /// priceless so validation names it.
    pub async fn resolve_request(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<CreateOrderRequest, ServiceError> {
        let mut resolved = request.clone();
        for line in &mut resolved.lines {
            if let Some(product) = self.products.find_by_code(&line.product_code).await? {
                line.unit_price = Some(product.unit_price);
                line.product_name.get_or_insert(product.name);
            }
        }
        Ok(resolved)
    }

    /// Resolves the request against the catalog, then applies the full
    /// validation rule set with the customer's current credit exposure.
    pub async fn validate_request(
        &self,
        request: &CreateOrderRequest,
    ) -> Result<OrderValidationResult, ServiceError> {
        let resolved = self.resolve_request(request).await?;
        let customer = self.customers.find_by_code(&resolved.customer_code).await?;
        let outstanding = match &customer {
            Some(customer) => {
                self.invoices.total_outstanding_for_customer(&customer.customer_code).await?
            }
            None => Decimal::ZERO,
        };
        Ok(validate_order(&resolved, customer.as_ref(), outstanding))
    }

    /// Builds and persists the order. Callers are expected to have validated
    /// the request; a line still missing a price here is an invariant breach,
    /// not a user error.
    pub async fn create(
        &self,
        request: &CreateOrderRequest,
        created_by: &str,
    ) -> Result<Order, ServiceError> {
        let resolved = self.resolve_request(request).await?;
        let customer = self
            .customers
            .find_by_code(&resolved.customer_code)
            .await?
            .ok_or_else(|| ServiceError::CustomerNotFound(resolved.customer_code.clone()))?;

        let mut order = Order::new(new_order_number(), &resolved.customer_code, created_by);
        order.shipping_address = resolved
            .shipping_address
            .filter(|address| !address.is_empty())
            .or_else(|| customer.address.clone());
        order.billing_address = resolved.billing_address;
        order.notes = resolved.notes;
        order.expected_delivery_date = resolved.expected_delivery_date;

        for line in resolved.lines {
            let unit_price = line.unit_price.ok_or_else(|| {
                DomainError::InvariantViolation(format!(
                    "unpriced line reached order creation: {}",
                    line.product_code
                ))
            })?;
            order.add_line(OrderLine {
                product_name: line.product_name.unwrap_or_else(|| line.product_code.clone()),
                product_code: line.product_code,
                quantity: line.quantity,
                unit_price,
                discount_percent: line.discount_percent,
                notes: line.notes,
            });
        }
        order.calculate_totals();

        self.orders.save(order.clone()).await?;
        info!(
            order_number = %order.order_number,
            customer = %order.customer_code,
            total = %order.grand_total(),
            "order created"
        );
        Ok(order)
    }

    /// Moves the order through the transition table; refused transitions
    /// surface as `DomainError::InvalidStatusTransition`.
    pub async fn transition(
        &self,
        order_number: &str,
        next: OrderStatus,
    ) -> Result<Order, ServiceError> {
        let mut order = self
            .orders
            .find_by_number(order_number)
            .await?
            .ok_or_else(|| ServiceError::OrderNotFound(order_number.to_owned()))?;
        order.transition_to(next)?;
        self.orders.save(order.clone()).await?;
        info!(order_number, status = order.status.label(), "order status updated");
        Ok(order)
    }

    pub async fn cancel(
        &self,
        order_number: &str,
        reason: &str,
        actor: &str,
    ) -> Result<Order, ServiceError> {
        let mut order = self
            .orders
            .find_by_number(order_number)
            .await?
            .ok_or_else(|| ServiceError::OrderNotFound(order_number.to_owned()))?;
        order.transition_to(OrderStatus::Cancelled)?;
        order.append_note(&format!(
            "Cancelled by {actor} on {}: {reason}",
            Utc::now().format("%Y-%m-%d")
        ));
        self.orders.save(order.clone()).await?;
        info!(order_number, actor, reason, "order cancelled");
        Ok(order)
    }
}

fn new_order_number() -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("ORD-{}-{}", Utc::now().format("%Y%m%d"), suffix)
}

/// Plain-text order report for the lookup capability.
pub fn format_order(order: &Order) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Order {} for customer {}", order.order_number, order.customer_code);
    let _ = writeln!(out, "Status: {}", order.status.label());
    let _ = writeln!(out, "Order date: {}", order.order_date.format("%Y-%m-%d"));
    if let Some(expected) = order.expected_delivery_date {
        let _ = writeln!(out, "Expected delivery: {}", expected.format("%Y-%m-%d"));
    }
    let _ = writeln!(out, "Lines:");
    for line in &order.lines {
        let _ = write!(
            out,
            "  - {} {} x{} @ {:.2} = {:.2}",
            line.product_code,
            line.product_name,
            line.quantity,
            line.unit_price,
            line.line_total()
        );
        match line.discount_percent {
            Some(discount) if discount > Decimal::ZERO => {
                let _ = writeln!(out, " ({discount}% discount)");
            }
            _ => out.push('\n'),
        }
    }
    let _ = writeln!(out, "Subtotal: {:.2}", order.subtotal);
    let _ = writeln!(out, "Tax: {:.2}", order.tax_amount);
    let _ = writeln!(out, "Total: {:.2}", order.grand_total());
    if let Some(address) = &order.shipping_address {
        let _ = writeln!(out, "Shipping address: {address}");
    }
    if let Some(notes) = &order.notes {
        let _ = writeln!(out, "Notes: {notes}");
    }
    let _ = write!(out, "Created by {}", order.created_by);
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use rust_decimal::Decimal;

    use custodian_core::domain::customer::{Customer, CustomerSegment, CustomerStatus};
    use custodian_core::domain::order::OrderStatus;
    use custodian_core::domain::product::{Product, ProductCategory, ProductStatus};
    use custodian_core::orders::{CreateOrderRequest, OrderLineRequest};
    use custodian_store::{
        InMemoryCustomerRepository, InMemoryInvoiceRepository, InMemoryOrderRepository,
        InMemoryProductRepository, OrderRepository, ProductRepository,
    };

    use super::{format_order, OrderService};
    use crate::error::ServiceError;

    async fn service_with_catalog() -> (OrderService, Arc<InMemoryOrderRepository>) {
        let customers = Arc::new(InMemoryCustomerRepository::default());
        customers
            .insert(Customer {
                customer_code: "CUST-1".to_string(),
                company_name: "Acme Industries".to_string(),
                contact_name: None,
                email: None,
                address: Some("12 Foundry Way".to_string()),
                status: CustomerStatus::Active,
                segment: CustomerSegment::Standard,
                credit_limit: None,
                created_at: Utc::now(),
            })
            .await;

        let products = Arc::new(InMemoryProductRepository::default());
        products
            .save(Product {
                product_code: "P-1".to_string(),
                name: "Widget".to_string(),
                description: None,
                category: ProductCategory::Hardware,
                unit_price: Decimal::new(250_000, 2),
                stock_quantity: Some(10),
                status: ProductStatus::Active,
            })
            .await
            .expect("save product");

        let orders = Arc::new(InMemoryOrderRepository::default());
        let service = OrderService::new(
            orders.clone(),
            customers,
            Arc::new(InMemoryInvoiceRepository::default()),
            products,
        );
        (service, orders)
    }

    fn request() -> CreateOrderRequest {
        CreateOrderRequest {
            customer_code: "CUST-1".to_string(),
            lines: vec![OrderLineRequest {
                product_code: "P-1".to_string(),
                product_name: None,
                quantity: 2,
                unit_price: None,
                discount_percent: None,
                notes: None,
            }],
            shipping_address: None,
            billing_address: None,
            notes: None,
            expected_delivery_date: None,
        }
    }

    #[tokio::test]
    async fn resolves_prices_from_the_catalog() {
        let (service, _) = service_with_catalog().await;
        let result = service.validate_request(&request()).await.expect("validation runs");
        assert!(result.valid);
        assert_eq!(result.estimated_total, Decimal::new(500_000, 2));
    }

    #[tokio::test]
    async fn unknown_product_fails_validation() {
        let (service, _) = service_with_catalog().await;
        let mut req = request();
        req.lines[0].product_code = "P-MISSING".to_string();
        let result = service.validate_request(&req).await.expect("validation runs");
        assert!(!result.valid);
        assert!(result.errors[0].contains("P-MISSING"));
    }

    #[tokio::test]
    async fn created_order_falls_back_to_the_customer_address() {
        let (service, orders) = service_with_catalog().await;
        let order = service.create(&request(), "alex").await.expect("order creates");

        assert_eq!(order.status, OrderStatus::PendingValidation);
        assert_eq!(order.shipping_address.as_deref(), Some("12 Foundry Way"));
        assert_eq!(order.subtotal, Decimal::new(500_000, 2));
        assert_eq!(order.tax_amount, Decimal::new(100_000, 2));
        assert!(order.order_number.starts_with("ORD-"));

        let stored = orders
            .find_by_number(&order.order_number)
            .await
            .expect("lookup runs")
            .expect("order persisted");
        assert_eq!(stored, order);
    }

    #[tokio::test]
    async fn cancel_appends_a_note_and_terminates_the_order() {
        let (service, _) = service_with_catalog().await;
        let order = service.create(&request(), "alex").await.expect("order creates");

        let cancelled = service
            .cancel(&order.order_number, "duplicate entry", "alex")
            .await
            .expect("cancel succeeds");
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(cancelled.notes.as_deref().is_some_and(|notes| notes.contains("duplicate entry")));

        let again = service.cancel(&order.order_number, "again", "alex").await;
        assert!(matches!(again, Err(ServiceError::Domain(_))));
    }

    #[tokio::test]
    async fn transition_refuses_illegal_jumps() {
        let (service, _) = service_with_catalog().await;
        let order = service.create(&request(), "alex").await.expect("order creates");

        let error = service
            .transition(&order.order_number, OrderStatus::Shipped)
            .await
            .expect_err("pending cannot ship");
        assert!(matches!(error, ServiceError::Domain(_)));

        let validated = service
            .transition(&order.order_number, OrderStatus::Validated)
            .await
            .expect("pending -> validated");
        assert_eq!(validated.status, OrderStatus::Validated);
    }

    #[tokio::test]
    async fn report_carries_lines_and_totals() {
        let (service, _) = service_with_catalog().await;
        let order = service.create(&request(), "alex").await.expect("order creates");

        let report = format_order(&order);
        assert!(report.contains("P-1 Widget x2 @ 2500.00 = 5000.00"));
        assert!(report.contains("Total: 6000.00"));
        assert!(report.contains("PENDING_VALIDATION"));
    }
}
