use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Fixed-rate tax applied to every order subtotal (20%).
pub const TAX_RATE: Decimal = Decimal::from_parts(20, 0, 0, false, 2);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Draft,
    PendingValidation,
    Validated,
    InPreparation,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
}

impl OrderStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::PendingValidation => "PENDING_VALIDATION",
            Self::Validated => "VALIDATED",
            Self::InPreparation => "IN_PREPARATION",
            Self::Shipped => "SHIPPED",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
            Self::Returned => "RETURNED",
        }
    }

    /// The transition table. `Cancelled` and `Returned` are terminal.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Draft, OrderStatus::PendingValidation)
                | (OrderStatus::Draft, OrderStatus::Cancelled)
                | (OrderStatus::PendingValidation, OrderStatus::Validated)
                | (OrderStatus::PendingValidation, OrderStatus::Cancelled)
                | (OrderStatus::Validated, OrderStatus::InPreparation)
                | (OrderStatus::Validated, OrderStatus::Cancelled)
                | (OrderStatus::InPreparation, OrderStatus::Shipped)
                | (OrderStatus::InPreparation, OrderStatus::Cancelled)
                | (OrderStatus::Shipped, OrderStatus::Delivered)
                | (OrderStatus::Shipped, OrderStatus::Returned)
                | (OrderStatus::Delivered, OrderStatus::Returned)
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_code: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub discount_percent: Option<Decimal>,
    pub notes: Option<String>,
}

impl OrderLine {
    /// `unit_price × quantity`, minus the discount percentage when present
    /// and positive. The same computation backs validation estimates and
    /// confirmation summaries so the three always agree.
    pub fn line_total(&self) -> Decimal {
        line_total(self.unit_price, self.quantity, self.discount_percent)
    }
}

pub fn line_total(unit_price: Decimal, quantity: u32, discount_percent: Option<Decimal>) -> Decimal {
    let subtotal = unit_price * Decimal::from(quantity);
    match discount_percent {
        Some(discount) if discount > Decimal::ZERO => {
            subtotal - subtotal * discount / Decimal::from(100)
        }
        _ => subtotal,
    }
}

pub fn tax_for(subtotal: Decimal) -> Decimal {
    subtotal * TAX_RATE
}

/// An order owns its lines: removing a line detaches it, and lines never
/// outlive the order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_number: String,
    pub customer_code: String,
    pub status: OrderStatus,
    pub lines: Vec<OrderLine>,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub shipping_address: Option<String>,
    pub billing_address: Option<String>,
    pub notes: Option<String>,
    pub order_date: DateTime<Utc>,
    pub expected_delivery_date: Option<DateTime<Utc>>,
    pub actual_delivery_date: Option<DateTime<Utc>>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        order_number: impl Into<String>,
        customer_code: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            order_number: order_number.into(),
            customer_code: customer_code.into(),
            status: OrderStatus::PendingValidation,
            lines: Vec::new(),
            subtotal: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            shipping_address: None,
            billing_address: None,
            notes: None,
            order_date: now,
            expected_delivery_date: None,
            actual_delivery_date: None,
            created_by: created_by.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn add_line(&mut self, line: OrderLine) {
        self.lines.push(line);
    }

    pub fn remove_line(&mut self, product_code: &str) -> Option<OrderLine> {
        let index = self.lines.iter().position(|line| line.product_code == product_code)?;
        Some(self.lines.remove(index))
    }

    pub fn calculate_totals(&mut self) {
        self.subtotal = self.lines.iter().map(OrderLine::line_total).sum();
        self.tax_amount = tax_for(self.subtotal);
    }

    pub fn grand_total(&self) -> Decimal {
        self.subtotal + self.tax_amount
    }

    pub fn transition_to(&mut self, next: OrderStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStatusTransition { from: self.status, to: next });
        }

        self.status = next;
        self.updated_at = Utc::now();
        if next == OrderStatus::Delivered {
            self.actual_delivery_date = Some(Utc::now());
        }
        Ok(())
    }

    pub fn append_note(&mut self, note: &str) {
        match &mut self.notes {
            Some(notes) => {
                notes.push('\n');
                notes.push_str(note);
            }
            None => self.notes = Some(note.to_owned()),
        }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{line_total, Order, OrderLine, OrderStatus};
    use crate::errors::DomainError;

    fn line(price: i64, quantity: u32) -> OrderLine {
        OrderLine {
            product_code: "P-1".to_string(),
            product_name: "Widget".to_string(),
            quantity,
            unit_price: Decimal::new(price, 2),
            discount_percent: None,
            notes: None,
        }
    }

    #[test]
    fn allows_pending_validation_from_draft() {
        let mut order = Order::new("ORD-1", "CUST-1", "alex");
        order.status = OrderStatus::Draft;
        order.transition_to(OrderStatus::PendingValidation).expect("draft -> pending");
        assert_eq!(order.status, OrderStatus::PendingValidation);
    }

    #[test]
    fn blocks_draft_straight_to_validated() {
        let mut order = Order::new("ORD-1", "CUST-1", "alex");
        order.status = OrderStatus::Draft;
        let error = order.transition_to(OrderStatus::Validated).expect_err("must be refused");
        assert_eq!(
            error,
            DomainError::InvalidStatusTransition {
                from: OrderStatus::Draft,
                to: OrderStatus::Validated,
            }
        );
        assert_eq!(order.status, OrderStatus::Draft);
    }

    #[test]
    fn cancelled_is_terminal() {
        let mut order = Order::new("ORD-1", "CUST-1", "alex");
        order.status = OrderStatus::Cancelled;
        for next in [
            OrderStatus::Draft,
            OrderStatus::PendingValidation,
            OrderStatus::Validated,
            OrderStatus::InPreparation,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Returned,
        ] {
            assert!(order.transition_to(next).is_err(), "cancelled -> {next:?} must fail");
        }
    }

    #[test]
    fn delivery_stamps_actual_date() {
        let mut order = Order::new("ORD-1", "CUST-1", "alex");
        order.status = OrderStatus::Shipped;
        order.transition_to(OrderStatus::Delivered).expect("shipped -> delivered");
        assert!(order.actual_delivery_date.is_some());
    }

    #[test]
    fn totals_match_fixed_rate_tax() {
        let mut order = Order::new("ORD-1", "CUST-1", "alex");
        order.add_line(line(250_000, 2));
        order.add_line(line(200_000, 1));
        order.add_line(line(100_000, 1));
        order.calculate_totals();

        assert_eq!(order.subtotal, Decimal::new(800_000, 2));
        assert_eq!(order.tax_amount, Decimal::new(160_000, 2));
        assert_eq!(order.grand_total(), Decimal::new(960_000, 2));
    }

    #[test]
    fn discount_reduces_the_line_total() {
        let total = line_total(Decimal::new(10_000, 2), 2, Some(Decimal::from(10)));
        assert_eq!(total, Decimal::new(18_000, 2));

        let untouched = line_total(Decimal::new(10_000, 2), 2, Some(Decimal::ZERO));
        assert_eq!(untouched, Decimal::new(20_000, 2));
    }

    #[test]
    fn removing_a_line_detaches_it() {
        let mut order = Order::new("ORD-1", "CUST-1", "alex");
        order.add_line(line(100, 1));
        let removed = order.remove_line("P-1").expect("line should be present");
        assert_eq!(removed.product_code, "P-1");
        assert!(order.lines.is_empty());
        assert!(order.remove_line("P-1").is_none());
    }
}
