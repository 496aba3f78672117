use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::customer::Customer;
use crate::domain::order::line_total;

/// Orders above this estimated total get a managerial-review warning.
pub const LARGE_ORDER_THRESHOLD: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub product_code: String,
    #[serde(default)]
    pub product_name: Option<String>,
    pub quantity: u32,
    /// Callers may omit the price; the gateway resolves it from the catalog
    /// before validation. A line still priceless at validation time names an
    /// unknown product.
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    #[serde(default)]
    pub discount_percent: Option<Decimal>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl OrderLineRequest {
    pub fn estimated_total(&self) -> Decimal {
        match self.unit_price {
            Some(price) => line_total(price, self.quantity, self.discount_percent),
            None => Decimal::ZERO,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub customer_code: String,
    pub lines: Vec<OrderLineRequest>,
    #[serde(default)]
    pub shipping_address: Option<String>,
    #[serde(default)]
    pub billing_address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub expected_delivery_date: Option<DateTime<Utc>>,
}

impl CreateOrderRequest {
    pub fn estimated_total(&self) -> Decimal {
        self.lines.iter().map(OrderLineRequest::estimated_total).sum()
    }
}

/// Outcome of validating a create-order request. Invalid results carry no
/// warnings and a zero total; valid results may still carry warnings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub estimated_total: Decimal,
}

impl OrderValidationResult {
    pub fn valid(warnings: Vec<String>, estimated_total: Decimal) -> Self {
        Self { valid: true, errors: Vec::new(), warnings, estimated_total }
    }

    pub fn invalid(errors: Vec<String>) -> Self {
        Self { valid: false, errors, warnings: Vec::new(), estimated_total: Decimal::ZERO }
    }

    pub fn to_explanation(&self) -> String {
        let mut out = String::new();
        if self.valid {
            out.push_str("The order is valid and can be created.\n");
            out.push_str(&format!("Estimated total: {:.2}\n", self.estimated_total));
            if !self.warnings.is_empty() {
                out.push_str("\nPoints of attention:\n");
                for warning in &self.warnings {
                    out.push_str(&format!("- {warning}\n"));
                }
            }
        } else {
            out.push_str("The order cannot be created.\n\nErrors:\n");
            for error in &self.errors {
                out.push_str(&format!("- {error}\n"));
            }
        }
        out
    }
}

/// Validation rules for order creation. All errors are collected rather than
/// short-circuited, except a missing customer, which is terminal. The caller
/// supplies the customer's current credit exposure (outstanding unpaid,
/// non-cancelled invoice amounts).
pub fn validate_order(
    request: &CreateOrderRequest,
    customer: Option<&Customer>,
    outstanding: Decimal,
) -> OrderValidationResult {
    let Some(customer) = customer else {
        return OrderValidationResult::invalid(vec![format!(
            "Customer not found: {}",
            request.customer_code
        )]);
    };

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if !customer.is_active() {
        errors.push(format!(
            "Customer is not active. Current status: {}",
            customer.status.label()
        ));
    }

    let estimated_total = request.estimated_total();

    if request.lines.is_empty() {
        errors.push("The order must contain at least one line".to_string());
    } else {
        for line in &request.lines {
            if line.quantity == 0 {
                errors.push(format!("Invalid quantity for product: {}", line.product_code));
            }
            match line.unit_price {
                Some(price) if price <= Decimal::ZERO => {
                    errors.push(format!("Invalid unit price for product: {}", line.product_code));
                }
                None => {
                    errors.push(format!(
                        "No unit price for unknown product: {}",
                        line.product_code
                    ));
                }
                Some(_) => {}
            }
        }

        if let Some(credit_limit) = customer.credit_limit {
            let exposure = outstanding + estimated_total;
            if exposure > credit_limit {
                errors.push(format!(
                    "Customer credit limit exceeded: exposure {exposure:.2} over limit {credit_limit:.2}"
                ));
            }
        }

        if estimated_total > LARGE_ORDER_THRESHOLD {
            warnings.push(format!(
                "Order above {LARGE_ORDER_THRESHOLD:.2} - managerial review recommended"
            ));
        }
    }

    if request.shipping_address.as_deref().map_or(true, str::is_empty) {
        warnings
            .push("No shipping address supplied - the customer's address will be used".to_string());
    }

    if errors.is_empty() {
        OrderValidationResult::valid(warnings, estimated_total)
    } else {
        OrderValidationResult::invalid(errors)
    }
}
