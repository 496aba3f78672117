use thiserror::Error;

use crate::domain::order::OrderStatus;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid order status transition from {from:?} to {to:?}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },
    #[error("invoice `{invoice_number}` is already fully paid")]
    InvoiceAlreadyPaid { invoice_number: String },
    #[error("cannot record a payment on cancelled invoice `{invoice_number}`")]
    PaymentOnCancelledInvoice { invoice_number: String },
    #[error("payment amount must be positive, got {amount}")]
    NonPositivePaymentAmount { amount: rust_decimal::Decimal },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("access denied to capability `{capability}` for role `{role}`")]
    AccessDenied { capability: &'static str, role: String },
    #[error("unknown capability `{name}`")]
    UnknownCapability { name: String },
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{DomainError, GatewayError};
    use crate::domain::order::OrderStatus;

    #[test]
    fn transition_error_names_both_states() {
        let error = DomainError::InvalidStatusTransition {
            from: OrderStatus::Draft,
            to: OrderStatus::Shipped,
        };
        let message = error.to_string();
        assert!(message.contains("Draft"));
        assert!(message.contains("Shipped"));
    }

    #[test]
    fn access_denied_names_capability_and_role() {
        let error =
            GatewayError::AccessDenied { capability: "createOrder", role: "SUPPORT".to_string() };
        assert!(error.to_string().contains("createOrder"));
        assert!(error.to_string().contains("SUPPORT"));
    }

    #[test]
    fn payment_amount_error_carries_amount() {
        let error = DomainError::NonPositivePaymentAmount { amount: Decimal::ZERO };
        assert!(error.to_string().contains('0'));
    }
}
