use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceStatus {
    Draft,
    Issued,
    Sent,
    PartiallyPaid,
    Paid,
    Overdue,
    Cancelled,
    Disputed,
}

impl InvoiceStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Issued => "ISSUED",
            Self::Sent => "SENT",
            Self::PartiallyPaid => "PARTIALLY_PAID",
            Self::Paid => "PAID",
            Self::Overdue => "OVERDUE",
            Self::Cancelled => "CANCELLED",
            Self::Disputed => "DISPUTED",
        }
    }

    /// Outstanding invoices count toward a customer's credit exposure.
    pub fn is_outstanding(&self) -> bool {
        !matches!(self, Self::Paid | Self::Cancelled)
    }
}

/// An invoice references at most one order and is created independently of
/// the order lifecycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_number: String,
    pub order_number: Option<String>,
    pub customer_code: String,
    pub status: InvoiceStatus,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub remaining_amount: Decimal,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub paid_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl Invoice {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status != InvoiceStatus::Paid && today > self.due_date
    }

    pub fn days_overdue(&self, today: NaiveDate) -> i64 {
        if !self.is_overdue(today) {
            return 0;
        }
        (today - self.due_date).num_days()
    }

    pub fn days_until_due(&self, today: NaiveDate) -> i64 {
        (self.due_date - today).num_days()
    }

    /// Applies a payment: updates the paid/remaining amounts, flips the
    /// status to `Paid` (stamping the paid date) or `PartiallyPaid`, and
    /// appends a note carrying the payment reference.
    pub fn record_payment(
        &mut self,
        amount: Decimal,
        payment_reference: &str,
        today: NaiveDate,
    ) -> Result<(), DomainError> {
        if self.status == InvoiceStatus::Paid {
            return Err(DomainError::InvoiceAlreadyPaid {
                invoice_number: self.invoice_number.clone(),
            });
        }
        if self.status == InvoiceStatus::Cancelled {
            return Err(DomainError::PaymentOnCancelledInvoice {
                invoice_number: self.invoice_number.clone(),
            });
        }
        if amount <= Decimal::ZERO {
            return Err(DomainError::NonPositivePaymentAmount { amount });
        }

        self.paid_amount += amount;
        self.remaining_amount = self.total_amount - self.paid_amount;

        if self.remaining_amount <= Decimal::ZERO {
            self.status = InvoiceStatus::Paid;
            self.paid_date = Some(today);
        } else {
            self.status = InvoiceStatus::PartiallyPaid;
        }

        let note = format!("Payment of {amount:.2} received on {today} (ref: {payment_reference})");
        match &mut self.notes {
            Some(notes) => {
                notes.push('\n');
                notes.push_str(&note);
            }
            None => self.notes = Some(note),
        }

        Ok(())
    }
}
