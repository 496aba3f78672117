use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::info;

use custodian_core::domain::customer::{Customer, CustomerSegment};
use custodian_core::domain::invoice::{Invoice, InvoiceStatus};
use custodian_store::{CustomerRepository, InvoiceRepository};

use crate::error::ServiceError;

/// Collection-risk ladder derived from invoice status and how far past (or
/// close to) the due date it is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RiskLevel {
    /// Settled or cancelled; nothing to collect.
    None,
    Normal,
    /// Due within the next seven days.
    Watch,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Normal => "NORMAL",
            Self::Watch => "WATCH",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

/// Everything the analysis capability reports about one invoice, plus the
/// customer's invoice history for context.
#[derive(Clone, Debug)]
pub struct InvoiceAnalysis {
    pub invoice: Invoice,
    pub customer: Option<Customer>,
    pub risk: RiskLevel,
    pub days_overdue: i64,
    pub days_until_due: i64,
    pub paid_percentage: Decimal,
    pub recommendations: Vec<String>,
    pub customer_invoice_count: u64,
    pub customer_total_paid: Decimal,
    pub customer_outstanding: Decimal,
}

impl InvoiceAnalysis {
    pub fn to_report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Invoice {} for customer {}",
            self.invoice.invoice_number, self.invoice.customer_code
        );
        if let Some(customer) = &self.customer {
            let _ = writeln!(
                out,
                "Customer: {} ({} segment)",
                customer.company_name,
                customer.segment.label()
            );
        }
        let _ = writeln!(out, "Status: {}", self.invoice.status.label());
        let _ = writeln!(
            out,
            "Amounts: total {:.2}, paid {:.2} ({:.0}%), remaining {:.2}",
            self.invoice.total_amount,
            self.invoice.paid_amount,
            self.paid_percentage,
            self.invoice.remaining_amount
        );
        let _ = writeln!(
            out,
            "Dates: issued {}, due {}",
            self.invoice.issue_date, self.invoice.due_date
        );
        if self.days_overdue > 0 {
            let _ = writeln!(out, "Overdue by {} days", self.days_overdue);
        }
        let _ = writeln!(out, "Risk level: {}", self.risk.label());
        let _ = writeln!(
            out,
            "Customer history: {} invoices, {:.2} paid, {:.2} outstanding",
            self.customer_invoice_count, self.customer_total_paid, self.customer_outstanding
        );
        let _ = writeln!(out, "Recommendations:");
        for recommendation in &self.recommendations {
            let _ = writeln!(out, "- {recommendation}");
        }
        out
    }
}

pub struct InvoiceService {
    invoices: Arc<dyn InvoiceRepository>,
    customers: Arc<dyn CustomerRepository>,
}

impl InvoiceService {
    pub fn new(
        invoices: Arc<dyn InvoiceRepository>,
        customers: Arc<dyn CustomerRepository>,
    ) -> Self {
        Self { invoices, customers }
    }

    pub async fn find_by_number(
        &self,
        invoice_number: &str,
    ) -> Result<Option<Invoice>, ServiceError> {
        Ok(self.invoices.find_by_number(invoice_number).await?)
    }

    pub async fn analyze(
        &self,
        invoice_number: &str,
    ) -> Result<Option<InvoiceAnalysis>, ServiceError> {
        let Some(invoice) = self.invoices.find_by_number(invoice_number).await? else {
            return Ok(None);
        };
        let customer = self.customers.find_by_code(&invoice.customer_code).await?;

        let today = Utc::now().date_naive();
        let risk = risk_level(&invoice, today);
        let days_overdue = invoice.days_overdue(today);
        let days_until_due = invoice.days_until_due(today);
        let recommendations = recommendations(
            &invoice,
            risk,
            days_until_due,
            customer.as_ref().map(|customer| customer.segment),
        );

        Ok(Some(InvoiceAnalysis {
            paid_percentage: paid_percentage(&invoice),
            risk,
            days_overdue,
            days_until_due,
            recommendations,
            customer_invoice_count: self
                .invoices
                .count_for_customer(&invoice.customer_code)
                .await?,
            customer_total_paid: self
                .invoices
                .total_paid_for_customer(&invoice.customer_code)
                .await?,
            customer_outstanding: self
                .invoices
                .total_outstanding_for_customer(&invoice.customer_code)
                .await?,
            customer,
            invoice,
        }))
    }

    pub async fn record_payment(
        &self,
        invoice_number: &str,
        amount: Decimal,
        payment_reference: &str,
    ) -> Result<Invoice, ServiceError> {
        let mut invoice = self
            .invoices
            .find_by_number(invoice_number)
            .await?
            .ok_or_else(|| ServiceError::InvoiceNotFound(invoice_number.to_owned()))?;
        invoice.record_payment(amount, payment_reference, Utc::now().date_naive())?;
        self.invoices.save(invoice.clone()).await?;
        info!(
            invoice_number,
            amount = %amount,
            status = invoice.status.label(),
            "payment recorded"
        );
        Ok(invoice)
    }
}

pub fn risk_level(invoice: &Invoice, today: NaiveDate) -> RiskLevel {
    if matches!(invoice.status, InvoiceStatus::Paid | InvoiceStatus::Cancelled) {
        return RiskLevel::None;
    }
    let overdue = invoice.days_overdue(today);
    if overdue > 90 {
        RiskLevel::Critical
    } else if overdue > 60 {
        RiskLevel::High
    } else if overdue > 30 {
        RiskLevel::Medium
    } else if overdue > 0 {
        RiskLevel::Low
    } else if invoice.days_until_due(today) <= 7 {
        RiskLevel::Watch
    } else {
        RiskLevel::Normal
    }
}

fn paid_percentage(invoice: &Invoice) -> Decimal {
    if invoice.total_amount <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    invoice.paid_amount * Decimal::from(100) / invoice.total_amount
}

fn recommendations(
    invoice: &Invoice,
    risk: RiskLevel,
    days_until_due: i64,
    segment: Option<CustomerSegment>,
) -> Vec<String> {
    let mut out = Vec::new();

    match invoice.status {
        InvoiceStatus::Paid => {
            out.push("No action required - the invoice is settled.".to_string());
            return out;
        }
        InvoiceStatus::Cancelled => {
            out.push(
                "Invoice is cancelled - check whether a replacement invoice is needed.".to_string(),
            );
            return out;
        }
        InvoiceStatus::Disputed => {
            out.push(
                "Resolve the open dispute with the customer before chasing payment.".to_string(),
            );
        }
        _ => {}
    }

    match risk {
        RiskLevel::Critical => {
            out.push(
                "Escalate to collections and review the customer's credit terms.".to_string(),
            );
        }
        RiskLevel::High => {
            out.push("Send a formal payment demand and hold new orders.".to_string());
        }
        RiskLevel::Medium => {
            out.push("Send a payment reminder referencing the overdue balance.".to_string());
        }
        RiskLevel::Low => {
            out.push("Send a courtesy reminder - the invoice is recently past due.".to_string());
        }
        RiskLevel::Watch => {
            out.push(format!(
                "Due in {days_until_due} days - a proactive reminder avoids late payment."
            ));
        }
        RiskLevel::Normal | RiskLevel::None => {
            out.push("No immediate action needed - monitor until the due date.".to_string());
        }
    }

    if invoice.status == InvoiceStatus::PartiallyPaid {
        out.push(format!(
            "Follow up on the remaining balance of {:.2}.",
            invoice.remaining_amount
        ));
    }

    if let Some(segment) = segment {
        if segment.is_priority() {
            out.push(format!(
                "Priority customer ({}) - coordinate with the account manager before escalating.",
                segment.label()
            ));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, Utc};
    use rust_decimal::Decimal;

    use custodian_core::domain::customer::CustomerSegment;
    use custodian_core::domain::invoice::{Invoice, InvoiceStatus};

    use super::{recommendations, risk_level, RiskLevel};

    fn invoice(status: InvoiceStatus, due: NaiveDate) -> Invoice {
        Invoice {
            invoice_number: "INV-1".to_string(),
            order_number: None,
            customer_code: "CUST-1".to_string(),
            status,
            total_amount: Decimal::new(100_000, 2),
            paid_amount: Decimal::ZERO,
            remaining_amount: Decimal::new(100_000, 2),
            issue_date: due - Duration::days(30),
            due_date: due,
            paid_date: None,
            notes: None,
        }
    }

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn ladder_tracks_days_overdue() {
        let today = date(2026, 6, 1);
        let cases = [
            (date(2026, 2, 1), RiskLevel::Critical), // 120 days
            (date(2026, 3, 20), RiskLevel::High),    // 73 days
            (date(2026, 4, 20), RiskLevel::Medium),  // 42 days
            (date(2026, 5, 20), RiskLevel::Low),     // 12 days
            (date(2026, 6, 5), RiskLevel::Watch),    // due in 4 days
            (date(2026, 8, 1), RiskLevel::Normal),
        ];
        for (due, expected) in cases {
            assert_eq!(risk_level(&invoice(InvoiceStatus::Sent, due), today), expected);
        }
    }

    #[test]
    fn settled_invoices_carry_no_risk() {
        let today = Utc::now().date_naive();
        let long_past = date(2020, 1, 1);
        assert_eq!(risk_level(&invoice(InvoiceStatus::Paid, long_past), today), RiskLevel::None);
        assert_eq!(
            risk_level(&invoice(InvoiceStatus::Cancelled, long_past), today),
            RiskLevel::None
        );
    }

    #[test]
    fn paid_invoice_needs_no_action() {
        let recs = recommendations(
            &invoice(InvoiceStatus::Paid, date(2026, 1, 1)),
            RiskLevel::None,
            0,
            None,
        );
        assert_eq!(recs.len(), 1);
        assert!(recs[0].contains("settled"));
    }

    #[test]
    fn critical_overdue_escalates_to_collections() {
        let recs = recommendations(
            &invoice(InvoiceStatus::Overdue, date(2026, 1, 1)),
            RiskLevel::Critical,
            -120,
            None,
        );
        assert!(recs.iter().any(|rec| rec.contains("collections")));
    }

    #[test]
    fn priority_segment_adds_account_manager_note() {
        let mut partial = invoice(InvoiceStatus::PartiallyPaid, date(2026, 1, 1));
        partial.paid_amount = Decimal::new(40_000, 2);
        partial.remaining_amount = Decimal::new(60_000, 2);

        let recs =
            recommendations(&partial, RiskLevel::Medium, -40, Some(CustomerSegment::Enterprise));
        assert!(recs.iter().any(|rec| rec.contains("remaining balance of 600.00")));
        assert!(recs.iter().any(|rec| rec.contains("ENTERPRISE")));
    }

    #[test]
    fn disputed_invoice_leads_with_the_dispute() {
        let recs = recommendations(
            &invoice(InvoiceStatus::Disputed, date(2026, 1, 1)),
            RiskLevel::High,
            -70,
            None,
        );
        assert!(recs[0].contains("dispute"));
        assert!(recs.len() >= 2);
    }
}
