use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use custodian_core::audit::{AuditEntry, AuditTrail};
use custodian_core::capability::{Capability, CapabilityDescriptor};
use custodian_core::config::GatewayConfig;
use custodian_core::confirm::TicketIssuer;
use custodian_core::domain::invoice::InvoiceStatus;
use custodian_core::domain::order::OrderStatus;
use custodian_core::orders::CreateOrderRequest;
use custodian_core::security::SecurityContext;
use custodian_store::{
    CustomerRepository, InvoiceRepository, OrderRepository, ProductRepository,
};

use crate::error::ServiceError;
use crate::response::CapabilityResponse;
use crate::services::{format_order, CustomerService, InvoiceService, OrderService};
use crate::workflow::{ConfirmableAction, ConfirmationWorkflow};

/// Single entry point mediating every capability invocation: authorization,
/// audit, confirmation for mutations, and uniform response shaping. Typed
/// methods serve embedders; `dispatch` serves a transport handing over raw
/// parameters.
pub struct CapabilityGateway {
    audit: Arc<AuditTrail>,
    workflow: ConfirmationWorkflow,
    orders: OrderService,
    invoices: InvoiceService,
    customers: CustomerService,
    recent_entries_default: usize,
}

impl CapabilityGateway {
    pub fn new(
        config: &GatewayConfig,
        customers: Arc<dyn CustomerRepository>,
        orders: Arc<dyn OrderRepository>,
        invoices: Arc<dyn InvoiceRepository>,
        products: Arc<dyn ProductRepository>,
    ) -> Self {
        let audit = Arc::new(AuditTrail::new());
        let issuer = TicketIssuer::new(config.signing_key.clone(), config.ticket_ttl_secs);
        Self {
            workflow: ConfirmationWorkflow::new(Arc::clone(&audit), issuer),
            orders: OrderService::new(
                Arc::clone(&orders),
                Arc::clone(&customers),
                Arc::clone(&invoices),
                products,
            ),
            invoices: InvoiceService::new(Arc::clone(&invoices), Arc::clone(&customers)),
            customers: CustomerService::new(customers, orders, invoices),
            recent_entries_default: config.recent_entries_default,
            audit,
        }
    }

    /// The capabilities the bound role may legally attempt; an unbound
    /// context sees nothing.
    pub fn list_capabilities(&self, context: &SecurityContext) -> Vec<CapabilityDescriptor> {
        context
            .role
            .map(|role| {
                role.allowed_capabilities().iter().map(Capability::describe).collect()
            })
            .unwrap_or_default()
    }

    pub async fn find_order(
        &self,
        context: &SecurityContext,
        order_number: &str,
    ) -> CapabilityResponse {
        let capability = Capability::FindOrder;
        if let Err(denied) = self.guard(context, capability) {
            return denied;
        }
        let params = string_params(&[("orderNumber", order_number)]);
        let correlation_id = self.audit.start_call(context, capability, &params);

        match self.orders.find_by_number(order_number).await {
            Ok(Some(order)) => {
                self.audit.complete_call(
                    &correlation_id,
                    capability,
                    format!("Order {} found", order.order_number),
                );
                CapabilityResponse::success(format_order(&order), Some(correlation_id))
            }
            Ok(None) => self.not_found(
                &correlation_id,
                capability,
                format!("Order not found: {order_number}"),
            ),
            Err(error) => self.internal_error(&correlation_id, capability, error),
        }
    }

    pub async fn analyze_invoice(
        &self,
        context: &SecurityContext,
        invoice_number: &str,
    ) -> CapabilityResponse {
        let capability = Capability::AnalyzeInvoice;
        if let Err(denied) = self.guard(context, capability) {
            return denied;
        }
        let params = string_params(&[("invoiceNumber", invoice_number)]);
        let correlation_id = self.audit.start_call(context, capability, &params);

        match self.invoices.analyze(invoice_number).await {
            Ok(Some(analysis)) => {
                self.audit.complete_call(
                    &correlation_id,
                    capability,
                    format!(
                        "Invoice {} analyzed, risk {}",
                        analysis.invoice.invoice_number,
                        analysis.risk.label()
                    ),
                );
                CapabilityResponse::success(analysis.to_report(), Some(correlation_id))
            }
            Ok(None) => self.not_found(
                &correlation_id,
                capability,
                format!("Invoice not found: {invoice_number}"),
            ),
            Err(error) => self.internal_error(&correlation_id, capability, error),
        }
    }

    pub async fn summarize_customer_activity(
        &self,
        context: &SecurityContext,
        customer_code: &str,
    ) -> CapabilityResponse {
        let capability = Capability::SummarizeCustomerActivity;
        if let Err(denied) = self.guard(context, capability) {
            return denied;
        }
        let params = string_params(&[("customerCode", customer_code)]);
        let correlation_id = self.audit.start_call(context, capability, &params);

        match self.customers.summarize_activity(customer_code).await {
            Ok(Some(summary)) => {
                self.audit.complete_call(
                    &correlation_id,
                    capability,
                    format!("Activity summarized for customer {customer_code}"),
                );
                CapabilityResponse::success(summary.to_summary(), Some(correlation_id))
            }
            Ok(None) => self.not_found(
                &correlation_id,
                capability,
                format!("Customer not found: {customer_code}"),
            ),
            Err(error) => self.internal_error(&correlation_id, capability, error),
        }
    }

    pub async fn create_order(
        &self,
        context: &SecurityContext,
        request: CreateOrderRequest,
        confirmed: bool,
        ticket: Option<&str>,
    ) -> CapabilityResponse {
        let capability = Capability::CreateOrder;
        if let Err(denied) = self.guard(context, capability) {
            return denied;
        }
        let action = CreateOrderAction {
            service: &self.orders,
            request,
            created_by: context.actor_name.clone(),
        };
        self.workflow.execute(context, &action, confirmed, ticket).await
    }

    pub async fn validate_order(
        &self,
        context: &SecurityContext,
        order_number: &str,
        confirmed: bool,
        ticket: Option<&str>,
    ) -> CapabilityResponse {
        let capability = Capability::ValidateOrder;
        if let Err(denied) = self.guard(context, capability) {
            return denied;
        }
        let action =
            ValidateOrderAction { service: &self.orders, order_number: order_number.to_owned() };
        self.workflow.execute(context, &action, confirmed, ticket).await
    }

    pub async fn cancel_order(
        &self,
        context: &SecurityContext,
        order_number: &str,
        reason: &str,
        confirmed: bool,
        ticket: Option<&str>,
    ) -> CapabilityResponse {
        let capability = Capability::CancelOrder;
        if let Err(denied) = self.guard(context, capability) {
            return denied;
        }
        let action = CancelOrderAction {
            service: &self.orders,
            order_number: order_number.to_owned(),
            reason: reason.to_owned(),
            actor: context.actor_name.clone(),
        };
        self.workflow.execute(context, &action, confirmed, ticket).await
    }

    pub async fn record_payment(
        &self,
        context: &SecurityContext,
        invoice_number: &str,
        amount: Decimal,
        payment_reference: &str,
        confirmed: bool,
        ticket: Option<&str>,
    ) -> CapabilityResponse {
        let capability = Capability::RecordPayment;
        if let Err(denied) = self.guard(context, capability) {
            return denied;
        }
        let action = RecordPaymentAction {
            service: &self.invoices,
            invoice_number: invoice_number.to_owned(),
            amount,
            payment_reference: payment_reference.to_owned(),
        };
        self.workflow.execute(context, &action, confirmed, ticket).await
    }

    /// Transport-facing entry point: resolves the capability by wire name,
    /// parses parameters, and delegates to the typed methods. Parameter
    /// parse failures never reach the audit trail; the call did not start.
    pub async fn dispatch(
        &self,
        context: &SecurityContext,
        capability_name: &str,
        params: &BTreeMap<String, Value>,
        confirmed: bool,
        ticket: Option<&str>,
    ) -> CapabilityResponse {
        let capability = match Capability::from_name(capability_name) {
            Ok(capability) => capability,
            Err(error) => return CapabilityResponse::validation_failed(error.to_string(), None),
        };

        match capability {
            Capability::FindOrder => match required_str(params, "orderNumber") {
                Ok(order_number) => self.find_order(context, &order_number).await,
                Err(invalid) => invalid,
            },
            Capability::AnalyzeInvoice => match required_str(params, "invoiceNumber") {
                Ok(invoice_number) => self.analyze_invoice(context, &invoice_number).await,
                Err(invalid) => invalid,
            },
            Capability::SummarizeCustomerActivity => match required_str(params, "customerCode") {
                Ok(customer_code) => {
                    self.summarize_customer_activity(context, &customer_code).await
                }
                Err(invalid) => invalid,
            },
            Capability::CreateOrder => {
                let request: CreateOrderRequest =
                    match serde_json::from_value(Value::Object(to_map(params))) {
                        Ok(request) => request,
                        Err(error) => {
                            return CapabilityResponse::validation_failed(
                                format!("Invalid parameters: {error}"),
                                None,
                            )
                        }
                    };
                self.create_order(context, request, confirmed, ticket).await
            }
            Capability::ValidateOrder => match required_str(params, "orderNumber") {
                Ok(order_number) => {
                    self.validate_order(context, &order_number, confirmed, ticket).await
                }
                Err(invalid) => invalid,
            },
            Capability::CancelOrder => match required_str(params, "orderNumber") {
                Ok(order_number) => {
                    let reason = optional_str(params, "reason", "No reason given");
                    self.cancel_order(context, &order_number, &reason, confirmed, ticket).await
                }
                Err(invalid) => invalid,
            },
            Capability::RecordPayment => {
                let invoice_number = match required_str(params, "invoiceNumber") {
                    Ok(invoice_number) => invoice_number,
                    Err(invalid) => return invalid,
                };
                let reference = match required_str(params, "paymentReference") {
                    Ok(reference) => reference,
                    Err(invalid) => return invalid,
                };
                let amount: Decimal = match params
                    .get("amount")
                    .cloned()
                    .map(serde_json::from_value)
                {
                    Some(Ok(amount)) => amount,
                    _ => {
                        return CapabilityResponse::validation_failed(
                            "Missing or invalid parameter: amount",
                            None,
                        )
                    }
                };
                self.record_payment(context, &invoice_number, amount, &reference, confirmed, ticket)
                    .await
            }
        }
    }

    pub fn recent_audit_entries(&self, limit: Option<usize>) -> Vec<AuditEntry> {
        self.audit.recent_entries(limit.unwrap_or(self.recent_entries_default))
    }

    pub fn usage_statistics(&self) -> BTreeMap<String, u64> {
        self.audit.usage_statistics()
    }

    fn guard(
        &self,
        context: &SecurityContext,
        capability: Capability,
    ) -> Result<(), CapabilityResponse> {
        if context.require_capability(capability).is_ok() {
            return Ok(());
        }
        let correlation_id = self.audit.log_access_denied(context, capability);
        Err(CapabilityResponse::access_denied(
            capability.name(),
            context.role_name(),
            Some(correlation_id),
        ))
    }

    fn not_found(
        &self,
        correlation_id: &str,
        capability: Capability,
        message: String,
    ) -> CapabilityResponse {
        self.audit.complete_call(correlation_id, capability, message.clone());
        CapabilityResponse::not_found(message, Some(correlation_id.to_owned()))
    }

    fn internal_error(
        &self,
        correlation_id: &str,
        capability: Capability,
        error: ServiceError,
    ) -> CapabilityResponse {
        self.audit.fail_call(correlation_id, capability, error.to_string());
        CapabilityResponse::error(Some(correlation_id.to_owned()))
    }
}

struct CreateOrderAction<'a> {
    service: &'a OrderService,
    request: CreateOrderRequest,
    created_by: String,
}

#[async_trait]
impl ConfirmableAction for CreateOrderAction<'_> {
    fn capability(&self) -> Capability {
        Capability::CreateOrder
    }

    fn payload(&self) -> Value {
        serde_json::to_value(&self.request).unwrap_or(Value::Null)
    }

    async fn validate(&self) -> Result<Option<String>, ServiceError> {
        let result = self.service.validate_request(&self.request).await?;
        Ok(if result.valid { None } else { Some(result.to_explanation()) })
    }

    async fn summarize(&self) -> Result<String, ServiceError> {
        let resolved = self.service.resolve_request(&self.request).await?;
        let result = self.service.validate_request(&self.request).await?;

        let mut out = format!("Create an order for customer {}:\n", resolved.customer_code);
        for line in &resolved.lines {
            out.push_str(&format!(
                "  - {} x{} @ {}\n",
                line.product_code,
                line.quantity,
                line.unit_price.map_or_else(|| "?".to_string(), |price| format!("{price:.2}")),
            ));
        }
        out.push_str(&format!("Estimated total before tax: {:.2}", result.estimated_total));
        for warning in &result.warnings {
            out.push_str(&format!("\nWarning: {warning}"));
        }
        Ok(out)
    }

    async fn apply(&self) -> Result<String, ServiceError> {
        let order = self.service.create(&self.request, &self.created_by).await?;
        Ok(format!(
            "Order {} created for customer {} with total {:.2} ({} lines)",
            order.order_number,
            order.customer_code,
            order.grand_total(),
            order.lines.len()
        ))
    }
}

struct ValidateOrderAction<'a> {
    service: &'a OrderService,
    order_number: String,
}

#[async_trait]
impl ConfirmableAction for ValidateOrderAction<'_> {
    fn capability(&self) -> Capability {
        Capability::ValidateOrder
    }

    fn payload(&self) -> Value {
        json!({ "orderNumber": self.order_number })
    }

    async fn validate(&self) -> Result<Option<String>, ServiceError> {
        match self.service.find_by_number(&self.order_number).await? {
            None => Ok(Some(format!("Order not found: {}", self.order_number))),
            Some(order) if !order.status.can_transition_to(OrderStatus::Validated) => {
                Ok(Some(format!(
                    "Order {} cannot be validated from status {}",
                    order.order_number,
                    order.status.label()
                )))
            }
            Some(_) => Ok(None),
        }
    }

    async fn summarize(&self) -> Result<String, ServiceError> {
        let order = self
            .service
            .find_by_number(&self.order_number)
            .await?
            .ok_or_else(|| ServiceError::OrderNotFound(self.order_number.clone()))?;
        Ok(format!(
            "Validate order {} for customer {} (total {:.2})",
            order.order_number,
            order.customer_code,
            order.grand_total()
        ))
    }

    async fn apply(&self) -> Result<String, ServiceError> {
        let order = self.service.transition(&self.order_number, OrderStatus::Validated).await?;
        Ok(format!("Order {} validated", order.order_number))
    }
}

struct CancelOrderAction<'a> {
    service: &'a OrderService,
    order_number: String,
    reason: String,
    actor: String,
}

#[async_trait]
impl ConfirmableAction for CancelOrderAction<'_> {
    fn capability(&self) -> Capability {
        Capability::CancelOrder
    }

    fn payload(&self) -> Value {
        json!({ "orderNumber": self.order_number, "reason": self.reason })
    }

    async fn validate(&self) -> Result<Option<String>, ServiceError> {
        match self.service.find_by_number(&self.order_number).await? {
            None => Ok(Some(format!("Order not found: {}", self.order_number))),
            Some(order) if !order.status.can_transition_to(OrderStatus::Cancelled) => {
                Ok(Some(format!(
                    "Order {} cannot be cancelled from status {}",
                    order.order_number,
                    order.status.label()
                )))
            }
            Some(_) => Ok(None),
        }
    }

    async fn summarize(&self) -> Result<String, ServiceError> {
        let order = self
            .service
            .find_by_number(&self.order_number)
            .await?
            .ok_or_else(|| ServiceError::OrderNotFound(self.order_number.clone()))?;
        Ok(format!(
            "Cancel order {} for customer {} (status {}, total {:.2}). Reason: {}",
            order.order_number,
            order.customer_code,
            order.status.label(),
            order.grand_total(),
            self.reason
        ))
    }

    async fn apply(&self) -> Result<String, ServiceError> {
        let order =
            self.service.cancel(&self.order_number, &self.reason, &self.actor).await?;
        Ok(format!("Order {} cancelled. Reason: {}", order.order_number, self.reason))
    }
}

struct RecordPaymentAction<'a> {
    service: &'a InvoiceService,
    invoice_number: String,
    amount: Decimal,
    payment_reference: String,
}

#[async_trait]
impl ConfirmableAction for RecordPaymentAction<'_> {
    fn capability(&self) -> Capability {
        Capability::RecordPayment
    }

    fn payload(&self) -> Value {
        json!({
            "invoiceNumber": self.invoice_number,
            "amount": self.amount,
            "paymentReference": self.payment_reference,
        })
    }

    async fn validate(&self) -> Result<Option<String>, ServiceError> {
        if self.amount <= Decimal::ZERO {
            return Ok(Some("Payment amount must be positive".to_string()));
        }
        match self.service.find_by_number(&self.invoice_number).await? {
            None => Ok(Some(format!("Invoice not found: {}", self.invoice_number))),
            Some(invoice) if invoice.status == InvoiceStatus::Paid => {
                Ok(Some(format!("Invoice {} is already fully paid", invoice.invoice_number)))
            }
            Some(invoice) if invoice.status == InvoiceStatus::Cancelled => Ok(Some(format!(
                "Invoice {} is cancelled; payments cannot be recorded",
                invoice.invoice_number
            ))),
            Some(_) => Ok(None),
        }
    }

    async fn summarize(&self) -> Result<String, ServiceError> {
        let invoice = self
            .service
            .find_by_number(&self.invoice_number)
            .await?
            .ok_or_else(|| ServiceError::InvoiceNotFound(self.invoice_number.clone()))?;
        Ok(format!(
            "Record a payment of {:.2} on invoice {} (remaining {:.2}, ref {})",
            self.amount,
            invoice.invoice_number,
            invoice.remaining_amount,
            self.payment_reference
        ))
    }

    async fn apply(&self) -> Result<String, ServiceError> {
        let invoice = self
            .service
            .record_payment(&self.invoice_number, self.amount, &self.payment_reference)
            .await?;
        Ok(format!(
            "Payment of {:.2} recorded on invoice {}. Status: {}, remaining {:.2}",
            self.amount,
            invoice.invoice_number,
            invoice.status.label(),
            invoice.remaining_amount
        ))
    }
}

fn string_params(pairs: &[(&str, &str)]) -> BTreeMap<String, Value> {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_string(), Value::String((*value).to_string())))
        .collect()
}

fn to_map(params: &BTreeMap<String, Value>) -> serde_json::Map<String, Value> {
    params.iter().map(|(key, value)| (key.clone(), value.clone())).collect()
}

fn required_str(
    params: &BTreeMap<String, Value>,
    key: &str,
) -> Result<String, CapabilityResponse> {
    match params.get(key) {
        Some(Value::String(value)) if !value.is_empty() => Ok(value.clone()),
        _ => Err(CapabilityResponse::validation_failed(
            format!("Missing or invalid parameter: {key}"),
            None,
        )),
    }
}

fn optional_str(params: &BTreeMap<String, Value>, key: &str, default: &str) -> String {
    match params.get(key) {
        Some(Value::String(value)) if !value.is_empty() => value.clone(),
        _ => default.to_owned(),
    }
}
