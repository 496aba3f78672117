use thiserror::Error;

use custodian_core::errors::DomainError;
use custodian_store::RepositoryError;

/// Failures crossing the service boundary. Not-found cases are ordinary
/// outcomes for lookups and are modelled as `Option` there; the variants here
/// cover mutations that name an entity which must exist.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("order not found: {0}")]
    OrderNotFound(String),
    #[error("invoice not found: {0}")]
    InvoiceNotFound(String),
    #[error("customer not found: {0}")]
    CustomerNotFound(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
