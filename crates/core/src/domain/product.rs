use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCategory {
    Software,
    Hardware,
    Service,
    Subscription,
    Accessory,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductStatus {
    Active,
    Inactive,
    Discontinued,
}

/// Catalog entry. The catalog is the authoritative price source when the
/// confirmation workflow re-prices a pending order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_code: String,
    pub name: String,
    pub description: Option<String>,
    pub category: ProductCategory,
    pub unit_price: Decimal,
    pub stock_quantity: Option<u32>,
    pub status: ProductStatus,
}
