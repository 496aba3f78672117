use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerStatus {
    Active,
    Inactive,
    Suspended,
    Prospect,
}

impl CustomerStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
            Self::Suspended => "SUSPENDED",
            Self::Prospect => "PROSPECT",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerSegment {
    Standard,
    Premium,
    Vip,
    Enterprise,
}

impl CustomerSegment {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Standard => "STANDARD",
            Self::Premium => "PREMIUM",
            Self::Vip => "VIP",
            Self::Enterprise => "ENTERPRISE",
        }
    }

    /// Priority segments get personalized handling in recommendations.
    pub fn is_priority(&self) -> bool {
        matches!(self, Self::Vip | Self::Enterprise)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_code: String,
    pub company_name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub status: CustomerStatus,
    pub segment: CustomerSegment,
    pub credit_limit: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    pub fn is_active(&self) -> bool {
        self.status == CustomerStatus::Active
    }
}
