//! Container Model

use super::request::Route;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Container status (strictly linear, no skipping, no reversal)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerStatus {
    Scheduled,
    Confirmed,
    Shipped,
    Completed,
    Settled,
}

impl ContainerStatus {
    /// The status a milestone transition from `self` leads to
    pub fn next(&self) -> Option<ContainerStatus> {
        match self {
            ContainerStatus::Scheduled => Some(ContainerStatus::Confirmed),
            ContainerStatus::Confirmed => Some(ContainerStatus::Shipped),
            ContainerStatus::Shipped => Some(ContainerStatus::Completed),
            ContainerStatus::Completed => Some(ContainerStatus::Settled),
            ContainerStatus::Settled => None,
        }
    }

    /// Settled containers are hidden from active listings
    pub fn is_active(&self) -> bool {
        *self != ContainerStatus::Settled
    }
}

impl std::fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ContainerStatus::Scheduled => "SCHEDULED",
            ContainerStatus::Confirmed => "CONFIRMED",
            ContainerStatus::Shipped => "SHIPPED",
            ContainerStatus::Completed => "COMPLETED",
            ContainerStatus::Settled => "SETTLED",
        };
        f.write_str(s)
    }
}

/// Standard container sizes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ContainerSize {
    #[serde(rename = "20ft")]
    TwentyFoot,
    #[serde(rename = "40ft")]
    FortyFoot,
}

impl ContainerSize {
    /// Parse the size label used by clients ("20ft" / "40ft")
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim() {
            "20ft" => Some(ContainerSize::TwentyFoot),
            "40ft" => Some(ContainerSize::FortyFoot),
            _ => None,
        }
    }

    /// Usable capacity in CBM
    pub fn capacity_cbm(&self) -> Decimal {
        match self {
            ContainerSize::TwentyFoot => Decimal::from(26),
            ContainerSize::FortyFoot => Decimal::from(55),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ContainerSize::TwentyFoot => "20ft",
            ContainerSize::FortyFoot => "40ft",
        }
    }
}

/// Container entity (集装箱)
///
/// Consumed capacity is never stored here; it is derived from the offers and
/// loaded-cargo rows that reference the container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Container {
    /// Container number, e.g. `SEAU0000042`
    pub id: String,
    pub forwarder_id: i64,
    #[serde(flatten)]
    pub route: Route,
    pub etd: NaiveDate,
    pub eta: NaiveDate,
    pub size: ContainerSize,
    pub capacity_cbm: Decimal,
    /// Vessel IMO number, recorded at confirmation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imo_number: Option<String>,
    pub status: ContainerStatus,
    pub created_at: i64,
}

/// Create container payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerCreate {
    /// "20ft" or "40ft"
    pub size: String,
    #[serde(flatten)]
    pub route: Route,
    pub etd: NaiveDate,
    pub eta: NaiveDate,
}
