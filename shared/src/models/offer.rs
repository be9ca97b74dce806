//! Offer (bid) Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Offer status
///
/// Happy path: `Pending -> Accepted -> Confirmed -> Shipped -> Completed`.
/// Reselling branches off `Accepted` into `ForSale`, which either returns to
/// `Accepted` (resale cancelled/expired) or ends in `Resold`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferStatus {
    Pending,
    Accepted,
    Rejected,
    ForSale,
    Resold,
    Confirmed,
    Shipped,
    Completed,
}

impl OfferStatus {
    /// The winner of a request is its only offer outside `Pending`/`Rejected`
    pub fn is_winning(&self) -> bool {
        !matches!(self, OfferStatus::Pending | OfferStatus::Rejected)
    }

    /// Statuses whose volume counts as booked on the container
    pub fn is_booked(&self) -> bool {
        matches!(
            self,
            OfferStatus::Accepted
                | OfferStatus::Confirmed
                | OfferStatus::Shipped
                | OfferStatus::Completed
        )
    }
}

impl std::fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OfferStatus::Pending => "PENDING",
            OfferStatus::Accepted => "ACCEPTED",
            OfferStatus::Rejected => "REJECTED",
            OfferStatus::ForSale => "FOR_SALE",
            OfferStatus::Resold => "RESOLD",
            OfferStatus::Confirmed => "CONFIRMED",
            OfferStatus::Shipped => "SHIPPED",
            OfferStatus::Completed => "COMPLETED",
        };
        f.write_str(s)
    }
}

/// Offer entity (报价)
///
/// A forwarder's bid against one request using space in one of its own
/// containers. The volume it occupies is the request cargo's `total_cbm`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Offer {
    pub id: i64,
    pub request_id: i64,
    pub container_id: String,
    pub forwarder_id: i64,
    pub price: Decimal,
    /// Opaque currency tag, never converted
    pub currency: String,
    pub status: OfferStatus,
    pub created_at: i64,
}

/// Create offer payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferCreate {
    pub request_id: i64,
    pub container_id: String,
    pub price: Decimal,
    pub currency: String,
}
