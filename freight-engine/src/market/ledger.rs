//! Capacity ledger
//!
//! Container capacity is never stored as a running total. Every figure here is
//! recomputed from the live offers and loaded-cargo rows that reference the
//! container, inside whatever transaction asks for it.
//!
//! | Figure | Source |
//! |--------|--------|
//! | consumed_confirmed | offers in ACCEPTED/CONFIRMED/SHIPPED/COMPLETED + external rows |
//! | consumed_resale | offers in FOR_SALE |
//! | consumed_bidding | PENDING offers whose request deadline has not passed |
//! | available | capacity - all three |

use super::storage::{MarketReader, StorageResult};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::models::{Container, ContainerStatus, OfferStatus};

/// Volume an offer puts on its container
#[derive(Debug, Clone, PartialEq)]
pub struct OfferLoad {
    pub offer_id: i64,
    pub status: OfferStatus,
    /// Cargo volume of the offer's request
    pub cbm: Decimal,
    /// Bidding deadline of the offer's request
    pub deadline: i64,
}

/// Derived accounting for one container
#[derive(Debug, Clone)]
pub struct CapacityLedger {
    capacity: Decimal,
    offers: Vec<OfferLoad>,
    external: Vec<Decimal>,
}

/// Ledger figures as exposed to callers
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CapacitySummary {
    pub container_id: String,
    pub status: ContainerStatus,
    pub capacity: Decimal,
    pub consumed_confirmed: Decimal,
    pub consumed_resale: Decimal,
    pub consumed_bidding: Decimal,
    pub available: Decimal,
    pub deletable: bool,
    pub confirmable: bool,
}

impl CapacityLedger {
    pub fn new(capacity: Decimal) -> Self {
        Self {
            capacity,
            offers: Vec::new(),
            external: Vec::new(),
        }
    }

    pub fn push_offer(&mut self, load: OfferLoad) {
        self.offers.push(load);
    }

    pub fn push_external(&mut self, cbm: Decimal) {
        self.external.push(cbm);
    }

    /// Build the ledger of a container from current state
    pub fn load<R: MarketReader + ?Sized>(reader: &R, container: &Container) -> StorageResult<Self> {
        let mut ledger = Self::new(container.capacity_cbm);

        for offer in reader.offers_for_container(&container.id)? {
            // Rejected offers hold nothing; skip the lookups
            if offer.status == OfferStatus::Rejected {
                continue;
            }
            let Some(request) = reader.get_request(offer.request_id)? else {
                tracing::warn!(offer_id = offer.id, request_id = offer.request_id, "Offer references missing request");
                continue;
            };
            let Some(cargo) = reader.get_cargo(request.cargo_id)? else {
                tracing::warn!(request_id = request.id, cargo_id = request.cargo_id, "Request references missing cargo");
                continue;
            };
            ledger.push_offer(OfferLoad {
                offer_id: offer.id,
                status: offer.status,
                cbm: cargo.total_cbm,
                deadline: request.deadline,
            });
        }

        for row in reader.cargo_rows_for_container(&container.id)? {
            if row.is_external() {
                ledger.push_external(row.cbm_loaded);
            }
        }

        Ok(ledger)
    }

    pub fn capacity(&self) -> Decimal {
        self.capacity
    }

    pub fn consumed_confirmed(&self) -> Decimal {
        let booked: Decimal = self
            .offers
            .iter()
            .filter(|o| o.status.is_booked())
            .map(|o| o.cbm)
            .sum();
        booked + self.external.iter().copied().sum::<Decimal>()
    }

    pub fn consumed_resale(&self) -> Decimal {
        self.offers
            .iter()
            .filter(|o| o.status == OfferStatus::ForSale)
            .map(|o| o.cbm)
            .sum()
    }

    /// PENDING volume still holding space at `now`; a lapsed deadline frees it
    pub fn consumed_bidding(&self, now: i64) -> Decimal {
        self.offers
            .iter()
            .filter(|o| o.status == OfferStatus::Pending && o.deadline > now)
            .map(|o| o.cbm)
            .sum()
    }

    pub fn available(&self, now: i64) -> Decimal {
        self.capacity
            - self.consumed_confirmed()
            - self.consumed_resale()
            - self.consumed_bidding(now)
    }

    /// Whether `cbm` more fits at `now`
    pub fn fits(&self, cbm: Decimal, now: i64) -> bool {
        cbm <= self.available(now)
    }

    /// The same ledger with one offer's volume taken out
    pub fn excluding(&self, offer_id: i64) -> Self {
        Self {
            capacity: self.capacity,
            offers: self
                .offers
                .iter()
                .filter(|o| o.offer_id != offer_id)
                .cloned()
                .collect(),
            external: self.external.clone(),
        }
    }

    pub fn is_deletable(&self, now: i64) -> bool {
        self.consumed_confirmed().is_zero()
            && self.consumed_resale().is_zero()
            && self.consumed_bidding(now).is_zero()
    }

    /// First offer still in PENDING or FOR_SALE, lapsed bids included
    pub fn contested_offer(&self) -> Option<&OfferLoad> {
        self.offers
            .iter()
            .find(|o| matches!(o.status, OfferStatus::Pending | OfferStatus::ForSale))
    }

    /// Why a container in `status` cannot be confirmed, `None` if it can
    pub fn confirm_blocker(&self, status: ContainerStatus) -> Option<String> {
        if status != ContainerStatus::Scheduled {
            return Some(format!("is {status}, not SCHEDULED"));
        }
        if let Some(open) = self.contested_offer() {
            return Some(format!("still has offer {} in {}", open.offer_id, open.status));
        }
        if self.consumed_confirmed() <= Decimal::ZERO {
            return Some("has no cargo loaded".to_string());
        }
        None
    }

    /// Nothing contested and something to ship
    pub fn is_confirmable(&self, status: ContainerStatus) -> bool {
        self.confirm_blocker(status).is_none()
    }

    pub fn summary(&self, container: &Container, now: i64) -> CapacitySummary {
        CapacitySummary {
            container_id: container.id.clone(),
            status: container.status,
            capacity: self.capacity,
            consumed_confirmed: self.consumed_confirmed(),
            consumed_resale: self.consumed_resale(),
            consumed_bidding: self.consumed_bidding(now),
            available: self.available(now),
            deletable: self.is_deletable(now),
            confirmable: self.is_confirmable(container.status),
        }
    }
}
