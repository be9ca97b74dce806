//! Market events - immutable facts recorded after command processing

use crate::models::{ContainerStatus, Route};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Market event - immutable audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketEvent {
    /// Event unique ID
    pub event_id: String,
    /// Global sequence number (ordering and replay)
    pub sequence: u64,
    /// ID of the entity this event is about (request, offer or container)
    pub aggregate_id: String,
    /// Server timestamp (Unix milliseconds)
    pub timestamp: i64,
    /// Command timestamp, preserved for audit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_timestamp: Option<i64>,
    /// Caller that triggered this event
    pub actor_id: i64,
    /// Command that triggered this event
    pub command_id: String,
    pub event_type: MarketEventType,
    pub payload: EventPayload,
}

impl MarketEvent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sequence: u64,
        aggregate_id: impl Into<String>,
        actor_id: i64,
        command_id: impl Into<String>,
        client_timestamp: Option<i64>,
        event_type: MarketEventType,
        payload: EventPayload,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            sequence,
            aggregate_id: aggregate_id.into(),
            timestamp: crate::util::now_millis(),
            client_timestamp,
            actor_id,
            command_id: command_id.into(),
            event_type,
            payload,
        }
    }
}

/// Event type enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketEventType {
    // Requests
    RequestCreated,
    ResaleListed,
    ResaleCancelled,

    // Offers
    OfferCreated,
    OfferConfirmed,
    OfferPriceUpdated,
    OfferWithdrawn,

    // Containers
    ContainerCreated,
    ContainerStatusChanged,
    ContainerDeleted,
    ExternalCargoAdded,
    ExternalCargoRemoved,
}

impl std::fmt::Display for MarketEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarketEventType::RequestCreated => write!(f, "REQUEST_CREATED"),
            MarketEventType::ResaleListed => write!(f, "RESALE_LISTED"),
            MarketEventType::ResaleCancelled => write!(f, "RESALE_CANCELLED"),
            MarketEventType::OfferCreated => write!(f, "OFFER_CREATED"),
            MarketEventType::OfferConfirmed => write!(f, "OFFER_CONFIRMED"),
            MarketEventType::OfferPriceUpdated => write!(f, "OFFER_PRICE_UPDATED"),
            MarketEventType::OfferWithdrawn => write!(f, "OFFER_WITHDRAWN"),
            MarketEventType::ContainerCreated => write!(f, "CONTAINER_CREATED"),
            MarketEventType::ContainerStatusChanged => write!(f, "CONTAINER_STATUS_CHANGED"),
            MarketEventType::ContainerDeleted => write!(f, "CONTAINER_DELETED"),
            MarketEventType::ExternalCargoAdded => write!(f, "EXTERNAL_CARGO_ADDED"),
            MarketEventType::ExternalCargoRemoved => write!(f, "EXTERNAL_CARGO_REMOVED"),
        }
    }
}

/// Per-offer outcome of a confirmation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OfferOutcome {
    pub offer_id: i64,
    pub forwarder_id: i64,
    pub accepted: bool,
}

/// Event payload variants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    // ========== Requests ==========
    RequestCreated {
        request_id: i64,
        cargo_id: i64,
        requester_id: i64,
        route: Route,
        deadline: i64,
    },

    /// A won offer was relisted as a new resale request
    ResaleListed {
        request_id: i64,
        source_offer_id: i64,
        reseller_id: i64,
    },

    /// Resale withdrawn by the reseller, or reverted by the expiry sweep
    ResaleCancelled {
        request_id: i64,
        source_offer_id: i64,
        rejected: Vec<OfferOutcome>,
        expired: bool,
    },

    // ========== Offers ==========
    OfferCreated {
        offer_id: i64,
        request_id: i64,
        container_id: String,
        forwarder_id: i64,
        /// Current owner of the request (shipper or reseller)
        request_owner_id: i64,
        price: Decimal,
        currency: String,
        /// Bids on the request including this one
        bid_count: usize,
    },

    /// Winner picked; one outcome per offer on the request
    OfferConfirmed {
        request_id: i64,
        request_owner_id: i64,
        winner: OfferOutcome,
        outcomes: Vec<OfferOutcome>,
        /// Source offer that became RESOLD (resale confirmation only)
        #[serde(skip_serializing_if = "Option::is_none")]
        resold_offer_id: Option<i64>,
    },

    OfferPriceUpdated {
        offer_id: i64,
        request_id: i64,
        request_owner_id: i64,
        price: Decimal,
        currency: String,
    },

    OfferWithdrawn {
        offer_id: i64,
        request_id: i64,
        request_owner_id: i64,
    },

    // ========== Containers ==========
    ContainerCreated {
        container_id: String,
        forwarder_id: i64,
        route: Route,
        capacity_cbm: Decimal,
    },

    /// Milestone transition with its cascade already applied
    ContainerStatusChanged {
        container_id: String,
        status: ContainerStatus,
        message: String,
        /// Offers moved by the cascade
        cascaded_offer_ids: Vec<i64>,
        /// Cargo owners and resellers along each chain, minus the container forwarder
        recipients: Vec<i64>,
        /// Chat rooms (keyed by offer) to close on settlement
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        closed_chat_offers: Vec<i64>,
    },

    ContainerDeleted {
        container_id: String,
        deleted_offer_ids: Vec<i64>,
        detached_request_ids: Vec<i64>,
    },

    ExternalCargoAdded {
        container_id: String,
        cargo_id: i64,
        name: String,
        cbm: Decimal,
    },

    ExternalCargoRemoved {
        container_id: String,
        cargo_id: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_display_matches_serde() {
        for event_type in [
            MarketEventType::OfferConfirmed,
            MarketEventType::ContainerStatusChanged,
            MarketEventType::ResaleCancelled,
        ] {
            let json = serde_json::to_string(&event_type).unwrap();
            assert_eq!(json, format!("\"{}\"", event_type));
        }
    }

    #[test]
    fn test_payload_tag() {
        let payload = EventPayload::OfferWithdrawn {
            offer_id: 3,
            request_id: 1,
            request_owner_id: 10,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "OFFER_WITHDRAWN");

        let back: EventPayload = serde_json::from_value(json).unwrap();
        assert!(matches!(back, EventPayload::OfferWithdrawn { offer_id: 3, .. }));
    }

    #[test]
    fn test_status_change_omits_empty_chat_list() {
        let payload = EventPayload::ContainerStatusChanged {
            container_id: "SEAU0000001".into(),
            status: ContainerStatus::Shipped,
            message: "shipped".into(),
            cascaded_offer_ids: vec![1],
            recipients: vec![7],
            closed_chat_offers: vec![],
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("closed_chat_offers").is_none());
        assert_eq!(json["status"], "SHIPPED");
    }
}
