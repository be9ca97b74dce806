//! Seed helpers for action tests
//!
//! Rows are written straight through storage so each test starts from the
//! exact state it needs, without running the commands that would build it.

use crate::market::storage::{
    FreightStorage, CARGO_ID_KEY, CONTAINER_CARGO_ID_KEY, CONTAINER_NO_KEY, OFFER_ID_KEY,
    REQUEST_ID_KEY,
};
use crate::market::traits::CommandMetadata;
use chrono::NaiveDate;
use redb::WriteTransaction;
use rust_decimal::Decimal;
use shared::models::{
    Cargo, CargoSource, Container, ContainerCargo, ContainerSize, ContainerStatus, Offer,
    OfferStatus, Request, RequestStatus, Route,
};

pub const SHIPPER: i64 = 1;
pub const FORWARDER_A: i64 = 2;
pub const FORWARDER_B: i64 = 3;
pub const FORWARDER_C: i64 = 4;

pub const NOW: i64 = 1_700_000_000_000;
pub const DEADLINE: i64 = NOW + 86_400_000;

pub fn metadata(actor_id: i64) -> CommandMetadata {
    CommandMetadata {
        command_id: uuid::Uuid::new_v4().to_string(),
        actor_id,
        timestamp: NOW,
    }
}

pub fn route() -> Route {
    Route::new("Busan", "Rotterdam")
}

pub fn seed_container(
    storage: &FreightStorage,
    txn: &WriteTransaction,
    forwarder_id: i64,
    status: ContainerStatus,
) -> Container {
    let seq = storage.next_id(txn, CONTAINER_NO_KEY).unwrap() as u64;
    let container = Container {
        id: shared::util::container_number(seq),
        forwarder_id,
        route: route(),
        etd: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        eta: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
        size: ContainerSize::TwentyFoot,
        capacity_cbm: ContainerSize::TwentyFoot.capacity_cbm(),
        imo_number: None,
        status,
        created_at: NOW,
    };
    storage.put_container_txn(txn, &container).unwrap();
    container
}

/// Original request with its own cargo
pub fn seed_request(
    storage: &FreightStorage,
    txn: &WriteTransaction,
    owner_id: i64,
    cbm: i64,
) -> Request {
    let cargo = Cargo {
        id: storage.next_id(txn, CARGO_ID_KEY).unwrap(),
        owner_id,
        item_name: "Machine parts".to_string(),
        incoterms: "FOB".to_string(),
        total_cbm: Decimal::from(cbm),
        is_dangerous: false,
        created_at: NOW,
    };
    storage.put_cargo_txn(txn, &cargo).unwrap();

    let request = Request {
        id: storage.next_id(txn, REQUEST_ID_KEY).unwrap(),
        cargo_id: cargo.id,
        requester_id: owner_id,
        route: route(),
        deadline: DEADLINE,
        desired_arrival_date: None,
        trade_type: "EXPORT".to_string(),
        transport_type: "LCL".to_string(),
        status: RequestStatus::Open,
        source_offer_id: None,
        created_at: NOW,
    };
    storage.put_request_txn(txn, &request).unwrap();
    request
}

/// Resale request relisting `source`, owned by its forwarder
pub fn seed_resale(
    storage: &FreightStorage,
    txn: &WriteTransaction,
    parent: &Request,
    source: &Offer,
) -> Request {
    let request = Request {
        id: storage.next_id(txn, REQUEST_ID_KEY).unwrap(),
        requester_id: source.forwarder_id,
        source_offer_id: Some(source.id),
        status: RequestStatus::Open,
        ..parent.clone()
    };
    storage.put_request_txn(txn, &request).unwrap();
    request
}

pub fn seed_offer(
    storage: &FreightStorage,
    txn: &WriteTransaction,
    request: &Request,
    container: &Container,
    status: OfferStatus,
) -> Offer {
    let offer = Offer {
        id: storage.next_id(txn, OFFER_ID_KEY).unwrap(),
        request_id: request.id,
        container_id: container.id.clone(),
        forwarder_id: container.forwarder_id,
        price: Decimal::from(1200),
        currency: "USD".to_string(),
        status,
        created_at: NOW,
    };
    storage.put_offer_txn(txn, &offer).unwrap();
    offer
}

/// Platform loaded-cargo row for a won offer
pub fn seed_platform_row(
    storage: &FreightStorage,
    txn: &WriteTransaction,
    offer: &Offer,
    cbm: i64,
) -> ContainerCargo {
    let row = ContainerCargo {
        id: storage.next_id(txn, CONTAINER_CARGO_ID_KEY).unwrap(),
        container_id: offer.container_id.clone(),
        source: CargoSource::Platform { offer_id: offer.id },
        cbm_loaded: Decimal::from(cbm),
        freight_cost: Some(offer.price),
        freight_currency: Some(offer.currency.clone()),
        added_at: NOW,
    };
    storage.put_container_cargo_txn(txn, &row).unwrap();
    row
}

pub fn seed_external_row(
    storage: &FreightStorage,
    txn: &WriteTransaction,
    container: &Container,
    cbm: i64,
) -> ContainerCargo {
    let row = ContainerCargo {
        id: storage.next_id(txn, CONTAINER_CARGO_ID_KEY).unwrap(),
        container_id: container.id.clone(),
        source: CargoSource::External {
            name: "Walk-in pallets".to_string(),
        },
        cbm_loaded: Decimal::from(cbm),
        freight_cost: Some(Decimal::from(300)),
        freight_currency: Some("EUR".to_string()),
        added_at: NOW,
    };
    storage.put_container_cargo_txn(txn, &row).unwrap();
    row
}
