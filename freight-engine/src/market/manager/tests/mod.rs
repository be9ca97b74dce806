use super::*;
use chrono::NaiveDate;
use shared::freight::{CommandErrorCode, MarketEventType};
use shared::models::{CargoCreate, OfferStatus, Route};
use shared::util::now_millis;

const SHIPPER: i64 = 1;
const FWD_A: i64 = 2;
const FWD_B: i64 = 3;
const FWD_C: i64 = 4;

const DAY_MS: i64 = 86_400_000;

fn create_test_manager() -> FreightManager {
    let storage = FreightStorage::open_in_memory().unwrap();
    FreightManager::with_storage(storage)
}

fn busan_rotterdam() -> Route {
    Route::new("Busan", "Rotterdam")
}

fn request_input(cbm: Decimal, deadline: i64) -> RequestCreate {
    RequestCreate {
        cargo: CargoCreate {
            item_name: "Auto parts".to_string(),
            incoterms: "FOB".to_string(),
            total_cbm: cbm,
            is_dangerous: false,
        },
        route: busan_rotterdam(),
        deadline,
        desired_arrival_date: None,
        trade_type: "EXPORT".to_string(),
        transport_type: "LCL".to_string(),
    }
}

fn container_input(size: &str) -> ContainerCreate {
    ContainerCreate {
        size: size.to_string(),
        route: busan_rotterdam(),
        etd: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
        eta: NaiveDate::from_ymd_opt(2026, 12, 10).unwrap(),
    }
}

// ========================================================================
// Helpers
// ========================================================================

/// Open an original request closing one day from now
fn open_request(manager: &FreightManager, owner: i64, cbm: i64) -> i64 {
    manager
        .create_request(owner, request_input(Decimal::from(cbm), now_millis() + DAY_MS))
        .expect("create request")
}

/// Register a 20ft (26 CBM) container on the Busan → Rotterdam lane
fn open_container(manager: &FreightManager, forwarder: i64) -> String {
    manager
        .create_container(forwarder, container_input("20ft"))
        .expect("create container")
}

fn bid(manager: &FreightManager, forwarder: i64, request_id: i64, container_id: &str) -> i64 {
    manager
        .create_offer(forwarder, request_id, container_id, Decimal::from(1000), "USD")
        .expect("create offer")
}

fn offer_status(manager: &FreightManager, offer_id: i64) -> OfferStatus {
    manager.get_offer(offer_id).unwrap().unwrap().status
}

fn available(manager: &FreightManager, container_id: &str) -> Decimal {
    manager
        .container_capacity(container_id, now_millis())
        .unwrap()
        .available
}

fn market_error(result: ManagerResult<impl std::fmt::Debug>) -> MarketError {
    match result {
        Err(ManagerError::Market(err)) => err,
        other => panic!("expected market error, got {other:?}"),
    }
}

/// Shipper's request won by FWD_A, with a losing bid from FWD_B
///
/// Returns (request_id, offer_a, container_a).
fn won_request(manager: &FreightManager, cbm: i64) -> (i64, i64, String) {
    let request_id = open_request(manager, SHIPPER, cbm);
    let container_a = open_container(manager, FWD_A);
    let container_b = open_container(manager, FWD_B);
    let offer_a = bid(manager, FWD_A, request_id, &container_a);
    bid(manager, FWD_B, request_id, &container_b);
    manager.confirm_offer(SHIPPER, request_id, offer_a).unwrap();
    (request_id, offer_a, container_a)
}

mod test_expiry;
