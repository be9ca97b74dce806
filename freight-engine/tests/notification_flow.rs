//! 事件 → 路由 → 通知工作者 → 连接注册表

use chrono::NaiveDate;
use freight_engine::notify::NotificationKind;
use freight_engine::{Config, EngineState, FreightManager};
use rust_decimal::Decimal;
use shared::models::{CargoCreate, ContainerCreate, RequestCreate, Route};
use shared::util::now_millis;
use std::time::Duration;

const SHIPPER: i64 = 1;
const FORWARDER: i64 = 2;

#[tokio::test]
async fn test_bid_and_confirmation_reach_connected_users() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::with_work_dir(dir.path().to_string_lossy());
    let manager = FreightManager::new(config.db_path(), 64, 64).unwrap();
    let state = EngineState::with_manager(config, manager);

    let mut shipper_rx = state.registry.connect(SHIPPER);
    let mut forwarder_rx = state.registry.connect(FORWARDER);
    let tasks = state.start_background_tasks();

    let route = Route::new("Busan", "Long Beach");
    let request_id = state
        .manager
        .create_request(
            SHIPPER,
            RequestCreate {
                cargo: CargoCreate {
                    item_name: "Tyres".to_string(),
                    incoterms: "EXW".to_string(),
                    total_cbm: Decimal::from(8),
                    is_dangerous: false,
                },
                route: route.clone(),
                deadline: now_millis() + 86_400_000,
                desired_arrival_date: None,
                trade_type: "EXPORT".to_string(),
                transport_type: "LCL".to_string(),
            },
        )
        .unwrap();
    let container_id = state
        .manager
        .create_container(
            FORWARDER,
            ContainerCreate {
                size: "20ft".to_string(),
                route,
                etd: NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
                eta: NaiveDate::from_ymd_opt(2026, 12, 20).unwrap(),
            },
        )
        .unwrap();
    let offer_id = state
        .manager
        .create_offer(FORWARDER, request_id, &container_id, Decimal::from(900), "USD")
        .unwrap();

    let new_offer = tokio::time::timeout(Duration::from_secs(5), shipper_rx.recv())
        .await
        .expect("no notification for the shipper")
        .unwrap();
    assert_eq!(new_offer.kind, NotificationKind::NewOffer);
    assert_eq!(new_offer.link, format!("/requests/{request_id}"));

    state.manager.confirm_offer(SHIPPER, request_id, offer_id).unwrap();
    let accepted = tokio::time::timeout(Duration::from_secs(5), forwarder_rx.recv())
        .await
        .expect("no notification for the forwarder")
        .unwrap();
    assert_eq!(accepted.kind, NotificationKind::OfferAccepted);
    assert_eq!(accepted.recipient, FORWARDER);

    tokio::time::timeout(Duration::from_secs(5), tasks.shutdown())
        .await
        .expect("background tasks did not stop");
}
