use super::*;


#[test]
fn test_sweep_reverts_expired_resale() {
    let manager = create_test_manager();
    let (r1, offer_a, container_a) = won_request(&manager, 10);
    let r2 = manager.resell(FWD_A, offer_a).unwrap();
    let container_c = open_container(&manager, FWD_C);
    let pending = bid(&manager, FWD_C, r2, &container_c);

    let later = now_millis() + 2 * DAY_MS;
    let report = manager.expire_resales(later).unwrap();
    assert_eq!(report.reverted, 1);
    assert_eq!(report.failed, 0);

    assert_eq!(offer_status(&manager, offer_a), OfferStatus::Accepted);
    assert_eq!(offer_status(&manager, pending), OfferStatus::Rejected);
    assert!(!manager.get_request(r2).unwrap().unwrap().is_open());
    assert_eq!(manager.find_final_offer(r1).unwrap().map(|o| o.id), Some(offer_a));

    let summary = manager.container_capacity(&container_a, later).unwrap();
    assert_eq!(summary.consumed_resale, Decimal::ZERO);
    assert_eq!(summary.consumed_confirmed, Decimal::from(10));

    // Nothing left to do on the next tick
    let again = manager.expire_resales(later).unwrap();
    assert_eq!(again, ExpiryReport::default());
}


#[test]
fn test_sweep_leaves_live_resales_and_originals() {
    let manager = create_test_manager();
    let (_, offer_a, _) = won_request(&manager, 10);
    let r2 = manager.resell(FWD_A, offer_a).unwrap();
    // An original nobody bid on
    let lonely = open_request(&manager, SHIPPER, 3);

    // Before the deadline: no-op
    let report = manager.expire_resales(now_millis()).unwrap();
    assert_eq!(report.reverted, 0);
    assert_eq!(report.stale_originals, 0);
    assert!(manager.get_request(r2).unwrap().unwrap().is_open());

    let later = now_millis() + 2 * DAY_MS;
    let report = manager.expire_resales(later).unwrap();
    assert_eq!(report.reverted, 1);
    assert_eq!(report.stale_originals, 1);

    // Expired originals are reported, not closed
    let stale = manager.stale_original_requests(later).unwrap();
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].id, lonely);
    assert!(manager.get_request(lonely).unwrap().unwrap().is_open());
}


#[test]
fn test_expiry_loses_race_cleanly() {
    let manager = create_test_manager();
    let (_, offer_a, _) = won_request(&manager, 10);
    let r2 = manager.resell(FWD_A, offer_a).unwrap();
    let container_c = open_container(&manager, FWD_C);
    let offer_c = bid(&manager, FWD_C, r2, &container_c);

    // Reseller confirms first
    manager.confirm_bid(FWD_A, r2, offer_c).unwrap();

    // A sweep that read R2 as OPEN before that commit
    let stale_sweep = FreightCommand {
        command_id: format!("expire-resale-{r2}"),
        actor_id: SYSTEM_ACTOR_ID,
        timestamp: now_millis() + 2 * DAY_MS,
        payload: FreightCommandPayload::ExpireResale { request_id: r2 },
    };
    let response = manager.execute_command(stale_sweep);
    assert!(!response.success);
    assert_eq!(response.error.unwrap().code, CommandErrorCode::AlreadyClosed);

    assert_eq!(offer_status(&manager, offer_a), OfferStatus::Resold);
    assert_eq!(offer_status(&manager, offer_c), OfferStatus::Accepted);
}


#[test]
fn test_expired_bids_stop_holding_space() {
    let manager = create_test_manager();
    let request_id = open_request(&manager, SHIPPER, 20);
    let container_a = open_container(&manager, FWD_A);
    bid(&manager, FWD_A, request_id, &container_a);

    let before_deadline = manager.container_capacity(&container_a, now_millis()).unwrap();
    assert_eq!(before_deadline.consumed_bidding, Decimal::from(20));

    let after_deadline = manager
        .container_capacity(&container_a, now_millis() + 2 * DAY_MS)
        .unwrap();
    assert_eq!(after_deadline.consumed_bidding, Decimal::ZERO);
    assert_eq!(after_deadline.available, Decimal::from(26));
}
