use chrono::Duration;

use leadflow_core::clock::Clock;
use leadflow_crm::config::ShippingConfig;
use leadflow_crm::usecase::shipping::ProgressShippedOrdersUseCase;
use leadflow_domain::id::{OrderId, StatusId};
use leadflow_domain::status::StatusGroup;
use leadflow_testing::clock::FixedClock;

use crate::helpers::{
    InMemoryCrm, OTHER_PROJECT, PAID, PROJECT, SHIPPED, default_statuses, far_deadline, order,
    status,
};

fn progression(
    crm: &InMemoryCrm,
    clock: &FixedClock,
) -> ProgressShippedOrdersUseCase<InMemoryCrm, InMemoryCrm, FixedClock> {
    ProgressShippedOrdersUseCase {
        orders: crm.clone(),
        statuses: crm.clone(),
        clock: clock.clone(),
        config: ShippingConfig::default(),
    }
}

fn shipped(id: i32, days_ago: i64, tracking: Option<&str>) -> leadflow_crm::domain::types::Order {
    let shipped_at = FixedClock::default_instant() - Duration::days(days_ago);
    let mut o = order(id, SHIPPED, shipped_at - Duration::days(1));
    o.status_updated_at = shipped_at;
    o.shipped_at = Some(shipped_at);
    o.tracking_number = tracking.map(str::to_owned);
    o
}

#[tokio::test]
async fn should_mark_orders_in_transit_long_enough_as_delivered() {
    let clock = FixedClock::default();
    let now = clock.now();
    let crm = InMemoryCrm::new().with(|s| {
        s.statuses = default_statuses();
        // A second paid status further down the list is never chosen.
        s.statuses
            .push(status(StatusId(9), PROJECT, "Paid late", StatusGroup::Paid));
        s.orders.push(shipped(1, 4, Some("RA123456789RU")));
    });
    let store = crm.store_handle();

    let report = progression(&crm, &clock).execute(far_deadline()).await.unwrap();

    assert_eq!(report.delivered, 1);
    let store = store.lock().unwrap();
    let order = store.order(OrderId(1));
    assert_eq!(order.status_id, PAID);
    assert_eq!(order.status_updated_at, now);
    assert_eq!(order.shipped_at, Some(now - Duration::days(4)));

    let entry = &store.history_for(OrderId(1))[0];
    assert_eq!(entry.action, "status_updated_by_shipping");
    assert_eq!(entry.old_value.as_deref(), Some("3"));
    assert_eq!(entry.new_value.as_deref(), Some("4"));
    assert_eq!(entry.comment.as_deref(), Some("Delivered: tracking RA123456789RU"));
}

#[tokio::test]
async fn should_leave_recent_stale_and_untracked_shipments_alone() {
    let clock = FixedClock::default();
    let crm = InMemoryCrm::new().with(|s| {
        s.statuses = default_statuses();
        s.orders.extend([
            shipped(1, 2, Some("RA1")),
            shipped(2, 40, Some("RA2")),
            shipped(3, 5, None),
            shipped(4, 5, Some("")),
        ]);
    });
    let store = crm.store_handle();

    let report = progression(&crm, &clock).execute(far_deadline()).await.unwrap();

    assert_eq!(report.candidates, 0);
    let store = store.lock().unwrap();
    assert!(store.orders.iter().all(|o| o.status_id == SHIPPED));
    assert!(store.history.is_empty());
}

#[tokio::test]
async fn should_skip_projects_without_a_paid_status() {
    let clock = FixedClock::default();
    let crm = InMemoryCrm::new().with(|s| {
        s.statuses = vec![status(
            StatusId(30),
            OTHER_PROJECT,
            "Shipped",
            StatusGroup::Shipped,
        )];
        let mut o = shipped(1, 4, Some("RA9"));
        o.project_id = OTHER_PROJECT;
        o.status_id = StatusId(30);
        s.orders.push(o);
    });
    let store = crm.store_handle();

    let report = progression(&crm, &clock).execute(far_deadline()).await.unwrap();

    assert_eq!(report.candidates, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.delivered, 0);
    assert_eq!(store.lock().unwrap().order(OrderId(1)).status_id, StatusId(30));
}
