use chrono::Duration;

use leadflow_core::clock::Clock;
use leadflow_crm::domain::types::{SmsMessage, SmsStatus};
use leadflow_crm::usecase::sms_dispatch::DispatchSmsUseCase;
use leadflow_domain::id::OrderId;
use leadflow_testing::clock::FixedClock;

use crate::helpers::{InMemoryCrm, MockSmsGateway, PROJECT, far_deadline};

fn pending(id: i32, phone: &str, created_at: chrono::DateTime<chrono::Utc>) -> SmsMessage {
    SmsMessage {
        id,
        project_id: PROJECT,
        order_id: Some(OrderId(id)),
        phone_number: phone.to_owned(),
        content: "Your order is on its way".to_owned(),
        status: SmsStatus::Pending,
        created_at,
    }
}

#[tokio::test]
async fn should_send_pending_sms_and_record_failures() {
    let clock = FixedClock::default();
    let now = clock.now();
    let crm = InMemoryCrm::new().with(|s| {
        s.sms = vec![
            pending(1, "+79990000001", now - Duration::minutes(2)),
            pending(2, "+79990000002", now - Duration::minutes(1)),
        ];
    });
    let store = crm.store_handle();
    let gateway = MockSmsGateway::rejecting(&["+79990000002"]);

    let usecase = DispatchSmsUseCase {
        outbox: crm.clone(),
        gateway,
        clock: clock.clone(),
        batch_size: 100,
    };
    let report = usecase.execute(far_deadline()).await.unwrap();

    assert_eq!(report.claimed, 2);
    assert_eq!(report.sent, 1);
    assert_eq!(report.failed, 1);

    let store = store.lock().unwrap();
    assert_eq!(store.sms[0].status, SmsStatus::Sent);
    assert_eq!(store.deliveries[&1].provider, "mock");
    assert_eq!(store.deliveries[&1].external_id.as_deref(), Some("ext-1"));
    assert_eq!(store.sms[1].status, SmsStatus::Failed);
    assert_eq!(store.sms_errors[&2], "number blacklisted by provider");
}

#[tokio::test]
async fn should_dispatch_oldest_first_within_batch_size() {
    let clock = FixedClock::default();
    let now = clock.now();
    let crm = InMemoryCrm::new().with(|s| {
        s.sms = vec![
            pending(1, "+79990000001", now - Duration::minutes(1)),
            pending(2, "+79990000002", now - Duration::minutes(5)),
            pending(3, "+79990000003", now - Duration::minutes(3)),
        ];
    });
    let store = crm.store_handle();
    let gateway = MockSmsGateway::default();
    let attempts = gateway.attempts_handle();

    let usecase = DispatchSmsUseCase {
        outbox: crm.clone(),
        gateway,
        clock: clock.clone(),
        batch_size: 2,
    };
    let report = usecase.execute(far_deadline()).await.unwrap();

    assert_eq!(report.claimed, 2);
    assert_eq!(*attempts.lock().unwrap(), vec![2, 3]);
    let store = store.lock().unwrap();
    assert_eq!(store.sms[0].status, SmsStatus::Pending);

    // Already-handled rows are not picked up again.
    drop(store);
    let again = usecase.execute(far_deadline()).await.unwrap();
    assert_eq!(again.claimed, 1);
    assert_eq!(*attempts.lock().unwrap(), vec![2, 3, 1]);
}

#[tokio::test]
async fn should_settle_rest_of_batch_when_one_status_write_fails() {
    let clock = FixedClock::default();
    let now = clock.now();
    let crm = InMemoryCrm::new().with(|s| {
        s.sms = vec![
            pending(1, "+79990000001", now - Duration::minutes(3)),
            pending(2, "+79990000002", now - Duration::minutes(2)),
            pending(3, "+79990000003", now - Duration::minutes(1)),
        ];
        s.unwritable_sms = vec![1];
    });
    let store = crm.store_handle();
    let gateway = MockSmsGateway::rejecting(&["+79990000003"]);
    let attempts = gateway.attempts_handle();

    let usecase = DispatchSmsUseCase {
        outbox: crm.clone(),
        gateway,
        clock: clock.clone(),
        batch_size: 100,
    };
    let report = usecase.execute(far_deadline()).await.unwrap();

    assert_eq!(report.claimed, 3);
    assert_eq!(report.sent, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.unsettled, 1);
    {
        let store = store.lock().unwrap();
        let statuses: Vec<SmsStatus> = store.sms.iter().map(|m| m.status).collect();
        assert_eq!(
            statuses,
            vec![SmsStatus::Processing, SmsStatus::Sent, SmsStatus::Failed]
        );
    }

    // The message already reached the gateway; it is not sent a second time.
    let again = usecase.execute(far_deadline()).await.unwrap();
    assert_eq!(again.claimed, 0);
    assert_eq!(*attempts.lock().unwrap(), vec![1, 2, 3]);
}
