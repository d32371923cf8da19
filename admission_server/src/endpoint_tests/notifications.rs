use std::sync::Arc;

use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use admission_engine::{
    db_types::{Cart, CartType, ProgressStatus, Transaction, TransactionStatus},
    events::{EventProducers, PushKind, PushNotification},
    notifications::{FanoutMetrics, NotificationFanout},
    test_utils::collaborators::{RecordingGateway, RecordingPusher},
    traits::StoreError,
    ProgressCoordinator,
    TransactionProcessor,
    WebhookReconciler,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};

use super::{
    helpers::{admin_token, pending_transaction, progress, push_only_fanout, school, send_request, user, user_token},
    mocks::MockStore,
};
use crate::routes::{health, NotificationStatsRoute, PaymentNotificationRoute};

type Reconciler = WebhookReconciler<MockStore, RecordingGateway, RecordingPusher>;

/// The reconciler drives two engine APIs, each with its own store handle. `transactions` serves the transaction and
/// cart calls, `progress` serves the progress and lookup calls.
fn reconciler(
    transactions: MockStore,
    progress: MockStore,
    gateway: RecordingGateway,
    pusher: RecordingPusher,
) -> Reconciler {
    let fanout = push_only_fanout(pusher);
    WebhookReconciler::new(
        TransactionProcessor::new(transactions, gateway, fanout.clone(), Duration::days(1)),
        ProgressCoordinator::new(progress, fanout.clone()),
        fanout,
    )
}

fn configure(api: Reconciler) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.service(PaymentNotificationRoute::<MockStore, RecordingGateway, RecordingPusher>::new())
            .app_data(web::Data::new(api));
    }
}

fn notification(order_id: &str, status: &str, signature: &str) -> Value {
    json!({
        "transaction_time": "2024-03-11 10:20:30",
        "transaction_status": status,
        "status_code": "200",
        "signature_key": signature,
        "payment_type": "bank_transfer",
        "order_id": order_id,
        "gross_amount": "200000.00",
        "fraud_status": "accept",
        "currency": "IDR"
    })
}

fn post_notification(body: Value) -> TestRequest {
    TestRequest::post().uri("/notif").set_json(body)
}

#[actix_web::test]
async fn settlement_pays_and_advances_the_application() {
    let _ = env_logger::try_init();
    let mut transactions = MockStore::new();
    transactions
        .expect_fetch_transaction()
        .returning(|invoice| Ok(Some(pending_transaction(invoice.as_str(), 7, 3, 200_000))));
    transactions
        .expect_settle_transaction()
        .withf(|_, status| *status == TransactionStatus::Paid)
        .times(1)
        .returning(|invoice, status| Ok(Transaction { status, ..pending_transaction(invoice.as_str(), 7, 3, 200_000) }));
    transactions.expect_fetch_cart().returning(|user_id, school_id| {
        Ok(Some(Cart { id: 4, user_id, school_id, cart_type: CartType::Registration, created_at: Utc::now(), deleted_at: None }))
    });
    transactions.expect_close_cart().times(1).returning(|_, _| Ok(true));
    let mut progresses = MockStore::new();
    progresses
        .expect_advance_progress_for_participant()
        .withf(|user_id, school_id, status, cart| {
            (*user_id, *school_id, *status) == (7, 3, ProgressStatus::DonePayment) && cart.is_none()
        })
        .times(1)
        .returning(|user_id, school_id, status, _| Ok(progress(21, user_id, school_id, status)));
    progresses.expect_fetch_user().returning(|id| Ok(Some(user(id))));
    progresses.expect_fetch_school().returning(|id| Ok(Some(school(id))));
    let pusher = RecordingPusher::default();
    let api = reconciler(transactions, progresses, RecordingGateway::default(), pusher.clone());

    let (status, body) = send_request(post_notification(notification("INV-731234", "settlement", "")), "", configure(api)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Notification received");
    assert_eq!(body["data"]["invoice"], "INV-731234");
    assert_eq!(body["data"]["action"], "paid");
    assert_eq!(body["data"]["issues"], json!([]));
    assert_eq!(pusher.sent(), vec![PushNotification::payment_success("applicant7", "SMA 3")]);
    assert_eq!(pusher.sent()[0].kind, PushKind::Payment);
}

#[actix_web::test]
async fn expiry_cascade_survives_a_failed_transaction_update() {
    let _ = env_logger::try_init();
    let mut transactions = MockStore::new();
    transactions
        .expect_fetch_transaction()
        .returning(|invoice| Ok(Some(pending_transaction(invoice.as_str(), 7, 3, 200_000))));
    transactions
        .expect_settle_transaction()
        .times(1)
        .returning(|_, _| Err(StoreError::DatabaseError("database is locked".into())));
    transactions.expect_close_cart().times(1).returning(|_, _| Ok(true));
    let mut progresses = MockStore::new();
    progresses
        .expect_advance_progress_for_participant()
        .withf(|user_id, school_id, status, _| (*user_id, *school_id, *status) == (7, 3, ProgressStatus::Failed))
        .times(1)
        .returning(|user_id, school_id, status, _| Ok(progress(21, user_id, school_id, status)));
    progresses.expect_fetch_user().returning(|id| Ok(Some(user(id))));
    progresses.expect_fetch_school().returning(|id| Ok(Some(school(id))));
    let pusher = RecordingPusher::default();
    let api = reconciler(transactions, progresses, RecordingGateway::default(), pusher.clone());

    let req = post_notification(notification("INV-7-3-100001", "expire", ""));
    let (status, body) = send_request(req, "", configure(api)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["action"], "cancelled");
    let issues = body["data"]["issues"].as_array().unwrap();
    assert_eq!(issues.len(), 1);
    assert!(issues[0].as_str().unwrap().starts_with("Transaction update failed"), "{issues:?}");
    assert_eq!(pusher.sent(), vec![PushNotification::payment_cancelled("applicant7", "SMA 3")]);
}

#[actix_web::test]
async fn expiry_without_an_open_cart_leaves_progress_alone() {
    let _ = env_logger::try_init();
    let mut transactions = MockStore::new();
    transactions
        .expect_fetch_transaction()
        .returning(|invoice| Ok(Some(pending_transaction(invoice.as_str(), 7, 3, 200_000))));
    transactions
        .expect_settle_transaction()
        .times(1)
        .returning(|invoice, status| Ok(Transaction { status, ..pending_transaction(invoice.as_str(), 7, 3, 200_000) }));
    transactions.expect_close_cart().times(1).returning(|_, _| Ok(false));
    let mut progresses = MockStore::new();
    progresses.expect_advance_progress_for_participant().never();
    progresses.expect_fetch_user().returning(|id| Ok(Some(user(id))));
    progresses.expect_fetch_school().returning(|id| Ok(Some(school(id))));
    let pusher = RecordingPusher::default();
    let api = reconciler(transactions, progresses, RecordingGateway::default(), pusher.clone());

    let req = post_notification(notification("INV-7-3-100001", "expire", ""));
    let (status, body) = send_request(req, "", configure(api)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["action"], "cancelled");
    assert_eq!(body["data"]["issues"], json!([]));
    assert_eq!(pusher.sent().len(), 1);
}

#[actix_web::test]
async fn bad_signatures_are_acknowledged_and_ignored() {
    let _ = env_logger::try_init();
    let gateway = RecordingGateway::default().with_signature("expected-signature");
    let api = reconciler(MockStore::new(), MockStore::new(), gateway, RecordingPusher::default());
    let req = post_notification(notification("INV-731234", "settlement", "forged"));
    let (status, body) = send_request(req, "", configure(api)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["action"], "rejected");
    assert_eq!(body["data"]["detail"], "Invalid signature");
}

#[actix_web::test]
async fn unknown_invoices_are_acknowledged() {
    let _ = env_logger::try_init();
    let mut transactions = MockStore::new();
    transactions.expect_fetch_transaction().returning(|_| Ok(None));
    let api = reconciler(transactions, MockStore::new(), RecordingGateway::default(), RecordingPusher::default());
    let req = post_notification(notification("INV-999", "expire", ""));
    let (status, body) = send_request(req, "", configure(api)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["action"], "rejected");
}

#[actix_web::test]
async fn informational_statuses_change_nothing() {
    let _ = env_logger::try_init();
    let api = reconciler(MockStore::new(), MockStore::new(), RecordingGateway::default(), RecordingPusher::default());
    let req = post_notification(notification("INV-731234", "pending", ""));
    let (status, body) = send_request(req, "", configure(api)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["action"], "ignored");
}

#[actix_web::test]
async fn malformed_notifications_still_get_ok() {
    let _ = env_logger::try_init();
    let api = reconciler(MockStore::new(), MockStore::new(), RecordingGateway::default(), RecordingPusher::default());
    let req = TestRequest::post().uri("/notif").set_payload("this is not json");
    let (status, body) = send_request(req, "", configure(api)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"code": 200, "message": "Notification ignored", "data": null}));
}

#[actix_web::test]
async fn delivery_stats_are_for_admins() {
    let _ = env_logger::try_init();
    let metrics = Arc::new(FanoutMetrics::default());
    let fanout = NotificationFanout::new(RecordingPusher::default(), EventProducers::default(), Arc::clone(&metrics));
    fanout.push(PushNotification::payment_success("applicant7", "SMA 3")).await;
    let failing = NotificationFanout::new(RecordingPusher::failing(), EventProducers::default(), Arc::clone(&metrics));
    failing.push(PushNotification::payment_cancelled("applicant7", "SMA 3")).await;

    let configure = |metrics: Arc<FanoutMetrics>| {
        move |cfg: &mut ServiceConfig| {
            cfg.service(NotificationStatsRoute::new()).app_data(web::Data::from(metrics));
        }
    };
    let req = || TestRequest::get().uri("/notifications/stats");
    let (status, body) = send_request(req(), &admin_token(1), configure(Arc::clone(&metrics))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!({"published": 0, "retried": 0, "failed": 0, "dropped": 0, "pushed": 1, "push_failed": 1})
    );

    let (status, _) = send_request(req(), &user_token(7), configure(Arc::clone(&metrics))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn health_check() {
    let (status, body) = send_request(TestRequest::get().uri("/health"), "", |cfg: &mut ServiceConfig| {
        cfg.service(health);
    })
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!("👍️\n"));
}
