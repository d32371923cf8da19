use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use admission_engine::{
    db_types::{Cart, CartType, CartWithSchool, NewTransaction, Transaction, TransactionStatus},
    events::Topic,
    test_utils::collaborators::{recording_fanout, RecordingBroker, RecordingGateway, RecordingPusher},
    traits::{GatewayError, StoreError},
    TransactionProcessor,
};
use chrono::{Duration, Utc};
use serde_json::json;

use super::{
    helpers::{pending_transaction, push_only_fanout, send_request, user, user_token},
    mocks::MockStore,
};
use crate::routes::{CheckoutRoute, MyCartsRoute, TransactionDetailRoute};

type Processor = TransactionProcessor<MockStore, RecordingGateway, RecordingPusher>;

fn configure(api: Processor) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.service(CheckoutRoute::<MockStore, RecordingGateway, RecordingPusher>::new())
            .service(MyCartsRoute::<MockStore, RecordingGateway, RecordingPusher>::new())
            .service(TransactionDetailRoute::<MockStore, RecordingGateway, RecordingPusher>::new())
            .app_data(web::Data::new(api));
    }
}

fn processor(store: MockStore, gateway: RecordingGateway) -> Processor {
    TransactionProcessor::new(store, gateway, push_only_fanout(RecordingPusher::default()), Duration::days(1))
}

fn checkout_request(cart_type: &str, method: &str) -> TestRequest {
    TestRequest::post()
        .uri("/transactions/checkout")
        .set_json(json!({"school_id": 3, "type": cart_type, "payment_method": method}))
}

fn stored(new: NewTransaction) -> Transaction {
    let now = Utc::now();
    Transaction {
        invoice: new.invoice,
        user_id: new.user_id,
        school_id: new.school_id,
        total: new.total,
        payment_code: new.payment_code,
        payment_method: new.payment_method,
        expire_at: new.expire_at,
        status: TransactionStatus::Pending,
        created_at: now,
        updated_at: now,
        items: Vec::new(),
    }
}

fn cart(cart_type: CartType) -> Cart {
    Cart { id: 1, user_id: 7, school_id: 3, cart_type, created_at: Utc::now(), deleted_at: None }
}

/// A store where user 7 has an open cart of `cart_type` at school 3 and nothing pending.
fn store_with_cart(cart_type: CartType) -> MockStore {
    let mut store = MockStore::new();
    store.expect_fetch_cart().returning(move |_, _| Ok(Some(cart(cart_type))));
    store.expect_fetch_pending_transaction().returning(|_, _| Ok(None));
    store
}

#[actix_web::test]
async fn registration_checkout() {
    let _ = env_logger::try_init();
    let mut store = store_with_cart(CartType::Registration);
    store.expect_insert_transaction().times(1).returning(|new| {
        assert!(new.payment_code.is_empty());
        Ok(stored(new))
    });
    store.expect_record_charge().times(1).returning(|invoice, code, expire_at| {
        Ok(Transaction { payment_code: code.to_string(), expire_at, ..pending_transaction(invoice.as_str(), 7, 3, 200_000) })
    });
    store.expect_discard_transaction().never();
    store.expect_fetch_user().returning(|id| Ok(Some(user(id))));
    let gateway = RecordingGateway::default();
    let broker = RecordingBroker::default();
    let (fanout, handlers) = recording_fanout(broker.clone(), RecordingPusher::default());
    handlers.start_handlers().await;
    let api = TransactionProcessor::new(store, gateway.clone(), fanout, Duration::days(1));

    let (status, body) = send_request(checkout_request("registration", " BCA "), &user_token(7), configure(api)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["code"], 201);
    assert_eq!(body["message"], "Status Created");
    let invoice = body["data"]["invoice"].as_str().unwrap().to_string();
    assert!(invoice.starts_with("INV-7-3-"), "{invoice}");
    assert_eq!(body["data"]["payment_method"], "bca");
    assert_eq!(body["data"]["total"], 200_000);
    assert_eq!(body["data"]["payment_code"], format!("8808{}", invoice.trim_start_matches("INV-").replace('-', "")));
    assert!(body["data"]["expire_date"].is_string());

    let charges = gateway.charges();
    assert_eq!(charges.len(), 1);
    assert_eq!(charges[0].items.len(), 1);
    assert_eq!(charges[0].items[0].item_name, "First Registration");
    assert_eq!(charges[0].payment_method, "bca");

    let messages = broker.wait_for(1).await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, Topic::CheckoutCreated);
    assert_eq!(messages[0].1["invoice"], invoice.as_str());
    assert_eq!(messages[0].1["email"], "applicant7@example.com");
}

#[actix_web::test]
async fn unknown_cart_types_are_rejected() {
    let _ = env_logger::try_init();
    let gateway = RecordingGateway::default();
    let api = processor(MockStore::new(), gateway.clone());
    let (status, body) = send_request(checkout_request("donation", "bca"), &user_token(7), configure(api)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid Request Body. type must be registration or herregistration");
    assert!(gateway.charges().is_empty());
}

#[actix_web::test]
async fn her_registration_needs_payment_plans() {
    let _ = env_logger::try_init();
    let mut store = store_with_cart(CartType::HerRegistration);
    store.expect_fetch_school_payments().returning(|_| Ok(Vec::new()));
    let gateway = RecordingGateway::default();
    let api = processor(store, gateway.clone());
    let (status, body) = send_request(checkout_request("herregistration", "gopay"), &user_token(7), configure(api)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "School 3 has no payment plans to check out");
    assert!(gateway.charges().is_empty());
}

#[actix_web::test]
async fn unsupported_payment_methods_are_client_errors() {
    let _ = env_logger::try_init();
    let mut store = store_with_cart(CartType::Registration);
    store.expect_insert_transaction().returning(|new| Ok(stored(new)));
    store.expect_discard_transaction().times(1).returning(|_| Ok(true));
    let gateway = RecordingGateway::failing(GatewayError::UnsupportedMethod("cash".into()));
    let (status, body) =
        send_request(checkout_request("registration", "cash"), &user_token(7), configure(processor(store, gateway))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Payment method cash is not supported");
}

#[actix_web::test]
async fn gateway_outages_are_server_errors() {
    let _ = env_logger::try_init();
    let mut store = store_with_cart(CartType::Registration);
    store.expect_insert_transaction().times(1).returning(|new| Ok(stored(new)));
    store.expect_discard_transaction().times(1).returning(|_| Ok(true));
    store.expect_record_charge().never();
    let gateway = RecordingGateway::failing(GatewayError::Unavailable("connection refused".into()));
    let (status, body) =
        send_request(checkout_request("registration", "bca"), &user_token(7), configure(processor(store, gateway))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], 500);
    assert!(!body["message"].as_str().unwrap().contains("refused"));
}

#[actix_web::test]
async fn checkout_needs_a_matching_open_cart() {
    let _ = env_logger::try_init();
    let mut store = MockStore::new();
    store.expect_fetch_cart().returning(|_, _| Ok(None));
    store.expect_insert_transaction().never();
    let gateway = RecordingGateway::default();
    let api = processor(store, gateway.clone());
    let (status, body) = send_request(checkout_request("herregistration", "bca"), &user_token(7), configure(api)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User 7 has no open herregistration cart at school 3");

    let mut store = store_with_cart(CartType::Registration);
    store.expect_insert_transaction().never();
    let api = processor(store, gateway.clone());
    let (status, body) = send_request(checkout_request("herregistration", "bca"), &user_token(7), configure(api)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "The open cart for user 7 at school 3 is registration, not herregistration");
    assert!(gateway.charges().is_empty());
}

#[actix_web::test]
async fn one_pending_transaction_per_school() {
    let _ = env_logger::try_init();
    let mut store = MockStore::new();
    store.expect_fetch_cart().returning(|_, _| Ok(Some(cart(CartType::Registration))));
    store.expect_fetch_pending_transaction().returning(|_, _| Ok(Some(pending_transaction("INV-7-3-100001", 7, 3, 200_000))));
    store.expect_insert_transaction().never();
    let gateway = RecordingGateway::default();
    let api = processor(store, gateway.clone());
    let (status, body) = send_request(checkout_request("registration", "bca"), &user_token(7), configure(api)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User 7 already has a pending transaction at school 3");
    assert!(gateway.charges().is_empty());
}

#[actix_web::test]
async fn taken_invoices_are_retried_before_charging() {
    let _ = env_logger::try_init();
    let mut store = store_with_cart(CartType::Registration);
    let mut seq = mockall::Sequence::new();
    store
        .expect_insert_transaction()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|new| Err(StoreError::InvoiceAlreadyExists(new.invoice)));
    store.expect_insert_transaction().times(1).in_sequence(&mut seq).returning(|new| Ok(stored(new)));
    store.expect_record_charge().times(1).returning(|invoice, code, expire_at| {
        Ok(Transaction { payment_code: code.to_string(), expire_at, ..pending_transaction(invoice.as_str(), 7, 3, 200_000) })
    });
    store.expect_fetch_user().returning(|id| Ok(Some(user(id))));
    let gateway = RecordingGateway::default();
    let api = processor(store, gateway.clone());
    let (status, body) = send_request(checkout_request("registration", "bca"), &user_token(7), configure(api)).await;
    assert_eq!(status, StatusCode::CREATED);
    let charges = gateway.charges();
    assert_eq!(charges.len(), 1);
    assert_eq!(body["data"]["invoice"], charges[0].invoice.as_str());
}

#[actix_web::test]
async fn checkout_needs_a_token() {
    let _ = env_logger::try_init();
    let api = processor(MockStore::new(), RecordingGateway::default());
    let (status, _) = send_request(checkout_request("registration", "bca"), "", configure(api)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn list_my_carts() {
    let _ = env_logger::try_init();
    let mut store = MockStore::new();
    store.expect_fetch_carts_for_user().withf(|id| *id == 7).returning(|_| {
        Ok(vec![CartWithSchool {
            school_id: 3,
            school_name: "SMA 3".into(),
            school_image: "https://img.example/3.png".into(),
            cart_type: CartType::Registration,
        }])
    });
    let req = TestRequest::get().uri("/transactions");
    let (status, body) =
        send_request(req, &user_token(7), configure(processor(store, RecordingGateway::default()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!([{"school_name": "SMA 3", "school_image": "https://img.example/3.png", "school_id": 3, "type": "registration"}])
    );
}

#[actix_web::test]
async fn detail_quotes_an_open_registration_cart() {
    let _ = env_logger::try_init();
    let mut store = MockStore::new();
    store.expect_fetch_pending_transaction().returning(|_, _| Ok(None));
    store.expect_fetch_cart().returning(|_, _| Ok(Some(cart(CartType::Registration))));
    let req = TestRequest::get().uri("/transactions/3");
    let (status, body) =
        send_request(req, &user_token(7), configure(processor(store, RecordingGateway::default()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!({"item_name": "First Registration", "item_price": 200_000, "type": "registration", "total": 200_000})
    );
}

#[actix_web::test]
async fn detail_without_cart_or_transaction() {
    let _ = env_logger::try_init();
    let mut store = MockStore::new();
    store.expect_fetch_pending_transaction().returning(|_, _| Ok(None));
    store.expect_fetch_cart().returning(|_, _| Ok(None));
    let req = TestRequest::get().uri("/transactions/3");
    let (status, body) =
        send_request(req, &user_token(7), configure(processor(store, RecordingGateway::default()))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Data Not Found");
}
