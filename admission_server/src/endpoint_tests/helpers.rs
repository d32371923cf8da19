use std::sync::Arc;

use actix_web::{
    body,
    http::{header, StatusCode},
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use admission_common::Secret;
use admission_engine::{
    db_types::{Invoice, Progress, ProgressStatus, Rupiah, School, Transaction, TransactionStatus, UserProfile},
    events::EventProducers,
    notifications::{FanoutMetrics, NotificationFanout},
    test_utils::collaborators::RecordingPusher,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use log::debug;
use serde_json::Value;

use crate::{
    auth::{JwtClaims, TokenVerifier, ADMIN_ROLE},
    config::AuthConfig,
};

// Only ever used to sign tokens in these tests
const TEST_SECRET: &str = "endpoint-tests-signing-key";

pub fn get_auth_config() -> AuthConfig {
    AuthConfig { jwt_secret: Secret::new(TEST_SECRET.to_string()) }
}

pub fn issue_token(id: i64, role: &str, expiry: DateTime<Utc>) -> String {
    let claims = JwtClaims { id, role: role.to_string(), exp: expiry.timestamp() };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(TEST_SECRET.as_bytes())).expect("Failed to sign token")
}

pub fn user_token(id: i64) -> String {
    issue_token(id, "user", Utc::now() + Duration::hours(1))
}

pub fn admin_token(id: i64) -> String {
    issue_token(id, ADMIN_ROLE, Utc::now() + Duration::hours(1))
}

/// Sends the request to an app configured by `configure` and returns the status and JSON body. Errors raised by
/// middleware are rendered the way the server would render them.
pub async fn send_request<F>(req: TestRequest, token: &str, configure: F) -> (StatusCode, Value)
where F: FnOnce(&mut ServiceConfig) {
    let mut req = req;
    if !token.is_empty() {
        req = req.insert_header((header::AUTHORIZATION, format!("Bearer {token}")));
    }
    let app = App::new().app_data(web::Data::new(TokenVerifier::new(&get_auth_config()))).configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let bytes = test::read_body(res).await;
            (status, parse_body(&bytes))
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let bytes = body::to_bytes(res.into_body()).await.unwrap();
            (status, parse_body(&bytes))
        },
    }
}

fn parse_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

/// A fan-out with no broker behind it. Push notifications land in `pusher`.
pub fn push_only_fanout(pusher: RecordingPusher) -> NotificationFanout<RecordingPusher> {
    NotificationFanout::new(pusher, EventProducers::default(), Arc::new(FanoutMetrics::default()))
}

pub fn progress(id: i64, user_id: i64, school_id: i64, status: ProgressStatus) -> Progress {
    let now = Utc::now();
    Progress { id, user_id, school_id, status, created_at: now, updated_at: now, deleted_at: None }
}

pub fn user(id: i64) -> UserProfile {
    UserProfile {
        id,
        username: format!("applicant{id}"),
        first_name: "Siti".into(),
        sure_name: "Rahma".into(),
        email: format!("applicant{id}@example.com"),
    }
}

pub fn school(id: i64) -> School {
    School { id, name: format!("SMA {id}"), image: String::new(), quiz_link_pub: Some(format!("https://quiz.example/{id}")) }
}

pub fn pending_transaction(invoice: &str, user_id: i64, school_id: i64, total: i64) -> Transaction {
    let now = Utc::now();
    Transaction {
        invoice: Invoice::new(invoice),
        user_id,
        school_id,
        total: Rupiah::from(total),
        payment_code: "880812345".into(),
        payment_method: "bca".into(),
        expire_at: (now + Duration::days(1)).naive_utc(),
        status: TransactionStatus::Pending,
        created_at: now,
        updated_at: now,
        items: Vec::new(),
    }
}
