use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use admission_engine::{
    db_types::{CartType, ProgressStatus},
    events::PushKind,
    test_utils::collaborators::RecordingPusher,
    traits::StoreError,
    ProgressCoordinator,
};
use chrono::{Duration, Utc};
use serde_json::json;

use super::{
    helpers::{admin_token, issue_token, progress, push_only_fanout, school, send_request, user, user_token},
    mocks::MockStore,
};
use crate::routes::{MyProgressesRoute, ProgressByIdRoute, UpdateProgressRoute};

fn configure(store: MockStore, pusher: RecordingPusher) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = ProgressCoordinator::new(store, push_only_fanout(pusher));
        cfg.service(UpdateProgressRoute::<MockStore, RecordingPusher>::new())
            .service(ProgressByIdRoute::<MockStore, RecordingPusher>::new())
            .service(MyProgressesRoute::<MockStore, RecordingPusher>::new())
            .app_data(web::Data::new(api));
    }
}

fn put_status(id: i64, status: &str) -> TestRequest {
    TestRequest::put().uri(&format!("/progresses/{id}")).set_json(json!({ "progress_status": status }))
}

#[actix_web::test]
async fn admin_moves_application_forward() {
    let _ = env_logger::try_init();
    let mut store = MockStore::new();
    store
        .expect_advance_progress()
        .withf(|id, status, cart| *id == 12 && *status == ProgressStatus::CheckFileRegistration && cart.is_none())
        .times(1)
        .returning(|id, status, _| Ok(progress(id, 7, 3, status)));
    let (status, body) =
        send_request(put_status(12, "Check File Registration"), &admin_token(1), configure(store, Default::default()))
            .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"code": 200, "message": "Success Operation", "data": {"progress_id": 12}}));
}

#[actix_web::test]
async fn cost_stage_opens_a_cart() {
    let _ = env_logger::try_init();
    let mut store = MockStore::new();
    store
        .expect_advance_progress()
        .withf(|_, status, cart| {
            *status == ProgressStatus::SendDetailCostsHerRegistration && *cart == Some(CartType::HerRegistration)
        })
        .times(1)
        .returning(|id, status, _| Ok(progress(id, 7, 3, status)));
    let req = put_status(12, "Send Detail Costs Her-Registration");
    let (status, _) = send_request(req, &admin_token(1), configure(store, Default::default())).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn file_approval_notifies_the_applicant() {
    let _ = env_logger::try_init();
    let mut store = MockStore::new();
    store.expect_advance_progress().returning(|id, status, _| Ok(progress(id, 7, 3, status)));
    store.expect_fetch_user().returning(|id| Ok(Some(user(id))));
    store.expect_fetch_school().returning(|id| Ok(Some(school(id))));
    let pusher = RecordingPusher::default();
    let (status, _) =
        send_request(put_status(12, "File Approved"), &admin_token(1), configure(store, pusher.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let sent = pusher.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].username, "applicant7");
    assert_eq!(sent[0].kind, PushKind::Admission);
    assert_eq!(sent[0].school_name, "SMA 3");
    assert_eq!(sent[0].status, "File Approved");
}

#[actix_web::test]
async fn statuses_outside_the_admin_set_are_rejected() {
    let _ = env_logger::try_init();
    for target in ["Done Payment", "Submitted", "Enrolled", ""] {
        let (status, body) =
            send_request(put_status(12, target), &admin_token(1), configure(MockStore::new(), Default::default()))
                .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{target}");
        assert_eq!(body["message"], "Invalid Request Body. Status Not Available");
        assert_eq!(body["data"], json!(null));
    }
}

#[actix_web::test]
async fn finished_applications_cannot_move() {
    let _ = env_logger::try_init();
    let mut store = MockStore::new();
    store.expect_advance_progress().returning(|id, _, _| Err(StoreError::ProgressNotFound(id)));
    let (status, body) =
        send_request(put_status(12, "Test Result"), &admin_token(1), configure(store, Default::default())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Data Not Found");
}

#[actix_web::test]
async fn store_failures_are_not_leaked() {
    let _ = env_logger::try_init();
    let mut store = MockStore::new();
    store.expect_advance_progress().returning(|_, _, _| Err(StoreError::DatabaseError("disk I/O error".into())));
    let (status, body) =
        send_request(put_status(12, "Test Result"), &admin_token(1), configure(store, Default::default())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body["message"].as_str().unwrap().contains("disk"));
}

#[actix_web::test]
async fn applicants_cannot_change_progress() {
    let _ = env_logger::try_init();
    let (status, body) =
        send_request(put_status(12, "Finish"), &user_token(7), configure(MockStore::new(), Default::default())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Authentication Error. Insufficient Permissions. admin access required");
}

#[actix_web::test]
async fn progress_changes_need_a_token() {
    let _ = env_logger::try_init();
    let (status, body) = send_request(put_status(12, "Finish"), "", configure(MockStore::new(), Default::default())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Authentication Error. No access token was provided.");

    let expired = issue_token(1, "admin", Utc::now() - Duration::days(1));
    let (status, _) = send_request(put_status(12, "Finish"), &expired, configure(MockStore::new(), Default::default())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) =
        send_request(put_status(12, "Finish"), "not-a-jwt", configure(MockStore::new(), Default::default())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn applicants_only_see_their_own_progress() {
    let _ = env_logger::try_init();
    let mock = || {
        let mut store = MockStore::new();
        store.expect_fetch_progress().returning(|id| Ok(Some(progress(id, 7, 3, ProgressStatus::TestResult))));
        store
    };
    let req = || TestRequest::get().uri("/progresses/12");
    let (status, body) = send_request(req(), &user_token(7), configure(mock(), Default::default())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"id": 12, "school_id": 3, "status": "Test Result"}));

    let (status, body) = send_request(req(), &user_token(8), configure(mock(), Default::default())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Data Not Found");

    let (status, _) = send_request(req(), &admin_token(1), configure(mock(), Default::default())).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn list_my_progresses() {
    let _ = env_logger::try_init();
    let mut store = MockStore::new();
    store.expect_fetch_progresses_for_user().withf(|id| *id == 7).returning(|_| {
        Ok(vec![progress(1, 7, 3, ProgressStatus::Submitted), progress(2, 7, 4, ProgressStatus::DonePayment)])
    });
    let req = TestRequest::get().uri("/progresses");
    let (status, body) = send_request(req, &user_token(7), configure(store, Default::default())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!([
            {"id": 1, "school_id": 3, "status": "Submitted"},
            {"id": 2, "school_id": 4, "status": "Done Payment"}
        ])
    );
}
