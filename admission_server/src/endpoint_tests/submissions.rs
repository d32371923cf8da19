use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use admission_engine::{
    db_types::{NewSubmission, ProgressStatus, Submission},
    test_utils::collaborators::MemoryStorage,
    SubmissionApi,
};
use chrono::Utc;
use serde_json::{json, Value};

use super::{
    helpers::{admin_token, progress, school, send_request, user_token},
    mocks::MockStore,
};
use crate::routes::{SubmissionByIdRoute, SubmitRoute};

fn configure(store: MockStore, storage: MemoryStorage) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.service(SubmitRoute::<MockStore, MemoryStorage>::new())
            .service(SubmissionByIdRoute::<MockStore, MemoryStorage>::new())
            .app_data(web::Data::new(SubmissionApi::new(store, storage)));
    }
}

fn form() -> Value {
    json!({
        "school_id": 3,
        "student_name": "Budi Santoso",
        "place_date": "Bandung, 2009-04-01",
        "gender": "male",
        "religion": "islam",
        "graduation_from": "SMP 1 Bandung",
        "nisn": "0091234567",
        "student_address": {"province": "Jawa Barat", "city": "Bandung", "district": "Coblong",
                            "village": "Dago", "zip_code": "40135", "detail": "Jl. Dago 12"},
        "parent_name": "Santoso",
        "parent_phone": "+6281234567890",
        "submitted_on": "2024-03-11",
        "student_photo": {"file_name": "photo.png", "content": "iVBORw0KGgo="},
        "student_signature": {"file_name": "sign.png", "content": "AQID"},
        "parent_signature": {"file_name": "parent sign.png", "content": "BAUG"}
    })
}

fn stored(new: NewSubmission) -> Submission {
    Submission {
        id: 5,
        user_id: new.user_id,
        school_id: new.school_id,
        student_name: new.student_name,
        student_photo: new.student_photo,
        student_signature: new.student_signature,
        place_date: new.place_date,
        gender: new.gender,
        religion: new.religion,
        graduation_from: new.graduation_from,
        nisn: new.nisn,
        student_address: new.student_address,
        parent_name: new.parent_name,
        parent_job: new.parent_job,
        parent_religion: new.parent_religion,
        parent_phone: new.parent_phone,
        parent_signature: new.parent_signature,
        parent_address: new.parent_address,
        submitted_on: new.submitted_on,
        created_at: Utc::now(),
    }
}

#[actix_web::test]
async fn submission_opens_an_application() {
    let _ = env_logger::try_init();
    let mut store = MockStore::new();
    store.expect_fetch_school().returning(|id| Ok(Some(school(id))));
    store.expect_fetch_progresses_for_user().returning(|_| Ok(vec![progress(2, 7, 4, ProgressStatus::TestResult)]));
    store.expect_insert_submission().times(1).returning(|new| {
        let p = progress(9, new.user_id, new.school_id, ProgressStatus::Submitted);
        Ok((stored(new), p))
    });
    let storage = MemoryStorage::default();
    let req = TestRequest::post().uri("/submissions").set_json(form());
    let (status, body) = send_request(req, &user_token(7), configure(store, storage.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"], json!({"submission_id": 5, "progress_id": 9}));
    let names = storage.object_names();
    assert_eq!(names.len(), 3);
    for (name, (prefix, suffix)) in names.iter().zip([
        ("ParentSign_7_3_", "_parent_sign.png"),
        ("StudentSign_7_3_", "_sign.png"),
        ("Student_7_3_", "_photo.png"),
    ]) {
        assert!(name.starts_with(prefix) && name.ends_with(suffix), "{name}");
    }
}

#[actix_web::test]
async fn one_application_per_school() {
    let _ = env_logger::try_init();
    let mut store = MockStore::new();
    store.expect_fetch_school().returning(|id| Ok(Some(school(id))));
    store.expect_fetch_progresses_for_user().returning(|_| Ok(vec![progress(2, 7, 3, ProgressStatus::FileApproved)]));
    store.expect_insert_submission().never();
    let storage = MemoryStorage::default();
    let req = TestRequest::post().uri("/submissions").set_json(form());
    let (status, body) = send_request(req, &user_token(7), configure(store, storage.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User 7 already has an application in progress at school 3");
    assert!(storage.object_names().is_empty());
}

#[actix_web::test]
async fn documents_must_be_base64() {
    let _ = env_logger::try_init();
    let mut body = form();
    body["parent_signature"]["content"] = json!("%%%");
    let req = TestRequest::post().uri("/submissions").set_json(body);
    let (status, body) = send_request(req, &user_token(7), configure(MockStore::new(), MemoryStorage::default())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("parent_signature is not valid base64"));
}

#[actix_web::test]
async fn invalid_nisn_is_rejected() {
    let _ = env_logger::try_init();
    let mut body = form();
    body["nisn"] = json!("12345");
    let req = TestRequest::post().uri("/submissions").set_json(body);
    let (status, body) = send_request(req, &user_token(7), configure(MockStore::new(), MemoryStorage::default())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing or Invalid Request Body. nisn must be 10 digits");
}

#[actix_web::test]
async fn submissions_are_private() {
    let _ = env_logger::try_init();
    let mock = || {
        let mut store = MockStore::new();
        store.expect_fetch_submission().returning(|id| {
            let mut s = stored(NewSubmission {
                user_id: 7,
                school_id: 3,
                student_name: "Budi Santoso".into(),
                student_photo: "Student_7_photo.png".into(),
                student_signature: "StudentSign_7_sign.png".into(),
                place_date: "Bandung, 2009-04-01".into(),
                gender: "male".into(),
                religion: "islam".into(),
                graduation_from: String::new(),
                nisn: "0091234567".into(),
                student_address: "{}".into(),
                parent_name: "Santoso".into(),
                parent_job: String::new(),
                parent_religion: String::new(),
                parent_phone: "+6281234567890".into(),
                parent_signature: "ParentSign_7_sign.png".into(),
                parent_address: "{}".into(),
                submitted_on: "2024-03-11".into(),
            });
            s.id = id;
            Ok(Some(s))
        });
        store
    };
    let req = || TestRequest::get().uri("/submissions/5");
    let (status, body) = send_request(req(), &user_token(7), configure(mock(), MemoryStorage::default())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], 5);
    assert_eq!(body["data"]["student_photo"], "Student_7_photo.png");

    let (status, _) = send_request(req(), &user_token(8), configure(mock(), MemoryStorage::default())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_request(req(), &admin_token(1), configure(mock(), MemoryStorage::default())).await;
    assert_eq!(status, StatusCode::OK);
}
