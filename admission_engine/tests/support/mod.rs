#![allow(dead_code)]

use admission_engine::{
    db_types::{NewSubmission, Progress, ProgressStatus},
    events::Topic,
    test_utils::{
        collaborators::{recording_fanout, MemoryStorage, RecordingBroker, RecordingGateway, RecordingPusher},
        prepare_env::{prepare_test_env, random_db_path, seed_catalog},
    },
    traits::AdmissionManagement,
    ProgressCoordinator,
    SqliteDatabase,
    SubmissionApi,
    TransactionProcessor,
    WebhookReconciler,
};
use serde_json::Value;
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub const DINA: i64 = 12;
pub const RUDI: i64 = 7;
pub const SMA_1: i64 = 3;
pub const SMP_HARAPAN: i64 = 5;

pub struct Harness {
    pub db: SqliteDatabase,
    pub gateway: RecordingGateway,
    pub broker: RecordingBroker,
    pub pusher: RecordingPusher,
    pub storage: MemoryStorage,
    pub progress: ProgressCoordinator<SqliteDatabase, RecordingPusher>,
    pub transactions: TransactionProcessor<SqliteDatabase, RecordingGateway, RecordingPusher>,
    pub webhook: WebhookReconciler<SqliteDatabase, RecordingGateway, RecordingPusher>,
    pub submissions: SubmissionApi<SqliteDatabase, MemoryStorage>,
}

pub async fn harness() -> Harness {
    harness_with(RecordingGateway::default(), RecordingPusher::default(), MemoryStorage::default()).await
}

pub async fn harness_with(gateway: RecordingGateway, pusher: RecordingPusher, storage: MemoryStorage) -> Harness {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    seed_catalog(
        &db,
        &[(SMA_1, "SMA 1 Bandung"), (SMP_HARAPAN, "SMP Harapan")],
        &[(DINA, "dina"), (RUDI, "rudi")],
        &[(SMA_1, "Uniform", 750_000, "one"), (SMA_1, "Tuition", 500_000, "interval"), (SMA_1, "Books", 250_000, "one")],
    )
    .await;
    let broker = RecordingBroker::default();
    let (fanout, handlers) = recording_fanout(broker.clone(), pusher.clone());
    handlers.start_handlers().await;
    let grace = chrono::Duration::minutes(60);
    let progress = ProgressCoordinator::new(db.clone(), fanout.clone());
    let transactions = TransactionProcessor::new(db.clone(), gateway.clone(), fanout.clone(), grace);
    let webhook = WebhookReconciler::new(
        TransactionProcessor::new(db.clone(), gateway.clone(), fanout.clone(), grace),
        ProgressCoordinator::new(db.clone(), fanout.clone()),
        fanout,
    );
    let submissions = SubmissionApi::new(db.clone(), storage.clone());
    Harness { db, gateway, broker, pusher, storage, progress, transactions, webhook, submissions }
}

impl Harness {
    /// Opens an application for the participant directly through the store.
    pub async fn open_application(&self, user_id: i64, school_id: i64) -> Progress {
        let (_, progress) = self.db.insert_submission(sample_submission(user_id, school_id)).await.expect("Error opening application");
        assert_eq!(progress.status, ProgressStatus::Submitted);
        progress
    }

    pub async fn broker_messages_on(&self, topic: Topic, count: usize) -> Vec<Value> {
        self.broker.wait_for(count).await;
        self.broker.messages_on(topic)
    }

    pub async fn tear_down(mut self) {
        let url = self.db.url().to_string();
        if let Err(e) = self.db.close().await {
            log::error!("🚀️ Failed to close database: {e}");
        }
        let _ = Sqlite::drop_database(&url).await;
    }
}

pub fn sample_submission(user_id: i64, school_id: i64) -> NewSubmission {
    NewSubmission {
        user_id,
        school_id,
        student_name: "Siti Rahma".into(),
        student_photo: format!("Student_{user_id}_photo.png"),
        student_signature: format!("StudentSign_{user_id}_sign.png"),
        place_date: "Bandung, 2010-04-02".into(),
        gender: "female".into(),
        religion: "islam".into(),
        graduation_from: "SD Negeri 1".into(),
        nisn: "0101234567".into(),
        student_address: "{}".into(),
        parent_name: "Ahmad".into(),
        parent_job: "Teacher".into(),
        parent_religion: "islam".into(),
        parent_phone: "+628123456789".into(),
        parent_signature: format!("ParentSign_{user_id}_sign.png"),
        parent_address: "{}".into(),
        submitted_on: "2024-03-01".into(),
    }
}
