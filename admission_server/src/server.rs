use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use admission_engine::{
    events::{EventHandlers, EventHooks},
    notifications::{broker_delivery_hook, FanoutMetrics, NotificationFanout},
    ProgressCoordinator,
    SqliteDatabase,
    SubmissionApi,
    TransactionProcessor,
    WebhookReconciler,
};
use log::*;
use provider_tools::{GcsStorage, MidtransClient, NsqPublisher, PushClient};

use crate::{
    auth::TokenVerifier,
    config::ServerConfig,
    errors::ServerError,
    routes::{
        health,
        CheckoutRoute,
        MyCartsRoute,
        MyProgressesRoute,
        NotificationStatsRoute,
        PaymentNotificationRoute,
        ProgressByIdRoute,
        SubmissionByIdRoute,
        SubmitRoute,
        TransactionDetailRoute,
        UpdateProgressRoute,
    },
};

/// Submissions carry three base64-encoded documents in the body.
const MAX_JSON_BODY: usize = 16 * 1024 * 1024;

/// The provider clients every worker shares.
#[derive(Clone)]
pub struct Providers {
    pub gateway: MidtransClient,
    pub pusher: PushClient,
    pub storage: GcsStorage,
}

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let providers = create_providers(&config)?;
    let broker =
        NsqPublisher::new(config.providers.nsq.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let metrics = Arc::new(FanoutMetrics::default());
    let mut hooks = EventHooks::default();
    hooks.on_broker_event(broker_delivery_hook(broker, config.notifications.retry_policy(), Arc::clone(&metrics)));
    let handlers = EventHandlers::new(config.notifications.buffer_size, hooks);
    let fanout = NotificationFanout::new(providers.pusher.clone(), handlers.producers(), Arc::clone(&metrics));
    handlers.start_handlers().await;
    info!("📬️ Broker delivery queue started");
    let srv = create_server_instance(config, db, providers, fanout, metrics)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_providers(config: &ServerConfig) -> Result<Providers, ServerError> {
    let gateway = MidtransClient::new(config.providers.gateway.clone())
        .map_err(|e| ServerError::InitializeError(format!("Payment gateway: {e}")))?;
    let pusher = PushClient::new(config.providers.push.clone())
        .map_err(|e| ServerError::InitializeError(format!("Push relay: {e}")))?;
    let storage = GcsStorage::new(config.providers.storage.clone())
        .map_err(|e| ServerError::InitializeError(format!("Document storage: {e}")))?;
    Ok(Providers { gateway, pusher, storage })
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    providers: Providers,
    fanout: NotificationFanout<PushClient>,
    metrics: Arc<FanoutMetrics>,
) -> Result<Server, ServerError> {
    let expiry_grace = config.expiry_grace();
    let verifier = TokenVerifier::new(&config.auth);
    let srv = HttpServer::new(move || {
        let Providers { gateway, storage, .. } = providers.clone();
        let transactions = TransactionProcessor::new(db.clone(), gateway.clone(), fanout.clone(), expiry_grace);
        let progress = ProgressCoordinator::new(db.clone(), fanout.clone());
        let webhook = WebhookReconciler::new(
            TransactionProcessor::new(db.clone(), gateway, fanout.clone(), expiry_grace),
            ProgressCoordinator::new(db.clone(), fanout.clone()),
            fanout.clone(),
        );
        let submissions = SubmissionApi::new(db.clone(), storage);
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("edu::access_log"))
            .app_data(web::JsonConfig::default().limit(MAX_JSON_BODY).error_handler(|err, _req| {
                debug!("💻️ Rejected request body. {err}");
                ServerError::InvalidRequestBody(err.to_string()).into()
            }))
            .app_data(web::PathConfig::default().error_handler(|err, _req| {
                ServerError::InvalidRequestPath(err.to_string()).into()
            }))
            .app_data(web::Data::new(verifier.clone()))
            .app_data(web::Data::new(transactions))
            .app_data(web::Data::new(progress))
            .app_data(web::Data::new(webhook))
            .app_data(web::Data::new(submissions))
            .app_data(web::Data::from(Arc::clone(&metrics)))
            .service(health)
            .service(CheckoutRoute::<SqliteDatabase, MidtransClient, PushClient>::new())
            .service(MyCartsRoute::<SqliteDatabase, MidtransClient, PushClient>::new())
            .service(TransactionDetailRoute::<SqliteDatabase, MidtransClient, PushClient>::new())
            .service(PaymentNotificationRoute::<SqliteDatabase, MidtransClient, PushClient>::new())
            .service(UpdateProgressRoute::<SqliteDatabase, PushClient>::new())
            .service(ProgressByIdRoute::<SqliteDatabase, PushClient>::new())
            .service(MyProgressesRoute::<SqliteDatabase, PushClient>::new())
            .service(SubmitRoute::<SqliteDatabase, GcsStorage>::new())
            .service(SubmissionByIdRoute::<SqliteDatabase, GcsStorage>::new())
            .service(NotificationStatsRoute::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
