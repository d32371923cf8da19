//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST delegate to the engine API objects. Keep this module neat and tidy
//! 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every store, gateway and storage call is asynchronous, so await them
//! rather than blocking on them.
use actix_web::{get, http::StatusCode, web, HttpResponse, Responder};
use admission_engine::{
    api::{
        submission_objects::SubmissionForm,
        transaction_objects::{CheckoutRequest, CheckoutResult},
    },
    notifications::FanoutMetrics,
    traits::{AdmissionStore, DocumentStorage, PaymentGateway, PushNotifier},
    PaymentNotification,
    ProgressCoordinator,
    SubmissionApi,
    TransactionProcessor,
    WebhookReconciler,
};
use log::*;

use crate::{
    auth::{JwtClaims, ADMIN_ROLE},
    data_objects::{
        ProgressIdResponse,
        ProgressView,
        SubmissionCreated,
        SubmissionRequest,
        UpdateProgressRequest,
        WebResponse,
    },
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal requires [$($roles:expr),+]) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
                impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name)
                        .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ident),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ident),+ where requires [$($roles:expr),+]) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

fn ok_response<T: serde::Serialize>(status: StatusCode, message: &str, data: T) -> HttpResponse {
    HttpResponse::build(status).json(WebResponse::success(status, message, data))
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Transactions  ----------------------------------------------------
route!(checkout => Post "/transactions/checkout" impl AdmissionStore, PaymentGateway, PushNotifier);
/// Route handler for checkout
///
/// Charges the authenticated applicant for a registration or her-registration cart at the given school, using the
/// payment method they chose. The response carries what the applicant needs to pay: the payment code (virtual account
/// number, bill key or QR/deeplink URL) and when it expires.
pub async fn checkout<B, G, P>(
    claims: JwtClaims,
    body: web::Json<CheckoutRequest>,
    api: web::Data<TransactionProcessor<B, G, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: AdmissionStore,
    G: PaymentGateway,
    P: PushNotifier,
{
    let request = body.into_inner();
    debug!("💻️ POST checkout for user {} at school {} ({})", claims.id, request.school_id, request.cart_type);
    let transaction = api.checkout(claims.id, request).await?;
    Ok(ok_response(StatusCode::CREATED, "Status Created", CheckoutResult::from(&transaction)))
}

route!(my_carts => Get "/transactions" impl AdmissionStore, PaymentGateway, PushNotifier);
/// Every cart the authenticated applicant still has to check out, with the school it belongs to.
pub async fn my_carts<B, G, P>(
    claims: JwtClaims,
    api: web::Data<TransactionProcessor<B, G, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: AdmissionStore,
    G: PaymentGateway,
    P: PushNotifier,
{
    debug!("💻️ GET carts for user {}", claims.id);
    let carts = api.carts_for_user(claims.id).await?;
    Ok(ok_response(StatusCode::OK, "Success Operation", carts))
}

route!(transaction_detail => Get "/transactions/{school_id}" impl AdmissionStore, PaymentGateway, PushNotifier);
/// The applicant's pending transaction at the school if there is one, otherwise a quote for their open cart.
pub async fn transaction_detail<B, G, P>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<TransactionProcessor<B, G, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: AdmissionStore,
    G: PaymentGateway,
    P: PushNotifier,
{
    let school_id = path.into_inner();
    debug!("💻️ GET transaction detail for user {} at school {school_id}", claims.id);
    let detail = api.detail(school_id, claims.id).await?;
    Ok(ok_response(StatusCode::OK, "Success Operation", detail))
}

//----------------------------------------------   Payment notifications  ---------------------------------------------
route!(payment_notification => Post "/notif" impl AdmissionStore, PaymentGateway, PushNotifier);
/// Route handler for the payment provider's notification webhook
///
/// The provider retries until it gets a 200, and there is nothing it could do about a failure on our side, so this
/// always answers 200. What actually happened is logged, and echoed in the response body for whoever is watching.
pub async fn payment_notification<B, G, P>(
    body: web::Bytes,
    api: web::Data<WebhookReconciler<B, G, P>>,
) -> HttpResponse
where
    B: AdmissionStore,
    G: PaymentGateway,
    P: PushNotifier,
{
    trace!("💻️ Received payment notification");
    let notification = match serde_json::from_slice::<PaymentNotification>(&body) {
        Ok(n) => n,
        Err(e) => {
            warn!("💻️ Could not read payment notification. {e}. {}", String::from_utf8_lossy(&body));
            return ok_response(StatusCode::OK, "Notification ignored", serde_json::Value::Null);
        },
    };
    let report = api.handle(notification).await;
    if report.is_clean() {
        info!("💻️ Payment notification handled. {report}");
    } else {
        warn!("💻️ Payment notification handled with problems. {report}");
    }
    ok_response(StatusCode::OK, "Notification received", report)
}

//----------------------------------------------   Progress  ----------------------------------------------------
route!(update_progress => Put "/progresses/{id}" impl AdmissionStore, PushNotifier where requires [ADMIN_ROLE]);
/// Route handler for moving an application to a new stage. Admins only.
///
/// The body is `{"progress_status": "<stage>"}` where the stage is one of the stages administrators may set. Stages
/// with side effects (opening a cart, sending the test link) trigger them here.
pub async fn update_progress<B, P>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<UpdateProgressRequest>,
    api: web::Data<ProgressCoordinator<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: AdmissionStore,
    P: PushNotifier,
{
    let id = path.into_inner();
    let target = body.into_inner().progress_status;
    info!("💻️ PUT progress #{id} to '{target}' by admin {}", claims.id);
    let progress = api.advance(id, &target).await?;
    Ok(ok_response(StatusCode::OK, "Success Operation", ProgressIdResponse { progress_id: progress.id }))
}

route!(progress_by_id => Get "/progresses/{id}" impl AdmissionStore, PushNotifier);
pub async fn progress_by_id<B, P>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<ProgressCoordinator<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: AdmissionStore,
    P: PushNotifier,
{
    let id = path.into_inner();
    debug!("💻️ GET progress #{id} for user {}", claims.id);
    let progress = api.progress(id).await?;
    if progress.user_id != claims.id && !claims.has_role(ADMIN_ROLE) {
        return Err(ServerError::NoRecordFound(format!("Progress #{id} does not belong to user {}", claims.id)));
    }
    Ok(ok_response(StatusCode::OK, "Success Operation", ProgressView::from(progress)))
}

route!(my_progresses => Get "/progresses" impl AdmissionStore, PushNotifier);
pub async fn my_progresses<B, P>(
    claims: JwtClaims,
    api: web::Data<ProgressCoordinator<B, P>>,
) -> Result<HttpResponse, ServerError>
where
    B: AdmissionStore,
    P: PushNotifier,
{
    debug!("💻️ GET progresses for user {}", claims.id);
    let progresses = api.progresses_for_user(claims.id).await?;
    let views = progresses.into_iter().map(ProgressView::from).collect::<Vec<_>>();
    Ok(ok_response(StatusCode::OK, "Success Operation", views))
}

//----------------------------------------------   Submissions  ----------------------------------------------------
route!(submit => Post "/submissions" impl AdmissionStore, DocumentStorage);
/// Route handler for admission forms
///
/// The three documents (student photo, student signature and parent signature) are sent base64-encoded in the JSON
/// body. On success the application is open at the school in the `Submitted` stage.
pub async fn submit<B, S>(
    claims: JwtClaims,
    body: web::Json<SubmissionRequest>,
    api: web::Data<SubmissionApi<B, S>>,
) -> Result<HttpResponse, ServerError>
where
    B: AdmissionStore,
    S: DocumentStorage,
{
    let form = SubmissionForm::try_from(body.into_inner())?;
    debug!("💻️ POST submission from user {} for school {}", claims.id, form.school_id);
    let (submission, progress) = api.submit(claims.id, form).await?;
    let created = SubmissionCreated { submission_id: submission.id, progress_id: progress.id };
    Ok(ok_response(StatusCode::CREATED, "Status Created", created))
}

route!(submission_by_id => Get "/submissions/{id}" impl AdmissionStore, DocumentStorage);
pub async fn submission_by_id<B, S>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<SubmissionApi<B, S>>,
) -> Result<HttpResponse, ServerError>
where
    B: AdmissionStore,
    S: DocumentStorage,
{
    let id = path.into_inner();
    debug!("💻️ GET submission #{id} for user {}", claims.id);
    let submission = api.submission_by_id(id).await?;
    if submission.user_id != claims.id && !claims.has_role(ADMIN_ROLE) {
        return Err(ServerError::NoRecordFound(format!("Submission #{id} does not belong to user {}", claims.id)));
    }
    Ok(ok_response(StatusCode::OK, "Success Operation", submission))
}

//----------------------------------------------   Notifications  ----------------------------------------------------
route!(notification_stats => Get "/notifications/stats" requires [ADMIN_ROLE]);
/// Delivery counters for broker messages and push notifications since the server started.
pub async fn notification_stats(metrics: web::Data<FanoutMetrics>) -> HttpResponse {
    trace!("💻️ GET notification stats");
    ok_response(StatusCode::OK, "Success Operation", metrics.snapshot())
}
