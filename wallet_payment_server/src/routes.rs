//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! All the handlers in this module are async and delegate to the engine APIs immediately. Storage calls, the gateway
//! call, and the race-loser poll loop are all awaited futures, so a slow payment never blocks a worker thread.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use wallet_payment_engine::{
    db_types::OrderId,
    traits::{IdempotencyStore, PaymentGateway, RiskAssessment, SettlementDatabase, WalletManagement},
    CallbackPayload,
    PaymentFlowApi,
    WalletApi,
    WebhookApi,
};

use crate::{data_objects::PayRequest, errors::ServerError};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
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
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//------------------------------------------   Create payment  -------------------------------------------------
route!(create_payment => Post "/payments" impl SettlementDatabase, IdempotencyStore, PaymentGateway, RiskAssessment);
/// Route handler for creating payments.
///
/// One call, one guarantee: however many times this endpoint is hit with the same buyer, product and amount while a
/// payment is in flight, at most one charge ever reaches the gateway. Duplicates receive the in-flight transaction
/// with `is_existing: true`. A lost race that outlasts the poll budget comes back as 409, which clients should treat
/// as "processing, check back".
pub async fn create_payment<TB, TK, TG, TR>(
    body: web::Json<PayRequest>,
    api: web::Data<PaymentFlowApi<TB, TK, TG, TR>>,
) -> Result<HttpResponse, ServerError>
where
    TB: SettlementDatabase,
    TK: IdempotencyStore,
    TG: PaymentGateway,
    TR: RiskAssessment,
{
    let PayRequest { buyer_id, payment } = body.into_inner();
    debug!("💻️ POST payment for buyer {buyer_id}: {} to seller {}", payment.amount, payment.seller_id);
    let response = api.create_payment(payment, buyer_id).await?;
    if response.is_existing {
        debug!("💻️ Request absorbed by in-flight transaction {}", response.transaction.order_id);
    }
    Ok(HttpResponse::Ok().json(response))
}

//------------------------------------------   Payment status  -------------------------------------------------
route!(payment_status => Get "/payments/{order_id}" impl SettlementDatabase, IdempotencyStore, PaymentGateway, RiskAssessment);
/// Read-only reconciliation view of a payment. Never mutates status and never credits; the webhook path remains the
/// sole settlement authority.
pub async fn payment_status<TB, TK, TG, TR>(
    path: web::Path<String>,
    api: web::Data<PaymentFlowApi<TB, TK, TG, TR>>,
) -> Result<HttpResponse, ServerError>
where
    TB: SettlementDatabase,
    TK: IdempotencyStore,
    TG: PaymentGateway,
    TR: RiskAssessment,
{
    let order_id = OrderId::from(path.into_inner());
    debug!("💻️ GET payment status for {order_id}");
    let transaction = api
        .fetch_payment(&order_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("No payment with order id {order_id}")))?;
    Ok(HttpResponse::Ok().json(transaction))
}

//------------------------------------------   Gateway webhook  ------------------------------------------------
route!(gateway_callback => Post "/callback/gateway" impl SettlementDatabase);
/// Route handler for gateway status callbacks.
///
/// The gateway delivers these at least once and in no particular order. Everything that makes replays and forgeries
/// harmless lives in the engine; this handler only deserializes and reports. A 401 here means the signature did not
/// verify and the payload never touched storage.
pub async fn gateway_callback<TB>(
    body: web::Json<CallbackPayload>,
    api: web::Data<WebhookApi<TB>>,
) -> Result<HttpResponse, ServerError>
where TB: SettlementDatabase {
    let payload = body.into_inner();
    trace!("💻️ Received gateway callback for order {}", payload.order_id);
    let transaction = api.handle_callback(payload).await?;
    Ok(HttpResponse::Ok().json(transaction))
}

//------------------------------------------   Wallet reads  ---------------------------------------------------
route!(wallet_balance => Get "/wallet/{user_id}/balance" impl WalletManagement);
pub async fn wallet_balance<TB: WalletManagement>(
    path: web::Path<i64>,
    api: web::Data<WalletApi<TB>>,
) -> Result<HttpResponse, ServerError> {
    let user_id = path.into_inner();
    debug!("💻️ GET wallet balance for user {user_id}");
    let wallet = api.balance(user_id).await.map_err(|e| ServerError::BackendError(e.to_string()))?;
    Ok(HttpResponse::Ok().json(wallet))
}

route!(wallet_history => Get "/wallet/{user_id}/history" impl WalletManagement);
pub async fn wallet_history<TB: WalletManagement>(
    path: web::Path<i64>,
    api: web::Data<WalletApi<TB>>,
) -> Result<HttpResponse, ServerError> {
    let user_id = path.into_inner();
    debug!("💻️ GET wallet history for user {user_id}");
    let entries = api.history(user_id).await.map_err(|e| ServerError::BackendError(e.to_string()))?;
    Ok(HttpResponse::Ok().json(entries))
}
