//! Route definitions for the B2B portal server.
//!
//! The `route!` macro generates a unit struct for each handler that implements `HttpServiceFactory`, so that
//! generic handlers (parameterised over the backend trait) can be registered with a concrete backend at server
//! assembly time: `OrdersCreateRoute::<SqliteDatabase>::new()`.

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use b2b_credit_engine::{
    order_objects::WebhookOutcome,
    AccountManagement,
    AccountsApi,
    CreditFlowApi,
    CreditGatewayDatabase,
    CreditGatewayError,
};
use log::*;

use crate::{
    config::SHOPIFY_SHOP_DOMAIN_HEADER,
    data_objects::{CreditLimitUpdate, JsonResponse, UserCreditLimitUpdate, ValidateOrderRequest},
    errors::ServerError,
    integrations::shopify::order_event_from_payload,
    shopify_order::ShopifyOrderEvent,
};

macro_rules! route {
    ($name:ident => $method:ident $path:literal) => {
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
                        .to($name);
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

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

//----------------------------------------------   Health  ----------------------------------------------------

#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Webhooks  ----------------------------------------------------

route!(orders_create => Post "/orders_create" impl CreditGatewayDatabase);
pub async fn orders_create<B>(
    req: HttpRequest,
    body: web::Json<ShopifyOrderEvent>,
    api: web::Data<CreditFlowApi<B>>,
) -> HttpResponse
where
    B: CreditGatewayDatabase,
{
    process_order_webhook("ORDERS_CREATE", req, body.into_inner(), api.get_ref()).await
}

route!(orders_updated => Post "/orders_updated" impl CreditGatewayDatabase);
pub async fn orders_updated<B>(
    req: HttpRequest,
    body: web::Json<ShopifyOrderEvent>,
    api: web::Data<CreditFlowApi<B>>,
) -> HttpResponse
where
    B: CreditGatewayDatabase,
{
    process_order_webhook("ORDERS_UPDATED", req, body.into_inner(), api.get_ref()).await
}

route!(orders_edited => Post "/orders_edited" impl CreditGatewayDatabase);
pub async fn orders_edited<B>(
    req: HttpRequest,
    body: web::Json<ShopifyOrderEvent>,
    api: web::Data<CreditFlowApi<B>>,
) -> HttpResponse
where
    B: CreditGatewayDatabase,
{
    process_order_webhook("ORDERS_EDITED", req, body.into_inner(), api.get_ref()).await
}

/// Shared webhook handling.
///
/// Responses must stay in the 200 range for everything we have absorbed, otherwise the storefront keeps
/// redelivering. The exceptions: signature failures never get here (the HMAC middleware rejects them), and a
/// persistent ledger conflict is answered with 503 precisely because we *want* that redelivery.
async fn process_order_webhook<B>(
    topic: &str,
    req: HttpRequest,
    payload: ShopifyOrderEvent,
    api: &CreditFlowApi<B>,
) -> HttpResponse
where
    B: CreditGatewayDatabase,
{
    trace!("🛍️️ Received {topic} webhook request: {}", req.uri());
    let Some(domain) = shop_domain(&req) else {
        warn!("🛍️️ {topic} delivery without a {SHOPIFY_SHOP_DOMAIN_HEADER} header. Dropping event.");
        return HttpResponse::Ok().json(JsonResponse::failure("Missing shop domain header"));
    };
    let store = match api.db().fetch_store_by_domain(&domain).await {
        Ok(Some(store)) => store,
        Ok(None) => {
            info!("🛍️️ {topic} delivery for unknown shop {domain}. Nothing to do.");
            return HttpResponse::Ok().json(JsonResponse::success("Nothing to do"));
        },
        Err(e) => {
            warn!("🛍️️ Could not look up shop {domain}. {e}");
            return HttpResponse::Ok().json(JsonResponse::failure("Store lookup failed"));
        },
    };
    let event = match order_event_from_payload(payload) {
        Ok(event) => event,
        Err(e) => {
            warn!("🛍️️ Could not convert {topic} payload for {domain}. {e}. Dropping event.");
            return HttpResponse::Ok().json(JsonResponse::failure(e));
        },
    };
    match api.process_order_event(&store, &event).await {
        Ok(WebhookOutcome::Ignored { reason }) => {
            debug!("🛍️️ {topic} for order {} ignored. {reason}", event.shopify_order_id);
            HttpResponse::Ok().json(JsonResponse::success(format!("Nothing to do: {reason}")))
        },
        Ok(WebhookOutcome::Created { order }) => {
            info!("🛍️️ {topic}: order {} recorded for company #{}.", order.shopify_order_id, order.company_id);
            HttpResponse::Ok().json(JsonResponse::success("Order recorded"))
        },
        Ok(WebhookOutcome::Updated { order, transition }) => {
            info!("🛍️️ {topic}: order {} transitioned ({transition}).", order.shopify_order_id);
            HttpResponse::Ok().json(JsonResponse::success(format!("Order updated: {transition}")))
        },
        Ok(WebhookOutcome::Unchanged { order }) => {
            debug!("🛍️️ {topic}: order {} unchanged.", order.shopify_order_id);
            HttpResponse::Ok().json(JsonResponse::success("No change"))
        },
        Err(CreditGatewayError::LedgerWriteConflict(e)) => {
            // Already retried once with a fresh read inside the flow api.
            warn!("🛍️️ {topic}: persistent ledger conflict for order {}. {e}", event.shopify_order_id);
            HttpResponse::ServiceUnavailable().json(JsonResponse::failure("Ledger busy, please redeliver"))
        },
        Err(e) => {
            warn!("🛍️️ {topic}: unexpected error handling order {}. {e}", event.shopify_order_id);
            HttpResponse::Ok().json(JsonResponse::failure("Unexpected error handling order"))
        },
    }
}

fn shop_domain(req: &HttpRequest) -> Option<String> {
    req.headers().get(SHOPIFY_SHOP_DOMAIN_HEADER).and_then(|v| v.to_str().ok()).map(|s| s.to_string())
}

//----------------------------------------------   Checkout  ----------------------------------------------------

route!(validate_order => Post "/credit/validate" impl AccountManagement);
/// Interactive credit admission for the checkout-time caller. Always decides against freshly committed state.
pub async fn validate_order<B>(
    body: web::Json<ValidateOrderRequest>,
    api: web::Data<AccountsApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: AccountManagement,
{
    let request = body.into_inner();
    debug!(
        "🧮️ POST credit validation for company #{}, user #{}, amount {}",
        request.company_id, request.user_id, request.amount
    );
    let result = api.validate_order_creation(request.company_id, request.user_id, request.amount).await?;
    Ok(HttpResponse::Ok().json(result))
}

//----------------------------------------------   Admin  ----------------------------------------------------

route!(company_credit => Get "/companies/{id}/credit" impl AccountManagement);
pub async fn company_credit<B>(
    path: web::Path<i64>,
    api: web::Data<AccountsApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: AccountManagement,
{
    let company_id = path.into_inner();
    let overview = api.company_credit_overview(company_id).await?;
    Ok(HttpResponse::Ok().json(overview))
}

route!(company_credit_history => Get "/companies/{id}/credit/history" impl AccountManagement);
pub async fn company_credit_history<B>(
    path: web::Path<i64>,
    api: web::Data<AccountsApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: AccountManagement,
{
    let company_id = path.into_inner();
    let history = api.credit_history(company_id).await?;
    Ok(HttpResponse::Ok().json(history))
}

route!(set_company_credit_limit => Post "/companies/{id}/credit_limit" impl CreditGatewayDatabase);
pub async fn set_company_credit_limit<B>(
    path: web::Path<i64>,
    body: web::Json<CreditLimitUpdate>,
    api: web::Data<CreditFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: CreditGatewayDatabase,
{
    let company_id = path.into_inner();
    let update = body.into_inner();
    let updated_by = update.updated_by.as_deref().unwrap_or("admin");
    info!("🏦️ POST credit limit {} for company #{company_id} by {updated_by}", update.credit_limit);
    let company = api.set_company_credit_limit(company_id, update.credit_limit, updated_by).await?;
    Ok(HttpResponse::Ok().json(company))
}

route!(set_user_credit_limit => Post "/users/{id}/credit_limit" impl CreditGatewayDatabase);
pub async fn set_user_credit_limit<B>(
    path: web::Path<i64>,
    body: web::Json<UserCreditLimitUpdate>,
    api: web::Data<CreditFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: CreditGatewayDatabase,
{
    let user_id = path.into_inner();
    let update = body.into_inner();
    let user = api.set_user_credit_limit(user_id, update.credit_limit).await?;
    Ok(HttpResponse::Ok().json(user))
}
