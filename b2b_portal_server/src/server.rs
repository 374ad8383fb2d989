use actix_web::{dev::Server, middleware::Logger, web, App, HttpServer};
use b2b_credit_engine::{events::EventProducers, AccountsApi, CreditFlowApi, SqliteDatabase};
use log::info;

use crate::{
    config::{ServerConfig, SHOPIFY_HMAC_HEADER},
    errors::ServerError,
    middleware::HmacMiddlewareFactory,
    routes::{
        health,
        CompanyCreditHistoryRoute,
        CompanyCreditRoute,
        OrdersCreateRoute,
        OrdersEditedRoute,
        OrdersUpdatedRoute,
        SetCompanyCreditLimitRoute,
        SetUserCreditLimitRoute,
        ValidateOrderRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    // No hooks are wired by default; deployments that need mail or storefront write-backs subscribe before start.
    let srv = create_server_instance(config, db, EventProducers::default())?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let flow_api = CreditFlowApi::new(db.clone(), producers.clone());
        let accounts_api = AccountsApi::new(db.clone());
        let hmac = HmacMiddlewareFactory::new(
            SHOPIFY_HMAC_HEADER,
            config.shopify_config.hmac_secret.clone(),
            config.shopify_config.hmac_checks,
        );
        let webhook_scope = web::scope("/webhook")
            .wrap(hmac)
            .service(OrdersCreateRoute::<SqliteDatabase>::new())
            .service(OrdersUpdatedRoute::<SqliteDatabase>::new())
            .service(OrdersEditedRoute::<SqliteDatabase>::new());
        let api_scope = web::scope("/api")
            .service(ValidateOrderRoute::<SqliteDatabase>::new())
            .service(CompanyCreditRoute::<SqliteDatabase>::new())
            .service(CompanyCreditHistoryRoute::<SqliteDatabase>::new())
            .service(SetCompanyCreditLimitRoute::<SqliteDatabase>::new())
            .service(SetUserCreditLimitRoute::<SqliteDatabase>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("bcg::access_log"))
            .app_data(web::Data::new(flow_api))
            .app_data(web::Data::new(accounts_api))
            .service(health)
            .service(webhook_scope)
            .service(api_scope)
    })
    .bind((host.as_str(), port))
    .map_err(|e| ServerError::InitializeError(format!("Could not bind to {host}:{port}. {e}")))?;
    info!("🚀️ Server bound to {host}:{port}");
    Ok(srv.run())
}
