//! Endpoint tests against the real route table, HMAC middleware and a throwaway SQLite backend.

mod validation;
mod webhooks;

use b2b_credit_engine::{
    db_types::{NewCompanyAccount, NewPortalUser, NewStore, UserStatus},
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    SqliteDatabase,
};

pub const TEST_SECRET: &str = "shpss_endpoint_test_secret";
pub const SHOP: &str = "acme-b2b.myshopify.com";

pub struct Seeded {
    pub db: SqliteDatabase,
    pub store_id: i64,
    pub company_id: i64,
    pub user_id: i64,
}

/// A fresh database with one store, one company (1000.00 limit) and one approved user (customer 7001).
pub async fn seeded_db() -> Seeded {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.unwrap();
    let store = db
        .upsert_store(NewStore { shop_domain: SHOP.to_string(), access_token: "shpat_test".to_string() })
        .await
        .unwrap();
    let company = db
        .insert_company(NewCompanyAccount {
            store_id: store.id,
            external_company_id: "gid://shopify/Company/1".to_string(),
            name: "Acme Wholesale".to_string(),
            credit_limit: "1000.00".parse().unwrap(),
        })
        .await
        .unwrap();
    let user = db
        .insert_user(NewPortalUser {
            store_id: store.id,
            company_id: company.id,
            external_customer_id: "7001".to_string(),
            is_active: true,
            status: UserStatus::Approved,
            credit_limit: None,
        })
        .await
        .unwrap();
    Seeded { db, store_id: store.id, company_id: company.id, user_id: user.id }
}

/// Builds the same app layout the server assembles, against the given backend.
macro_rules! test_app {
    ($db:expr) => {{
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new(b2b_credit_engine::CreditFlowApi::new(
                    $db.clone(),
                    b2b_credit_engine::events::EventProducers::default(),
                )))
                .app_data(actix_web::web::Data::new(b2b_credit_engine::AccountsApi::new($db.clone())))
                .service(
                    actix_web::web::scope("/webhook")
                        .wrap($crate::middleware::HmacMiddlewareFactory::new(
                            $crate::config::SHOPIFY_HMAC_HEADER,
                            bcg_common::Secret::new($crate::endpoint_tests::TEST_SECRET.to_string()),
                            true,
                        ))
                        .service($crate::routes::OrdersCreateRoute::<b2b_credit_engine::SqliteDatabase>::new())
                        .service($crate::routes::OrdersUpdatedRoute::<b2b_credit_engine::SqliteDatabase>::new()),
                )
                .service(
                    actix_web::web::scope("/api")
                        .service($crate::routes::ValidateOrderRoute::<b2b_credit_engine::SqliteDatabase>::new()),
                ),
        )
        .await
    }};
}

pub(crate) use test_app;
