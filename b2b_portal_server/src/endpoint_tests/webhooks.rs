use actix_web::{http::{header::ContentType, StatusCode}, test};
use b2b_credit_engine::{db_types::OrderId, AccountManagement};

use crate::{
    config::{SHOPIFY_HMAC_HEADER, SHOPIFY_SHOP_DOMAIN_HEADER},
    data_objects::JsonResponse,
    endpoint_tests::{seeded_db, test_app, SHOP, TEST_SECRET},
    helpers::calculate_hmac,
    shopify_order::OrderEventBuilder,
};

fn order_create_body(order_id: i64, customer_id: i64, total: &str) -> Vec<u8> {
    let payload = OrderEventBuilder::new().id(order_id).customer_id(customer_id).total_price(total).build();
    serde_json::to_vec(&payload).unwrap()
}

#[actix_web::test]
async fn unsigned_webhooks_are_rejected() {
    let seeded = seeded_db().await;
    let app = test_app!(seeded.db);
    let body = order_create_body(3001, 7001, "500.00");
    let req = test::TestRequest::post()
        .uri("/webhook/orders_create")
        .insert_header(ContentType::json())
        .insert_header((SHOPIFY_SHOP_DOMAIN_HEADER, SHOP))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn badly_signed_webhooks_are_rejected() {
    let seeded = seeded_db().await;
    let app = test_app!(seeded.db);
    let body = order_create_body(3002, 7001, "500.00");
    let req = test::TestRequest::post()
        .uri("/webhook/orders_create")
        .insert_header(ContentType::json())
        .insert_header((SHOPIFY_HMAC_HEADER, "bm90LWEtcmVhbC1zaWduYXR1cmU="))
        .insert_header((SHOPIFY_SHOP_DOMAIN_HEADER, SHOP))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn signed_order_creation_records_the_order() {
    let seeded = seeded_db().await;
    let app = test_app!(seeded.db);
    let body = order_create_body(3003, 7001, "500.00");
    let signature = calculate_hmac(TEST_SECRET, &body);
    let req = test::TestRequest::post()
        .uri("/webhook/orders_create")
        .insert_header(ContentType::json())
        .insert_header((SHOPIFY_HMAC_HEADER, signature))
        .insert_header((SHOPIFY_SHOP_DOMAIN_HEADER, SHOP))
        .set_payload(body)
        .to_request();
    let response: JsonResponse = test::call_and_read_body_json(&app, req).await;
    assert!(response.success, "{}", response.message);

    let order = seeded.db.fetch_order_by_shopify_id(seeded.store_id, &OrderId::from(3003)).await.unwrap();
    let order = order.expect("order should have been recorded");
    assert_eq!(order.credit_used, "500.00".parse().unwrap());
    assert_eq!(order.company_id, seeded.company_id);
}

#[actix_web::test]
async fn deliveries_for_unknown_shops_are_acknowledged() {
    let seeded = seeded_db().await;
    let app = test_app!(seeded.db);
    let body = order_create_body(3004, 7001, "500.00");
    let signature = calculate_hmac(TEST_SECRET, &body);
    let req = test::TestRequest::post()
        .uri("/webhook/orders_updated")
        .insert_header(ContentType::json())
        .insert_header((SHOPIFY_HMAC_HEADER, signature))
        .insert_header((SHOPIFY_SHOP_DOMAIN_HEADER, "someone-else.myshopify.com"))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn malformed_payloads_are_acknowledged_and_dropped() {
    let seeded = seeded_db().await;
    let app = test_app!(seeded.db);
    // No customer object: the event cannot be correlated to a portal user.
    let mut payload = OrderEventBuilder::new().id(3005).total_price("100.00").build();
    payload.customer = None;
    let body = serde_json::to_vec(&payload).unwrap();
    let signature = calculate_hmac(TEST_SECRET, &body);
    let req = test::TestRequest::post()
        .uri("/webhook/orders_create")
        .insert_header(ContentType::json())
        .insert_header((SHOPIFY_HMAC_HEADER, signature))
        .insert_header((SHOPIFY_SHOP_DOMAIN_HEADER, SHOP))
        .set_payload(body)
        .to_request();
    let response: JsonResponse = test::call_and_read_body_json(&app, req).await;
    assert!(!response.success);

    let order = seeded.db.fetch_order_by_shopify_id(seeded.store_id, &OrderId::from(3005)).await.unwrap();
    assert!(order.is_none());
}
