use actix_web::test;
use serde_json::{json, Value};

use crate::endpoint_tests::{seeded_db, test_app};

#[actix_web::test]
async fn admits_within_the_company_limit() {
    let seeded = seeded_db().await;
    let app = test_app!(seeded.db);
    let req = test::TestRequest::post()
        .uri("/api/credit/validate")
        .set_json(json!({ "companyId": seeded.company_id, "userId": seeded.user_id, "amount": "1000.00" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["canCreate"], Value::Bool(true));
    assert_eq!(body["limitingFactor"], Value::Null);
    assert_eq!(body["creditInfo"]["company"]["availableCredit"], Value::String("1000.00".to_string()));
}

#[actix_web::test]
async fn rejects_one_cent_over_the_company_limit() {
    let seeded = seeded_db().await;
    let app = test_app!(seeded.db);
    let req = test::TestRequest::post()
        .uri("/api/credit/validate")
        .set_json(json!({ "companyId": seeded.company_id, "userId": seeded.user_id, "amount": "1000.01" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["canCreate"], Value::Bool(false));
    assert_eq!(body["limitingFactor"], Value::String("company".to_string()));
}

#[actix_web::test]
async fn unknown_companies_get_a_404() {
    let seeded = seeded_db().await;
    let app = test_app!(seeded.db);
    let req = test::TestRequest::post()
        .uri("/api/credit/validate")
        .set_json(json!({ "companyId": 9999, "userId": seeded.user_id, "amount": "1.00" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);
}
