//! End-to-end reconciliation tests against the SQLite backend.
//!
//! Each test gets its own throwaway database. Events are built the same way the server builds them from raw
//! webhook payloads, then pushed through `CreditFlowApi` as the transport would.

mod support;

use b2b_credit_engine::{
    credit_check::LimitingFactor,
    db_types::{
        NewCompanyAccount,
        NewPortalUser,
        NewStore,
        OrderId,
        OrderStatus,
        PaymentStatus,
        PortalUser,
        Store,
        TransactionType,
        UserStatus,
    },
    events::EventProducers,
    order_objects::WebhookOutcome,
    shopify_types::{order_status_from_fulfillment, outstanding_or_default, payment_status_from_financial, OrderEvent},
    AccountManagement,
    AccountsApi,
    CreditFlowApi,
    CreditGatewayDatabase,
    SqliteDatabase,
};
use bcg_common::Money;
use chrono::Utc;
use sqlx::{migrate::MigrateDatabase, Sqlite};
use support::prepare_env::{prepare_test_env, random_db_path};

struct TestRig {
    api: CreditFlowApi<SqliteDatabase>,
    accounts: AccountsApi<SqliteDatabase>,
    store: Store,
    company_id: i64,
    user: PortalUser,
}

async fn setup(credit_limit: &str, user_limit: Option<&str>) -> TestRig {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");
    let store = db
        .upsert_store(NewStore { shop_domain: "acme-b2b.myshopify.com".to_string(), access_token: "shpat_test".to_string() })
        .await
        .expect("Error creating store");
    let company = db
        .insert_company(NewCompanyAccount {
            store_id: store.id,
            external_company_id: "gid://shopify/Company/1".to_string(),
            name: "Acme Wholesale".to_string(),
            credit_limit: credit_limit.parse().unwrap(),
        })
        .await
        .expect("Error creating company");
    let user = db
        .insert_user(NewPortalUser {
            store_id: store.id,
            company_id: company.id,
            external_customer_id: "7001".to_string(),
            is_active: true,
            status: UserStatus::Approved,
            credit_limit: user_limit.map(|s| s.parse().unwrap()),
        })
        .await
        .expect("Error creating user");
    let api = CreditFlowApi::new(db.clone(), EventProducers::default());
    let accounts = AccountsApi::new(db);
    TestRig { api, accounts, store, company_id: company.id, user }
}

async fn tear_down(mut rig: TestRig) {
    let url = rig.api.db().url().to_string();
    if let Err(e) = rig.api.db_mut().close().await {
        log::error!("🚀️ Failed to close database: {e}");
    }
    Sqlite::drop_database(&url).await.unwrap();
}

/// Builds an event the same way the server's conversion layer does.
fn order_event(
    order_id: i64,
    customer: &str,
    total: &str,
    outstanding: Option<&str>,
    financial_status: Option<&str>,
    fulfillment_status: Option<&str>,
    cancelled: bool,
) -> OrderEvent {
    let payment_status = payment_status_from_financial(financial_status);
    let order_status = order_status_from_fulfillment(fulfillment_status, cancelled);
    let order_total: Money = total.parse().unwrap();
    let outstanding = outstanding_or_default(outstanding.map(|s| s.parse().unwrap()), order_total, payment_status);
    OrderEvent {
        shopify_order_id: OrderId::from(order_id),
        customer_reference: customer.to_string(),
        currency: "USD".to_string(),
        order_total,
        outstanding,
        payment_status,
        order_status,
        cancelled_at: cancelled.then(Utc::now),
        updated_at: Some(Utc::now()),
    }
}

fn assert_settlement_invariant(order: &b2b_credit_engine::db_types::OrderRecord) {
    assert_eq!(
        order.paid_amount + order.remaining_balance,
        order.order_total,
        "paid + remaining != total for order {}",
        order.shopify_order_id
    );
}

#[tokio::test]
async fn order_creation_reserves_credit() {
    let rig = setup("1000.00", None).await;
    let event = order_event(1001, "7001", "500.00", None, None, None, false);
    let outcome = rig.api.process_order_event(&rig.store, &event).await.unwrap();
    let order = match outcome {
        WebhookOutcome::Created { order } => order,
        other => panic!("Expected Created, got {other:?}"),
    };
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.order_status, OrderStatus::Submitted);
    assert_eq!(order.credit_used, "500.00".parse().unwrap());
    assert_eq!(order.remaining_balance, "500.00".parse().unwrap());
    assert!(!order.flagged_for_review);
    assert_settlement_invariant(&order);

    let snapshot = rig.api.db().company_credit_snapshot(rig.company_id).await.unwrap();
    assert_eq!(snapshot.used_credit, "500.00".parse().unwrap());
    assert_eq!(snapshot.available_credit(), "500.00".parse().unwrap());

    let history = rig.accounts.credit_history(rig.company_id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].transaction_type, TransactionType::Reserve);
    assert_eq!(history[0].credit_amount, "500.00".parse().unwrap());
    tear_down(rig).await;
}

#[tokio::test]
async fn orders_from_unmapped_customers_are_ignored() {
    let rig = setup("1000.00", None).await;
    let event = order_event(1002, "9999", "100.00", None, None, None, false);
    let outcome = rig.api.process_order_event(&rig.store, &event).await.unwrap();
    assert!(matches!(outcome, WebhookOutcome::Ignored { .. }));
    let order = rig.api.db().fetch_order_by_shopify_id(rig.store.id, &OrderId::from(1002)).await.unwrap();
    assert!(order.is_none());
    tear_down(rig).await;
}

#[tokio::test]
async fn orders_from_unapproved_users_are_ignored() {
    let rig = setup("1000.00", None).await;
    let pending_user = rig
        .api
        .db()
        .insert_user(NewPortalUser {
            store_id: rig.store.id,
            company_id: rig.company_id,
            external_customer_id: "7002".to_string(),
            is_active: true,
            status: UserStatus::Pending,
            credit_limit: None,
        })
        .await
        .unwrap();
    let event = order_event(1003, &pending_user.external_customer_id, "100.00", None, None, None, false);
    let outcome = rig.api.process_order_event(&rig.store, &event).await.unwrap();
    assert!(matches!(outcome, WebhookOutcome::Ignored { .. }));
    tear_down(rig).await;
}

#[tokio::test]
async fn paid_update_finalizes_the_order() {
    let rig = setup("1000.00", None).await;
    let created = order_event(1004, "7001", "500.00", None, None, None, false);
    rig.api.process_order_event(&rig.store, &created).await.unwrap();

    let paid = order_event(1004, "7001", "500.00", Some("0.00"), Some("paid"), None, false);
    let outcome = rig.api.process_order_event(&rig.store, &paid).await.unwrap();
    let order = match outcome {
        WebhookOutcome::Updated { order, .. } => order,
        other => panic!("Expected Updated, got {other:?}"),
    };
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert_eq!(order.credit_used, Money::ZERO);
    assert_eq!(order.remaining_balance, Money::ZERO);
    assert_eq!(order.paid_amount, "500.00".parse().unwrap());
    assert_settlement_invariant(&order);

    let snapshot = rig.api.db().company_credit_snapshot(rig.company_id).await.unwrap();
    assert_eq!(snapshot.used_credit, Money::ZERO);
    let user = rig.api.db().user_credit_snapshot(rig.user.id).await.unwrap();
    assert_eq!(user.credit_used, Money::ZERO);

    let history = rig.accounts.credit_history(rig.company_id).await.unwrap();
    let types: Vec<_> = history.iter().map(|t| t.transaction_type).collect();
    assert_eq!(types, vec![TransactionType::Reserve, TransactionType::Deduct]);
    tear_down(rig).await;
}

#[tokio::test]
async fn partial_payment_recomputes_the_unpaid_portion() {
    let rig = setup("1000.00", None).await;
    let created = order_event(1005, "7001", "500.00", None, None, None, false);
    rig.api.process_order_event(&rig.store, &created).await.unwrap();

    let partial = order_event(1005, "7001", "500.00", Some("300.00"), Some("partially_paid"), None, false);
    let outcome = rig.api.process_order_event(&rig.store, &partial).await.unwrap();
    let order = outcome.order().unwrap().clone();
    assert_eq!(order.payment_status, PaymentStatus::Partial);
    assert_eq!(order.paid_amount, "200.00".parse().unwrap());
    assert_eq!(order.credit_used, "300.00".parse().unwrap());
    assert_eq!(order.remaining_balance, "300.00".parse().unwrap());
    assert_settlement_invariant(&order);

    let snapshot = rig.api.db().company_credit_snapshot(rig.company_id).await.unwrap();
    assert_eq!(snapshot.used_credit, "300.00".parse().unwrap());
    let user = rig.api.db().user_credit_snapshot(rig.user.id).await.unwrap();
    assert_eq!(user.credit_used, "300.00".parse().unwrap());
    tear_down(rig).await;
}

#[tokio::test]
async fn cancellation_restores_credit_exactly_once() {
    let rig = setup("1000.00", None).await;
    let created = order_event(1006, "7001", "500.00", None, None, None, false);
    rig.api.process_order_event(&rig.store, &created).await.unwrap();

    let cancelled = order_event(1006, "7001", "500.00", Some("0.00"), None, None, true);
    let first = rig.api.process_order_event(&rig.store, &cancelled).await.unwrap();
    let order = first.order().unwrap().clone();
    assert_eq!(order.order_status, OrderStatus::Cancelled);
    assert_eq!(order.payment_status, PaymentStatus::Cancelled);
    assert_eq!(order.credit_used, Money::ZERO);

    // Duplicate delivery: no second restore.
    let second = rig.api.process_order_event(&rig.store, &cancelled).await.unwrap();
    assert!(matches!(second, WebhookOutcome::Unchanged { .. }));

    let history = rig.accounts.credit_history(rig.company_id).await.unwrap();
    let restores = history.iter().filter(|t| t.transaction_type == TransactionType::Restore).count();
    assert_eq!(restores, 1);
    let snapshot = rig.api.db().company_credit_snapshot(rig.company_id).await.unwrap();
    assert_eq!(snapshot.used_credit, Money::ZERO);
    let user = rig.api.db().user_credit_snapshot(rig.user.id).await.unwrap();
    assert_eq!(user.credit_used, Money::ZERO);
    tear_down(rig).await;
}

#[tokio::test]
async fn a_voided_order_writes_a_refund_entry() {
    let rig = setup("1000.00", None).await;
    let created = order_event(1014, "7001", "500.00", None, None, None, false);
    rig.api.process_order_event(&rig.store, &created).await.unwrap();

    // Money moved back upstream, so the release is recorded as a refund rather than a restore.
    let voided = order_event(1014, "7001", "500.00", Some("0.00"), Some("voided"), None, false);
    let outcome = rig.api.process_order_event(&rig.store, &voided).await.unwrap();
    let order = outcome.order().unwrap().clone();
    assert_eq!(order.payment_status, PaymentStatus::Cancelled);

    let history = rig.accounts.credit_history(rig.company_id).await.unwrap();
    let types: Vec<_> = history.iter().map(|t| t.transaction_type).collect();
    assert_eq!(types, vec![TransactionType::Reserve, TransactionType::Refund]);
    let snapshot = rig.api.db().company_credit_snapshot(rig.company_id).await.unwrap();
    assert_eq!(snapshot.used_credit, Money::ZERO);
    tear_down(rig).await;
}

#[tokio::test]
async fn replaying_a_creation_event_changes_nothing() {
    let rig = setup("1000.00", None).await;
    let event = order_event(1007, "7001", "500.00", None, None, None, false);
    rig.api.process_order_event(&rig.store, &event).await.unwrap();
    let replay = rig.api.process_order_event(&rig.store, &event).await.unwrap();
    assert!(matches!(replay, WebhookOutcome::Unchanged { .. }));

    let history = rig.accounts.credit_history(rig.company_id).await.unwrap();
    assert_eq!(history.len(), 1, "replay must not write a second ledger entry");
    let user = rig.api.db().user_credit_snapshot(rig.user.id).await.unwrap();
    assert_eq!(user.credit_used, "500.00".parse().unwrap());
    tear_down(rig).await;
}

#[tokio::test]
async fn webhook_creation_over_the_limit_is_flagged_not_blocked() {
    let rig = setup("100.00", None).await;
    let event = order_event(1008, "7001", "500.00", None, None, None, false);
    let outcome = rig.api.process_order_event(&rig.store, &event).await.unwrap();
    let order = outcome.order().unwrap().clone();
    // The order already exists on the storefront; it is recorded and flagged, and the exposure is real.
    assert!(order.flagged_for_review);
    assert!(order.review_note.is_some());
    let snapshot = rig.api.db().company_credit_snapshot(rig.company_id).await.unwrap();
    assert_eq!(snapshot.used_credit, "500.00".parse().unwrap());
    assert!(snapshot.available_credit().is_negative());

    // Interactive admission now rejects anything.
    let result = rig.accounts.validate_order_creation(rig.company_id, rig.user.id, "0.01".parse().unwrap()).await.unwrap();
    assert!(!result.can_create);
    assert_eq!(result.limiting_factor, Some(LimitingFactor::Company));
    tear_down(rig).await;
}

#[tokio::test]
async fn interactive_validation_at_the_company_boundary() {
    let rig = setup("1000.00", None).await;
    let exact = rig.accounts.validate_order_creation(rig.company_id, rig.user.id, "1000.00".parse().unwrap()).await.unwrap();
    assert!(exact.can_create);
    assert_eq!(exact.limiting_factor, None);

    let over = rig.accounts.validate_order_creation(rig.company_id, rig.user.id, "1000.01".parse().unwrap()).await.unwrap();
    assert!(!over.can_create);
    assert_eq!(over.limiting_factor, Some(LimitingFactor::Company));
    assert_eq!(over.credit_info.company.available_credit, "1000.00".parse().unwrap());
    tear_down(rig).await;
}

#[tokio::test]
async fn user_sub_limit_rejects_before_company_headroom_matters() {
    let rig = setup("100000.00", Some("200.00")).await;
    // Consume 150 of the user's personal limit.
    let event = order_event(1009, "7001", "150.00", None, None, None, false);
    rig.api.process_order_event(&rig.store, &event).await.unwrap();

    let result = rig.accounts.validate_order_creation(rig.company_id, rig.user.id, "100.00".parse().unwrap()).await.unwrap();
    assert!(!result.can_create);
    assert_eq!(result.limiting_factor, Some(LimitingFactor::User));
    let user_info = result.credit_info.user.expect("user has a personal limit");
    assert_eq!(user_info.available_credit, "50.00".parse().unwrap());
    tear_down(rig).await;
}

#[tokio::test]
async fn lowering_the_limit_below_usage_blocks_new_orders_only() {
    let rig = setup("1000.00", None).await;
    let event = order_event(1010, "7001", "500.00", None, None, None, false);
    rig.api.process_order_event(&rig.store, &event).await.unwrap();

    rig.api.set_company_credit_limit(rig.company_id, "300.00".parse().unwrap(), "admin@acme").await.unwrap();
    let snapshot = rig.api.db().company_credit_snapshot(rig.company_id).await.unwrap();
    assert_eq!(snapshot.available_credit(), "-200.00".parse::<Money>().unwrap());

    let result = rig.accounts.validate_order_creation(rig.company_id, rig.user.id, "0.01".parse().unwrap()).await.unwrap();
    assert!(!result.can_create);

    // The existing order is untouched, and the admin entry does not disturb ledger replay.
    let order = rig.api.db().fetch_order_by_shopify_id(rig.store.id, &OrderId::from(1010)).await.unwrap().unwrap();
    assert_eq!(order.credit_used, "500.00".parse().unwrap());
    assert!(!order.flagged_for_review);
    let audit = rig.accounts.audit_company_ledger(rig.company_id).await.unwrap();
    assert!(audit.consistent);
    tear_down(rig).await;
}

#[tokio::test]
async fn out_of_order_paid_update_creates_a_settled_record() {
    let rig = setup("1000.00", None).await;
    // ORDERS_UPDATED arrived before ORDERS_CREATE.
    let paid = order_event(1011, "7001", "250.00", Some("0.00"), Some("paid"), None, false);
    let outcome = rig.api.process_order_event(&rig.store, &paid).await.unwrap();
    let order = match outcome {
        WebhookOutcome::Created { order } => order,
        other => panic!("Expected Created, got {other:?}"),
    };
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert_eq!(order.credit_used, Money::ZERO);
    assert_settlement_invariant(&order);
    // Nothing was ever reserved, so nothing hits the ledger.
    let history = rig.accounts.credit_history(rig.company_id).await.unwrap();
    assert!(history.is_empty());
    tear_down(rig).await;
}

#[tokio::test]
async fn cancelling_a_paid_order_restores_nothing() {
    let rig = setup("1000.00", None).await;
    let created = order_event(1012, "7001", "500.00", None, None, None, false);
    rig.api.process_order_event(&rig.store, &created).await.unwrap();
    let paid = order_event(1012, "7001", "500.00", Some("0.00"), Some("paid"), None, false);
    rig.api.process_order_event(&rig.store, &paid).await.unwrap();

    let cancelled = order_event(1012, "7001", "500.00", Some("0.00"), Some("refunded"), None, true);
    let outcome = rig.api.process_order_event(&rig.store, &cancelled).await.unwrap();
    let order = outcome.order().unwrap().clone();
    assert_eq!(order.order_status, OrderStatus::Cancelled);

    let history = rig.accounts.credit_history(rig.company_id).await.unwrap();
    assert!(history.iter().all(|t| t.transaction_type != TransactionType::Restore));
    tear_down(rig).await;
}

#[tokio::test]
async fn fulfillment_only_updates_touch_no_ledger_state() {
    let rig = setup("1000.00", None).await;
    let created = order_event(1013, "7001", "500.00", None, None, None, false);
    rig.api.process_order_event(&rig.store, &created).await.unwrap();

    let shipped = order_event(1013, "7001", "500.00", None, None, Some("in_progress"), false);
    let outcome = rig.api.process_order_event(&rig.store, &shipped).await.unwrap();
    let order = match outcome {
        WebhookOutcome::Unchanged { order } => order,
        other => panic!("Expected Unchanged, got {other:?}"),
    };
    assert_eq!(order.order_status, OrderStatus::Processing);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    let history = rig.accounts.credit_history(rig.company_id).await.unwrap();
    assert_eq!(history.len(), 1);
    tear_down(rig).await;
}

#[tokio::test]
async fn ledger_replay_matches_the_order_book_across_a_busy_day() {
    let rig = setup("10000.00", None).await;
    // Create three orders, partially pay one, settle one, cancel one.
    for (id, total) in [(2001, "1200.00"), (2002, "800.00"), (2003, "450.50")] {
        let event = order_event(id, "7001", total, None, None, None, false);
        rig.api.process_order_event(&rig.store, &event).await.unwrap();
    }
    let partial = order_event(2001, "7001", "1200.00", Some("700.00"), Some("partially_paid"), None, false);
    rig.api.process_order_event(&rig.store, &partial).await.unwrap();
    let paid = order_event(2002, "7001", "800.00", Some("0.00"), Some("paid"), None, false);
    rig.api.process_order_event(&rig.store, &paid).await.unwrap();
    let cancelled = order_event(2003, "7001", "450.50", None, None, None, true);
    rig.api.process_order_event(&rig.store, &cancelled).await.unwrap();

    let snapshot = rig.api.db().company_credit_snapshot(rig.company_id).await.unwrap();
    assert_eq!(snapshot.used_credit, "700.00".parse().unwrap());
    let audit = rig.accounts.audit_company_ledger(rig.company_id).await.unwrap();
    assert!(audit.consistent, "ledger replay {:?} diverged from the order book", audit);

    let open = rig.api.db().fetch_open_orders_for_company(rig.company_id).await.unwrap();
    assert_eq!(open.len(), 1);
    for order in &open {
        assert_settlement_invariant(order);
    }
    let user = rig.api.db().user_credit_snapshot(rig.user.id).await.unwrap();
    assert_eq!(user.credit_used, "700.00".parse().unwrap());
    tear_down(rig).await;
}

#[tokio::test]
async fn an_edit_that_raises_the_total_adjusts_exposure() {
    let rig = setup("5000.00", None).await;
    let created = order_event(2100, "7001", "500.00", None, None, None, false);
    rig.api.process_order_event(&rig.store, &created).await.unwrap();

    // ORDERS_EDITED delivers new totals with the payment status still pending.
    let edited = order_event(2100, "7001", "650.00", Some("650.00"), None, None, false);
    let outcome = rig.api.process_order_event(&rig.store, &edited).await.unwrap();
    let order = match outcome {
        WebhookOutcome::Updated { order, .. } => order,
        other => panic!("Expected Updated, got {other:?}"),
    };
    assert_eq!(order.order_total, "650.00".parse().unwrap());
    assert_eq!(order.credit_used, "650.00".parse().unwrap());
    assert_settlement_invariant(&order);

    let snapshot = rig.api.db().company_credit_snapshot(rig.company_id).await.unwrap();
    assert_eq!(snapshot.used_credit, "650.00".parse().unwrap());
    let audit = rig.accounts.audit_company_ledger(rig.company_id).await.unwrap();
    assert!(audit.consistent);
    tear_down(rig).await;
}
