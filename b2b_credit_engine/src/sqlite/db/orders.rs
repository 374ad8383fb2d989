use bcg_common::Money;
use log::{debug, trace};
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewOrderRecord, OrderId, OrderRecord},
    order_objects::OrderPatch,
};

/// Returns the order record for the store's external order id, if the portal has seen it.
pub async fn fetch_order_by_shopify_id(
    store_id: i64,
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<OrderRecord>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE store_id = $1 AND shopify_order_id = $2")
        .bind(store_id)
        .bind(order_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Inserts a new order record. Not atomic on its own; embed the call in a transaction and pass `&mut *tx`.
///
/// `credit_used` and `remaining_balance` are both set to the order's unpaid portion; the review flag carries the
/// evaluator's message when the reservation was admitted over the company's objection.
pub async fn insert_order(
    order: &NewOrderRecord,
    credit_used: Money,
    flagged: bool,
    review_note: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<OrderRecord, sqlx::Error> {
    let order: OrderRecord = sqlx::query_as(
        r#"
            INSERT INTO orders (
                store_id,
                company_id,
                created_by_user_id,
                shopify_order_id,
                currency,
                order_total,
                paid_amount,
                credit_used,
                remaining_balance,
                payment_status,
                order_status,
                flagged_for_review,
                review_note
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *;
        "#,
    )
    .bind(order.store_id)
    .bind(order.company_id)
    .bind(order.created_by_user_id)
    .bind(order.shopify_order_id.as_str())
    .bind(&order.currency)
    .bind(order.order_total)
    .bind(order.paid_amount)
    .bind(credit_used)
    .bind(order.outstanding())
    .bind(order.payment_status)
    .bind(order.order_status)
    .bind(flagged)
    .bind(review_note)
    .fetch_one(conn)
    .await?;
    debug!("📝️ Order [{}] inserted with id {}", order.shopify_order_id, order.id);
    Ok(order)
}

/// Applies a partial update to the order with the given internal id.
pub async fn update_order(
    id: i64,
    patch: OrderPatch,
    conn: &mut SqliteConnection,
) -> Result<Option<OrderRecord>, sqlx::Error> {
    if patch.is_empty() {
        debug!("📝️ No fields to update for order id {id}. Update request skipped.");
        return sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await;
    }
    let mut builder = QueryBuilder::new("UPDATE orders SET updated_at = CURRENT_TIMESTAMP, ");
    let mut set_clause = builder.separated(", ");
    if let Some(status) = patch.payment_status {
        set_clause.push("payment_status = ");
        set_clause.push_bind_unseparated(status.to_string());
    }
    if let Some(status) = patch.order_status {
        set_clause.push("order_status = ");
        set_clause.push_bind_unseparated(status.to_string());
    }
    if let Some(total) = patch.order_total {
        set_clause.push("order_total = ");
        set_clause.push_bind_unseparated(total);
    }
    if let Some(paid) = patch.paid_amount {
        set_clause.push("paid_amount = ");
        set_clause.push_bind_unseparated(paid);
    }
    if let Some(credit_used) = patch.credit_used {
        set_clause.push("credit_used = ");
        set_clause.push_bind_unseparated(credit_used);
    }
    if let Some(remaining) = patch.remaining_balance {
        set_clause.push("remaining_balance = ");
        set_clause.push_bind_unseparated(remaining);
    }
    if let Some(flagged) = patch.flagged_for_review {
        set_clause.push("flagged_for_review = ");
        set_clause.push_bind_unseparated(flagged);
    }
    if let Some(note) = patch.review_note {
        set_clause.push("review_note = ");
        set_clause.push_bind_unseparated(note);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    trace!("📝️ Executing query: {}", builder.sql());
    let res = builder.build().fetch_optional(conn).await?.map(|row: SqliteRow| OrderRecord::from_row(&row)).transpose()?;
    Ok(res)
}

/// The company's open orders, i.e. the non-cancelled ones with payment outstanding, oldest first.
pub async fn fetch_open_orders_for_company(
    company_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderRecord>, sqlx::Error> {
    let orders = sqlx::query_as(
        r#"
        SELECT * FROM orders
        WHERE company_id = $1 AND payment_status IN ('Pending', 'Partial')
        ORDER BY created_at ASC
        "#,
    )
    .bind(company_id)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}
