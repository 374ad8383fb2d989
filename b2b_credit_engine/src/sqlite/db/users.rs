use bcg_common::Money;
use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{NewPortalUser, PortalUser};

pub async fn fetch_user_by_id(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<PortalUser>, sqlx::Error> {
    let user = sqlx::query_as("SELECT * FROM company_users WHERE id = $1").bind(user_id).fetch_optional(conn).await?;
    Ok(user)
}

pub async fn fetch_user_by_customer_id(
    store_id: i64,
    external_customer_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PortalUser>, sqlx::Error> {
    let user = sqlx::query_as("SELECT * FROM company_users WHERE store_id = $1 AND external_customer_id = $2")
        .bind(store_id)
        .bind(external_customer_id)
        .fetch_optional(conn)
        .await?;
    Ok(user)
}

pub async fn insert_user(user: NewPortalUser, conn: &mut SqliteConnection) -> Result<PortalUser, sqlx::Error> {
    let user = sqlx::query_as(
        r#"
            INSERT INTO company_users (store_id, company_id, external_customer_id, is_active, status, credit_limit)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(user.store_id)
    .bind(user.company_id)
    .bind(user.external_customer_id)
    .bind(user.is_active)
    .bind(user.status)
    .bind(user.credit_limit)
    .fetch_one(conn)
    .await?;
    Ok(user)
}

/// Applies a signed delta to the user's own unpaid-order total.
pub async fn adjust_credit_used(
    user_id: i64,
    delta: Money,
    conn: &mut SqliteConnection,
) -> Result<Option<PortalUser>, sqlx::Error> {
    if delta.is_zero() {
        return fetch_user_by_id(user_id, conn).await;
    }
    trace!("🧑️ Adjusting credit used for user #{user_id} by {delta}");
    let user = sqlx::query_as(
        "UPDATE company_users SET credit_used = credit_used + $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 \
         RETURNING *",
    )
    .bind(delta)
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    Ok(user)
}

pub async fn set_credit_limit(
    user_id: i64,
    new_limit: Option<Money>,
    conn: &mut SqliteConnection,
) -> Result<Option<PortalUser>, sqlx::Error> {
    let user = sqlx::query_as(
        "UPDATE company_users SET credit_limit = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(new_limit)
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    Ok(user)
}
