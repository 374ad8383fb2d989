use bcg_common::Money;
use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{CompanyAccount, NewCompanyAccount};

pub async fn fetch_company_by_id(
    company_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<CompanyAccount>, sqlx::Error> {
    let company = sqlx::query_as("SELECT * FROM company_accounts WHERE id = $1")
        .bind(company_id)
        .fetch_optional(conn)
        .await?;
    Ok(company)
}

pub async fn insert_company(
    company: NewCompanyAccount,
    conn: &mut SqliteConnection,
) -> Result<CompanyAccount, sqlx::Error> {
    let company = sqlx::query_as(
        r#"
            INSERT INTO company_accounts (store_id, external_company_id, name, credit_limit)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(company.store_id)
    .bind(company.external_company_id)
    .bind(company.name)
    .bind(company.credit_limit)
    .fetch_one(conn)
    .await?;
    Ok(company)
}

pub async fn update_credit_limit(
    company_id: i64,
    new_limit: Money,
    conn: &mut SqliteConnection,
) -> Result<Option<CompanyAccount>, sqlx::Error> {
    let company = sqlx::query_as(
        "UPDATE company_accounts SET credit_limit = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(new_limit)
    .bind(company_id)
    .fetch_optional(conn)
    .await?;
    Ok(company)
}

/// The company's current credit exposure: the sum of `remaining_balance` over its open orders. This is the live
/// source of truth for used credit; the ledger only mirrors it for audit.
pub async fn company_exposure(company_id: i64, conn: &mut SqliteConnection) -> Result<Money, sqlx::Error> {
    let (cents,): (i64,) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(remaining_balance), 0) FROM orders
        WHERE company_id = $1 AND payment_status IN ('Pending', 'Partial')
        "#,
    )
    .bind(company_id)
    .fetch_one(conn)
    .await?;
    trace!("🏦️ Company #{company_id} exposure is {} cents", cents);
    Ok(Money::from_cents(cents))
}
