use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::{CreditTransaction, NewCreditTransaction};

pub async fn insert_transaction(
    txn: NewCreditTransaction,
    conn: &mut SqliteConnection,
) -> Result<CreditTransaction, sqlx::Error> {
    let txn: CreditTransaction = sqlx::query_as(
        r#"
            INSERT INTO credit_transactions (
                company_id,
                order_id,
                transaction_type,
                credit_amount,
                previous_balance,
                new_balance,
                created_by
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(txn.company_id)
    .bind(txn.order_id)
    .bind(txn.transaction_type)
    .bind(txn.credit_amount)
    .bind(txn.previous_balance)
    .bind(txn.new_balance)
    .bind(txn.created_by)
    .fetch_one(conn)
    .await?;
    trace!(
        "🧾️ {} of {} recorded for company #{} ({} -> {})",
        txn.transaction_type,
        txn.credit_amount,
        txn.company_id,
        txn.previous_balance,
        txn.new_balance
    );
    Ok(txn)
}

pub async fn history_for_company(
    company_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<CreditTransaction>, sqlx::Error> {
    let history = sqlx::query_as("SELECT * FROM credit_transactions WHERE company_id = $1 ORDER BY id ASC")
        .bind(company_id)
        .fetch_all(conn)
        .await?;
    Ok(history)
}
