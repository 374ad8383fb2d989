use sqlx::SqliteConnection;

use crate::db_types::{NewStore, Store};

pub async fn fetch_store_by_domain(
    shop_domain: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Store>, sqlx::Error> {
    let store = sqlx::query_as("SELECT * FROM stores WHERE shop_domain = $1")
        .bind(shop_domain)
        .fetch_optional(conn)
        .await?;
    Ok(store)
}

pub async fn insert_store(store: NewStore, conn: &mut SqliteConnection) -> Result<Store, sqlx::Error> {
    let store = sqlx::query_as(
        r#"
            INSERT INTO stores (shop_domain, access_token)
            VALUES ($1, $2)
            ON CONFLICT (shop_domain) DO UPDATE SET access_token = excluded.access_token,
                updated_at = CURRENT_TIMESTAMP
            RETURNING *;
        "#,
    )
    .bind(store.shop_domain)
    .bind(store.access_token)
    .fetch_one(conn)
    .await?;
    Ok(store)
}
