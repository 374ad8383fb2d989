//! `SqliteDatabase` is a concrete credit gateway backend over SQLite.
//!
//! Every write operation opens one transaction, re-reads the ledger state it depends on inside that transaction,
//! applies the mutation, and records the matching append-only ledger entry before committing. The company aggregate
//! is therefore serialized by the database's own transaction scope, which is what keeps concurrent deliveries for
//! the same company from losing updates.
use std::fmt::Debug;

use bcg_common::Money;
use log::*;
use sqlx::SqlitePool;

use super::db::{companies, db_url, new_pool, orders, stores, transactions, users};
use crate::{
    credit_check::{evaluate, CompanyCreditSnapshot, UserCreditSnapshot},
    db_types::{
        CompanyAccount,
        CreditTransaction,
        NewCompanyAccount,
        NewCreditTransaction,
        NewOrderRecord,
        NewPortalUser,
        NewStore,
        OrderId,
        OrderRecord,
        OrderStatus,
        PaymentStatus,
        PortalUser,
        Store,
        TransactionType,
    },
    order_objects::OrderPatch,
    traits::{
        AccountManagement,
        CreditApiError,
        CreditGatewayDatabase,
        CreditGatewayError,
        FinalizeOutcome,
        InsertOrderOutcome,
        RestoreOutcome,
        SyncOutcome,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL from the environment.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Registers (or refreshes) a store. Used by installation bookkeeping and test setup.
    pub async fn upsert_store(&self, store: NewStore) -> Result<Store, CreditGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let store = stores::insert_store(store, &mut conn).await?;
        Ok(store)
    }

    pub async fn insert_company(&self, company: NewCompanyAccount) -> Result<CompanyAccount, CreditGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let company = companies::insert_company(company, &mut conn).await?;
        Ok(company)
    }

    pub async fn insert_user(&self, user: NewPortalUser) -> Result<PortalUser, CreditGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::insert_user(user, &mut conn).await?;
        Ok(user)
    }
}

impl CreditGatewayDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order_with_reservation(
        &self,
        order: NewOrderRecord,
    ) -> Result<InsertOrderOutcome, CreditGatewayError> {
        let mut tx = self.pool.begin().await?;
        if let Some(existing) = orders::fetch_order_by_shopify_id(order.store_id, &order.shopify_order_id, &mut tx).await? {
            debug!("🗃️ Order [{}] already exists with id {}. Nothing written.", order.shopify_order_id, existing.id);
            tx.commit().await?;
            return Ok(InsertOrderOutcome { order: existing, inserted: false });
        }
        let company = companies::fetch_company_by_id(order.company_id, &mut tx)
            .await?
            .ok_or(CreditGatewayError::CompanyNotFound(order.company_id))?;
        let user = users::fetch_user_by_id(order.created_by_user_id, &mut tx)
            .await?
            .ok_or(CreditGatewayError::UserNotFound(order.created_by_user_id))?;
        let exposure = companies::company_exposure(company.id, &mut tx).await?;
        let company_snapshot =
            CompanyCreditSnapshot { company_id: company.id, credit_limit: company.credit_limit, used_credit: exposure };
        let user_snapshot =
            UserCreditSnapshot { user_id: user.id, credit_limit: user.credit_limit, credit_used: user.credit_used };
        let amount = order.outstanding();
        // Admission is decided here, against state read in this same transaction. A rejection cannot block the
        // insert (the order already exists upstream) so the record is created flagged for manual review instead.
        let decision = evaluate(&company_snapshot, Some(&user_snapshot), amount);
        let (flagged, note) = if decision.admit {
            (false, None)
        } else {
            warn!("🗃️ Order [{}] admitted over a credit rejection: {}", order.shopify_order_id, decision.message);
            (true, Some(decision.message.as_str()))
        };
        let record = orders::insert_order(&order, amount, flagged, note, &mut tx).await?;
        if amount.is_positive() {
            transactions::insert_transaction(
                NewCreditTransaction {
                    company_id: company.id,
                    order_id: Some(record.id),
                    transaction_type: TransactionType::Reserve,
                    credit_amount: amount,
                    previous_balance: exposure,
                    new_balance: exposure + amount,
                    created_by: "webhook".to_string(),
                },
                &mut tx,
            )
            .await?;
            users::adjust_credit_used(user.id, amount, &mut tx).await?;
        }
        tx.commit().await?;
        debug!("🗃️ Order [{}] inserted; {amount} reserved for company #{}", record.shopify_order_id, company.id);
        Ok(InsertOrderOutcome { order: record, inserted: true })
    }

    async fn finalize_order(&self, store_id: i64, order_id: &OrderId) -> Result<FinalizeOutcome, CreditGatewayError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_shopify_id(store_id, order_id, &mut tx)
            .await?
            .ok_or_else(|| CreditGatewayError::OrderNotFound(order_id.clone()))?;
        if order.payment_status == PaymentStatus::Paid {
            debug!("🗃️ Order [{order_id}] is already paid. No ledger entry written.");
            tx.commit().await?;
            let flagged = order.flagged_for_review;
            return Ok(FinalizeOutcome { order, deducted: false, flagged });
        }
        let company = companies::fetch_company_by_id(order.company_id, &mut tx)
            .await?
            .ok_or(CreditGatewayError::CompanyNotFound(order.company_id))?;
        let user = users::fetch_user_by_id(order.created_by_user_id, &mut tx)
            .await?
            .ok_or(CreditGatewayError::UserNotFound(order.created_by_user_id))?;
        let exposure = companies::company_exposure(company.id, &mut tx).await?;
        let released = order.credit_used;
        // Post-hoc validation: would this order have been admitted against the rest of the book? The payment
        // already happened externally, so a failure flags the order instead of blocking it.
        let company_snapshot = CompanyCreditSnapshot {
            company_id: company.id,
            credit_limit: company.credit_limit,
            used_credit: exposure - order.remaining_balance,
        };
        let user_snapshot = UserCreditSnapshot {
            user_id: user.id,
            credit_limit: user.credit_limit,
            credit_used: user.credit_used - released,
        };
        let decision = evaluate(&company_snapshot, Some(&user_snapshot), order.order_total);
        let mut patch = OrderPatch::default()
            .with_payment_status(PaymentStatus::Paid)
            .with_paid_amount(order.order_total)
            .with_credit_used(Money::ZERO)
            .with_remaining_balance(Money::ZERO);
        let flagged = !decision.admit;
        if flagged {
            warn!("🗃️ Post-hoc validation failed for order [{order_id}]: {}", decision.message);
            patch = patch.with_review_flag(decision.message);
        }
        let order = orders::update_order(order.id, patch, &mut tx)
            .await?
            .ok_or_else(|| CreditGatewayError::OrderNotFound(order_id.clone()))?;
        if released.is_positive() {
            transactions::insert_transaction(
                NewCreditTransaction {
                    company_id: company.id,
                    order_id: Some(order.id),
                    transaction_type: TransactionType::Deduct,
                    credit_amount: released,
                    previous_balance: exposure,
                    new_balance: exposure - released,
                    created_by: "webhook".to_string(),
                },
                &mut tx,
            )
            .await?;
            users::adjust_credit_used(user.id, -released, &mut tx).await?;
        }
        tx.commit().await?;
        debug!("🗃️ Order [{order_id}] finalized. {released} of credit exposure settled.");
        Ok(FinalizeOutcome { order, deducted: true, flagged })
    }

    async fn restore_credit(
        &self,
        store_id: i64,
        order_id: &OrderId,
        kind: TransactionType,
        reason: &str,
    ) -> Result<RestoreOutcome, CreditGatewayError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_shopify_id(store_id, order_id, &mut tx)
            .await?
            .ok_or_else(|| CreditGatewayError::OrderNotFound(order_id.clone()))?;
        // The released amount is the order's own recorded reservation. The webhook payload's totals may already
        // reflect the cancellation, so they are never consulted here.
        let released = order.credit_used;
        if released.is_zero() {
            info!("🗃️ Order [{order_id}] has no reserved credit to restore ({reason}). Duplicate delivery absorbed.");
            let patch = OrderPatch::default()
                .with_payment_status(PaymentStatus::Cancelled)
                .with_order_status(OrderStatus::Cancelled);
            let order = orders::update_order(order.id, patch, &mut tx)
                .await?
                .ok_or_else(|| CreditGatewayError::OrderNotFound(order_id.clone()))?;
            tx.commit().await?;
            return Ok(RestoreOutcome { order, restored: Money::ZERO, already_released: true });
        }
        let exposure = companies::company_exposure(order.company_id, &mut tx).await?;
        let patch = OrderPatch::default()
            .with_payment_status(PaymentStatus::Cancelled)
            .with_order_status(OrderStatus::Cancelled)
            .with_credit_used(Money::ZERO);
        let order = orders::update_order(order.id, patch, &mut tx)
            .await?
            .ok_or_else(|| CreditGatewayError::OrderNotFound(order_id.clone()))?;
        transactions::insert_transaction(
            NewCreditTransaction {
                company_id: order.company_id,
                order_id: Some(order.id),
                transaction_type: kind,
                credit_amount: released,
                previous_balance: exposure,
                new_balance: exposure - released,
                created_by: reason.to_string(),
            },
            &mut tx,
        )
        .await?;
        users::adjust_credit_used(order.created_by_user_id, -released, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Order [{order_id}] cancelled. {released} released to company #{} ({kind}, {reason}).", order.company_id);
        Ok(RestoreOutcome { order, restored: released, already_released: false })
    }

    async fn apply_partial_payment(
        &self,
        store_id: i64,
        order_id: &OrderId,
        order_total: Money,
        outstanding: Money,
    ) -> Result<SyncOutcome, CreditGatewayError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_shopify_id(store_id, order_id, &mut tx)
            .await?
            .ok_or_else(|| CreditGatewayError::OrderNotFound(order_id.clone()))?;
        let old_unpaid = order.credit_used;
        let delta = outstanding - old_unpaid;
        let exposure = companies::company_exposure(order.company_id, &mut tx).await?;
        let patch = OrderPatch::default()
            .with_payment_status(PaymentStatus::Partial)
            .with_order_total(order_total)
            .with_paid_amount(order_total - outstanding)
            .with_credit_used(outstanding)
            .with_remaining_balance(outstanding);
        let order = orders::update_order(order.id, patch, &mut tx)
            .await?
            .ok_or_else(|| CreditGatewayError::OrderNotFound(order_id.clone()))?;
        if !delta.is_zero() {
            transactions::insert_transaction(
                NewCreditTransaction {
                    company_id: order.company_id,
                    order_id: Some(order.id),
                    transaction_type: TransactionType::Adjust,
                    credit_amount: delta,
                    previous_balance: exposure,
                    new_balance: exposure + delta,
                    created_by: "webhook".to_string(),
                },
                &mut tx,
            )
            .await?;
            users::adjust_credit_used(order.created_by_user_id, delta, &mut tx).await?;
        }
        tx.commit().await?;
        debug!("🗃️ Order [{order_id}] partially paid. Unpaid portion is now {outstanding} (delta {delta}).");
        Ok(SyncOutcome { order, exposure_delta: delta })
    }

    async fn sync_order_amounts(
        &self,
        store_id: i64,
        order_id: &OrderId,
        order_total: Money,
        outstanding: Money,
        order_status: OrderStatus,
    ) -> Result<SyncOutcome, CreditGatewayError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_shopify_id(store_id, order_id, &mut tx)
            .await?
            .ok_or_else(|| CreditGatewayError::OrderNotFound(order_id.clone()))?;
        let mut patch = OrderPatch::default()
            .with_order_status(order_status)
            .with_order_total(order_total)
            .with_paid_amount(order_total - outstanding)
            .with_remaining_balance(outstanding);
        let mut delta = Money::ZERO;
        if order.payment_status.is_open() {
            // An edit can move the unpaid portion of an open order. The exposure change is recorded so ledger
            // replay stays faithful; a fulfilment-only update has a zero delta and writes nothing.
            delta = outstanding - order.credit_used;
            patch = patch.with_credit_used(outstanding);
        } else {
            patch.remaining_balance = Some(Money::ZERO);
            patch.paid_amount = Some(order_total);
        }
        let exposure = companies::company_exposure(order.company_id, &mut tx).await?;
        let order = orders::update_order(order.id, patch, &mut tx)
            .await?
            .ok_or_else(|| CreditGatewayError::OrderNotFound(order_id.clone()))?;
        if !delta.is_zero() {
            transactions::insert_transaction(
                NewCreditTransaction {
                    company_id: order.company_id,
                    order_id: Some(order.id),
                    transaction_type: TransactionType::Adjust,
                    credit_amount: delta,
                    previous_balance: exposure,
                    new_balance: exposure + delta,
                    created_by: "webhook".to_string(),
                },
                &mut tx,
            )
            .await?;
            users::adjust_credit_used(order.created_by_user_id, delta, &mut tx).await?;
        }
        tx.commit().await?;
        trace!("🗃️ Order [{order_id}] amounts synced (exposure delta {delta}).");
        Ok(SyncOutcome { order, exposure_delta: delta })
    }

    async fn set_company_credit_limit(
        &self,
        company_id: i64,
        new_limit: Money,
        created_by: &str,
    ) -> Result<CompanyAccount, CreditGatewayError> {
        let mut tx = self.pool.begin().await?;
        let company = companies::fetch_company_by_id(company_id, &mut tx)
            .await?
            .ok_or(CreditGatewayError::CompanyNotFound(company_id))?;
        let old_limit = company.credit_limit;
        let company = companies::update_credit_limit(company_id, new_limit, &mut tx)
            .await?
            .ok_or(CreditGatewayError::CompanyNotFound(company_id))?;
        let exposure = companies::company_exposure(company_id, &mut tx).await?;
        if new_limit < exposure {
            warn!(
                "🗃️ Company #{company_id}'s new limit {new_limit} is below its current exposure {exposure}. New \
                 orders will be rejected until exposure drains."
            );
        }
        // Administrative entries carry no order id; previous/new balance snapshot the limit itself.
        transactions::insert_transaction(
            NewCreditTransaction {
                company_id,
                order_id: None,
                transaction_type: TransactionType::Adjust,
                credit_amount: new_limit - old_limit,
                previous_balance: old_limit,
                new_balance: new_limit,
                created_by: created_by.to_string(),
            },
            &mut tx,
        )
        .await?;
        tx.commit().await?;
        info!("🗃️ Company #{company_id} credit limit changed from {old_limit} to {new_limit} by {created_by}.");
        Ok(company)
    }

    async fn set_user_credit_limit(
        &self,
        user_id: i64,
        new_limit: Option<Money>,
    ) -> Result<PortalUser, CreditGatewayError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::set_credit_limit(user_id, new_limit, &mut conn)
            .await?
            .ok_or(CreditGatewayError::UserNotFound(user_id))?;
        match new_limit {
            Some(limit) => info!("🗃️ User #{user_id} personal credit limit set to {limit}."),
            None => info!("🗃️ User #{user_id} personal credit limit cleared."),
        }
        Ok(user)
    }

    async fn close(&mut self) -> Result<(), CreditGatewayError> {
        self.pool.close().await;
        Ok(())
    }
}

impl AccountManagement for SqliteDatabase {
    async fn fetch_store_by_domain(&self, shop_domain: &str) -> Result<Option<Store>, CreditApiError> {
        let mut conn = self.pool.acquire().await?;
        let store = stores::fetch_store_by_domain(shop_domain, &mut conn).await?;
        Ok(store)
    }

    async fn fetch_user_by_customer_id(
        &self,
        store_id: i64,
        customer_reference: &str,
    ) -> Result<Option<PortalUser>, CreditApiError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::fetch_user_by_customer_id(store_id, customer_reference, &mut conn).await?;
        Ok(user)
    }

    async fn fetch_user_by_id(&self, user_id: i64) -> Result<Option<PortalUser>, CreditApiError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::fetch_user_by_id(user_id, &mut conn).await?;
        Ok(user)
    }

    async fn fetch_company_by_id(&self, company_id: i64) -> Result<Option<CompanyAccount>, CreditApiError> {
        let mut conn = self.pool.acquire().await?;
        let company = companies::fetch_company_by_id(company_id, &mut conn).await?;
        Ok(company)
    }

    async fn fetch_order_by_shopify_id(
        &self,
        store_id: i64,
        order_id: &OrderId,
    ) -> Result<Option<OrderRecord>, CreditApiError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_shopify_id(store_id, order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_open_orders_for_company(&self, company_id: i64) -> Result<Vec<OrderRecord>, CreditApiError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_open_orders_for_company(company_id, &mut conn).await?;
        Ok(orders)
    }

    async fn company_credit_snapshot(&self, company_id: i64) -> Result<CompanyCreditSnapshot, CreditApiError> {
        let mut conn = self.pool.acquire().await?;
        let company = companies::fetch_company_by_id(company_id, &mut conn)
            .await?
            .ok_or(CreditApiError::CompanyNotFound(company_id))?;
        let used_credit = companies::company_exposure(company_id, &mut conn).await?;
        Ok(CompanyCreditSnapshot { company_id, credit_limit: company.credit_limit, used_credit })
    }

    async fn user_credit_snapshot(&self, user_id: i64) -> Result<UserCreditSnapshot, CreditApiError> {
        let mut conn = self.pool.acquire().await?;
        let user =
            users::fetch_user_by_id(user_id, &mut conn).await?.ok_or(CreditApiError::UserNotFound(user_id))?;
        Ok(UserCreditSnapshot { user_id, credit_limit: user.credit_limit, credit_used: user.credit_used })
    }

    async fn credit_history_for_company(&self, company_id: i64) -> Result<Vec<CreditTransaction>, CreditApiError> {
        let mut conn = self.pool.acquire().await?;
        let history = transactions::history_for_company(company_id, &mut conn).await?;
        Ok(history)
    }
}
