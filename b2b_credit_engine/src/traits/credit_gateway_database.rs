use bcg_common::Money;
use thiserror::Error;

use crate::{
    credit_check::LimitingFactor,
    db_types::{CompanyAccount, NewOrderRecord, OrderId, OrderStatus, PortalUser, TransactionType},
    traits::{
        account_management::{AccountManagement, CreditApiError},
        data_objects::{FinalizeOutcome, InsertOrderOutcome, RestoreOutcome, SyncOutcome},
    },
};

/// The write side of a credit gateway backend: the credit transaction applier.
///
/// Every method executes as a single atomic transaction against the backing store, re-reads the state it depends on
/// inside that transaction, and is idempotent per `(order, operation)`. Webhook delivery is at-least-once, so each
/// operation must be safe to retry with the same payload; transitions are derived from old-state/new-state
/// comparison of the order record, never from counting deliveries.
#[allow(async_fn_in_trait)]
pub trait CreditGatewayDatabase: Clone + AccountManagement {
    /// The URL of the backing database.
    fn url(&self) -> &str;

    /// Atomically inserts the order and reserves credit for its unpaid portion.
    ///
    /// Idempotent: if an order with the same external id already exists, nothing is written and the existing record
    /// is returned with `inserted = false`.
    ///
    /// Admission is re-validated against the ledger inside the transaction; an earlier read is never trusted. A
    /// rejected reservation does not block the insert (the order already exists on the storefront side); the record
    /// is created flagged for manual review instead, with the evaluator's message as the note. The reservation is
    /// recorded either way, since the order's unpaid balance is real exposure.
    async fn insert_order_with_reservation(
        &self,
        order: NewOrderRecord,
    ) -> Result<InsertOrderOutcome, CreditGatewayError>;

    /// Settles an order in full: pending/partial → paid, `credit_used = 0`, `remaining_balance = 0`,
    /// `paid_amount = order_total`.
    ///
    /// A `Deduct` ledger entry is written only if the order was not already paid. Credit is re-validated post hoc;
    /// if validation now fails the order is still marked paid (the payment already happened externally) but flagged
    /// for manual review.
    async fn finalize_order(&self, store_id: i64, order_id: &OrderId) -> Result<FinalizeOutcome, CreditGatewayError>;

    /// Releases the credit recorded on the order back to the company and user, and marks the order cancelled.
    ///
    /// `kind` is the ledger entry to write: [`TransactionType::Refund`] when money moved back (refunded/voided
    /// financial status), [`TransactionType::Restore`] when a cancellation or edit releases the reservation.
    ///
    /// The released amount is the order record's own `credit_used`, never a value recomputed from the webhook
    /// payload, whose totals may already reflect the cancellation. When `credit_used` is already zero the release is
    /// a logged no-op, which absorbs duplicate deliveries.
    async fn restore_credit(
        &self,
        store_id: i64,
        order_id: &OrderId,
        kind: TransactionType,
        reason: &str,
    ) -> Result<RestoreOutcome, CreditGatewayError>;

    /// Applies a partial payment: `credit_used` becomes the unpaid remainder (`order_total − paid_amount`) and an
    /// `Adjust` entry records the signed exposure change. The company-wide exposure snapshot in the ledger entry is
    /// recomputed from the aggregate, not from this one order.
    async fn apply_partial_payment(
        &self,
        store_id: i64,
        order_id: &OrderId,
        order_total: Money,
        outstanding: Money,
    ) -> Result<SyncOutcome, CreditGatewayError>;

    /// Re-syncs totals and fulfilment state from an event that did not change the payment status.
    ///
    /// Fulfilment-only updates touch no amounts and write no ledger entry. If an edit changed the unpaid portion of
    /// an open order, the exposure change is recorded with an `Adjust` entry so ledger replay stays faithful.
    async fn sync_order_amounts(
        &self,
        store_id: i64,
        order_id: &OrderId,
        order_total: Money,
        outstanding: Money,
        order_status: OrderStatus,
    ) -> Result<SyncOutcome, CreditGatewayError>;

    /// Sets a company's credit limit and writes an administrative `Adjust` entry snapshotting the old and new
    /// limits. Lowering the limit below current usage is allowed; the evaluator will reject new orders until
    /// exposure drains.
    async fn set_company_credit_limit(
        &self,
        company_id: i64,
        new_limit: Money,
        created_by: &str,
    ) -> Result<CompanyAccount, CreditGatewayError>;

    /// Sets or clears a user's personal sub-limit.
    async fn set_user_credit_limit(
        &self,
        user_id: i64,
        new_limit: Option<Money>,
    ) -> Result<PortalUser, CreditGatewayError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), CreditGatewayError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum CreditGatewayError {
    #[error("Internal database engine error: {0}")]
    DatabaseError(String),
    #[error("Concurrent ledger mutation detected: {0}")]
    LedgerWriteConflict(String),
    #[error("Insufficient credit ({factor:?}): {message}")]
    InsufficientCredit { factor: LimitingFactor, message: String },
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("The requested company (id {0}) does not exist")]
    CompanyNotFound(i64),
    #[error("The requested user (id {0}) does not exist")]
    UserNotFound(i64),
    #[error("{0}")]
    AccountError(#[from] CreditApiError),
    #[error("The event payload is missing required fields: {0}")]
    MalformedEvent(String),
}

impl From<sqlx::Error> for CreditGatewayError {
    fn from(e: sqlx::Error) -> Self {
        // Sqlite surfaces contention as busy/locked database errors. Those are retryable with a fresh read;
        // everything else is a hard backend failure.
        if let sqlx::Error::Database(db) = &e {
            let msg = db.message().to_lowercase();
            if msg.contains("locked") || msg.contains("busy") {
                return CreditGatewayError::LedgerWriteConflict(db.message().to_string());
            }
        }
        CreditGatewayError::DatabaseError(e.to_string())
    }
}
