use bcg_common::Money;

use crate::db_types::OrderRecord;

/// Result of the idempotent insert-and-reserve operation.
#[derive(Debug, Clone)]
pub struct InsertOrderOutcome {
    pub order: OrderRecord,
    /// False when the order already existed and nothing was written.
    pub inserted: bool,
}

/// Result of settling an order in full.
#[derive(Debug, Clone)]
pub struct FinalizeOutcome {
    pub order: OrderRecord,
    /// False when the order was already paid (duplicate delivery) and no ledger entry was written.
    pub deducted: bool,
    /// True when post-hoc validation failed and the order was marked for manual review.
    pub flagged: bool,
}

/// Result of releasing reserved credit on cancellation.
#[derive(Debug, Clone)]
pub struct RestoreOutcome {
    pub order: OrderRecord,
    /// The amount released. Zero when the reservation had already been released.
    pub restored: Money,
    /// True when `credit_used` was already zero, i.e. a duplicate delivery was absorbed.
    pub already_released: bool,
}

/// Result of re-syncing order amounts from an event.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub order: OrderRecord,
    /// The signed change in the order's credit exposure, zero for fulfilment-only updates.
    pub exposure_delta: Money,
}
