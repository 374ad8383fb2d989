use bcg_common::Money;
use serde::{Deserialize, Serialize};

use crate::db_types::OrderRecord;

/// An order has been settled in full and no longer consumes credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: OrderRecord,
}

impl OrderPaidEvent {
    pub fn new(order: OrderRecord) -> Self {
        Self { order }
    }
}

/// An order needs a human: post-hoc credit validation failed, or a transition could only partially complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFlaggedEvent {
    pub order: OrderRecord,
    pub note: String,
}

impl OrderFlaggedEvent {
    pub fn new(order: OrderRecord, note: impl Into<String>) -> Self {
        Self { order, note: note.into() }
    }
}

/// Previously reserved credit has been released back to the company ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditRestoredEvent {
    pub order: OrderRecord,
    pub amount: Money,
}

impl CreditRestoredEvent {
    pub fn new(order: OrderRecord, amount: Money) -> Self {
        Self { order, amount }
    }
}
