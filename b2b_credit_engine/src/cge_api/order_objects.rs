use bcg_common::Money;
use serde::{Deserialize, Serialize};

use crate::db_types::{OrderRecord, OrderStatus, PaymentStatus};

/// Partial update for an order record. Only the populated fields are written; `updated_at` is always bumped.
#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    pub payment_status: Option<PaymentStatus>,
    pub order_status: Option<OrderStatus>,
    pub order_total: Option<Money>,
    pub paid_amount: Option<Money>,
    pub credit_used: Option<Money>,
    pub remaining_balance: Option<Money>,
    pub flagged_for_review: Option<bool>,
    pub review_note: Option<String>,
}

impl OrderPatch {
    pub fn is_empty(&self) -> bool {
        self.payment_status.is_none()
            && self.order_status.is_none()
            && self.order_total.is_none()
            && self.paid_amount.is_none()
            && self.credit_used.is_none()
            && self.remaining_balance.is_none()
            && self.flagged_for_review.is_none()
            && self.review_note.is_none()
    }

    pub fn with_payment_status(mut self, status: PaymentStatus) -> Self {
        self.payment_status = Some(status);
        self
    }

    pub fn with_order_status(mut self, status: OrderStatus) -> Self {
        self.order_status = Some(status);
        self
    }

    pub fn with_order_total(mut self, total: Money) -> Self {
        self.order_total = Some(total);
        self
    }

    pub fn with_paid_amount(mut self, paid: Money) -> Self {
        self.paid_amount = Some(paid);
        self
    }

    pub fn with_credit_used(mut self, credit_used: Money) -> Self {
        self.credit_used = Some(credit_used);
        self
    }

    pub fn with_remaining_balance(mut self, remaining: Money) -> Self {
        self.remaining_balance = Some(remaining);
        self
    }

    pub fn with_review_flag(mut self, note: impl Into<String>) -> Self {
        self.flagged_for_review = Some(true);
        self.review_note = Some(note.into());
        self
    }
}

/// How a processed lifecycle event changed an order, as reported back to the webhook transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WebhookOutcome {
    /// No portal user (or store) maps to the event; nothing to do.
    Ignored { reason: String },
    /// First sight of the order; a record was created and credit reserved.
    Created { order: OrderRecord },
    /// A state transition was applied.
    Updated { order: OrderRecord, transition: String },
    /// The event carried no new information (duplicate or totals-only sync).
    Unchanged { order: OrderRecord },
}

impl WebhookOutcome {
    pub fn order(&self) -> Option<&OrderRecord> {
        match self {
            WebhookOutcome::Ignored { .. } => None,
            WebhookOutcome::Created { order } => Some(order),
            WebhookOutcome::Updated { order, .. } => Some(order),
            WebhookOutcome::Unchanged { order } => Some(order),
        }
    }
}
