//! Normalized order lifecycle events.
//!
//! The storefront delivers order webhooks as loosely-typed JSON. The server crate deserializes the raw payload and
//! converts it into the strict [`OrderEvent`] defined here; by the time an event reaches the reconciler every field
//! has a documented type and default. The mapping from the storefront's `financial_status` / `fulfillment_status`
//! vocabularies into the engine's own status enums also lives here so it can be tested in one place.

use bcg_common::Money;
use chrono::{DateTime, Utc};

use crate::db_types::{OrderId, OrderStatus, PaymentStatus};

/// A normalized order lifecycle event, ready for reconciliation.
///
/// Events carry no sequence number; the reconciler derives transitions by comparing this snapshot against the stored
/// order record.
#[derive(Debug, Clone)]
pub struct OrderEvent {
    /// The storefront order id (`id` in the payload).
    pub shopify_order_id: OrderId,
    /// The storefront customer id (`customer.id` in the payload).
    pub customer_reference: String,
    pub currency: String,
    /// Current order total. Taken from `current_total_price` when present (it reflects edits), else `total_price`.
    pub order_total: Money,
    /// The unpaid portion (`total_outstanding`). Defaults to the full total when absent and the order is unpaid,
    /// and to zero when the order is paid.
    pub outstanding: Money,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl OrderEvent {
    /// The amount the payer has settled so far.
    pub fn paid_amount(&self) -> Money {
        self.order_total - self.outstanding
    }

    /// A cancellation is signalled by `cancelled_at`, a cancelled fulfilment, or a refunded/voided financial status.
    pub fn is_cancellation(&self) -> bool {
        self.order_status == OrderStatus::Cancelled || self.payment_status == PaymentStatus::Cancelled
    }
}

/// Maps the storefront's `financial_status` vocabulary onto [`PaymentStatus`].
///
/// `paid` → Paid, `partially_paid` → Partial, `refunded`/`voided` → Cancelled, anything else (including a missing
/// field) → Pending.
pub fn payment_status_from_financial(financial_status: Option<&str>) -> PaymentStatus {
    match financial_status {
        Some("paid") => PaymentStatus::Paid,
        Some("partially_paid") => PaymentStatus::Partial,
        Some("refunded") | Some("voided") => PaymentStatus::Cancelled,
        _ => PaymentStatus::Pending,
    }
}

/// Maps the storefront's `fulfillment_status` vocabulary onto [`OrderStatus`].
///
/// A present `cancelled_at` wins over whatever the fulfilment field says. Otherwise `fulfilled` → Delivered,
/// `partial`/`in_progress` → Processing, `cancelled` → Cancelled, anything else → Submitted.
pub fn order_status_from_fulfillment(fulfillment_status: Option<&str>, cancelled: bool) -> OrderStatus {
    if cancelled {
        return OrderStatus::Cancelled;
    }
    match fulfillment_status {
        Some("fulfilled") => OrderStatus::Delivered,
        Some("partial") | Some("in_progress") => OrderStatus::Processing,
        Some("cancelled") => OrderStatus::Cancelled,
        _ => OrderStatus::Submitted,
    }
}

/// Resolves the unpaid portion from the payload's `total_outstanding`, defaulting per the payment status when the
/// field is absent.
pub fn outstanding_or_default(total_outstanding: Option<Money>, order_total: Money, status: PaymentStatus) -> Money {
    match total_outstanding {
        Some(amount) => amount,
        None if matches!(status, PaymentStatus::Paid | PaymentStatus::Cancelled) => Money::ZERO,
        None => order_total,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn financial_status_mapping() {
        assert_eq!(payment_status_from_financial(Some("paid")), PaymentStatus::Paid);
        assert_eq!(payment_status_from_financial(Some("partially_paid")), PaymentStatus::Partial);
        assert_eq!(payment_status_from_financial(Some("refunded")), PaymentStatus::Cancelled);
        assert_eq!(payment_status_from_financial(Some("voided")), PaymentStatus::Cancelled);
        assert_eq!(payment_status_from_financial(Some("authorized")), PaymentStatus::Pending);
        assert_eq!(payment_status_from_financial(None), PaymentStatus::Pending);
    }

    #[test]
    fn fulfillment_status_mapping() {
        assert_eq!(order_status_from_fulfillment(Some("fulfilled"), false), OrderStatus::Delivered);
        assert_eq!(order_status_from_fulfillment(Some("partial"), false), OrderStatus::Processing);
        assert_eq!(order_status_from_fulfillment(Some("in_progress"), false), OrderStatus::Processing);
        assert_eq!(order_status_from_fulfillment(Some("cancelled"), false), OrderStatus::Cancelled);
        assert_eq!(order_status_from_fulfillment(None, false), OrderStatus::Submitted);
        assert_eq!(order_status_from_fulfillment(Some("anything"), false), OrderStatus::Submitted);
    }

    #[test]
    fn cancelled_at_wins_over_fulfillment() {
        assert_eq!(order_status_from_fulfillment(Some("fulfilled"), true), OrderStatus::Cancelled);
        assert_eq!(order_status_from_fulfillment(None, true), OrderStatus::Cancelled);
    }

    #[test]
    fn outstanding_defaults() {
        let total = Money::from_units(500);
        assert_eq!(outstanding_or_default(Some(Money::from_units(300)), total, PaymentStatus::Partial), Money::from_units(300));
        assert_eq!(outstanding_or_default(None, total, PaymentStatus::Pending), total);
        assert_eq!(outstanding_or_default(None, total, PaymentStatus::Paid), Money::ZERO);
        assert_eq!(outstanding_or_default(None, total, PaymentStatus::Cancelled), Money::ZERO);
    }

    #[test]
    fn paid_amount_is_total_minus_outstanding() {
        let event = OrderEvent {
            shopify_order_id: OrderId::from(1001),
            customer_reference: "7001".to_string(),
            currency: "USD".to_string(),
            order_total: Money::from_units(500),
            outstanding: Money::from_units(300),
            payment_status: PaymentStatus::Partial,
            order_status: OrderStatus::Submitted,
            cancelled_at: None,
            updated_at: None,
        };
        assert_eq!(event.paid_amount(), Money::from_units(200));
        assert!(!event.is_cancellation());
    }
}
