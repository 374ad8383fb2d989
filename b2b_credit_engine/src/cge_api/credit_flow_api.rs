use std::fmt::Debug;

use bcg_common::Money;
use log::*;

use crate::{
    cge_api::order_objects::WebhookOutcome,
    db_types::{
        CompanyAccount,
        NewOrderRecord,
        OrderRecord,
        OrderStatus,
        PaymentStatus,
        PortalUser,
        Store,
        TransactionType,
    },
    events::{CreditRestoredEvent, EventProducers, OrderFlaggedEvent, OrderPaidEvent},
    shopify_types::OrderEvent,
    traits::{CreditGatewayDatabase, CreditGatewayError},
};

/// `CreditFlowApi` reconciles order lifecycle events against the credit ledger.
///
/// Events arrive at least once, unordered and concurrently. Each event is handled as one unit of work: load the
/// order record, derive the transition by comparing stored state against the event, and apply the matching ledger
/// operation through the backend. The transition handling is tabulated below.
///
/// | stored payment status | event payment status | action |
/// |-----------------------|----------------------|--------|
/// | (no record)           | any                  | map the customer to a portal user; create + reserve, or ignore |
/// | Pending/Partial       | Paid                 | finalize; post-hoc validation failure flags, never blocks |
/// | any                   | cancelled¹           | restore the order's own recorded credit, exactly once |
/// | Pending/Partial       | Partial              | recompute the unpaid remainder and company exposure |
/// | unchanged             | unchanged            | re-sync totals, no ledger entry |
/// | Cancelled             | any non-cancelled    | ignored; cancellation is terminal |
///
/// ¹ signalled by `cancelled_at`, a cancelled fulfilment, or a refunded/voided financial status.
pub struct CreditFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for CreditFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CreditFlowApi")
    }
}

impl<B> CreditFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> CreditFlowApi<B>
where B: CreditGatewayDatabase
{
    /// Processes one normalized order lifecycle event.
    ///
    /// A `LedgerWriteConflict` (a concurrent delivery touched the same company) is retried once with a fresh read;
    /// if it persists, the error is surfaced so the transport redelivers.
    pub async fn process_order_event(
        &self,
        store: &Store,
        event: &OrderEvent,
    ) -> Result<WebhookOutcome, CreditGatewayError> {
        match self.apply_event(store, event).await {
            Err(CreditGatewayError::LedgerWriteConflict(msg)) => {
                debug!("🔄️ Ledger write conflict for order {}: {msg}. Retrying once.", event.shopify_order_id);
                self.apply_event(store, event).await
            },
            other => other,
        }
    }

    async fn apply_event(&self, store: &Store, event: &OrderEvent) -> Result<WebhookOutcome, CreditGatewayError> {
        match self.db.fetch_order_by_shopify_id(store.id, &event.shopify_order_id).await? {
            None => self.first_seen(store, event).await,
            Some(order) => self.reconcile(store, order, event).await,
        }
    }

    /// First sight of an order. Update events can arrive ahead of the creation event, so any event qualifies.
    ///
    /// Orders are only recorded for storefront customers that map to an active, approved portal user; everyone
    /// else's orders are not B2B orders and are acknowledged without a record.
    async fn first_seen(&self, store: &Store, event: &OrderEvent) -> Result<WebhookOutcome, CreditGatewayError> {
        let user = match self.db.fetch_user_by_customer_id(store.id, &event.customer_reference).await? {
            None => {
                debug!(
                    "🔄️📦️ No portal user maps to customer [{}] on {}. Ignoring order {}.",
                    event.customer_reference, store.shop_domain, event.shopify_order_id
                );
                return Ok(WebhookOutcome::Ignored { reason: "No matching portal user".to_string() });
            },
            Some(user) if !user.participates() => {
                debug!(
                    "🔄️📦️ Portal user #{} is not an active approved member. Ignoring order {}.",
                    user.id, event.shopify_order_id
                );
                return Ok(WebhookOutcome::Ignored { reason: "Portal user is not an active approved member".to_string() });
            },
            Some(user) => user,
        };
        let new_order = new_record_from_event(store, &user, event);
        let outcome = self.db.insert_order_with_reservation(new_order).await?;
        if !outcome.inserted {
            // A concurrent delivery won the insert race; reconcile against what it wrote.
            return self.reconcile(store, outcome.order, event).await;
        }
        let order = outcome.order;
        info!(
            "🔄️📦️ Order {} recorded for company #{} ({} reserved).",
            order.shopify_order_id, order.company_id, order.credit_used
        );
        if order.flagged_for_review {
            self.call_order_flagged_hook(&order).await;
        }
        Ok(WebhookOutcome::Created { order })
    }

    async fn reconcile(
        &self,
        store: &Store,
        order: OrderRecord,
        event: &OrderEvent,
    ) -> Result<WebhookOutcome, CreditGatewayError> {
        use PaymentStatus::*;
        let old_status = order.payment_status;
        if event.is_cancellation() {
            if old_status == Cancelled && order.order_status == OrderStatus::Cancelled {
                trace!("🔄️❌️ Order {} is already cancelled. Duplicate delivery.", order.shopify_order_id);
                return Ok(WebhookOutcome::Unchanged { order });
            }
            // Money moved back (refunded/voided) is a refund; a plain cancellation releases the reservation.
            let kind = if event.payment_status == Cancelled { TransactionType::Refund } else { TransactionType::Restore };
            let res = self.db.restore_credit(store.id, &event.shopify_order_id, kind, "order cancelled").await?;
            if !res.already_released {
                self.call_credit_restored_hook(&res.order, res.restored).await;
            }
            let transition = format!("{old_status} -> Cancelled");
            return Ok(WebhookOutcome::Updated { order: res.order, transition });
        }
        match (old_status, event.payment_status) {
            (Cancelled, _) => {
                warn!(
                    "🔄️ Order {} received a {} event after cancellation. Cancellation is terminal; ignoring.",
                    order.shopify_order_id, event.payment_status
                );
                Ok(WebhookOutcome::Unchanged { order })
            },
            (Pending | Partial, Paid) => {
                let res = self.db.finalize_order(store.id, &event.shopify_order_id).await?;
                if res.deducted {
                    self.call_order_paid_hook(&res.order).await;
                }
                if res.flagged {
                    self.call_order_flagged_hook(&res.order).await;
                }
                let transition = format!("{old_status} -> Paid");
                Ok(WebhookOutcome::Updated { order: res.order, transition })
            },
            (Pending | Partial, Partial) => {
                let res = self
                    .db
                    .apply_partial_payment(store.id, &event.shopify_order_id, event.order_total, event.outstanding)
                    .await?;
                let transition = format!("{old_status} -> Partial");
                Ok(WebhookOutcome::Updated { order: res.order, transition })
            },
            (old, new) => {
                // Payment status is unchanged (or the event carries a downgrade, which never resurrects exposure).
                // Totals and fulfilment state are still re-synced so the record stays current.
                if old != new {
                    warn!(
                        "🔄️ Order {} would move {old} -> {new}; not a credit transition. Syncing totals only.",
                        order.shopify_order_id
                    );
                }
                let res = self
                    .db
                    .sync_order_amounts(
                        store.id,
                        &event.shopify_order_id,
                        event.order_total,
                        event.outstanding,
                        event.order_status,
                    )
                    .await?;
                if res.exposure_delta.is_zero() {
                    Ok(WebhookOutcome::Unchanged { order: res.order })
                } else {
                    let transition = format!("exposure adjusted by {}", res.exposure_delta);
                    Ok(WebhookOutcome::Updated { order: res.order, transition })
                }
            },
        }
    }

    /// Changes a company's credit limit. The evaluator starts rejecting new orders immediately if the new limit is
    /// below current exposure; existing orders are untouched.
    pub async fn set_company_credit_limit(
        &self,
        company_id: i64,
        new_limit: Money,
        created_by: &str,
    ) -> Result<CompanyAccount, CreditGatewayError> {
        self.db.set_company_credit_limit(company_id, new_limit, created_by).await
    }

    pub async fn set_user_credit_limit(
        &self,
        user_id: i64,
        new_limit: Option<Money>,
    ) -> Result<PortalUser, CreditGatewayError> {
        self.db.set_user_credit_limit(user_id, new_limit).await
    }

    async fn call_order_paid_hook(&self, order: &OrderRecord) {
        for emitter in &self.producers.order_paid_producer {
            debug!("🔄️📦️ Notifying order paid hook subscribers");
            emitter.publish_event(OrderPaidEvent::new(order.clone())).await;
        }
    }

    async fn call_order_flagged_hook(&self, order: &OrderRecord) {
        let note = order.review_note.clone().unwrap_or_default();
        for emitter in &self.producers.order_flagged_producer {
            debug!("🔄️🚩️ Notifying order flagged hook subscribers");
            emitter.publish_event(OrderFlaggedEvent::new(order.clone(), note.clone())).await;
        }
    }

    async fn call_credit_restored_hook(&self, order: &OrderRecord, amount: Money) {
        for emitter in &self.producers.credit_restored_producer {
            debug!("🔄️💳️ Notifying credit restored hook subscribers");
            emitter.publish_event(CreditRestoredEvent::new(order.clone(), amount)).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}

fn new_record_from_event(store: &Store, user: &PortalUser, event: &OrderEvent) -> NewOrderRecord {
    NewOrderRecord {
        store_id: store.id,
        company_id: user.company_id,
        created_by_user_id: user.id,
        shopify_order_id: event.shopify_order_id.clone(),
        currency: event.currency.clone(),
        order_total: event.order_total,
        paid_amount: event.paid_amount(),
        payment_status: event.payment_status,
        order_status: event.order_status,
    }
}
