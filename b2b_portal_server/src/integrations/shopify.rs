use b2b_credit_engine::{
    db_types::OrderId,
    shopify_types::{order_status_from_fulfillment, outstanding_or_default, payment_status_from_financial, OrderEvent},
};
use bcg_common::Money;
use chrono::{DateTime, Utc};
use log::trace;
use thiserror::Error;

use crate::shopify_order::ShopifyOrderEvent;

#[derive(Debug, Error)]
pub enum OrderConversionError {
    #[error("The payload is missing a required correlation field: {0}")]
    MissingField(&'static str),
    #[error("The payload contained invalid data. {0}")]
    FormatError(String),
}

/// Normalizes a raw storefront order payload into the engine's typed event.
///
/// Missing optional fields resolve to the documented defaults; a payload without its correlation fields (order id is
/// enforced by deserialization, customer id here) cannot be reconciled and is rejected so the handler can log and
/// acknowledge it.
pub fn order_event_from_payload(payload: ShopifyOrderEvent) -> Result<OrderEvent, OrderConversionError> {
    trace!("Converting storefront payload to OrderEvent: {payload:?}");
    let customer = payload.customer.ok_or(OrderConversionError::MissingField("customer.id"))?;
    let cancelled_at = parse_timestamp(payload.cancelled_at.as_deref())?;
    let updated_at = parse_timestamp(payload.updated_at.as_deref())?;
    let payment_status = payment_status_from_financial(payload.financial_status.as_deref());
    let order_status = order_status_from_fulfillment(payload.fulfillment_status.as_deref(), cancelled_at.is_some());
    // current_total_price reflects order edits; fall back to the original total.
    let total = payload
        .current_total_price
        .or(payload.total_price)
        .ok_or(OrderConversionError::MissingField("total_price"))?;
    let order_total = parse_price(&total)?;
    let outstanding = match payload.total_outstanding {
        Some(s) => Some(parse_price(&s)?),
        None => None,
    };
    let outstanding = outstanding_or_default(outstanding, order_total, payment_status);
    Ok(OrderEvent {
        shopify_order_id: OrderId::from(payload.id),
        customer_reference: customer.id.to_string(),
        currency: payload.currency.unwrap_or_else(|| "USD".to_string()),
        order_total,
        outstanding,
        payment_status,
        order_status,
        cancelled_at,
        updated_at,
    })
}

fn parse_price(value: &str) -> Result<Money, OrderConversionError> {
    value.parse().map_err(|e| OrderConversionError::FormatError(format!("{e}")))
}

fn parse_timestamp(value: Option<&str>) -> Result<Option<DateTime<Utc>>, OrderConversionError> {
    value
        .map(|s| s.parse::<DateTime<Utc>>().map_err(|e| OrderConversionError::FormatError(format!("{s}: {e}"))))
        .transpose()
}
