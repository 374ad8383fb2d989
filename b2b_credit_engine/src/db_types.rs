use std::{fmt::Display, str::FromStr};

use bcg_common::Money;
use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid status value: {0}")]
pub struct ConversionError(String);

//--------------------------------------        OrderId        -------------------------------------------------------
/// The storefront's order id, used as the external correlation key. Unique per store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<i64> for OrderId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------    PaymentStatus      -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// No payment has been received against the order.
    Pending,
    /// Part of the order total has been paid; the remainder is still covered by credit.
    Partial,
    /// The order has been settled in full. It no longer consumes credit.
    Paid,
    /// The order was cancelled, refunded or voided. It no longer consumes credit.
    Cancelled,
}

impl PaymentStatus {
    /// Open orders are the ones that count against a company's credit exposure.
    pub fn is_open(&self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Partial)
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "Pending"),
            PaymentStatus::Partial => write!(f, "Partial"),
            PaymentStatus::Paid => write!(f, "Paid"),
            PaymentStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Partial" => Ok(Self::Partial),
            "Paid" => Ok(Self::Paid),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

impl From<String> for PaymentStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid payment status: {value}. But this conversion cannot fail. Defaulting to Pending");
            PaymentStatus::Pending
        })
    }
}

//--------------------------------------     OrderStatus       -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Created in the portal but not yet submitted to the storefront.
    Draft,
    /// Submitted and awaiting fulfilment.
    Submitted,
    /// Fulfilment has started.
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Draft => write!(f, "Draft"),
            OrderStatus::Submitted => write!(f, "Submitted"),
            OrderStatus::Processing => write!(f, "Processing"),
            OrderStatus::Shipped => write!(f, "Shipped"),
            OrderStatus::Delivered => write!(f, "Delivered"),
            OrderStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Draft" => Ok(Self::Draft),
            "Submitted" => Ok(Self::Submitted),
            "Processing" => Ok(Self::Processing),
            "Shipped" => Ok(Self::Shipped),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Submitted");
            OrderStatus::Submitted
        })
    }
}

//--------------------------------------   TransactionType     -------------------------------------------------------
/// The direction and intent of an append-only ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum TransactionType {
    /// Provisional allocation of credit against a new order. Increases exposure.
    Reserve,
    /// Settlement of a reservation once payment is confirmed. Decreases exposure.
    Deduct,
    /// Release of reserved credit back to the ledger. Decreases exposure.
    Refund,
    /// Release of the exact previously-reserved amount on cancellation or edit. Decreases exposure.
    Restore,
    /// Signed correction: partial-payment recomputations (order-linked) or administrative limit changes (no order).
    Adjust,
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Reserve => write!(f, "Reserve"),
            TransactionType::Deduct => write!(f, "Deduct"),
            TransactionType::Refund => write!(f, "Refund"),
            TransactionType::Restore => write!(f, "Restore"),
            TransactionType::Adjust => write!(f, "Adjust"),
        }
    }
}

impl FromStr for TransactionType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Reserve" => Ok(Self::Reserve),
            "Deduct" => Ok(Self::Deduct),
            "Refund" => Ok(Self::Refund),
            "Restore" => Ok(Self::Restore),
            "Adjust" => Ok(Self::Adjust),
            s => Err(ConversionError(format!("Invalid transaction type: {s}"))),
        }
    }
}

impl From<String> for TransactionType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid transaction type: {value}. But this conversion cannot fail. Defaulting to Adjust");
            TransactionType::Adjust
        })
    }
}

//--------------------------------------      UserStatus       -------------------------------------------------------
/// Membership status of a portal user within their company. Stored in the upstream's uppercase convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum UserStatus {
    #[sqlx(rename = "PENDING")]
    Pending,
    #[sqlx(rename = "APPROVED")]
    Approved,
    #[sqlx(rename = "REJECTED")]
    Rejected,
}

impl Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserStatus::Pending => write!(f, "PENDING"),
            UserStatus::Approved => write!(f, "APPROVED"),
            UserStatus::Rejected => write!(f, "REJECTED"),
        }
    }
}

impl FromStr for UserStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            s => Err(ConversionError(format!("Invalid user status: {s}"))),
        }
    }
}

//--------------------------------------        Store          -------------------------------------------------------
/// One row per installed shop. Webhook deliveries identify the shop by domain.
#[derive(Debug, Clone, FromRow)]
pub struct Store {
    pub id: i64,
    pub shop_domain: String,
    pub access_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------    CompanyAccount     -------------------------------------------------------
/// A B2B company's credit account. Used credit is never stored here; it is derived from the open orders, so the
/// ledger cannot drift from the order book.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CompanyAccount {
    pub id: i64,
    pub store_id: i64,
    pub external_company_id: String,
    pub name: String,
    pub credit_limit: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      PortalUser       -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PortalUser {
    pub id: i64,
    pub store_id: i64,
    pub company_id: i64,
    /// The storefront customer id this portal user maps to.
    pub external_customer_id: String,
    pub is_active: bool,
    pub status: UserStatus,
    /// Optional personal sub-limit. Unset means only the company cap applies.
    pub credit_limit: Option<Money>,
    /// The user's own unpaid order total.
    pub credit_used: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PortalUser {
    /// Only active, approved members place B2B orders. Everyone else's storefront orders are ignored.
    pub fn participates(&self) -> bool {
        self.is_active && self.status == UserStatus::Approved
    }
}

//--------------------------------------     OrderRecord       -------------------------------------------------------
/// One B2B order. Never deleted; cancellation is a status. `paid_amount + remaining_balance == order_total` holds
/// after every processed event.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: i64,
    pub store_id: i64,
    pub company_id: i64,
    pub created_by_user_id: i64,
    pub shopify_order_id: OrderId,
    pub currency: String,
    pub order_total: Money,
    pub paid_amount: Money,
    /// The credit this order currently consumes: the unpaid portion while the order is open, zero once it is settled
    /// or cancelled.
    pub credit_used: Money,
    pub remaining_balance: Money,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    pub flagged_for_review: bool,
    pub review_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------    NewOrderRecord     -------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrderRecord {
    pub store_id: i64,
    pub company_id: i64,
    pub created_by_user_id: i64,
    pub shopify_order_id: OrderId,
    pub currency: String,
    pub order_total: Money,
    pub paid_amount: Money,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
}

impl NewOrderRecord {
    /// The unpaid portion, i.e. the credit a reservation for this order must cover.
    pub fn outstanding(&self) -> Money {
        self.order_total - self.paid_amount
    }
}

//--------------------------------------       NewStore        -------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewStore {
    pub shop_domain: String,
    pub access_token: String,
}

//--------------------------------------  NewCompanyAccount    -------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewCompanyAccount {
    pub store_id: i64,
    pub external_company_id: String,
    pub name: String,
    pub credit_limit: Money,
}

//--------------------------------------    NewPortalUser      -------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewPortalUser {
    pub store_id: i64,
    pub company_id: i64,
    pub external_customer_id: String,
    pub is_active: bool,
    pub status: UserStatus,
    pub credit_limit: Option<Money>,
}

//--------------------------------------  CreditTransaction    -------------------------------------------------------
/// Append-only ledger entry. For order-linked entries, `previous_balance`/`new_balance` snapshot the company's
/// credit exposure around the mutation; for administrative limit changes (`order_id` is null) they snapshot the
/// limit itself. Replaying the order-linked entries reproduces the company's current used credit.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CreditTransaction {
    pub id: i64,
    pub company_id: i64,
    pub order_id: Option<i64>,
    pub transaction_type: TransactionType,
    pub credit_amount: Money,
    pub previous_balance: Money,
    pub new_balance: Money,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------  NewCreditTransaction -------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewCreditTransaction {
    pub company_id: i64,
    pub order_id: Option<i64>,
    pub transaction_type: TransactionType,
    pub credit_amount: Money,
    pub previous_balance: Money,
    pub new_balance: Money,
    pub created_by: String,
}
