use bcg_common::Money;
use serde::{Deserialize, Serialize};

use crate::{
    credit_check::{CompanyCreditSnapshot, LimitingFactor, UserCreditSnapshot},
    db_types::{CompanyAccount, CreditTransaction, TransactionType},
};

/// Company-side credit figures as shown to a checkout-time caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyCreditInfo {
    pub company_id: i64,
    pub credit_limit: Money,
    pub used_credit: Money,
    pub available_credit: Money,
}

impl From<&CompanyCreditSnapshot> for CompanyCreditInfo {
    fn from(snapshot: &CompanyCreditSnapshot) -> Self {
        Self {
            company_id: snapshot.company_id,
            credit_limit: snapshot.credit_limit,
            used_credit: snapshot.used_credit,
            available_credit: snapshot.available_credit(),
        }
    }
}

/// User-side credit figures. Only present when the user carries a personal sub-limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCreditInfo {
    pub user_id: i64,
    pub credit_limit: Money,
    pub credit_used: Money,
    pub available_credit: Money,
}

impl UserCreditInfo {
    pub fn from_snapshot(snapshot: &UserCreditSnapshot) -> Option<Self> {
        let limit = snapshot.credit_limit?;
        Some(Self {
            user_id: snapshot.user_id,
            credit_limit: limit,
            credit_used: snapshot.credit_used,
            available_credit: limit - snapshot.credit_used,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditInfo {
    pub company: CompanyCreditInfo,
    pub user: Option<UserCreditInfo>,
}

/// The outcome of an interactive credit admission check, consumed by the checkout-time caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditValidationResult {
    pub can_create: bool,
    pub limiting_factor: Option<LimitingFactor>,
    pub message: String,
    pub credit_info: CreditInfo,
}

/// Admin-facing summary of a company's credit position.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyCreditOverview {
    pub company: CompanyAccount,
    pub used_credit: Money,
    pub available_credit: Money,
    pub open_orders: usize,
}

/// Result of replaying a company's ledger against its live order book.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerAudit {
    pub derived_exposure: Money,
    pub replayed_exposure: Money,
    pub consistent: bool,
}

/// Replays order-linked ledger entries in order and returns the exposure they reproduce.
///
/// Administrative entries (no order id) snapshot limit changes and contribute nothing. The result must match the
/// exposure derived from the live order records; a mismatch means the ledger and order book have diverged.
pub fn replay_exposure(history: &[CreditTransaction]) -> Money {
    history.iter().filter(|t| t.order_id.is_some()).fold(Money::ZERO, |acc, t| match t.transaction_type {
        TransactionType::Reserve => acc + t.credit_amount,
        TransactionType::Deduct | TransactionType::Refund | TransactionType::Restore => acc - t.credit_amount,
        // Adjust entries carry a signed delta.
        TransactionType::Adjust => acc + t.credit_amount,
    })
}
