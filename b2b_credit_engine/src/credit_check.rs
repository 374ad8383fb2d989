//! The credit evaluator: a pure admission decision over a consistent ledger snapshot.
//!
//! Callers are responsible for snapshot consistency. Interactive admission re-reads committed state at decision
//! time; the transaction applier re-evaluates inside its own database transaction rather than trusting an earlier
//! read.

use bcg_common::Money;
use serde::{Deserialize, Serialize};

/// A point-in-time view of a company's ledger.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CompanyCreditSnapshot {
    pub company_id: i64,
    pub credit_limit: Money,
    /// Sum of `remaining_balance` over the company's open (pending/partial) orders.
    pub used_credit: Money,
}

impl CompanyCreditSnapshot {
    /// May be negative after an administrator lowers the limit below current usage. The evaluator rejects new
    /// orders in that state; it never repairs it.
    pub fn available_credit(&self) -> Money {
        self.credit_limit - self.used_credit
    }
}

/// A point-in-time view of a user's personal sub-limit, if they have one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UserCreditSnapshot {
    pub user_id: i64,
    pub credit_limit: Option<Money>,
    pub credit_used: Money,
}

impl UserCreditSnapshot {
    /// `None` when the user has no personal cap and only the company limit applies.
    pub fn available_credit(&self) -> Option<Money> {
        self.credit_limit.map(|limit| limit - self.credit_used)
    }
}

/// Whichever credit boundary caused a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitingFactor {
    Company,
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditDecision {
    pub admit: bool,
    pub limiting_factor: Option<LimitingFactor>,
    pub message: String,
}

impl CreditDecision {
    fn admitted() -> Self {
        Self { admit: true, limiting_factor: None, message: "Sufficient credit available".to_string() }
    }

    fn rejected(factor: LimitingFactor, message: String) -> Self {
        Self { admit: false, limiting_factor: Some(factor), message }
    }
}

/// Decides whether an order of `amount` may be admitted against the given snapshots.
///
/// The company check runs first; the user check only applies when the user carries a personal sub-limit. A zero
/// amount always admits. No side effects.
pub fn evaluate(
    company: &CompanyCreditSnapshot,
    user: Option<&UserCreditSnapshot>,
    amount: Money,
) -> CreditDecision {
    if amount.is_zero() {
        return CreditDecision::admitted();
    }
    let available = company.available_credit();
    if available < amount {
        return CreditDecision::rejected(
            LimitingFactor::Company,
            format!(
                "Order of {amount} exceeds the company's available credit of {} (limit {})",
                available.or_zero(),
                company.credit_limit
            ),
        );
    }
    if let Some(user_available) = user.and_then(UserCreditSnapshot::available_credit) {
        if user_available < amount {
            return CreditDecision::rejected(
                LimitingFactor::User,
                format!("Order of {amount} exceeds your personal available credit of {}", user_available.or_zero()),
            );
        }
    }
    CreditDecision::admitted()
}
