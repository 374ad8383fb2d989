use std::fmt::Debug;

use bcg_common::Money;
use log::*;

use crate::{
    cge_api::credit_objects::{
        replay_exposure,
        CompanyCreditInfo,
        CompanyCreditOverview,
        CreditInfo,
        CreditValidationResult,
        LedgerAudit,
        UserCreditInfo,
    },
    credit_check::evaluate,
    db_types::{CreditTransaction, Store},
    traits::{AccountManagement, CreditApiError},
};

/// Read-side API: credit snapshots, the interactive admission check, ledger history and the audit replay.
pub struct AccountsApi<B> {
    db: B,
}

impl<B> Debug for AccountsApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountsApi")
    }
}

impl<B> AccountsApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> AccountsApi<B>
where B: AccountManagement
{
    pub async fn store_by_domain(&self, shop_domain: &str) -> Result<Option<Store>, CreditApiError> {
        self.db.fetch_store_by_domain(shop_domain).await
    }

    /// The interactive (checkout-time) admission check.
    ///
    /// The ledger is re-read from committed state at decision time; a snapshot the caller obtained earlier is never
    /// trusted for the final admit decision.
    pub async fn validate_order_creation(
        &self,
        company_id: i64,
        user_id: i64,
        amount: Money,
    ) -> Result<CreditValidationResult, CreditApiError> {
        let company = self.db.company_credit_snapshot(company_id).await?;
        let user = self.db.user_credit_snapshot(user_id).await?;
        let decision = evaluate(&company, Some(&user), amount);
        debug!(
            "🧮️ Admission check for company #{company_id}, user #{user_id}, amount {amount}: admit={}",
            decision.admit
        );
        Ok(CreditValidationResult {
            can_create: decision.admit,
            limiting_factor: decision.limiting_factor,
            message: decision.message,
            credit_info: CreditInfo {
                company: CompanyCreditInfo::from(&company),
                user: UserCreditInfo::from_snapshot(&user),
            },
        })
    }

    pub async fn company_credit_overview(&self, company_id: i64) -> Result<CompanyCreditOverview, CreditApiError> {
        let snapshot = self.db.company_credit_snapshot(company_id).await?;
        let company =
            self.db.fetch_company_by_id(company_id).await?.ok_or(CreditApiError::CompanyNotFound(company_id))?;
        let open_orders = self.db.fetch_open_orders_for_company(company_id).await?;
        Ok(CompanyCreditOverview {
            company,
            used_credit: snapshot.used_credit,
            available_credit: snapshot.available_credit(),
            open_orders: open_orders.len(),
        })
    }

    pub async fn credit_history(&self, company_id: i64) -> Result<Vec<CreditTransaction>, CreditApiError> {
        self.db.credit_history_for_company(company_id).await
    }

    /// Cross-checks the append-only ledger against the live order book. A mismatch indicates a bug, not a state to
    /// repair automatically.
    pub async fn audit_company_ledger(&self, company_id: i64) -> Result<LedgerAudit, CreditApiError> {
        let snapshot = self.db.company_credit_snapshot(company_id).await?;
        let history = self.db.credit_history_for_company(company_id).await?;
        let replayed = replay_exposure(&history);
        let consistent = replayed == snapshot.used_credit;
        if !consistent {
            error!(
                "🧮️ Ledger replay for company #{company_id} produced {replayed} but the order book says {}",
                snapshot.used_credit
            );
        }
        Ok(LedgerAudit { derived_exposure: snapshot.used_credit, replayed_exposure: replayed, consistent })
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
