use thiserror::Error;

use crate::{
    credit_check::{CompanyCreditSnapshot, UserCreditSnapshot},
    db_types::{CompanyAccount, CreditTransaction, OrderId, OrderRecord, PortalUser, Store},
};

/// Read-side access to stores, companies, users, orders and the credit ledger.
#[allow(async_fn_in_trait)]
pub trait AccountManagement {
    /// Fetches the store for the given shop domain, as delivered in the webhook's shop header.
    async fn fetch_store_by_domain(&self, shop_domain: &str) -> Result<Option<Store>, CreditApiError>;

    /// Fetches the portal user mapped to the given storefront customer id, if any.
    async fn fetch_user_by_customer_id(
        &self,
        store_id: i64,
        customer_reference: &str,
    ) -> Result<Option<PortalUser>, CreditApiError>;

    async fn fetch_user_by_id(&self, user_id: i64) -> Result<Option<PortalUser>, CreditApiError>;

    async fn fetch_company_by_id(&self, company_id: i64) -> Result<Option<CompanyAccount>, CreditApiError>;

    /// Fetches the order for the store's external order id. Returns `None` for orders the portal has never seen.
    async fn fetch_order_by_shopify_id(
        &self,
        store_id: i64,
        order_id: &OrderId,
    ) -> Result<Option<OrderRecord>, CreditApiError>;

    /// The company's open (pending/partial, non-cancelled) orders, i.e. the ones consuming credit.
    async fn fetch_open_orders_for_company(&self, company_id: i64) -> Result<Vec<OrderRecord>, CreditApiError>;

    /// A consistent snapshot of the company's limit and derived usage, read from committed state.
    async fn company_credit_snapshot(&self, company_id: i64) -> Result<CompanyCreditSnapshot, CreditApiError>;

    async fn user_credit_snapshot(&self, user_id: i64) -> Result<UserCreditSnapshot, CreditApiError>;

    /// The company's full append-only ledger, oldest first. Audit and debugging only; live state is derived from
    /// the order records.
    async fn credit_history_for_company(&self, company_id: i64) -> Result<Vec<CreditTransaction>, CreditApiError>;
}

#[derive(Debug, Clone, Error)]
pub enum CreditApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("The requested company (id {0}) does not exist")]
    CompanyNotFound(i64),
    #[error("The requested user (id {0}) does not exist")]
    UserNotFound(i64),
    #[error("The requested order {0} does not exist")]
    OrderDoesNotExist(OrderId),
}

impl From<sqlx::Error> for CreditApiError {
    fn from(e: sqlx::Error) -> Self {
        CreditApiError::DatabaseError(e.to_string())
    }
}
