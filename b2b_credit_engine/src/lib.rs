//! B2B Credit Engine
//!
//! The credit engine tracks a company's (and optionally a user's) available credit against outstanding B2B orders,
//! decides whether new orders may be admitted, and reconciles credit state as the storefront delivers asynchronous
//! order lifecycle webhooks. Delivery is at-least-once: events arrive duplicated, out of order, and concurrently, so
//! every ledger mutation here is idempotent and derived from old-state/new-state comparison rather than event
//! counting.
//!
//! The crate is divided into two main sections:
//! 1. Database management and control ([`mod@sqlite`]). SQLite is the default backend (Postgres is feature-flagged).
//!    You should never need to access the database directly; use the public API instead. The exception is the data
//!    types used in the database, which are defined in [`db_types`] and are public.
//! 2. The engine public API ([`mod@cge_api`]). [`CreditFlowApi`] handles order lifecycle events and administrative
//!    credit adjustments; [`AccountsApi`] serves credit snapshots, interactive admission checks and ledger history.
//!    Backends implement the traits in [`traits`] to plug in.
//!
//! The engine also emits events ([`events`]) when orders settle, get flagged for manual review, or have credit
//! restored, so that collaborators (mail, storefront write-backs) can subscribe without entangling the core.
pub mod credit_check;
pub mod db_types;
pub mod events;
pub mod shopify_types;
pub mod traits;

mod cge_api;
#[cfg(feature = "sqlite")]
mod sqlite;
#[cfg(feature = "test_utils")]
pub mod test_utils;

pub use cge_api::{
    accounts_api::AccountsApi,
    credit_flow_api::CreditFlowApi,
    credit_objects,
    order_objects,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{AccountManagement, CreditApiError, CreditGatewayDatabase, CreditGatewayError};
