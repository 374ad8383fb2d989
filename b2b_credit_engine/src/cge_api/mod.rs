//! # Credit engine public API
//!
//! The API is modular so that clients can pick the functionality they need, and different parts could run against
//! different backends.
//!
//! * [`credit_flow_api`] is the primary API for reconciling order lifecycle events against the credit ledger, and
//!   for administrative credit-limit changes.
//! * [`accounts_api`] serves credit snapshots, the interactive (checkout-time) admission check, ledger history and
//!   the audit replay.
//!
//! The pattern for using the APIs is the same: construct an instance by supplying a backend that implements the
//! required traits.
//!
//! ```rust,ignore
//! use b2b_credit_engine::{AccountsApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/bcg.db", 5).await?;
//! // SqliteDatabase implements AccountManagement
//! let api = AccountsApi::new(db);
//! let overview = api.company_credit_overview(company_id).await?;
//! ```

pub mod accounts_api;
pub mod credit_flow_api;
pub mod credit_objects;
pub mod order_objects;
