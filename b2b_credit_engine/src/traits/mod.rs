//! Behaviour contracts for credit gateway backends.
//!
//! [`CreditGatewayDatabase`] covers the write side: every method is one atomic, idempotent unit of work (the credit
//! transaction applier of the engine). [`AccountManagement`] covers the read side used by admission checks, admin
//! overviews and the reconciler's lookups.

mod account_management;
mod credit_gateway_database;
mod data_objects;

pub use account_management::{AccountManagement, CreditApiError};
pub use credit_gateway_database::{CreditGatewayDatabase, CreditGatewayError};
pub use data_objects::{FinalizeOutcome, InsertOrderOutcome, RestoreOutcome, SyncOutcome};
