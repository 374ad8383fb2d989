//! # B2B portal server
//!
//! The HTTP surface of the credit gateway. It is responsible for:
//! * Listening for incoming order lifecycle webhooks from the storefront and feeding them to the credit engine.
//! * Serving the interactive (checkout-time) credit admission check.
//! * Serving the admin credit-limit endpoints.
//!
//! ## Configuration
//! The server is configured via `BCG_*` environment variables. See [config](config/index.html).
//!
//! ## Routes
//! * `/health`: health check.
//! * `/webhook/orders_create`, `/webhook/orders_updated`, `/webhook/orders_edited`: order lifecycle webhooks,
//!   HMAC-verified. Responses stay in the 200 range for everything except signature failures and transient ledger
//!   conflicts, so the transport does not redeliver events we have already absorbed.
//! * `/api/credit/validate`: interactive credit admission.
//! * `/api/companies/{id}/credit`, `/api/companies/{id}/credit_limit`, `/api/users/{id}/credit_limit`: admin
//!   credit views and limit changes.

pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod shopify_order;

#[cfg(test)]
mod endpoint_tests;
