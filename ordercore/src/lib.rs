//! `OrderCore` - Atomic order creation and inventory consistency engine
//!
//! This library implements order placement as a single conditioned
//! multi-record write: the order insert and every stock decrement commit
//! together or not at all, so inventory can never oversell and a retried
//! submission replays its original outcome instead of charging twice.
//!
//! The pieces compose around the [`store::CommerceStore`] trait:
//!
//! - [`validation::OrderItemValidator`] resolves products and runs the
//!   advisory stock pre-check
//! - [`pricing::PricingCalculator`] produces the deterministic price
//!   breakdown
//! - [`coordinator::OrderTransactionCoordinator`] owns the atomic commit,
//!   outcome classification, and bounded retry
//! - [`status::OrderStatusMachine`] applies lifecycle transitions with
//!   optimistic concurrency
//! - [`query::OrderQueryService`] serves lookups and cursor pagination
//! - [`cart::CartClearer`] clears purchased items post-commit, best effort
//! - [`service::OrderService`] wires the common path together

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cart;
pub mod catalog;
pub mod coordinator;
pub mod errors;
pub mod order;
pub mod pricing;
pub mod query;
pub mod service;
pub mod status;
pub mod store;
pub mod types;
pub mod validation;
