//! Trihop - three-hop Jupiter arbitrage relay and auto-bot for Solana
//! Built with Domain-Driven Design principles

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export main types for convenience
pub use application::{BotController, RelayService};
pub use domain::arbitrage::{ArbitrageOpportunity, RouteEvaluator, TriangularRoute};
pub use domain::execution::{ExecutionCoordinator, ExecutionOutcome, TransactionBuilder};
