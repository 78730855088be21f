//! Builds one unsigned swap transaction per hop

use std::sync::Arc;

use solana_sdk::pubkey::Pubkey;
use tracing::{error, info};

use super::{SwapApiClient, UnsignedTransaction, UnsignedTransactionSet};
use crate::domain::arbitrage::{ArbitrageOpportunity, Quote, TriangularRoute};
use crate::shared::errors::ExecutionError;

pub struct TransactionBuilder {
    swaps: Arc<dyn SwapApiClient>,
    route: TriangularRoute,
    wrap_and_unwrap_sol: bool,
}

impl TransactionBuilder {
    pub fn new(swaps: Arc<dyn SwapApiClient>, route: TriangularRoute, wrap_and_unwrap_sol: bool) -> Self {
        Self {
            swaps,
            route,
            wrap_and_unwrap_sol,
        }
    }

    /// One swap outside the route, for manual trades
    pub async fn build_single(&self, quote: &Quote, user: &Pubkey) -> Result<String, ExecutionError> {
        self.swaps
            .build_swap_transaction(quote, user, self.wrap_and_unwrap_sol)
            .await
    }

    /// All three or nothing. A failed hop discards the hops already built.
    pub async fn build_unsigned_transactions(
        &self,
        opportunity: &ArbitrageOpportunity,
        payer: &Pubkey,
    ) -> Result<UnsignedTransactionSet, ExecutionError> {
        info!("🚀 Creating unsigned transactions for {}...", self.route.description());

        let mut transactions = Vec::with_capacity(3);
        for (hop, quote) in self.route.hops().iter().zip(opportunity.quotes.iter()) {
            let transaction = self
                .swaps
                .build_swap_transaction(quote, payer, self.wrap_and_unwrap_sol)
                .await
                .map_err(|e| {
                    error!("❌ Failed to build step {} ({}): {}", hop.step, hop.description(), e);
                    match e {
                        ExecutionError::Build(reason) => {
                            ExecutionError::Build(format!("step {}: {}", hop.step, reason))
                        }
                        other => ExecutionError::Build(format!("step {}: {}", hop.step, other)),
                    }
                })?;

            transactions.push(UnsignedTransaction {
                step: hop.step,
                transaction,
                description: hop.description(),
            });
        }

        info!("✅ Built {} unsigned transactions", transactions.len());
        Ok(UnsignedTransactionSet {
            expected_profit: opportunity.profit_lamports,
            token_amounts: opportunity.token_amounts,
            transactions,
        })
    }
}
