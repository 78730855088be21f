//! Arbitrage domain - quotes, the three-hop route and its evaluation

pub mod route;
pub mod route_evaluator;

pub use route::{Hop, TriangularRoute};
pub use route_evaluator::RouteEvaluator;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use solana_sdk::pubkey::Pubkey;

use crate::shared::errors::ArbitrageError;
use crate::shared::types::TokenAmounts;

/// Priced conversion estimate for one hop
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    pub in_amount: u64,
    pub out_amount: u64,
    pub slippage_bps: u16,
    pub price_impact_pct: Option<String>,
    pub route_labels: Vec<String>,
    /// Aggregator response, forwarded verbatim when building the swap
    pub raw: serde_json::Value,
}

/// Port for price quote providers
#[async_trait]
pub trait QuoteApiClient: Send + Sync {
    /// Quote `amount` of `input` into `output`. Any failure is a missing route.
    async fn get_quote(
        &self,
        input: &Pubkey,
        output: &Pubkey,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<Quote, ArbitrageError>;
}

/// Three chained quotes and the integer profit of running them
#[derive(Debug, Clone)]
pub struct ArbitrageOpportunity {
    pub id: String,
    pub quotes: [Quote; 3],
    pub profit_lamports: i128,
    pub token_amounts: TokenAmounts,
    pub timestamp: DateTime<Utc>,
}

impl ArbitrageOpportunity {
    /// Chain-check the quotes and compute `out(hop3) - in(hop1)`.
    pub fn from_quotes(quotes: [Quote; 3]) -> Result<Self, ArbitrageError> {
        for pair in quotes.windows(2) {
            if pair[1].in_amount != pair[0].out_amount || pair[1].input_mint != pair[0].output_mint {
                return Err(ArbitrageError::InvalidRoute(format!(
                    "hop input {} {} does not match previous output {} {}",
                    pair[1].in_amount, pair[1].input_mint, pair[0].out_amount, pair[0].output_mint
                )));
            }
        }
        if quotes[2].output_mint != quotes[0].input_mint {
            return Err(ArbitrageError::InvalidRoute("route does not return to the start asset".to_string()));
        }

        let profit_lamports = quotes[2].out_amount as i128 - quotes[0].in_amount as i128;
        let token_amounts = TokenAmounts {
            start: quotes[0].in_amount,
            after_first_hop: quotes[0].out_amount,
            after_second_hop: quotes[1].out_amount,
            end: quotes[2].out_amount,
        };

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            quotes,
            profit_lamports,
            token_amounts,
            timestamp: Utc::now(),
        })
    }

    /// Relay decision, strict
    pub fn is_profitable(&self, min_profit: u64) -> bool {
        self.profit_lamports > min_profit as i128
    }

    /// Bot auto-execution decision, inclusive
    pub fn meets_threshold(&self, threshold: u64) -> bool {
        self.profit_lamports >= threshold as i128
    }

    pub fn ensure_profitable(&self, min_profit: u64) -> Result<(), ArbitrageError> {
        if self.is_profitable(min_profit) {
            Ok(())
        } else {
            Err(ArbitrageError::NotProfitable {
                profit: self.profit_lamports,
                threshold: min_profit,
            })
        }
    }
}
