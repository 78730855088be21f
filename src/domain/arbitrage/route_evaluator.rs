//! Chains three quotes over the configured route

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{ArbitrageOpportunity, Quote, QuoteApiClient, TriangularRoute};
use crate::shared::errors::ArbitrageError;
use crate::shared::types::format_units;

pub struct RouteEvaluator {
    quotes: Arc<dyn QuoteApiClient>,
    route: TriangularRoute,
    amount: u64,
    slippage_bps: u16,
}

impl RouteEvaluator {
    pub fn new(
        quotes: Arc<dyn QuoteApiClient>,
        route: TriangularRoute,
        amount: u64,
        slippage_bps: u16,
    ) -> Self {
        Self {
            quotes,
            route,
            amount,
            slippage_bps,
        }
    }

    pub fn route(&self) -> &TriangularRoute {
        &self.route
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    /// Quote every hop in order, feeding each output into the next input.
    pub async fn evaluate(&self) -> Result<ArbitrageOpportunity, ArbitrageError> {
        if self.amount == 0 {
            return Err(ArbitrageError::InvalidAmount);
        }

        info!("🔍 Checking {}...", self.route.description());

        let mut amount = self.amount;
        let mut quotes: Vec<Quote> = Vec::with_capacity(3);
        for hop in self.route.hops() {
            let quote = self
                .quotes
                .get_quote(&hop.input.mint, &hop.output.mint, amount, self.slippage_bps)
                .await?;
            if quote.out_amount == 0 {
                return Err(ArbitrageError::NoRouteFound(format!(
                    "hop {} ({}) returned no output",
                    hop.step,
                    hop.description()
                )));
            }
            debug!(
                "   Hop {} {}: {} → {}",
                hop.step,
                hop.description(),
                format_units(amount as i128, hop.input.decimals),
                format_units(quote.out_amount as i128, hop.output.decimals)
            );
            amount = quote.out_amount;
            quotes.push(quote);
        }

        let quotes: [Quote; 3] = quotes
            .try_into()
            .map_err(|_| ArbitrageError::InvalidRoute("expected three quotes".to_string()))?;
        let opportunity = ArbitrageOpportunity::from_quotes(quotes)?;

        let start = self.route.start_token();
        info!(
            "💰 Profit: {} ({} {})",
            opportunity.profit_lamports,
            format_units(opportunity.profit_lamports, start.decimals),
            start.symbol
        );
        Ok(opportunity)
    }

    /// Like [`evaluate`](Self::evaluate) but collapses every failure to `None`.
    pub async fn check_arbitrage(&self) -> Option<ArbitrageOpportunity> {
        match self.evaluate().await {
            Ok(opportunity) => Some(opportunity),
            Err(e) => {
                warn!("❌ Arbitrage check failed: {}", e);
                None
            }
        }
    }
}
