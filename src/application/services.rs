use std::sync::Arc;

use chrono::Utc;
use solana_sdk::pubkey::Pubkey;
use tracing::{error, info, warn};

use super::responses::{
    ArbResponse, BalanceResponse, CreateSwapRequest, ExecuteResponse, ExecuteSignedRequest, HealthResponse,
    QuoteQuery, QuoteResponse, SwapTransactionRequest, SwapTransactionResponse,
};
use crate::domain::arbitrage::{Quote, QuoteApiClient, RouteEvaluator};
use crate::domain::execution::{ChainClient, StepExecutor, TransactionBuilder};
use crate::shared::errors::ArbitrageError;
use crate::shared::types::{format_sol, Amount};

/// Request handlers of the relay, independent of the HTTP framework
pub struct RelayService {
    evaluator: Arc<RouteEvaluator>,
    builder: TransactionBuilder,
    steps: StepExecutor,
    quotes: Arc<dyn QuoteApiClient>,
    min_profit: u64,
    manual_slippage_bps: u16,
}

impl RelayService {
    pub fn new(
        evaluator: Arc<RouteEvaluator>,
        builder: TransactionBuilder,
        steps: StepExecutor,
        quotes: Arc<dyn QuoteApiClient>,
        min_profit: u64,
        manual_slippage_bps: u16,
    ) -> Self {
        Self {
            evaluator,
            builder,
            steps,
            quotes,
            min_profit,
            manual_slippage_bps,
        }
    }

    pub fn chain(&self) -> &Arc<dyn ChainClient> {
        self.steps.chain()
    }

    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            status: "healthy",
            timestamp: Utc::now().to_rfc3339(),
            rpc: self.chain().endpoint(),
        }
    }

    pub async fn balance(&self, address: &str) -> BalanceResponse {
        let lookup = async {
            let owner = parse_pubkey(address)?;
            self.chain().get_balance(&owner).await.map_err(|e| e.to_string())
        };
        match lookup.await {
            Ok(lamports) => BalanceResponse {
                balance: Amount::from_lamports(lamports).to_ui(),
                error: None,
            },
            Err(e) => {
                warn!("⚠️ Balance lookup for {} failed: {}", address, e);
                BalanceResponse {
                    balance: 0.0,
                    error: Some(e),
                }
            }
        }
    }

    /// `GET /arb`
    pub async fn check_arbitrage(&self) -> ArbResponse {
        match self.evaluator.evaluate().await {
            Ok(opportunity) => {
                let profitable = opportunity.is_profitable(self.min_profit);
                ArbResponse::evaluated(&opportunity, profitable)
            }
            Err(e) => Self::evaluation_failure(e),
        }
    }

    /// `POST /create-swap-transactions`
    pub async fn create_swap_transactions(&self, request: CreateSwapRequest) -> ArbResponse {
        let user = match parse_pubkey(&request.user_public_key) {
            Ok(user) => user,
            Err(e) => return ArbResponse::error(e),
        };

        let opportunity = match self.evaluator.evaluate().await {
            Ok(opportunity) => opportunity,
            Err(e) => return Self::evaluation_failure(e),
        };
        if let Err(e) = opportunity.ensure_profitable(self.min_profit) {
            info!("📉 {}", e);
            return ArbResponse::evaluated(&opportunity, false);
        }

        info!(
            "💰 Profitable! Expected profit: {} SOL, building transactions for {}",
            format_sol(opportunity.profit_lamports),
            user
        );
        match self.builder.build_unsigned_transactions(&opportunity, &user).await {
            Ok(set) => ArbResponse::with_transactions(set),
            Err(e) => {
                error!("❌ Failed to create swap transactions: {}", e);
                ArbResponse::error(e.to_string())
            }
        }
    }

    /// `POST /execute-signed-transaction`
    pub async fn execute_signed_transaction(&self, request: ExecuteSignedRequest) -> ExecuteResponse {
        let step = request.step;
        if !(1..=3).contains(&step) {
            return ExecuteResponse::failure(step, format!("Invalid step {}, expected 1 to 3", step));
        }
        let owner = match parse_pubkey(&request.user_public_key) {
            Ok(owner) => owner,
            Err(e) => return ExecuteResponse::failure(step, e),
        };

        info!("📤 Executing signed transaction for step {}...", step);
        match self.steps.execute_step(&request.signed_transaction, step, &owner).await {
            Ok(result) => ExecuteResponse::success(result),
            Err(e) => {
                error!("❌ Step {} failed: {}", step, e);
                ExecuteResponse::failure(step, e.to_string())
            }
        }
    }

    /// `GET /quote` for manual swaps
    pub async fn quote(&self, query: QuoteQuery) -> QuoteResponse {
        match self.manual_quote(&query).await {
            Ok(quote) => quote.into(),
            Err(e) => QuoteResponse::failure(e),
        }
    }

    /// `POST /swap-transaction`: the manual swap, unsigned. The signed
    /// result goes through `/execute-signed-transaction` as step 1.
    pub async fn swap_transaction(&self, request: SwapTransactionRequest) -> SwapTransactionResponse {
        let user = match parse_pubkey(&request.user_public_key) {
            Ok(user) => user,
            Err(e) => return SwapTransactionResponse::failure(e),
        };
        let quote = match self.manual_quote(&request.quote_query()).await {
            Ok(quote) => quote,
            Err(e) => return SwapTransactionResponse::failure(e),
        };

        info!(
            "💱 Building manual swap {} → {} ({} in, {} out) for {}",
            quote.input_mint, quote.output_mint, quote.in_amount, quote.out_amount, user
        );
        match self.builder.build_single(&quote, &user).await {
            Ok(transaction) => SwapTransactionResponse {
                success: true,
                quote: Some(quote.into()),
                swap_transaction: Some(transaction),
                error: None,
            },
            Err(e) => {
                error!("❌ Failed to build manual swap: {}", e);
                SwapTransactionResponse::failure(e.to_string())
            }
        }
    }

    async fn manual_quote(&self, query: &QuoteQuery) -> Result<Quote, String> {
        let input = parse_pubkey(&query.input_mint)?;
        let output = parse_pubkey(&query.output_mint)?;
        if query.amount == 0 {
            return Err("amount must be positive".to_string());
        }
        let slippage_bps = query.slippage_bps.unwrap_or(self.manual_slippage_bps);

        self.quotes
            .get_quote(&input, &output, query.amount, slippage_bps)
            .await
            .map_err(|e| e.to_string())
    }

    fn evaluation_failure(err: ArbitrageError) -> ArbResponse {
        match err {
            ArbitrageError::NoRouteFound(reason) => {
                warn!("❌ No route: {}", reason);
                ArbResponse::no_route()
            }
            other => {
                error!("❌ Arbitrage check failed: {}", other);
                ArbResponse::error(other.to_string())
            }
        }
    }
}

fn parse_pubkey(value: &str) -> Result<Pubkey, String> {
    value
        .trim()
        .parse::<Pubkey>()
        .map_err(|e| format!("Invalid public key {}: {}", value, e))
}
