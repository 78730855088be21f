//! JSON request and response bodies of the relay

use serde::{Deserialize, Serialize};

use super::bot_controller::BotStatus;
use crate::domain::arbitrage::{ArbitrageOpportunity, Quote};
use crate::domain::execution::{ExecutionResult, TradeRecord, UnsignedTransactionSet};
use crate::shared::types::TokenAmounts;

pub const NO_ROUTES_FOUND: &str = "No routes found";
pub const NOT_ENOUGH_PROFIT: &str = "Not enough profit";
pub const PROFITABLE: &str = "Profitable opportunity found";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub rpc: String,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub balance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDto {
    pub step: u8,
    pub transaction: String,
    pub description: String,
}

/// Body of `/arb` and `/create-swap-transactions`
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArbResponse {
    pub profitable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_amounts: Option<TokenAmounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transactions: Option<Vec<TransactionDto>>,
}

impl ArbResponse {
    pub fn no_route() -> Self {
        Self::error(NO_ROUTES_FOUND)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            profitable: false,
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn evaluated(opportunity: &ArbitrageOpportunity, profitable: bool) -> Self {
        Self {
            profitable,
            profit: Some(opportunity.profit_lamports.to_string()),
            reason: Some(if profitable { PROFITABLE } else { NOT_ENOUGH_PROFIT }.to_string()),
            token_amounts: Some(opportunity.token_amounts),
            ..Self::default()
        }
    }

    pub fn with_transactions(set: UnsignedTransactionSet) -> Self {
        Self {
            profitable: true,
            profit: Some(set.expected_profit.to_string()),
            token_amounts: Some(set.token_amounts),
            transactions: Some(
                set.transactions
                    .into_iter()
                    .map(|tx| TransactionDto {
                        step: tx.step,
                        transaction: tx.transaction,
                        description: tx.description,
                    })
                    .collect(),
            ),
            ..Self::default()
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSwapRequest {
    pub user_public_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteSignedRequest {
    pub signed_transaction: String,
    pub step: u8,
    pub user_public_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponse {
    pub success: bool,
    pub step: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_before: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_after: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_change: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecuteResponse {
    pub fn success(result: ExecutionResult) -> Self {
        Self {
            success: true,
            step: result.step,
            signature: Some(result.signature),
            balance_before: Some(result.balance_before.to_string()),
            balance_after: result.balance_after.map(|b| b.to_string()),
            balance_change: result.balance_change.map(|c| c.to_string()),
            confirmed: Some(result.confirmed),
            error: None,
        }
    }

    pub fn failure(step: u8, error: impl Into<String>) -> Self {
        Self {
            success: false,
            step,
            signature: None,
            balance_before: None,
            balance_after: None,
            balance_change: None,
            confirmed: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteQuery {
    pub input_mint: String,
    pub output_mint: String,
    pub amount: u64,
    pub slippage_bps: Option<u16>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_mint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_mint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slippage_bps: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_impact_pct: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub route: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QuoteResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

impl From<Quote> for QuoteResponse {
    fn from(quote: Quote) -> Self {
        Self {
            input_mint: Some(quote.input_mint.to_string()),
            output_mint: Some(quote.output_mint.to_string()),
            in_amount: Some(quote.in_amount.to_string()),
            out_amount: Some(quote.out_amount.to_string()),
            slippage_bps: Some(quote.slippage_bps),
            price_impact_pct: quote.price_impact_pct,
            route: quote.route_labels,
            error: None,
        }
    }
}

/// Body of `POST /swap-transaction`: quote one conversion and build it for `userPublicKey`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapTransactionRequest {
    pub input_mint: String,
    pub output_mint: String,
    pub amount: u64,
    pub slippage_bps: Option<u16>,
    pub user_public_key: String,
}

impl SwapTransactionRequest {
    pub fn quote_query(&self) -> QuoteQuery {
        QuoteQuery {
            input_mint: self.input_mint.clone(),
            output_mint: self.output_mint.clone(),
            amount: self.amount,
            slippage_bps: self.slippage_bps,
        }
    }
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapTransactionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote: Option<QuoteResponse>,
    /// Unsigned, base64 wire format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swap_transaction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SwapTransactionResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecordDto {
    pub id: String,
    pub timestamp: String,
    pub profit: String,
    pub balance_change: String,
    pub tx_ids: Vec<String>,
    pub token_amounts: TokenAmounts,
}

impl From<TradeRecord> for TradeRecordDto {
    fn from(record: TradeRecord) -> Self {
        Self {
            id: record.id,
            timestamp: record.timestamp.to_rfc3339(),
            profit: record.total_profit.to_string(),
            balance_change: record.balance_change.to_string(),
            tx_ids: record.signatures,
            token_amounts: record.token_amounts,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StartBotRequest {
    pub interval_secs: Option<u64>,
    pub min_profit_threshold: Option<u64>,
    pub stop_on_error: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartBotResponse {
    pub started: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopBotResponse {
    pub stopped: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BotStatusResponse {
    pub state: String,
    pub interval_secs: u64,
    pub min_profit_threshold: String,
    pub stop_on_error: bool,
    pub checks: u64,
    pub opportunities: u64,
    pub successful_trades: u64,
    pub failed_trades: u64,
    pub skipped_in_flight: u64,
    pub total_profit: String,
    pub average_profit: String,
    pub uptime_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    pub executing: bool,
    pub execution_state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl From<BotStatus> for BotStatusResponse {
    fn from(status: BotStatus) -> Self {
        Self {
            state: status.state.to_string(),
            interval_secs: status.settings.interval.as_secs(),
            min_profit_threshold: status.settings.min_profit_threshold.to_string(),
            stop_on_error: status.settings.stop_on_error,
            checks: status.stats.checks,
            opportunities: status.stats.opportunities,
            successful_trades: status.stats.successful_trades,
            failed_trades: status.stats.failed_trades,
            skipped_in_flight: status.stats.skipped_in_flight,
            total_profit: status.stats.total_profit.to_string(),
            average_profit: status.stats.average_profit().to_string(),
            uptime_secs: status.stats.uptime().as_secs(),
            started_at: status.stats.started_at.map(|at| at.to_rfc3339()),
            executing: status.executing,
            execution_state: status.execution_state.to_string(),
            last_error: status.last_error,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
