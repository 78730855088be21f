use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, info, warn};

use crate::domain::arbitrage::{Quote, QuoteApiClient};
use crate::domain::execution::SwapApiClient;
use crate::shared::errors::{ArbitrageError, ExecutionError};

/// Subset of the Jupiter v6 quote response we read
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JupiterQuoteResponse {
    input_mint: Option<String>,
    in_amount: Option<String>,
    output_mint: Option<String>,
    out_amount: Option<String>,
    slippage_bps: Option<u16>,
    price_impact_pct: Option<String>,
    #[serde(default)]
    route_plan: Vec<JupiterRoutePlanStep>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JupiterRoutePlanStep {
    swap_info: Option<JupiterSwapInfo>,
}

#[derive(Debug, Deserialize)]
struct JupiterSwapInfo {
    label: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JupiterSwapRequest<'a> {
    quote_response: &'a serde_json::Value,
    user_public_key: String,
    wrap_and_unwrap_sol: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JupiterSwapResponse {
    swap_transaction: Option<String>,
    last_valid_block_height: Option<u64>,
    error: Option<String>,
}

/// Jupiter aggregator quote + swap-build client
pub struct JupiterApiClient {
    http_client: Client,
    base_url: String,
}

impl JupiterApiClient {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn quote_url(&self, input: &Pubkey, output: &Pubkey, amount: u64, slippage_bps: u16) -> String {
        format!(
            "{}/quote?inputMint={}&outputMint={}&amount={}&slippageBps={}",
            self.base_url, input, output, amount, slippage_bps
        )
    }

    /// Turn a raw quote response into a [`Quote`]. A missing, zero or
    /// unparseable `outAmount` means there is no route.
    pub fn parse_quote(
        raw: serde_json::Value,
        input: &Pubkey,
        output: &Pubkey,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<Quote, ArbitrageError> {
        let response: JupiterQuoteResponse = serde_json::from_value(raw.clone())
            .map_err(|e| ArbitrageError::NoRouteFound(format!("unexpected quote response: {}", e)))?;

        if let Some(error) = response.error {
            return Err(ArbitrageError::NoRouteFound(error));
        }

        let out_amount = response
            .out_amount
            .as_deref()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|out| *out > 0)
            .ok_or_else(|| {
                ArbitrageError::NoRouteFound(format!("no outAmount for {} → {}", input, output))
            })?;

        let in_amount = response
            .in_amount
            .as_deref()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(amount);

        let parse_mint = |value: Option<String>, fallback: &Pubkey| {
            value.and_then(|m| m.parse::<Pubkey>().ok()).unwrap_or(*fallback)
        };

        Ok(Quote {
            input_mint: parse_mint(response.input_mint, input),
            output_mint: parse_mint(response.output_mint, output),
            in_amount,
            out_amount,
            slippage_bps: response.slippage_bps.unwrap_or(slippage_bps),
            price_impact_pct: response.price_impact_pct,
            route_labels: response
                .route_plan
                .into_iter()
                .filter_map(|step| step.swap_info.and_then(|info| info.label))
                .collect(),
            raw,
        })
    }

    /// Check that the quote endpoint answers
    pub async fn is_available(&self) -> bool {
        match self.http_client.get(format!("{}/quote", self.base_url)).send().await {
            Ok(_) => {
                info!("✅ Jupiter API is reachable");
                true
            }
            Err(e) => {
                warn!("⚠️ Jupiter API is not available: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl QuoteApiClient for JupiterApiClient {
    async fn get_quote(
        &self,
        input: &Pubkey,
        output: &Pubkey,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<Quote, ArbitrageError> {
        if amount == 0 {
            return Err(ArbitrageError::InvalidAmount);
        }

        let url = self.quote_url(input, output, amount, slippage_bps);
        debug!("🔍 Fetching Jupiter quote from: {}", url);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| ArbitrageError::NoRouteFound(format!("quote request failed: {}", e)))?;

        let status = response.status();
        let raw: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ArbitrageError::NoRouteFound(format!("quote body unreadable ({}): {}", status, e)))?;

        if !status.is_success() && raw.get("outAmount").is_none() {
            return Err(ArbitrageError::NoRouteFound(format!(
                "Jupiter quote failed with status {}: {}",
                status, raw
            )));
        }

        Self::parse_quote(raw, input, output, amount, slippage_bps)
    }
}

#[async_trait]
impl SwapApiClient for JupiterApiClient {
    async fn build_swap_transaction(
        &self,
        quote: &Quote,
        user: &Pubkey,
        wrap_and_unwrap_sol: bool,
    ) -> Result<String, ExecutionError> {
        let request = JupiterSwapRequest {
            quote_response: &quote.raw,
            user_public_key: user.to_string(),
            wrap_and_unwrap_sol,
        };

        let response = self
            .http_client
            .post(format!("{}/swap", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| ExecutionError::Build(format!("swap request failed: {}", e)))?;

        let status = response.status();
        let body: JupiterSwapResponse = response
            .json()
            .await
            .map_err(|e| ExecutionError::Build(format!("swap body unreadable ({}): {}", status, e)))?;

        if let Some(error) = body.error {
            return Err(ExecutionError::Build(error));
        }

        let transaction = body
            .swap_transaction
            .filter(|tx| !tx.is_empty())
            .ok_or_else(|| ExecutionError::Build(format!("no swapTransaction in response ({})", status)))?;

        debug!(
            "📝 Swap transaction built for {} → {} (last valid block height {:?})",
            quote.input_mint, quote.output_mint, body.last_valid_block_height
        );
        Ok(transaction)
    }
}
