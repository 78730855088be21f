//! Wires config into clients, evaluator, coordinator, relay and bot

use std::sync::Arc;
use std::time::Duration;

use solana_sdk::pubkey::Pubkey;
use tracing::{info, warn};

use super::bot_controller::{BotController, BotSettings};
use super::services::RelayService;
use crate::domain::arbitrage::{RouteEvaluator, TriangularRoute};
use crate::domain::execution::{ExecutionCoordinator, StepExecutor, TransactionBuilder, TransactionSigner};
use crate::infrastructure::api_clients::JupiterApiClient;
use crate::infrastructure::blockchain::{KeypairSigner, SolanaRpcClient};
use crate::shared::config::Config;
use crate::shared::errors::AppError;

pub struct AppContext {
    pub config: Config,
    pub jupiter: Arc<JupiterApiClient>,
    pub evaluator: Arc<RouteEvaluator>,
    pub relay: Arc<RelayService>,
    pub bot: BotController,
    pub payer: Option<Pubkey>,
}

impl AppContext {
    pub fn build(config: Config) -> Result<Self, AppError> {
        let route = TriangularRoute::new(config.route_tokens()?)
            .map_err(|e| AppError::ConfigError(e.to_string()))?;

        let jupiter = Arc::new(
            JupiterApiClient::new(
                config.jupiter.api_url.clone(),
                Duration::from_secs(config.jupiter.request_timeout_secs),
            )
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {}", e)))?,
        );
        let chain = Arc::new(SolanaRpcClient::new(config.rpc.url.clone()));

        let signer: Option<Arc<dyn TransactionSigner>> = match &config.wallet.keypair {
            Some(path) => {
                let signer = KeypairSigner::from_file(path)?;
                info!("🔑 Loaded keypair {}", signer.pubkey());
                Some(Arc::new(signer))
            }
            None => None,
        };
        let payer = Self::resolve_payer(&config, signer.as_deref())?;

        let evaluator = Arc::new(RouteEvaluator::new(
            jupiter.clone(),
            route.clone(),
            config.route.amount,
            config.jupiter.slippage_bps,
        ));
        let builder = || TransactionBuilder::new(jupiter.clone(), route.clone(), config.jupiter.wrap_and_unwrap_sol);
        let steps = || StepExecutor::new(chain.clone(), config.confirm_timeout());

        let coordinator = Arc::new(ExecutionCoordinator::new(builder(), steps(), config.step_delay()));
        let relay = Arc::new(RelayService::new(
            evaluator.clone(),
            builder(),
            steps(),
            jupiter.clone(),
            config.trade.min_profit_lamports,
            config.jupiter.manual_slippage_bps,
        ));
        let bot = BotController::new(
            evaluator.clone(),
            coordinator,
            chain,
            signer,
            payer,
            config.trade.min_profit_lamports,
            BotSettings::from(&config.bot),
        );

        Ok(Self {
            config,
            jupiter,
            evaluator,
            relay,
            bot,
            payer,
        })
    }

    /// Explicit `wallet.payer` wins, otherwise the keypair's own address
    fn resolve_payer(config: &Config, signer: Option<&dyn TransactionSigner>) -> Result<Option<Pubkey>, AppError> {
        let configured = config
            .wallet
            .payer
            .as_deref()
            .map(|payer| {
                payer
                    .parse::<Pubkey>()
                    .map_err(|e| AppError::ConfigError(format!("Invalid payer {}: {}", payer, e)))
            })
            .transpose()?;

        match (configured, signer) {
            (Some(payer), Some(signer)) if payer != signer.pubkey() => {
                warn!(
                    "⚠️ Payer {} differs from keypair {}, the bot cannot sign for it",
                    payer,
                    signer.pubkey()
                );
                Ok(Some(payer))
            }
            (Some(payer), _) => Ok(Some(payer)),
            (None, signer) => Ok(signer.map(|s| s.pubkey())),
        }
    }
}
