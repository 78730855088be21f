//! CLI commands and handlers
use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use super::bot_controller::{BotSettings, BotState};
use super::context::AppContext;
use super::responses::QuoteQuery;
use super::server::{self, AppState};
use crate::shared::config::Config;
use crate::shared::errors::AppError;
use crate::shared::types::{format_sol, format_units};

#[derive(Parser, Debug)]
#[command(name = "trihop", version)]
#[command(about = "Three-hop Jupiter arbitrage relay and auto-bot for Solana")]
pub struct Cli {
    /// Path to config file (optional)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// RPC endpoint URL (overrides config)
    #[arg(long, global = true)]
    pub rpc_url: Option<String>,

    /// Path to keypair file (overrides config)
    #[arg(long, global = true)]
    pub keypair: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP relay for browser wallets
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Also start the auto-bot with the local keypair
        #[arg(long)]
        bot: bool,
    },

    /// Run the auto-bot headless with the local keypair
    Bot {
        /// Seconds between evaluations
        #[arg(short, long)]
        interval: Option<u64>,

        /// Minimum profit in lamports, inclusive
        #[arg(short, long)]
        min_profit: Option<u64>,

        /// Keep running after a failed check or trade
        #[arg(long)]
        keep_going: bool,
    },

    /// Evaluate the route once and print the result
    Check,

    /// Quote a single conversion
    Quote {
        #[arg(long)]
        input_mint: String,

        #[arg(long)]
        output_mint: String,

        /// Amount in the input asset's smallest units
        #[arg(long)]
        amount: u64,

        #[arg(long)]
        slippage_bps: Option<u16>,
    },

    /// Show the SOL balance of an address (defaults to the wallet)
    Balance { address: Option<String> },
}

impl Cli {
    /// Config file (or defaults) with CLI overrides applied on top
    pub fn load_config(&self) -> Result<Config, AppError> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path).map_err(|e| AppError::ConfigError(format!("{:#}", e)))?,
            None => Config::default(),
        };
        if let Some(rpc_url) = &self.rpc_url {
            config.rpc.url = rpc_url.clone();
        }
        if let Some(keypair) = &self.keypair {
            config.wallet.keypair = Some(keypair.clone());
        }
        config.validate()?;
        Ok(config)
    }
}

pub struct CommandExecutor;

impl CommandExecutor {
    /// Execute the selected command
    pub async fn execute(cli: Cli) -> Result<(), AppError> {
        let config = cli.load_config()?;
        let context = AppContext::build(config)?;

        match cli.command {
            Commands::Serve { host, port, bot } => Self::execute_serve_command(context, host, port, bot).await,
            Commands::Bot {
                interval,
                min_profit,
                keep_going,
            } => Self::execute_bot_command(context, interval, min_profit, keep_going).await,
            Commands::Check => Self::execute_check_command(context).await,
            Commands::Quote {
                input_mint,
                output_mint,
                amount,
                slippage_bps,
            } => {
                let query = QuoteQuery {
                    input_mint,
                    output_mint,
                    amount,
                    slippage_bps,
                };
                Self::execute_quote_command(context, query).await
            }
            Commands::Balance { address } => Self::execute_balance_command(context, address).await,
        }
    }

    async fn execute_serve_command(
        context: AppContext,
        host: Option<String>,
        port: Option<u16>,
        with_bot: bool,
    ) -> Result<(), AppError> {
        let host = host.unwrap_or_else(|| context.config.server.host.clone());
        let port = port.unwrap_or(context.config.server.port);
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .map_err(|e| AppError::ConfigError(format!("Invalid bind address {}:{}: {}", host, port, e)))?;

        info!("🚀 Starting arbitrage relay");
        info!("   RPC: {}", context.config.rpc.url);
        info!("   Route: {}", context.evaluator.route().description());
        info!("   Amount: {} lamports", context.evaluator.amount());
        info!("   Min profit: {} SOL", format_sol(context.config.trade.min_profit_lamports as i128));
        context.jupiter.is_available().await;

        if with_bot || context.config.bot.auto_start {
            if let Err(e) = context.bot.start(BotSettings::from(&context.config.bot)).await {
                warn!("⚠️ Auto-bot not started: {}", e);
            }
        }

        let state = AppState::new(context.relay.clone(), context.bot.clone());
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("❌ Failed to listen for shutdown signal: {}", e);
            }
            info!("🛑 Shutdown signal received");
        };
        let served = server::serve(state, addr, shutdown).await;
        context.bot.stop().await;
        served.map_err(|e| AppError::ConfigError(format!("Failed to serve on {}: {}", addr, e)))
    }

    async fn execute_bot_command(
        context: AppContext,
        interval: Option<u64>,
        min_profit: Option<u64>,
        keep_going: bool,
    ) -> Result<(), AppError> {
        let mut settings = BotSettings::from(&context.config.bot);
        if let Some(secs) = interval {
            if secs == 0 {
                return Err(AppError::ConfigError("--interval must be positive".to_string()));
            }
            settings.interval = Duration::from_secs(secs);
        }
        if let Some(threshold) = min_profit {
            settings.min_profit_threshold = threshold;
        }
        if keep_going {
            settings.stop_on_error = false;
        }

        context.bot.start(settings).await?;

        loop {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        error!("❌ Failed to listen for shutdown signal: {}", e);
                    }
                    info!("🛑 Shutdown signal received");
                    break;
                }
                _ = tokio::time::sleep(Duration::from_secs(1)) => {
                    if context.bot.state().await == BotState::Stopped {
                        break;
                    }
                }
            }
        }
        context.bot.stop().await;

        let status = context.bot.status().await;
        info!("📊 Session summary:");
        info!("   Checks: {}", status.stats.checks);
        info!("   Opportunities: {}", status.stats.opportunities);
        info!("   Successful trades: {}", status.stats.successful_trades);
        info!("   Failed trades: {}", status.stats.failed_trades);
        info!("   Total profit: {} SOL", format_sol(status.stats.total_profit));
        info!("   Average profit: {} SOL", format_sol(status.stats.average_profit()));
        if let Some(e) = status.last_error {
            info!("   Last error: {}", e);
        }
        Ok(())
    }

    async fn execute_check_command(context: AppContext) -> Result<(), AppError> {
        let opportunity = context.evaluator.evaluate().await?;
        let route = context.evaluator.route();
        let [first, second, third] = route.tokens();
        let amounts = opportunity.token_amounts;

        info!("📊 {}", route.description());
        info!("   {} {}", format_units(amounts.start as i128, first.decimals), first.symbol);
        info!("   → {} {}", format_units(amounts.after_first_hop as i128, second.decimals), second.symbol);
        info!("   → {} {}", format_units(amounts.after_second_hop as i128, third.decimals), third.symbol);
        info!("   → {} {}", format_units(amounts.end as i128, first.decimals), first.symbol);

        let min_profit = context.config.trade.min_profit_lamports;
        match opportunity.ensure_profitable(min_profit) {
            Ok(()) => info!("✅ Profitable: {} SOL", format_sol(opportunity.profit_lamports)),
            Err(e) => info!("📉 {}", e),
        }
        Ok(())
    }

    async fn execute_quote_command(context: AppContext, query: QuoteQuery) -> Result<(), AppError> {
        let response = context.relay.quote(query).await;
        if let Some(e) = response.error {
            return Err(AppError::Unknown(e));
        }
        let json = serde_json::to_string_pretty(&response)
            .map_err(|e| AppError::Unknown(format!("Failed to render quote: {}", e)))?;
        info!("💱 Quote:\n{}", json);
        Ok(())
    }

    async fn execute_balance_command(context: AppContext, address: Option<String>) -> Result<(), AppError> {
        let address = match address.or_else(|| context.payer.map(|p| p.to_string())) {
            Some(address) => address,
            None => {
                return Err(AppError::WalletError(
                    "No address given and no wallet configured".to_string(),
                ))
            }
        };
        let response = context.relay.balance(&address).await;
        match response.error {
            Some(e) => Err(AppError::BlockchainError(e)),
            None => {
                info!("💰 {}: {} SOL", address, response.balance);
                Ok(())
            }
        }
    }
}
