use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;

use crate::shared::errors::AppError;
use crate::shared::types::{Token, MAX_DECIMALS};

pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";
pub const USDT_MINT: &str = "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB";
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RpcCfg {
    pub url: String,
    pub confirm_timeout_secs: u64,
}

impl Default for RpcCfg {
    fn default() -> Self {
        Self {
            url: "https://api.mainnet-beta.solana.com".to_string(),
            confirm_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JupiterCfg {
    pub api_url: String,
    pub slippage_bps: u16,
    pub manual_slippage_bps: u16,
    pub wrap_and_unwrap_sol: bool,
    pub request_timeout_secs: u64,
}

impl Default for JupiterCfg {
    fn default() -> Self {
        Self {
            api_url: "https://quote-api.jup.ag/v6".to_string(),
            slippage_bps: 300,
            manual_slippage_bps: 50,
            wrap_and_unwrap_sol: true,
            request_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenCfg {
    pub mint: String,
    pub symbol: String,
    pub decimals: u8,
}

impl TokenCfg {
    fn new(mint: &str, symbol: &str, decimals: u8) -> Self {
        Self {
            mint: mint.to_string(),
            symbol: symbol.to_string(),
            decimals,
        }
    }

    pub fn to_token(&self) -> Result<Token, AppError> {
        let mint = self.mint.parse::<Pubkey>().map_err(|e| {
            AppError::ConfigError(format!("Invalid mint {} for {}: {}", self.mint, self.symbol, e))
        })?;
        Ok(Token::new(mint, self.symbol.clone(), self.decimals))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RouteCfg {
    /// Three assets, traded first → second → third → first
    pub tokens: Vec<TokenCfg>,
    /// Starting notional in the first asset's smallest unit
    pub amount: u64,
}

impl Default for RouteCfg {
    fn default() -> Self {
        Self {
            tokens: vec![
                TokenCfg::new(SOL_MINT, "SOL", 9),
                TokenCfg::new(USDT_MINT, "USDT", 6),
                TokenCfg::new(USDC_MINT, "USDC", 6),
            ],
            amount: 500_000_000, // 0.5 SOL
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TradeCfg {
    /// Relay profitability bar, strict: profit > min_profit_lamports
    pub min_profit_lamports: u64,
    pub step_delay_ms: u64,
}

impl Default for TradeCfg {
    fn default() -> Self {
        Self {
            min_profit_lamports: 10_000_000,
            step_delay_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotCfg {
    pub interval_secs: u64,
    /// Inclusive: profit >= threshold triggers auto-execution
    pub min_profit_threshold_lamports: u64,
    pub stop_on_error: bool,
    pub auto_start: bool,
}

impl Default for BotCfg {
    fn default() -> Self {
        Self {
            interval_secs: 15,
            min_profit_threshold_lamports: 10_000, // 0.00001 SOL
            stop_on_error: true,
            auto_start: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerCfg {
    pub host: String,
    pub port: u16,
}

impl Default for ServerCfg {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WalletCfg {
    /// Local keypair used by the headless bot for signing
    pub keypair: Option<String>,
    /// Paying account; defaults to the keypair's pubkey
    pub payer: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rpc: RpcCfg,
    pub jupiter: JupiterCfg,
    pub route: RouteCfg,
    pub trade: TradeCfg,
    pub bot: BotCfg,
    pub server: ServerCfg,
    pub wallet: WalletCfg,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path.as_ref())
            .with_context(|| format!("read {}", path.as_ref().display()))?;
        let cfg = Self::from_toml(&s).context("parse Config.toml")?;
        Ok(cfg)
    }

    pub fn from_toml(s: &str) -> Result<Self, AppError> {
        let cfg: Self = toml::from_str(s)
            .map_err(|e| AppError::ConfigError(format!("Failed to parse config file: {}", e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.route.tokens.len() != 3 {
            return Err(AppError::ConfigError(format!(
                "route.tokens must list exactly 3 assets, got {}",
                self.route.tokens.len()
            )));
        }
        for token in &self.route.tokens {
            token.to_token()?;
            if token.decimals > MAX_DECIMALS {
                return Err(AppError::ConfigError(format!(
                    "{} has {} decimals, at most {} are supported",
                    token.symbol, token.decimals, MAX_DECIMALS
                )));
            }
        }
        if self.route.amount == 0 {
            return Err(AppError::ConfigError("route.amount must be positive".to_string()));
        }
        if self.bot.interval_secs == 0 {
            return Err(AppError::ConfigError("bot.interval_secs must be positive".to_string()));
        }
        if let Some(payer) = &self.wallet.payer {
            payer
                .parse::<Pubkey>()
                .map_err(|e| AppError::ConfigError(format!("Invalid payer {}: {}", payer, e)))?;
        }
        Ok(())
    }

    pub fn route_tokens(&self) -> Result<[Token; 3], AppError> {
        let tokens = self
            .route
            .tokens
            .iter()
            .map(TokenCfg::to_token)
            .collect::<Result<Vec<_>, _>>()?;
        tokens
            .try_into()
            .map_err(|_| AppError::ConfigError("route.tokens must list exactly 3 assets".to_string()))
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc.confirm_timeout_secs)
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.trade.step_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_relay_constants() {
        let cfg = Config::from_toml("").unwrap();
        assert_eq!(cfg.route.amount, 500_000_000);
        assert_eq!(cfg.trade.min_profit_lamports, 10_000_000);
        assert_eq!(cfg.jupiter.slippage_bps, 300);
        assert_eq!(cfg.jupiter.manual_slippage_bps, 50);
        assert_eq!(cfg.server.port, 5000);
        assert_eq!(cfg.step_delay(), Duration::from_secs(2));

        let tokens = cfg.route_tokens().unwrap();
        assert_eq!(tokens[0].symbol, "SOL");
        assert_eq!(tokens[1].symbol, "USDT");
        assert_eq!(tokens[2].symbol, "USDC");
    }

    #[test]
    fn test_partial_file_overrides() {
        let cfg = Config::from_toml(
            r#"
            [trade]
            min_profit_lamports = 5

            [bot]
            interval_secs = 3
            stop_on_error = false
            "#,
        )
        .unwrap();
        assert_eq!(cfg.trade.min_profit_lamports, 5);
        assert_eq!(cfg.trade.step_delay_ms, 2000);
        assert_eq!(cfg.bot.interval_secs, 3);
        assert!(!cfg.bot.stop_on_error);
        assert_eq!(cfg.rpc.url, "https://api.mainnet-beta.solana.com");
    }

    #[test]
    fn test_validation_rejects_bad_route() {
        let err = Config::from_toml("[route]\namount = 0").unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));

        let err = Config::from_toml(
            r#"
            [route]
            tokens = [{ mint = "not-a-mint", symbol = "X", decimals = 6 }]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn test_validation_bounds_decimals() {
        let route = |decimals: u8| {
            format!(
                r#"
                [[route.tokens]]
                mint = "{}"
                symbol = "SOL"
                decimals = 9

                [[route.tokens]]
                mint = "{}"
                symbol = "WIDE"
                decimals = {}

                [[route.tokens]]
                mint = "{}"
                symbol = "USDC"
                decimals = 6
                "#,
                SOL_MINT, USDT_MINT, decimals, USDC_MINT
            )
        };

        let err = Config::from_toml(&route(39)).unwrap_err();
        assert!(err.to_string().contains("WIDE has 39 decimals"));

        let cfg = Config::from_toml(&route(38)).unwrap();
        let tokens = cfg.route_tokens().unwrap();
        assert_eq!(crate::shared::types::format_units(1, tokens[1].decimals).len(), 40);
    }
}
