//! Error handling for the application

use thiserror::Error;

/// Quote and route evaluation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArbitrageError {
    #[error("No route found: {0}")]
    NoRouteFound(String),

    #[error("Not enough profit: {profit} <= {threshold}")]
    NotProfitable { profit: i128, threshold: u64 },

    #[error("Invalid arbitrage route: {0}")]
    InvalidRoute(String),

    #[error("Amount must be a positive integer in smallest units")]
    InvalidAmount,
}

/// Transaction building, signing and submission errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("Failed to build swap transaction: {0}")]
    Build(String),

    #[error("Signing rejected: {0}")]
    SigningRejected(String),

    #[error("Transaction submission failed: {0}")]
    Submission(String),

    #[error("Transaction failed on chain: {0}")]
    FailedOnChain(String),

    #[error("Transaction {0} not confirmed in time, check its status later")]
    ConfirmationTimeout(String),

    #[error("Backend unreachable: {0}")]
    BackendUnreachable(String),

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("Trade already in progress")]
    TradeInProgress,
}

/// Reasons the auto-bot refuses to start
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BotError {
    #[error("Cannot start: no signer connected")]
    NoSigner,

    #[error("Cannot start: no paying account address available")]
    NoPayer,

    #[error("Cannot start: backend not connected ({0})")]
    BackendUnreachable(String),

    #[error("Cannot start: interval must be positive")]
    InvalidInterval,
}

/// General application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Wallet error: {0}")]
    WalletError(String),

    #[error("Blockchain error: {0}")]
    BlockchainError(String),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<ArbitrageError> for AppError {
    fn from(err: ArbitrageError) -> Self {
        AppError::Unknown(err.to_string())
    }
}

impl From<BotError> for AppError {
    fn from(err: BotError) -> Self {
        match err {
            BotError::NoSigner | BotError::NoPayer => AppError::WalletError(err.to_string()),
            BotError::BackendUnreachable(e) => AppError::BlockchainError(e),
            BotError::InvalidInterval => AppError::ConfigError(err.to_string()),
        }
    }
}

impl From<ExecutionError> for AppError {
    fn from(err: ExecutionError) -> Self {
        match err {
            ExecutionError::BackendUnreachable(e) => AppError::BlockchainError(e),
            other => AppError::ExecutionError(other.to_string()),
        }
    }
}
