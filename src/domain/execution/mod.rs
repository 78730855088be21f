//! Execution domain - building, signing, submitting and tracking swap transactions

mod coordinator;
mod history;
mod step_executor;
mod transaction_builder;

pub use coordinator::ExecutionCoordinator;
pub use history::{TradeHistory, TradeRecord, HISTORY_CAPACITY};
pub use step_executor::{StepExecutor, SubmittedStep};
pub use transaction_builder::TransactionBuilder;

use std::time::Duration;

use async_trait::async_trait;
use solana_sdk::{pubkey::Pubkey, signature::Signature};

use crate::domain::arbitrage::Quote;
use crate::shared::errors::ExecutionError;
use crate::shared::types::TokenAmounts;

/// Port for the aggregator's swap-build endpoint
#[async_trait]
pub trait SwapApiClient: Send + Sync {
    /// Returns the unsigned transaction, base64 encoded
    async fn build_swap_transaction(
        &self,
        quote: &Quote,
        user: &Pubkey,
        wrap_and_unwrap_sol: bool,
    ) -> Result<String, ExecutionError>;
}

/// Result of waiting on a submitted signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationStatus {
    Confirmed,
    /// Not confirmed within the wait window; status unknown
    Pending,
    Failed(String),
}

/// Port for the chain RPC node
#[async_trait]
pub trait ChainClient: Send + Sync {
    fn endpoint(&self) -> String;

    async fn health(&self) -> Result<(), ExecutionError>;

    async fn get_balance(&self, address: &Pubkey) -> Result<u64, ExecutionError>;

    /// Submit an already signed transaction in wire format
    async fn send_raw_transaction(&self, wire: &[u8]) -> Result<Signature, ExecutionError>;

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        timeout: Duration,
    ) -> Result<ConfirmationStatus, ExecutionError>;

    /// One-shot status lookup, no waiting
    async fn signature_status(&self, signature: &Signature) -> Result<ConfirmationStatus, ExecutionError>;
}

/// Port for whatever holds the signing key (local keypair, wallet extension)
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    fn pubkey(&self) -> Pubkey;

    /// Sign a wire-format transaction and return it in wire format
    async fn sign_transaction(&self, unsigned: &[u8]) -> Result<Vec<u8>, ExecutionError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnsignedTransaction {
    pub step: u8,
    /// base64 wire format
    pub transaction: String,
    pub description: String,
}

/// One unsigned transaction per hop, in execution order
#[derive(Debug, Clone)]
pub struct UnsignedTransactionSet {
    pub expected_profit: i128,
    pub token_amounts: TokenAmounts,
    pub transactions: Vec<UnsignedTransaction>,
}

/// Outcome of one submitted step
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub signature: String,
    pub step: u8,
    pub balance_before: u64,
    /// `None` when the balance could not be read after submission
    pub balance_after: Option<u64>,
    pub balance_change: Option<i128>,
    pub confirmed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Idle,
    Building,
    AwaitingSignature(u8),
    Submitting(u8),
    Confirming(u8),
    Done,
    Failed,
}

impl std::fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionState::Idle => write!(f, "idle"),
            ExecutionState::Building => write!(f, "building"),
            ExecutionState::AwaitingSignature(step) => write!(f, "awaiting_signature({})", step),
            ExecutionState::Submitting(step) => write!(f, "submitting({})", step),
            ExecutionState::Confirming(step) => write!(f, "confirming({})", step),
            ExecutionState::Done => write!(f, "done"),
            ExecutionState::Failed => write!(f, "failed"),
        }
    }
}

/// Terminal result of a multi-hop execution
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    Completed {
        record: TradeRecord,
        steps: Vec<ExecutionResult>,
    },
    /// Some steps landed on chain, then execution stopped. Nothing is rolled
    /// back. `steps` includes `failed_step` when it was submitted but could
    /// not be tracked afterwards.
    Partial {
        steps: Vec<ExecutionResult>,
        failed_step: u8,
        error: ExecutionError,
    },
    /// Nothing reached the chain
    Failed {
        failed_step: u8,
        error: ExecutionError,
    },
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Completed { .. })
    }

    pub fn executed_steps(&self) -> &[ExecutionResult] {
        match self {
            ExecutionOutcome::Completed { steps, .. } | ExecutionOutcome::Partial { steps, .. } => steps,
            ExecutionOutcome::Failed { .. } => &[],
        }
    }
}
