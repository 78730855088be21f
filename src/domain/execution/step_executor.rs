//! Submits a signed transaction and measures its balance effect

use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use tracing::{info, warn};

use super::{ChainClient, ConfirmationStatus, ExecutionResult};
use crate::shared::errors::ExecutionError;

/// A step that reached the chain but is not confirmed yet
#[derive(Debug, Clone)]
pub struct SubmittedStep {
    pub step: u8,
    pub signature: Signature,
    pub balance_before: u64,
}

pub struct StepExecutor {
    chain: Arc<dyn ChainClient>,
    confirm_timeout: Duration,
}

impl StepExecutor {
    pub fn new(chain: Arc<dyn ChainClient>, confirm_timeout: Duration) -> Self {
        Self { chain, confirm_timeout }
    }

    pub fn chain(&self) -> &Arc<dyn ChainClient> {
        &self.chain
    }

    pub fn decode(signed_base64: &str) -> Result<Vec<u8>, ExecutionError> {
        BASE64_STANDARD
            .decode(signed_base64.trim())
            .map_err(|e| ExecutionError::InvalidTransaction(format!("bad base64: {}", e)))
    }

    pub async fn submit(&self, signed: &[u8], step: u8, owner: &Pubkey) -> Result<SubmittedStep, ExecutionError> {
        let balance_before = self.chain.get_balance(owner).await?;
        let signature = self.chain.send_raw_transaction(signed).await?;
        info!("🚀 Step {} sent: {}", step, signature);

        Ok(SubmittedStep {
            step,
            signature,
            balance_before,
        })
    }

    /// A confirmation timeout is not an error: the result comes back with
    /// `confirmed = false` and the caller checks the signature later.
    pub async fn confirm(&self, submitted: &SubmittedStep, owner: &Pubkey) -> Result<ExecutionResult, ExecutionError> {
        let confirmed = match self
            .chain
            .confirm_transaction(&submitted.signature, self.confirm_timeout)
            .await?
        {
            ConfirmationStatus::Confirmed => {
                info!("✅ Step {} confirmed", submitted.step);
                true
            }
            ConfirmationStatus::Pending => {
                warn!(
                    "⚠️ {}",
                    ExecutionError::ConfirmationTimeout(submitted.signature.to_string())
                );
                false
            }
            ConfirmationStatus::Failed(reason) => {
                return Err(ExecutionError::FailedOnChain(format!("{}: {}", submitted.signature, reason)));
            }
        };

        let balance_after = self.chain.get_balance(owner).await?;
        Ok(ExecutionResult {
            signature: submitted.signature.to_string(),
            step: submitted.step,
            balance_before: submitted.balance_before,
            balance_after: Some(balance_after),
            balance_change: Some(balance_after as i128 - submitted.balance_before as i128),
            confirmed,
        })
    }

    /// Record for a step that was sent but could not be tracked afterwards
    pub fn unverified(submitted: &SubmittedStep) -> ExecutionResult {
        ExecutionResult {
            signature: submitted.signature.to_string(),
            step: submitted.step,
            balance_before: submitted.balance_before,
            balance_after: None,
            balance_change: None,
            confirmed: false,
        }
    }

    pub async fn execute_step(
        &self,
        signed_base64: &str,
        step: u8,
        owner: &Pubkey,
    ) -> Result<ExecutionResult, ExecutionError> {
        let signed = Self::decode(signed_base64)?;
        let submitted = self.submit(&signed, step, owner).await?;
        self.confirm(&submitted, owner).await
    }
}
