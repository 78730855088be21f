//! Solana RPC client for balances, submission and confirmation

use std::time::{Duration, Instant};

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_sdk::{
    commitment_config::{CommitmentConfig, CommitmentLevel},
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use tracing::debug;

use crate::domain::execution::{ChainClient, ConfirmationStatus};
use crate::shared::errors::ExecutionError;

const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Solana RPC client wrapper
pub struct SolanaRpcClient {
    client: RpcClient,
}

impl SolanaRpcClient {
    /// Create new RPC client at `confirmed` commitment
    pub fn new(rpc_url: String) -> Self {
        Self {
            client: RpcClient::new_with_commitment(rpc_url, CommitmentConfig::confirmed()),
        }
    }

    fn status_of(
        status: Option<solana_sdk::transaction::Result<()>>,
    ) -> ConfirmationStatus {
        match status {
            Some(Ok(())) => ConfirmationStatus::Confirmed,
            Some(Err(e)) => ConfirmationStatus::Failed(e.to_string()),
            None => ConfirmationStatus::Pending,
        }
    }
}

#[async_trait]
impl ChainClient for SolanaRpcClient {
    fn endpoint(&self) -> String {
        self.client.url()
    }

    async fn health(&self) -> Result<(), ExecutionError> {
        self.client
            .get_health()
            .await
            .map_err(|e| ExecutionError::BackendUnreachable(format!("RPC health check failed: {}", e)))
    }

    async fn get_balance(&self, address: &Pubkey) -> Result<u64, ExecutionError> {
        self.client
            .get_balance(address)
            .await
            .map_err(|e| ExecutionError::BackendUnreachable(format!("Failed to get balance of {}: {}", address, e)))
    }

    async fn send_raw_transaction(&self, wire: &[u8]) -> Result<Signature, ExecutionError> {
        let transaction: VersionedTransaction = bincode::deserialize(wire)
            .map_err(|e| ExecutionError::InvalidTransaction(format!("Failed to deserialize transaction: {}", e)))?;

        let config = RpcSendTransactionConfig {
            skip_preflight: false,
            preflight_commitment: Some(CommitmentLevel::Confirmed),
            ..RpcSendTransactionConfig::default()
        };

        self.client
            .send_transaction_with_config(&transaction, config)
            .await
            .map_err(|e| ExecutionError::Submission(e.to_string()))
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        timeout: Duration,
    ) -> Result<ConfirmationStatus, ExecutionError> {
        let started = Instant::now();
        loop {
            let status = self.signature_status(signature).await?;
            if status != ConfirmationStatus::Pending {
                return Ok(status);
            }
            if started.elapsed() >= timeout {
                debug!("⏰ Gave up waiting on {} after {:?}", signature, timeout);
                return Ok(ConfirmationStatus::Pending);
            }
            tokio::time::sleep(STATUS_POLL_INTERVAL).await;
        }
    }

    async fn signature_status(&self, signature: &Signature) -> Result<ConfirmationStatus, ExecutionError> {
        let status = self
            .client
            .get_signature_status_with_commitment(signature, CommitmentConfig::confirmed())
            .await
            .map_err(|e| ExecutionError::BackendUnreachable(format!("Failed to get signature status: {}", e)))?;
        Ok(Self::status_of(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::transaction::TransactionError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(SolanaRpcClient::status_of(Some(Ok(()))), ConfirmationStatus::Confirmed);
        assert_eq!(SolanaRpcClient::status_of(None), ConfirmationStatus::Pending);
        assert!(matches!(
            SolanaRpcClient::status_of(Some(Err(TransactionError::AccountNotFound))),
            ConfirmationStatus::Failed(_)
        ));
    }

    #[tokio::test]
    async fn test_garbage_wire_rejected_locally() {
        let client = SolanaRpcClient::new("http://127.0.0.1:1".to_string());
        let err = client.send_raw_transaction(&[0xff]).await.unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidTransaction(_)));
        assert_eq!(client.endpoint(), "http://127.0.0.1:1");
    }
}
