//! Local keypair signer for the headless bot

use std::path::Path;

use async_trait::async_trait;
use solana_sdk::{
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair, Signer},
    transaction::VersionedTransaction,
};

use crate::domain::execution::TransactionSigner;
use crate::shared::errors::{AppError, ExecutionError};

pub struct KeypairSigner {
    keypair: Keypair,
}

impl KeypairSigner {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let keypair = read_keypair_file(path.as_ref()).map_err(|e| {
            AppError::WalletError(format!("Failed to load keypair {}: {}", path.as_ref().display(), e))
        })?;
        Ok(Self::new(keypair))
    }
}

#[async_trait]
impl TransactionSigner for KeypairSigner {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_transaction(&self, unsigned: &[u8]) -> Result<Vec<u8>, ExecutionError> {
        let transaction: VersionedTransaction = bincode::deserialize(unsigned)
            .map_err(|e| ExecutionError::InvalidTransaction(format!("Failed to deserialize transaction: {}", e)))?;

        // Jupiter leaves the blockhash in place, only the signature slots change
        let signed = VersionedTransaction::try_new(transaction.message, &[&self.keypair])
            .map_err(|e| ExecutionError::SigningRejected(e.to_string()))?;

        bincode::serialize(&signed)
            .map_err(|e| ExecutionError::InvalidTransaction(format!("Failed to serialize transaction: {}", e)))
    }
}
