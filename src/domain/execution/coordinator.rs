//! Multi-hop execution with a single in-flight guard

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use chrono::Utc;
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::{
    ConfirmationStatus, ExecutionOutcome, ExecutionResult, ExecutionState, StepExecutor, TradeHistory,
    TradeRecord, TransactionBuilder, TransactionSigner, UnsignedTransactionSet,
};
use crate::domain::arbitrage::ArbitrageOpportunity;
use crate::shared::errors::ExecutionError;
use crate::shared::types::format_sol;

/// Releases the in-flight flag however the execution ends
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Why a step stopped the run, with the step's record when it was already sent
struct StepFailure {
    landed: Option<ExecutionResult>,
    error: ExecutionError,
}

impl From<ExecutionError> for StepFailure {
    fn from(error: ExecutionError) -> Self {
        Self { landed: None, error }
    }
}

pub struct ExecutionCoordinator {
    builder: TransactionBuilder,
    steps: StepExecutor,
    step_delay: Duration,
    in_flight: AtomicBool,
    state: RwLock<ExecutionState>,
    history: RwLock<TradeHistory>,
}

impl ExecutionCoordinator {
    pub fn new(builder: TransactionBuilder, steps: StepExecutor, step_delay: Duration) -> Self {
        Self {
            builder,
            steps,
            step_delay,
            in_flight: AtomicBool::new(false),
            state: RwLock::new(ExecutionState::Idle),
            history: RwLock::new(TradeHistory::default()),
        }
    }

    pub fn is_executing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub async fn state(&self) -> ExecutionState {
        *self.state.read().await
    }

    pub async fn history(&self) -> Vec<TradeRecord> {
        self.history.read().await.to_vec()
    }

    fn try_begin(&self) -> Result<InFlightGuard<'_>, ExecutionError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlightGuard(&self.in_flight))
            .map_err(|_| {
                warn!("⏳ Trade already in progress, skipping execution");
                ExecutionError::TradeInProgress
            })
    }

    async fn set_state(&self, state: ExecutionState) {
        *self.state.write().await = state;
    }

    /// Build, sign and submit all hops of an evaluated opportunity.
    pub async fn execute_opportunity(
        &self,
        opportunity: &ArbitrageOpportunity,
        payer: &Pubkey,
        signer: &dyn TransactionSigner,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let _guard = self.try_begin()?;
        info!(
            "🎯 Executing opportunity {} (expected profit {} SOL)",
            opportunity.id,
            format_sol(opportunity.profit_lamports)
        );

        self.set_state(ExecutionState::Building).await;
        let set = match self.builder.build_unsigned_transactions(opportunity, payer).await {
            Ok(set) => set,
            Err(e) => {
                self.set_state(ExecutionState::Failed).await;
                return Ok(ExecutionOutcome::Failed {
                    failed_step: 0,
                    error: e,
                });
            }
        };

        Ok(self.run_steps(&set, payer, signer).await)
    }

    /// Sign and submit a pre-built set in order.
    pub async fn execute_signed(
        &self,
        set: &UnsignedTransactionSet,
        payer: &Pubkey,
        signer: &dyn TransactionSigner,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let _guard = self.try_begin()?;
        Ok(self.run_steps(set, payer, signer).await)
    }

    async fn run_steps(
        &self,
        set: &UnsignedTransactionSet,
        payer: &Pubkey,
        signer: &dyn TransactionSigner,
    ) -> ExecutionOutcome {
        let total = set.transactions.len();
        let mut executed: Vec<ExecutionResult> = Vec::with_capacity(total);

        for (index, unsigned) in set.transactions.iter().enumerate() {
            if index > 0 {
                info!("⏳ Waiting {:?} before next transaction...", self.step_delay);
                tokio::time::sleep(self.step_delay).await;
            }

            info!("📝 Signing transaction {}/{}: {}", index + 1, total, unsigned.description);
            match self.run_step(unsigned.step, &unsigned.transaction, payer, signer).await {
                Ok(result) => {
                    info!(
                        "✅ Step {} completed: {} (balance change {} SOL)",
                        result.step,
                        result.signature,
                        format_sol(result.balance_change.unwrap_or_default())
                    );
                    executed.push(result);
                }
                Err(StepFailure { landed, error }) => {
                    error!("❌ Step {} failed: {}", unsigned.step, error);
                    self.set_state(ExecutionState::Failed).await;
                    executed.extend(landed);
                    if executed.is_empty() {
                        return ExecutionOutcome::Failed {
                            failed_step: unsigned.step,
                            error,
                        };
                    }

                    warn!(
                        "⚠️ Partial execution: {} of {} steps landed and are not rolled back",
                        executed.len(),
                        total
                    );
                    self.reconcile_pending(&mut executed).await;
                    return ExecutionOutcome::Partial {
                        steps: executed,
                        failed_step: unsigned.step,
                        error,
                    };
                }
            }
        }

        self.reconcile_pending(&mut executed).await;

        let record = TradeRecord {
            id: format!("trade_{}", uuid::Uuid::new_v4()),
            timestamp: Utc::now(),
            total_profit: set.expected_profit,
            balance_change: executed.iter().filter_map(|r| r.balance_change).sum(),
            signatures: executed.iter().map(|r| r.signature.clone()).collect(),
            token_amounts: set.token_amounts,
        };
        self.history.write().await.push(record.clone());
        self.set_state(ExecutionState::Done).await;

        info!("🎉 Arbitrage completed successfully!");
        info!("💰 Total profit: {} SOL", format_sol(record.total_profit));
        info!("🔗 Transaction signatures: {}", record.signatures.join(", "));

        ExecutionOutcome::Completed {
            record,
            steps: executed,
        }
    }

    async fn run_step(
        &self,
        step: u8,
        unsigned_base64: &str,
        payer: &Pubkey,
        signer: &dyn TransactionSigner,
    ) -> Result<ExecutionResult, StepFailure> {
        self.set_state(ExecutionState::AwaitingSignature(step)).await;
        let unsigned = BASE64_STANDARD
            .decode(unsigned_base64)
            .map_err(|e| ExecutionError::InvalidTransaction(format!("step {}: {}", step, e)))?;
        let signed = signer.sign_transaction(&unsigned).await?;

        self.set_state(ExecutionState::Submitting(step)).await;
        let submitted = self.steps.submit(&signed, step, payer).await?;

        self.set_state(ExecutionState::Confirming(step)).await;
        self.steps.confirm(&submitted, payer).await.map_err(|error| match error {
            // reverted, the swap did not happen
            ExecutionError::FailedOnChain(_) => StepFailure::from(error),
            error => {
                warn!("⚠️ Step {} was sent as {} but could not be tracked", step, submitted.signature);
                StepFailure {
                    landed: Some(StepExecutor::unverified(&submitted)),
                    error,
                }
            }
        })
    }

    /// Second look at signatures whose confirmation wait ran out.
    async fn reconcile_pending(&self, executed: &mut [ExecutionResult]) {
        for result in executed.iter_mut().filter(|r| !r.confirmed) {
            let Ok(signature) = result.signature.parse::<Signature>() else {
                continue;
            };
            match self.steps.chain().signature_status(&signature).await {
                Ok(ConfirmationStatus::Confirmed) => {
                    info!("✅ Step {} confirmed on re-check", result.step);
                    result.confirmed = true;
                }
                Ok(status) => {
                    warn!("⚠️ Step {} still unconfirmed ({:?}), check {} manually", result.step, status, result.signature);
                }
                Err(e) => {
                    warn!("⚠️ Status re-check for step {} failed: {}", result.step, e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::test_support::{coordinator, sample_opportunity, unsigned_set, EchoSigner, FakeChain, FakeSwapClient};

    #[tokio::test(start_paused = true)]
    async fn test_full_execution_records_history() {
        let chain = Arc::new(FakeChain::new());
        chain.set_balance(1_000_000_000);
        chain.set_balance_delta_per_send(3_500_000);
        let coordinator = coordinator(chain.clone(), Arc::new(FakeSwapClient::new(None)));
        let signer = EchoSigner::new();

        let outcome = coordinator
            .execute_opportunity(&sample_opportunity(510_500_000), &Pubkey::new_unique(), &signer)
            .await
            .unwrap();

        let ExecutionOutcome::Completed { record, steps } = outcome else {
            panic!("expected completed execution");
        };
        assert_eq!(steps.len(), 3);
        assert_eq!(record.signatures.len(), 3);
        assert_eq!(record.total_profit, 10_500_000);
        assert_eq!(record.balance_change, 10_500_000);
        assert_eq!(coordinator.state().await, ExecutionState::Done);
        assert!(!coordinator.is_executing());
        assert_eq!(coordinator.history().await.len(), 1);
        assert_eq!(signer.signed(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_at_step_two_is_partial() {
        let chain = Arc::new(FakeChain::new());
        chain.fail_send_at(2);
        let coordinator = coordinator(chain.clone(), Arc::new(FakeSwapClient::new(None)));

        let outcome = coordinator
            .execute_signed(&unsigned_set(), &Pubkey::new_unique(), &EchoSigner::new())
            .await
            .unwrap();

        match outcome {
            ExecutionOutcome::Partial { steps, failed_step, error } => {
                assert_eq!(steps.len(), 1);
                assert_eq!(steps[0].step, 1);
                assert_eq!(failed_step, 2);
                assert!(matches!(error, ExecutionError::Submission(_)));
            }
            other => panic!("expected partial execution, got {:?}", other),
        }
        // step 3 never attempted
        assert_eq!(chain.send_attempts(), 2);
        assert_eq!(coordinator.state().await, ExecutionState::Failed);
        assert!(coordinator.history().await.is_empty());
        assert!(!coordinator.is_executing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sent_step_with_failed_balance_read_is_partial() {
        let chain = Arc::new(FakeChain::new());
        // read 1 is before the first send, read 2 after it
        chain.fail_balance_at(2);
        chain.set_status(ConfirmationStatus::Pending);
        let coordinator = coordinator(chain.clone(), Arc::new(FakeSwapClient::new(None)));

        let outcome = coordinator
            .execute_signed(&unsigned_set(), &Pubkey::new_unique(), &EchoSigner::new())
            .await
            .unwrap();

        match outcome {
            ExecutionOutcome::Partial { steps, failed_step, error } => {
                assert_eq!(failed_step, 1);
                assert_eq!(steps.len(), 1);
                assert_eq!(steps[0].step, 1);
                assert_eq!(steps[0].signature, Signature::from([1u8; 64]).to_string());
                assert_eq!(steps[0].balance_after, None);
                assert!(!steps[0].confirmed);
                assert!(matches!(error, ExecutionError::BackendUnreachable(_)));
            }
            other => panic!("expected partial execution, got {:?}", other),
        }
        assert_eq!(chain.send_attempts(), 1);
        assert_eq!(coordinator.state().await, ExecutionState::Failed);
        assert!(coordinator.history().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_untracked_later_step_joins_partial_steps() {
        let chain = Arc::new(FakeChain::new());
        // step 2 reads at 3 and 4
        chain.fail_balance_at(4);
        let coordinator = coordinator(chain.clone(), Arc::new(FakeSwapClient::new(None)));

        let outcome = coordinator
            .execute_signed(&unsigned_set(), &Pubkey::new_unique(), &EchoSigner::new())
            .await
            .unwrap();

        let ExecutionOutcome::Partial { steps, failed_step, .. } = outcome else {
            panic!("expected partial execution");
        };
        assert_eq!(failed_step, 2);
        let executed: Vec<u8> = steps.iter().map(|r| r.step).collect();
        assert_eq!(executed, vec![1, 2]);
        assert_eq!(steps[0].balance_after, Some(1_000_000_000));
        // confirmed on the status re-check
        assert!(steps[1].confirmed);
        assert_eq!(chain.send_attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reverted_first_step_is_failed() {
        let chain = Arc::new(FakeChain::new());
        chain.set_confirmation(ConfirmationStatus::Failed("InstructionError".to_string()));
        let coordinator = coordinator(chain.clone(), Arc::new(FakeSwapClient::new(None)));

        let outcome = coordinator
            .execute_signed(&unsigned_set(), &Pubkey::new_unique(), &EchoSigner::new())
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            ExecutionOutcome::Failed {
                failed_step: 1,
                error: ExecutionError::FailedOnChain(_)
            }
        ));
        assert_eq!(chain.send_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_signing_rejected_before_anything_lands() {
        let chain = Arc::new(FakeChain::new());
        let coordinator = coordinator(chain.clone(), Arc::new(FakeSwapClient::new(None)));

        let outcome = coordinator
            .execute_signed(&unsigned_set(), &Pubkey::new_unique(), &EchoSigner::rejecting())
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            ExecutionOutcome::Failed {
                failed_step: 1,
                error: ExecutionError::SigningRejected(_)
            }
        ));
        assert_eq!(chain.send_attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_build_failure_is_failed_outcome() {
        let chain = Arc::new(FakeChain::new());
        let coordinator = coordinator(chain.clone(), Arc::new(FakeSwapClient::new(Some(3))));

        let outcome = coordinator
            .execute_opportunity(&sample_opportunity(510_500_000), &Pubkey::new_unique(), &EchoSigner::new())
            .await
            .unwrap();

        assert!(matches!(outcome, ExecutionOutcome::Failed { failed_step: 0, error: ExecutionError::Build(_) }));
        assert_eq!(chain.send_attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_execution_rejected() {
        let chain = Arc::new(FakeChain::new());
        chain.set_send_delay(Duration::from_secs(1));
        let coordinator = Arc::new(coordinator(chain.clone(), Arc::new(FakeSwapClient::new(None))));
        let payer = Pubkey::new_unique();

        let first = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .execute_signed(&unsigned_set(), &payer, &EchoSigner::new())
                    .await
            })
        };
        // let the first run take the guard
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(coordinator.is_executing());

        let second = coordinator
            .execute_signed(&unsigned_set(), &payer, &EchoSigner::new())
            .await;
        assert_eq!(second.unwrap_err(), ExecutionError::TradeInProgress);

        let first = first.await.unwrap().unwrap();
        assert!(first.is_success());
        assert_eq!(first.executed_steps().len(), 3);
        assert_eq!(chain.send_attempts(), 3);
        assert!(!coordinator.is_executing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_confirmation_continues_and_rechecks() {
        let chain = Arc::new(FakeChain::new());
        chain.set_confirmation(ConfirmationStatus::Pending);
        chain.set_status(ConfirmationStatus::Confirmed);
        let coordinator = coordinator(chain.clone(), Arc::new(FakeSwapClient::new(None)));

        let outcome = coordinator
            .execute_signed(&unsigned_set(), &Pubkey::new_unique(), &EchoSigner::new())
            .await
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(chain.send_attempts(), 3);
        assert!(outcome.executed_steps().iter().all(|r| r.confirmed));
    }
}
