//! Auto-bot: periodic evaluation with automatic execution above a threshold

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use solana_sdk::pubkey::Pubkey;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::scheduler::PeriodicTask;
use crate::domain::arbitrage::{ArbitrageOpportunity, RouteEvaluator};
use crate::domain::execution::{ChainClient, ExecutionCoordinator, ExecutionOutcome, ExecutionState, TransactionSigner};
use crate::shared::config::BotCfg;
use crate::shared::errors::{BotError, ExecutionError};
use crate::shared::types::format_sol;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotState {
    Stopped,
    Running,
}

impl std::fmt::Display for BotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BotState::Stopped => write!(f, "stopped"),
            BotState::Running => write!(f, "running"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BotSettings {
    pub interval: Duration,
    /// Inclusive: a profit equal to the threshold executes
    pub min_profit_threshold: u64,
    pub stop_on_error: bool,
}

impl From<&BotCfg> for BotSettings {
    fn from(cfg: &BotCfg) -> Self {
        Self {
            interval: Duration::from_secs(cfg.interval_secs),
            min_profit_threshold: cfg.min_profit_threshold_lamports,
            stop_on_error: cfg.stop_on_error,
        }
    }
}

/// Session counters, reset on every start
#[derive(Debug, Clone, Default)]
pub struct BotStats {
    pub checks: u64,
    pub opportunities: u64,
    pub successful_trades: u64,
    pub failed_trades: u64,
    pub skipped_in_flight: u64,
    pub total_profit: i128,
    pub started_at: Option<DateTime<Utc>>,
    started: Option<Instant>,
}

impl BotStats {
    fn started_now() -> Self {
        Self {
            started_at: Some(Utc::now()),
            started: Some(Instant::now()),
            ..Self::default()
        }
    }

    pub fn average_profit(&self) -> i128 {
        if self.successful_trades == 0 {
            0
        } else {
            self.total_profit / self.successful_trades as i128
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started.map(|at| at.elapsed()).unwrap_or_default()
    }
}

/// Point-in-time view for status reporting
#[derive(Debug, Clone)]
pub struct BotStatus {
    pub state: BotState,
    pub settings: BotSettings,
    pub stats: BotStats,
    pub executing: bool,
    pub execution_state: ExecutionState,
    pub last_error: Option<String>,
}

struct Session {
    state: BotState,
    settings: BotSettings,
    stats: BotStats,
    last_error: Option<String>,
    /// Bumped on every start so late results of an older session are dropped
    epoch: u64,
    task: Option<PeriodicTask>,
}

impl Session {
    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.cancel();
        }
        if self.state == BotState::Running {
            self.state = BotState::Stopped;
            self.stats.started = None;
            info!("🛑 Auto-bot stopped");
        }
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.epoch == epoch && self.state == BotState::Running
    }
}

struct ControllerInner {
    evaluator: Arc<RouteEvaluator>,
    coordinator: Arc<ExecutionCoordinator>,
    chain: Arc<dyn ChainClient>,
    signer: Option<Arc<dyn TransactionSigner>>,
    payer: Option<Pubkey>,
    /// Relay profitability bar, strict: profit > min_profit
    min_profit: u64,
    session: RwLock<Session>,
}

#[derive(Clone)]
pub struct BotController {
    inner: Arc<ControllerInner>,
}

impl BotController {
    pub fn new(
        evaluator: Arc<RouteEvaluator>,
        coordinator: Arc<ExecutionCoordinator>,
        chain: Arc<dyn ChainClient>,
        signer: Option<Arc<dyn TransactionSigner>>,
        payer: Option<Pubkey>,
        min_profit: u64,
        settings: BotSettings,
    ) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                evaluator,
                coordinator,
                chain,
                signer,
                payer,
                min_profit,
                session: RwLock::new(Session {
                    state: BotState::Stopped,
                    settings,
                    stats: BotStats::default(),
                    last_error: None,
                    epoch: 0,
                    task: None,
                }),
            }),
        }
    }

    pub fn coordinator(&self) -> &Arc<ExecutionCoordinator> {
        &self.inner.coordinator
    }

    pub async fn state(&self) -> BotState {
        self.inner.session.read().await.state
    }

    pub async fn settings(&self) -> BotSettings {
        self.inner.session.read().await.settings.clone()
    }

    pub async fn status(&self) -> BotStatus {
        let session = self.inner.session.read().await;
        BotStatus {
            state: session.state,
            settings: session.settings.clone(),
            stats: session.stats.clone(),
            executing: self.inner.coordinator.is_executing(),
            execution_state: self.inner.coordinator.state().await,
            last_error: session.last_error.clone(),
        }
    }

    /// Start periodic evaluation. A no-op when already running.
    pub async fn start(&self, settings: BotSettings) -> Result<(), BotError> {
        if self.state().await == BotState::Running {
            info!("🤖 Auto-bot already running");
            return Ok(());
        }
        if settings.interval.is_zero() {
            return Err(BotError::InvalidInterval);
        }
        if self.inner.signer.is_none() {
            return Err(BotError::NoSigner);
        }
        if self.inner.payer.is_none() {
            return Err(BotError::NoPayer);
        }
        self.inner
            .chain
            .health()
            .await
            .map_err(|e| BotError::BackendUnreachable(e.to_string()))?;

        let mut session = self.inner.session.write().await;
        if session.state == BotState::Running {
            return Ok(());
        }
        session.epoch += 1;
        session.state = BotState::Running;
        session.stats = BotStats::started_now();
        session.last_error = None;
        session.settings = settings.clone();

        let epoch = session.epoch;
        let controller = self.clone();
        session.task = Some(PeriodicTask::spawn("auto-bot", settings.interval, move || {
            let controller = controller.clone();
            async move { controller.tick(epoch).await }
        }));

        info!("🤖 Auto-bot started");
        info!("   Route: {}", self.inner.evaluator.route().description());
        info!("   Interval: {:?}", settings.interval);
        info!("   Min profit threshold: {} SOL", format_sol(settings.min_profit_threshold as i128));
        info!("   Stop on error: {}", settings.stop_on_error);
        Ok(())
    }

    /// Idempotent. No evaluation starts after this returns; an execution
    /// already in flight runs to completion.
    pub async fn stop(&self) {
        self.inner.session.write().await.stop();
    }

    async fn tick(&self, epoch: u64) {
        let settings = {
            let session = self.inner.session.read().await;
            if !session.is_current(epoch) {
                return;
            }
            session.settings.clone()
        };

        info!("🔍 Scanning for arbitrage opportunities...");
        let result = self.inner.evaluator.evaluate().await;

        let mut session = self.inner.session.write().await;
        if !session.is_current(epoch) {
            debug!("Discarding evaluation from a stopped session");
            return;
        }
        session.stats.checks += 1;

        let opportunity = match result {
            Ok(opportunity) => opportunity,
            Err(e) => {
                error!("❌ Failed to check arbitrage: {}", e);
                session.last_error = Some(e.to_string());
                if settings.stop_on_error {
                    warn!("🛑 Stopping auto-bot due to error");
                    session.stop();
                }
                return;
            }
        };

        if !opportunity.is_profitable(self.inner.min_profit) {
            info!(
                "📉 Not enough profit: {} SOL (need more than {} SOL)",
                format_sol(opportunity.profit_lamports),
                format_sol(self.inner.min_profit as i128)
            );
            return;
        }
        session.stats.opportunities += 1;

        if !opportunity.meets_threshold(settings.min_profit_threshold) {
            info!(
                "⏭️ Skipping trade - profit {} SOL below threshold {} SOL",
                format_sol(opportunity.profit_lamports),
                format_sol(settings.min_profit_threshold as i128)
            );
            return;
        }

        if self.inner.coordinator.is_executing() {
            session.stats.skipped_in_flight += 1;
            warn!("⏳ Trade already in progress, skipping...");
            return;
        }
        drop(session);

        info!(
            "🤖 AUTO-EXECUTE: Profit {} SOL >= threshold {} SOL",
            format_sol(opportunity.profit_lamports),
            format_sol(settings.min_profit_threshold as i128)
        );
        let controller = self.clone();
        tokio::spawn(async move { controller.execute(epoch, opportunity, settings.stop_on_error).await });
    }

    async fn execute(&self, epoch: u64, opportunity: ArbitrageOpportunity, stop_on_error: bool) {
        let (Some(signer), Some(payer)) = (self.inner.signer.clone(), self.inner.payer) else {
            return;
        };

        let outcome = self
            .inner
            .coordinator
            .execute_opportunity(&opportunity, &payer, signer.as_ref())
            .await;

        let mut session = self.inner.session.write().await;
        if session.epoch != epoch {
            debug!("Discarding execution result from an earlier session");
            return;
        }

        let error = match outcome {
            Ok(ExecutionOutcome::Completed { record, .. }) => {
                session.stats.successful_trades += 1;
                session.stats.total_profit += record.total_profit;
                info!("✅ Auto-trade {} completed", record.id);
                return;
            }
            Err(ExecutionError::TradeInProgress) => {
                session.stats.skipped_in_flight += 1;
                return;
            }
            Ok(ExecutionOutcome::Partial { steps, failed_step, error }) => {
                warn!(
                    "⚠️ Auto-trade stopped at step {} after {} step(s) landed: {}",
                    failed_step,
                    steps.len(),
                    error
                );
                error
            }
            Ok(ExecutionOutcome::Failed { failed_step, error }) => {
                error!("❌ Auto-trade failed at step {}: {}", failed_step, error);
                error
            }
            Err(e) => e,
        };

        session.stats.failed_trades += 1;
        session.last_error = Some(error.to_string());
        if stop_on_error && session.state == BotState::Running {
            warn!("🛑 Stopping auto-bot due to error");
            session.stop();
        }
    }
}
