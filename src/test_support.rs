//! In-memory fakes for the quote, swap, chain and signer ports

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use solana_sdk::{pubkey::Pubkey, signature::Signature};

use crate::application::RelayService;
use crate::domain::arbitrage::{ArbitrageOpportunity, Quote, QuoteApiClient, RouteEvaluator, TriangularRoute};
use crate::domain::execution::{
    ChainClient, ConfirmationStatus, ExecutionCoordinator, StepExecutor, SwapApiClient, TransactionBuilder,
    TransactionSigner, UnsignedTransaction, UnsignedTransactionSet,
};
use crate::shared::config::{SOL_MINT, USDC_MINT, USDT_MINT};
use crate::shared::errors::{ArbitrageError, ExecutionError};
use crate::shared::types::{Token, TokenAmounts};

pub fn quote(input: Pubkey, output: Pubkey, in_amount: u64, out_amount: u64) -> Quote {
    Quote {
        input_mint: input,
        output_mint: output,
        in_amount,
        out_amount,
        slippage_bps: 300,
        price_impact_pct: None,
        route_labels: vec!["Whirlpool".to_string()],
        raw: serde_json::json!({
            "inputMint": input.to_string(),
            "outputMint": output.to_string(),
            "inAmount": in_amount.to_string(),
            "outAmount": out_amount.to_string(),
        }),
    }
}

pub fn default_route() -> TriangularRoute {
    TriangularRoute::new([
        Token::new(SOL_MINT.parse().unwrap(), "SOL", 9),
        Token::new(USDT_MINT.parse().unwrap(), "USDT", 6),
        Token::new(USDC_MINT.parse().unwrap(), "USDC", 6),
    ])
    .unwrap()
}

/// SOL → USDT → USDC → SOL over 500_000_000 lamports ending at `final_out`
pub fn sample_opportunity(final_out: u64) -> ArbitrageOpportunity {
    let route = default_route();
    let [sol, usdt, usdc] = route.tokens().clone();
    ArbitrageOpportunity::from_quotes([
        quote(sol.mint, usdt.mint, 500_000_000, 495_000_000),
        quote(usdt.mint, usdc.mint, 495_000_000, 494_000_000),
        quote(usdc.mint, sol.mint, 494_000_000, final_out),
    ])
    .unwrap()
}

pub fn unsigned_set() -> UnsignedTransactionSet {
    let route = default_route();
    UnsignedTransactionSet {
        expected_profit: 10_500_000,
        token_amounts: TokenAmounts {
            start: 500_000_000,
            after_first_hop: 495_000_000,
            after_second_hop: 494_000_000,
            end: 510_500_000,
        },
        transactions: route
            .hops()
            .iter()
            .map(|hop| UnsignedTransaction {
                step: hop.step,
                transaction: BASE64_STANDARD.encode([hop.step; 8]),
                description: hop.description(),
            })
            .collect(),
    }
}

pub fn coordinator(chain: Arc<FakeChain>, swaps: Arc<FakeSwapClient>) -> ExecutionCoordinator {
    ExecutionCoordinator::new(
        TransactionBuilder::new(swaps, default_route(), true),
        StepExecutor::new(chain, Duration::from_secs(5)),
        Duration::from_secs(2),
    )
}

/// Relay over the default route: 500_000_000 notional, 10_000_000 minimum
/// profit, 50 bps manual slippage
pub fn relay(quotes: Arc<ScriptedQuoteClient>, swaps: Arc<FakeSwapClient>, chain: Arc<FakeChain>) -> RelayService {
    let evaluator = Arc::new(RouteEvaluator::new(quotes.clone(), default_route(), 500_000_000, 300));
    RelayService::new(
        evaluator,
        TransactionBuilder::new(swaps, default_route(), true),
        StepExecutor::new(chain, Duration::from_secs(5)),
        quotes,
        10_000_000,
        50,
    )
}

/// Answers hop quotes from a script, cycling when it runs out
pub struct ScriptedQuoteClient {
    script: Vec<Result<u64, ArbitrageError>>,
    calls: Mutex<Vec<(Pubkey, Pubkey, u64, u16)>>,
}

impl ScriptedQuoteClient {
    pub fn new(script: Vec<Result<u64, ArbitrageError>>) -> Self {
        Self {
            script,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(Pubkey, Pubkey, u64, u16)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl QuoteApiClient for ScriptedQuoteClient {
    async fn get_quote(
        &self,
        input: &Pubkey,
        output: &Pubkey,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<Quote, ArbitrageError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((*input, *output, amount, slippage_bps));
            (calls.len() - 1) % self.script.len()
        };
        let out = self.script[index].clone()?;
        let mut quote = quote(*input, *output, amount, out);
        quote.slippage_bps = slippage_bps;
        Ok(quote)
    }
}

pub struct FakeSwapClient {
    fail_at: Option<usize>,
    calls: AtomicUsize,
    last_wrap: AtomicBool,
    last_user: Mutex<Option<Pubkey>>,
}

impl FakeSwapClient {
    /// `fail_at` is the 1-based call that errors
    pub fn new(fail_at: Option<usize>) -> Self {
        Self {
            fail_at,
            calls: AtomicUsize::new(0),
            last_wrap: AtomicBool::new(false),
            last_user: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_wrap_flag(&self) -> bool {
        self.last_wrap.load(Ordering::SeqCst)
    }

    pub fn last_user(&self) -> Option<Pubkey> {
        *self.last_user.lock().unwrap()
    }
}

#[async_trait]
impl SwapApiClient for FakeSwapClient {
    async fn build_swap_transaction(
        &self,
        _quote: &Quote,
        user: &Pubkey,
        wrap_and_unwrap_sol: bool,
    ) -> Result<String, ExecutionError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.last_wrap.store(wrap_and_unwrap_sol, Ordering::SeqCst);
        *self.last_user.lock().unwrap() = Some(*user);
        if self.fail_at == Some(call) {
            return Err(ExecutionError::Build("swap endpoint returned 500".to_string()));
        }
        Ok(BASE64_STANDARD.encode([call as u8; 8]))
    }
}

pub struct FakeChain {
    healthy: AtomicBool,
    balance: AtomicU64,
    delta_per_send: AtomicI64,
    fail_send_at: Mutex<Option<usize>>,
    fail_balance_at: Mutex<Option<usize>>,
    balance_reads: AtomicUsize,
    send_delay: Mutex<Duration>,
    confirmation: Mutex<ConfirmationStatus>,
    status: Mutex<ConfirmationStatus>,
    attempts: AtomicUsize,
    sent: Mutex<Vec<Vec<u8>>>,
}

impl Default for FakeChain {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeChain {
    pub fn new() -> Self {
        Self {
            healthy: AtomicBool::new(true),
            balance: AtomicU64::new(1_000_000_000),
            delta_per_send: AtomicI64::new(0),
            fail_send_at: Mutex::new(None),
            fail_balance_at: Mutex::new(None),
            balance_reads: AtomicUsize::new(0),
            send_delay: Mutex::new(Duration::ZERO),
            confirmation: Mutex::new(ConfirmationStatus::Confirmed),
            status: Mutex::new(ConfirmationStatus::Confirmed),
            attempts: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn set_balance(&self, lamports: u64) {
        self.balance.store(lamports, Ordering::SeqCst);
    }

    pub fn set_balance_delta_per_send(&self, delta: i64) {
        self.delta_per_send.store(delta, Ordering::SeqCst);
    }

    /// 1-based send attempt that fails
    pub fn fail_send_at(&self, attempt: usize) {
        *self.fail_send_at.lock().unwrap() = Some(attempt);
    }

    /// 1-based `get_balance` call that fails; each step reads before and after sending
    pub fn fail_balance_at(&self, read: usize) {
        *self.fail_balance_at.lock().unwrap() = Some(read);
    }

    pub fn set_send_delay(&self, delay: Duration) {
        *self.send_delay.lock().unwrap() = delay;
    }

    /// What `confirm_transaction` answers
    pub fn set_confirmation(&self, status: ConfirmationStatus) {
        *self.confirmation.lock().unwrap() = status;
    }

    /// What `signature_status` answers
    pub fn set_status(&self, status: ConfirmationStatus) {
        *self.status.lock().unwrap() = status;
    }

    pub fn send_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainClient for FakeChain {
    fn endpoint(&self) -> String {
        "http://fake-rpc".to_string()
    }

    async fn health(&self) -> Result<(), ExecutionError> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ExecutionError::BackendUnreachable("connection refused".to_string()))
        }
    }

    async fn get_balance(&self, _address: &Pubkey) -> Result<u64, ExecutionError> {
        let read = self.balance_reads.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.healthy.load(Ordering::SeqCst) {
            return Err(ExecutionError::BackendUnreachable("connection refused".to_string()));
        }
        if *self.fail_balance_at.lock().unwrap() == Some(read) {
            return Err(ExecutionError::BackendUnreachable("timeout".to_string()));
        }
        Ok(self.balance.load(Ordering::SeqCst))
    }

    async fn send_raw_transaction(&self, wire: &[u8]) -> Result<Signature, ExecutionError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = *self.send_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if *self.fail_send_at.lock().unwrap() == Some(attempt) {
            return Err(ExecutionError::Submission("blockhash not found".to_string()));
        }

        let delta = self.delta_per_send.load(Ordering::SeqCst);
        let balance = self.balance.load(Ordering::SeqCst) as i64 + delta;
        self.balance.store(balance.max(0) as u64, Ordering::SeqCst);
        self.sent.lock().unwrap().push(wire.to_vec());
        Ok(Signature::from([attempt as u8; 64]))
    }

    async fn confirm_transaction(
        &self,
        _signature: &Signature,
        _timeout: Duration,
    ) -> Result<ConfirmationStatus, ExecutionError> {
        Ok(self.confirmation.lock().unwrap().clone())
    }

    async fn signature_status(&self, _signature: &Signature) -> Result<ConfirmationStatus, ExecutionError> {
        Ok(self.status.lock().unwrap().clone())
    }
}

/// Returns the wire bytes unchanged
pub struct EchoSigner {
    pubkey: Pubkey,
    reject: bool,
    signed: AtomicUsize,
}

impl EchoSigner {
    pub fn new() -> Self {
        Self {
            pubkey: Pubkey::new_unique(),
            reject: false,
            signed: AtomicUsize::new(0),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::new()
        }
    }

    pub fn signed(&self) -> usize {
        self.signed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionSigner for EchoSigner {
    fn pubkey(&self) -> Pubkey {
        self.pubkey
    }

    async fn sign_transaction(&self, unsigned: &[u8]) -> Result<Vec<u8>, ExecutionError> {
        if self.reject {
            return Err(ExecutionError::SigningRejected("User rejected the request".to_string()));
        }
        self.signed.fetch_add(1, Ordering::SeqCst);
        Ok(unsigned.to_vec())
    }
}
