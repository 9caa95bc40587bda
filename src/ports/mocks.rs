//! In-memory port implementations that record calls and return scripted responses.
//!
//! Used by unit tests and the integration suite; nothing here touches the network.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use solana_sdk::{
    hash::Hash,
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    signature::{Keypair, Signature},
};

use crate::domain::{PositionHandle, RawAccount};
use super::chain::{ChainError, ChainPort};
use super::dlmm::{CreatePoolRequest, DlmmError, DlmmPort, OpenPositionRequest, PoolState, SwapQuote};

/// Program id stamped on instructions built by `MockDlmm`
pub const MOCK_DLMM_PROGRAM: Pubkey = Pubkey::new_from_array([7u8; 32]);

/// Mock chain that records submitted transactions and allows controlled failures
#[derive(Debug, Default)]
pub struct MockChain {
    balances: Mutex<VecDeque<u64>>,
    token_accounts: Mutex<Option<Result<Vec<RawAccount>, ChainError>>>,
    accounts: Mutex<HashMap<Pubkey, RawAccount>>,
    failing_keys: Mutex<HashMap<Pubkey, String>>,
    failing_tags: Mutex<HashMap<Vec<u8>, String>>,
    scripted_send_failures: Mutex<VecDeque<String>>,
    send_delay: Mutex<Duration>,
    sent: Mutex<Vec<Vec<Instruction>>>,
    signature_counter: AtomicU64,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Balances returned by successive `get_balance` calls; the last one repeats
    pub fn with_balances(self, balances: Vec<u64>) -> Self {
        *self.balances.lock().unwrap() = balances.into();
        self
    }

    pub fn with_token_accounts(self, accounts: Vec<RawAccount>) -> Self {
        *self.token_accounts.lock().unwrap() = Some(Ok(accounts));
        self
    }

    pub fn with_token_accounts_error(self, message: &str) -> Self {
        *self.token_accounts.lock().unwrap() = Some(Err(ChainError::RpcError(message.to_string())));
        self
    }

    pub fn with_account(self, account: RawAccount) -> Self {
        self.accounts.lock().unwrap().insert(account.address, account);
        self
    }

    /// Fail every transaction that references `key`
    pub fn with_failing_key(self, key: Pubkey, message: &str) -> Self {
        self.failing_keys.lock().unwrap().insert(key, message.to_string());
        self
    }

    /// Fail every transaction containing an instruction whose data is `tag`
    pub fn with_failing_tag(self, tag: &[u8], message: &str) -> Self {
        self.failing_tags.lock().unwrap().insert(tag.to_vec(), message.to_string());
        self
    }

    /// Fail the next sends, in order, with these messages
    pub fn with_send_failures(self, messages: Vec<&str>) -> Self {
        *self.scripted_send_failures.lock().unwrap() =
            messages.into_iter().map(String::from).collect();
        self
    }

    /// Simulated confirmation latency per transaction
    pub fn with_send_delay(self, delay: Duration) -> Self {
        *self.send_delay.lock().unwrap() = delay;
        self
    }

    pub fn insert_account(&self, account: RawAccount) {
        self.accounts.lock().unwrap().insert(account.address, account);
    }

    /// All submitted transactions (successful or not), in submission order
    pub fn sent(&self) -> Vec<Vec<Instruction>> {
        self.sent.lock().unwrap().clone()
    }

    /// Submitted transactions whose first instruction carries `tag` as data
    pub fn sent_with_tag(&self, tag: &[u8]) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|tx| tx.iter().any(|ix| ix.data == tag))
            .count()
    }

    /// Highest number of concurrently pending `send_and_confirm` calls
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_signature(&self) -> Signature {
        let n = self.signature_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let mut bytes = [0u8; 64];
        bytes[..8].copy_from_slice(&n.to_le_bytes());
        Signature::from(bytes)
    }

    fn failure_for(&self, instructions: &[Instruction]) -> Option<String> {
        let failing = self.failing_keys.lock().unwrap();
        for ix in instructions {
            for meta in &ix.accounts {
                if let Some(message) = failing.get(&meta.pubkey) {
                    return Some(message.clone());
                }
            }
        }
        drop(failing);
        let tags = self.failing_tags.lock().unwrap();
        if let Some(message) = instructions.iter().find_map(|ix| tags.get(&ix.data)) {
            return Some(message.clone());
        }
        drop(tags);
        self.scripted_send_failures.lock().unwrap().pop_front()
    }
}

#[async_trait]
impl ChainPort for MockChain {
    async fn get_balance(&self, _owner: &Pubkey) -> Result<u64, ChainError> {
        let mut balances = self.balances.lock().unwrap();
        if balances.len() > 1 {
            Ok(balances.pop_front().unwrap_or_default())
        } else {
            Ok(balances.front().copied().unwrap_or_default())
        }
    }

    async fn get_token_accounts(
        &self,
        _owner: &Pubkey,
        _token_program: &Pubkey,
    ) -> Result<Vec<RawAccount>, ChainError> {
        self.token_accounts
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn get_account(&self, address: &Pubkey) -> Result<Option<RawAccount>, ChainError> {
        Ok(self.accounts.lock().unwrap().get(address).cloned())
    }

    async fn get_latest_blockhash(&self) -> Result<Hash, ChainError> {
        Ok(Hash::default())
    }

    async fn get_minimum_balance_for_rent_exemption(&self, data_len: usize) -> Result<u64, ChainError> {
        Ok((data_len as u64 + 128) * 6_960)
    }

    async fn send_and_confirm(
        &self,
        instructions: &[Instruction],
        _payer: &Keypair,
        _signers: &[&Keypair],
    ) -> Result<Signature, ChainError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.send_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.sent.lock().unwrap().push(instructions.to_vec());
        let result = match self.failure_for(instructions) {
            Some(message) => Err(ChainError::TransactionError(message)),
            None => Ok(self.next_signature()),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Mock DLMM protocol with a single pool and a fixed exchange rate
#[derive(Debug)]
pub struct MockDlmm {
    pool: PoolState,
    /// Quote output = input * rate.0 / rate.1
    rate: (u64, u64),
    has_liquidity: bool,
    fail_all_swaps: bool,
    failing_swap_calls: HashSet<u32>,
    swap_calls: AtomicU32,
    calls: Mutex<Vec<String>>,
    quotes: Mutex<Vec<SwapQuote>>,
    open_requests: Mutex<Vec<OpenPositionRequest>>,
}

impl MockDlmm {
    pub fn new(pool: PoolState) -> Self {
        Self {
            pool,
            rate: (1, 1),
            has_liquidity: true,
            fail_all_swaps: false,
            failing_swap_calls: HashSet::new(),
            swap_calls: AtomicU32::new(0),
            calls: Mutex::new(Vec::new()),
            quotes: Mutex::new(Vec::new()),
            open_requests: Mutex::new(Vec::new()),
        }
    }

    /// Pool with unique addresses and the active bin at `active_id`
    pub fn with_active_id(active_id: i32) -> Self {
        Self::new(PoolState {
            address: Pubkey::new_unique(),
            token_x_mint: Pubkey::new_unique(),
            token_y_mint: Pubkey::new_unique(),
            reserve_x: Pubkey::new_unique(),
            reserve_y: Pubkey::new_unique(),
            oracle: Pubkey::new_unique(),
            active_id,
            bin_step: 20,
            base_factor: 10_000,
            base_fee_power_factor: 0,
        })
    }

    pub fn with_rate(mut self, numerator: u64, denominator: u64) -> Self {
        self.rate = (numerator, denominator);
        self
    }

    pub fn without_liquidity(mut self) -> Self {
        self.has_liquidity = false;
        self
    }

    /// Fail the `n`th swap instruction build (0-based, counted across cycles)
    pub fn with_failing_swap_call(mut self, n: u32) -> Self {
        self.failing_swap_calls.insert(n);
        self
    }

    pub fn with_all_swaps_failing(mut self) -> Self {
        self.fail_all_swaps = true;
        self
    }

    pub fn pool(&self) -> &PoolState {
        &self.pool
    }

    /// Recorded operation names, in call order
    pub fn get_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| c.as_str() == name).count()
    }

    /// Quotes handed out, in order
    pub fn quotes(&self) -> Vec<SwapQuote> {
        self.quotes.lock().unwrap().clone()
    }

    /// Open-position requests, in order
    pub fn open_requests(&self) -> Vec<OpenPositionRequest> {
        self.open_requests.lock().unwrap().clone()
    }

    fn record(&self, name: &str) {
        self.calls.lock().unwrap().push(name.to_string());
    }

    fn tagged(tag: &[u8], accounts: Vec<AccountMeta>) -> Instruction {
        Instruction::new_with_bytes(MOCK_DLMM_PROGRAM, tag, accounts)
    }
}

#[async_trait]
impl DlmmPort for MockDlmm {
    fn derive_pool_address(&self, _x: &Pubkey, _y: &Pubkey, _bin_step: u16, _base_factor: u16) -> Pubkey {
        self.pool.address
    }

    fn derive_preset_parameter(&self, _bin_step: u16, _base_factor: u16) -> Pubkey {
        Pubkey::new_from_array([9u8; 32])
    }

    async fn load_pool(&self, pool: &Pubkey) -> Result<PoolState, DlmmError> {
        self.record("load_pool");
        if *pool == self.pool.address {
            Ok(self.pool.clone())
        } else {
            Err(DlmmError::InvalidPool(pool.to_string()))
        }
    }

    async fn create_pool_instructions(
        &self,
        funder: &Pubkey,
        _request: &CreatePoolRequest,
    ) -> Result<Vec<Instruction>, DlmmError> {
        self.record("create_pool");
        Ok(vec![Self::tagged(b"create_pool", vec![AccountMeta::new(*funder, true)])])
    }

    async fn open_position_instructions(
        &self,
        _pool: &PoolState,
        request: &OpenPositionRequest,
    ) -> Result<Vec<Instruction>, DlmmError> {
        self.record("open_position");
        self.open_requests.lock().unwrap().push(request.clone());
        Ok(vec![Self::tagged(
            b"open_position",
            vec![AccountMeta::new(request.position, true), AccountMeta::new(request.user, true)],
        )])
    }

    async fn remove_liquidity_instructions(
        &self,
        _pool: &PoolState,
        user: &Pubkey,
        position: &PositionHandle,
    ) -> Result<Vec<Instruction>, DlmmError> {
        self.record("remove_liquidity");
        Ok(vec![Self::tagged(
            b"remove_liquidity",
            vec![AccountMeta::new(position.address, false), AccountMeta::new(*user, true)],
        )])
    }

    async fn bin_arrays_for_swap(&self, pool: &PoolState, _swap_for_y: bool) -> Result<Vec<Pubkey>, DlmmError> {
        self.record("bin_arrays_for_swap");
        if self.has_liquidity {
            Ok(vec![pool.address])
        } else {
            Ok(Vec::new())
        }
    }

    fn swap_quote(
        &self,
        _pool: &PoolState,
        amount_in: u64,
        swap_for_y: bool,
        slippage_bps: u16,
        bin_arrays: Vec<Pubkey>,
    ) -> Result<SwapQuote, DlmmError> {
        self.record("swap_quote");
        let out_amount = (amount_in as u128 * self.rate.0 as u128 / self.rate.1 as u128) as u64;
        let min_out_amount =
            (out_amount as u128 * (10_000 - slippage_bps as u128) / 10_000) as u64;
        let quote = SwapQuote {
            swap_for_y,
            amount_in,
            out_amount,
            min_out_amount,
            fee: 0,
            bin_arrays,
        };
        self.quotes.lock().unwrap().push(quote.clone());
        Ok(quote)
    }

    async fn swap_instructions(
        &self,
        _pool: &PoolState,
        user: &Pubkey,
        _quote: &SwapQuote,
    ) -> Result<Vec<Instruction>, DlmmError> {
        self.record("swap");
        let call = self.swap_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_all_swaps || self.failing_swap_calls.contains(&call) {
            return Err(DlmmError::QuoteError(format!("injected swap failure #{}", call)));
        }
        Ok(vec![Self::tagged(b"swap", vec![AccountMeta::new(*user, true)])])
    }
}
