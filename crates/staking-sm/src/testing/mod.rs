//! In-memory collaborators and fixtures for exercising the flows without a chain.
//!
//! - [`MockChain`] implements [`StakingClient`] over a handful of maps and applies the effects of
//!   every call once it is finalized, so flows can be driven end to end.
//! - [`MockWallet`] implements [`WalletProvider`] with a mutable account list.
//! - [`proptest`] holds strategies for the property tests.

pub(crate) mod proptest;

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
    sync::Arc,
};

use parking_lot::Mutex;
use staking_primitives::{Address, EthAmount, PoolId};
use tokio::sync::{mpsc, watch, Notify};

use crate::{
    client::{FinalityStatus, QueryResponse, StakingCall, StakingClient, StakingQuery, WalletProvider},
    config::StakingConfig,
    errors::{ClientError, ClientResult},
    session::{Session, SessionWatch},
    subscription::Subscription,
};

/// The pool every test stakes into.
pub(crate) const POOL: PoolId = PoolId::new(0);

/// Address of the staking contract in [`config`].
pub(crate) const CONTRACT: u8 = 0xcc;

/// A deterministic address ending in `n`.
pub(crate) fn address(n: u8) -> Address {
    Address::with_last_byte(n)
}

/// Parses a decimal ether amount.
pub(crate) fn eth(text: &str) -> EthAmount {
    EthAmount::parse_ether(text).expect("test amount must parse")
}

/// A configuration pointing at the mock contract.
pub(crate) fn config() -> StakingConfig {
    StakingConfig {
        stake_contract_address: address(CONTRACT),
        pool_id: POOL,
        ..StakingConfig::default()
    }
}

/// A session connected as `account`, with its sender so tests can replace it.
pub(crate) fn connected(account: Address) -> (watch::Sender<Session>, SessionWatch) {
    watch::channel(Session::connected(account, 1))
}

/// A disconnected session.
pub(crate) fn disconnected() -> (watch::Sender<Session>, SessionWatch) {
    watch::channel(Session::disconnected())
}

/// How [`MockChain::wait_for_finality`] resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FinalityBehavior {
    Success,
    Revert,
    Fail(ClientError),
}

/// Handle of a call submitted to the [`MockChain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct MockTx(u64);

impl fmt::Display for MockTx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:064x}", self.0)
    }
}

#[derive(Debug)]
struct ChainState {
    native: HashMap<Address, EthAmount>,
    staked: HashMap<(PoolId, Address), EthAmount>,
    requested: HashMap<(PoolId, Address), EthAmount>,
    withdrawable: HashMap<(PoolId, Address), EthAmount>,

    reads: HashMap<&'static str, usize>,
    fail_reads: bool,
    failing_signatures: HashSet<&'static str>,

    writes: Vec<(Address, StakingCall)>,
    pending: BTreeMap<u64, (Address, StakingCall)>,
    next_tx: u64,
    submission_error: Option<ClientError>,
    finality: FinalityBehavior,
    gate: Option<Arc<Notify>>,
}

impl Default for ChainState {
    fn default() -> Self {
        Self {
            native: HashMap::new(),
            staked: HashMap::new(),
            requested: HashMap::new(),
            withdrawable: HashMap::new(),
            reads: HashMap::new(),
            fail_reads: false,
            failing_signatures: HashSet::new(),
            writes: Vec::new(),
            pending: BTreeMap::new(),
            next_tx: 1,
            submission_error: None,
            finality: FinalityBehavior::Success,
            gate: None,
        }
    }
}

/// A single-account-per-key ledger that behaves like the staking contract.
#[derive(Debug, Default)]
pub(crate) struct MockChain {
    state: Mutex<ChainState>,
}

impl MockChain {
    pub(crate) fn set_native(&self, account: Address, amount: EthAmount) {
        self.state.lock().native.insert(account, amount);
    }

    pub(crate) fn set_staked(&self, pool: PoolId, account: Address, amount: EthAmount) {
        self.state.lock().staked.insert((pool, account), amount);
    }

    pub(crate) fn set_withdraw_status(
        &self,
        pool: PoolId,
        account: Address,
        requested: EthAmount,
        withdrawable: EthAmount,
    ) {
        let mut state = self.state.lock();
        state.requested.insert((pool, account), requested);
        state.withdrawable.insert((pool, account), withdrawable);
    }

    /// Lets every outstanding unstake request of `account` finish its cooldown.
    pub(crate) fn mature(&self, pool: PoolId, account: Address) {
        let mut state = self.state.lock();
        let requested = state
            .requested
            .get(&(pool, account))
            .copied()
            .unwrap_or_default();
        state.withdrawable.insert((pool, account), requested);
    }

    pub(crate) fn native(&self, account: Address) -> EthAmount {
        self.state
            .lock()
            .native
            .get(&account)
            .copied()
            .unwrap_or_default()
    }

    /// Makes every read fail.
    pub(crate) fn fail_reads(&self, fail: bool) {
        self.state.lock().fail_reads = fail;
    }

    /// Makes reads of one function fail.
    pub(crate) fn fail_signature(&self, signature: &'static str) {
        self.state.lock().failing_signatures.insert(signature);
    }

    pub(crate) fn fail_submissions(&self, err: Option<ClientError>) {
        self.state.lock().submission_error = err;
    }

    pub(crate) fn set_finality(&self, behavior: FinalityBehavior) {
        self.state.lock().finality = behavior;
    }

    /// Blocks every finality wait until the returned gate is notified, once per call.
    pub(crate) fn hold_finality(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.lock().gate = Some(gate.clone());
        gate
    }

    /// Number of reads of `signature` so far.
    pub(crate) fn reads(&self, signature: &str) -> usize {
        self.state.lock().reads.get(signature).copied().unwrap_or(0)
    }

    pub(crate) fn total_reads(&self) -> usize {
        self.state.lock().reads.values().sum()
    }

    /// Every call accepted so far, in submission order.
    pub(crate) fn writes(&self) -> Vec<(Address, StakingCall)> {
        self.state.lock().writes.clone()
    }
}

impl ChainState {
    fn amount(map: &HashMap<(PoolId, Address), EthAmount>, pool: PoolId, account: Address) -> EthAmount {
        map.get(&(pool, account)).copied().unwrap_or_default()
    }

    fn apply(&mut self, from: Address, call: StakingCall) {
        match call {
            StakingCall::Deposit { value } => {
                let native = self.native.entry(from).or_default();
                *native = native.saturating_sub(value);
                // deposits carry no pool and land in the default one
                let staked = self.staked.entry((POOL, from)).or_default();
                *staked = staked.saturating_add(value);
            }
            StakingCall::Unstake { pool, amount } => {
                let staked = self.staked.entry((pool, from)).or_default();
                *staked = staked.saturating_sub(amount);
                let requested = self.requested.entry((pool, from)).or_default();
                *requested = requested.saturating_add(amount);
            }
            StakingCall::Withdraw { pool } => {
                let paid = Self::amount(&self.withdrawable, pool, from);
                let requested = self.requested.entry((pool, from)).or_default();
                *requested = requested.saturating_sub(paid);
                self.withdrawable.insert((pool, from), EthAmount::ZERO);
                let native = self.native.entry(from).or_default();
                *native = native.saturating_add(paid);
            }
        }
    }
}

impl StakingClient for MockChain {
    type CallHandle = MockTx;

    async fn read(&self, _contract: Address, query: StakingQuery) -> ClientResult<QueryResponse> {
        let mut state = self.state.lock();
        let signature = query.signature();
        *state.reads.entry(signature).or_default() += 1;

        if state.fail_reads || state.failing_signatures.contains(signature) {
            return Err(ClientError::Transport("connection refused".to_string()));
        }

        Ok(match query {
            StakingQuery::NativeBalance { account } => {
                QueryResponse::Amount(state.native.get(&account).copied().unwrap_or_default())
            }
            StakingQuery::StakingBalance { pool, account } => {
                QueryResponse::Amount(ChainState::amount(&state.staked, pool, account))
            }
            StakingQuery::WithdrawAmount { pool, account } => QueryResponse::WithdrawStatus {
                requested: ChainState::amount(&state.requested, pool, account),
                withdrawable: ChainState::amount(&state.withdrawable, pool, account),
            },
        })
    }

    async fn write(
        &self,
        from: Address,
        _contract: Address,
        call: StakingCall,
    ) -> ClientResult<MockTx> {
        let mut state = self.state.lock();
        if let Some(err) = state.submission_error.clone() {
            return Err(err);
        }

        let id = state.next_tx;
        state.next_tx += 1;
        state.writes.push((from, call));
        state.pending.insert(id, (from, call));
        Ok(MockTx(id))
    }

    async fn wait_for_finality(&self, handle: MockTx) -> ClientResult<FinalityStatus> {
        let gate = self.state.lock().gate.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut state = self.state.lock();
        let Some((from, call)) = state.pending.remove(&handle.0) else {
            return Err(ClientError::UnexpectedResponse(format!("unknown call {handle}")));
        };

        match state.finality.clone() {
            FinalityBehavior::Success => {
                state.apply(from, call);
                Ok(FinalityStatus::Success)
            }
            FinalityBehavior::Revert => Ok(FinalityStatus::Reverted),
            FinalityBehavior::Fail(err) => Err(err),
        }
    }
}

#[derive(Debug, Default)]
struct WalletState {
    accounts: Vec<Address>,
    listeners: Vec<mpsc::UnboundedSender<Vec<Address>>>,
}

/// A wallet whose authorized accounts are set by the test.
#[derive(Debug, Default)]
pub(crate) struct MockWallet {
    state: Mutex<WalletState>,
    failing: bool,
}

impl MockWallet {
    pub(crate) fn with_accounts(accounts: Vec<Address>) -> Self {
        Self {
            state: Mutex::new(WalletState {
                accounts,
                listeners: Vec::new(),
            }),
            failing: false,
        }
    }

    /// A wallet whose account query always fails.
    pub(crate) fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Replaces the account list and notifies every live listener.
    pub(crate) fn switch_accounts(&self, accounts: Vec<Address>) {
        let mut state = self.state.lock();
        state.accounts = accounts.clone();
        state
            .listeners
            .retain(|listener| listener.send(accounts.clone()).is_ok());
    }
}

impl WalletProvider for MockWallet {
    async fn accounts(&self) -> ClientResult<Vec<Address>> {
        if self.failing {
            return Err(ClientError::Rejected(Some("wallet locked".to_string())));
        }
        Ok(self.state.lock().accounts.clone())
    }

    fn subscribe_accounts(&self) -> Subscription<Vec<Address>> {
        let (send, subscription) = Subscription::channel();
        self.state.lock().listeners.push(send);
        subscription
    }
}
