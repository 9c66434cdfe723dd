//! The capabilities the staking session needs from the outside world.
//!
//! The session never talks to a particular chain library. It needs a wallet that can tell it which
//! accounts are authorized and when that changes ([`WalletProvider`]), and a client that can read
//! contract state, submit a state-changing call and wait for that call to be finalized
//! ([`StakingClient`]). Encoding calls for the wire is entirely the client's business.

use std::{fmt, future::Future, sync::Arc};

use staking_primitives::{Address, EthAmount, PoolId};
use tracing::{debug, trace};

use crate::{
    errors::{ClientError, ClientResult},
    phase::PendingOperation,
    subscription::Subscription,
};

/// A read against the latest block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StakingQuery {
    /// The account's native-currency balance.
    NativeBalance {
        /// Account to read.
        account: Address,
    },

    /// The principal the account has staked in the pool.
    StakingBalance {
        /// Pool to read.
        pool: PoolId,
        /// Account to read.
        account: Address,
    },

    /// The account's cumulative unstake requests and the part of them that is withdrawable.
    WithdrawAmount {
        /// Pool to read.
        pool: PoolId,
        /// Account to read.
        account: Address,
    },
}

impl StakingQuery {
    /// The contract function this query maps to.
    pub const fn signature(&self) -> &'static str {
        match self {
            StakingQuery::NativeBalance { .. } => "eth_getBalance",
            StakingQuery::StakingBalance { .. } => "stakingBalance(uint256,address)",
            StakingQuery::WithdrawAmount { .. } => "withdrawAmount(uint256,address)",
        }
    }

    /// Whether the query is answered by the staking contract rather than the chain itself.
    pub const fn targets_contract(&self) -> bool {
        !matches!(self, StakingQuery::NativeBalance { .. })
    }
}

/// The decoded answer to a [`StakingQuery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryResponse {
    /// A single amount.
    Amount(EthAmount),

    /// The pair returned by [`StakingQuery::WithdrawAmount`].
    WithdrawStatus {
        /// Everything the account has ever asked to unstake and not yet withdrawn.
        requested: EthAmount,
        /// The part of `requested` whose cooldown has elapsed.
        withdrawable: EthAmount,
    },
}

/// A state-changing call against the staking contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StakingCall {
    /// Deposits `value` of native currency into the pool.
    Deposit {
        /// The amount transferred with the call.
        value: EthAmount,
    },

    /// Requests that `amount` of principal be unstaked, starting its cooldown.
    Unstake {
        /// Pool to unstake from.
        pool: PoolId,
        /// Principal to unstake.
        amount: EthAmount,
    },

    /// Withdraws everything whose cooldown has elapsed.
    Withdraw {
        /// Pool to withdraw from.
        pool: PoolId,
    },
}

impl StakingCall {
    /// The contract function this call maps to.
    pub const fn signature(&self) -> &'static str {
        match self {
            StakingCall::Deposit { .. } => "depositETH()",
            StakingCall::Unstake { .. } => "unstake(uint256,uint256)",
            StakingCall::Withdraw { .. } => "withdraw(uint256)",
        }
    }

    /// The native currency transferred with the call, if any.
    pub const fn value(&self) -> Option<EthAmount> {
        match self {
            StakingCall::Deposit { value } => Some(*value),
            StakingCall::Unstake { .. } | StakingCall::Withdraw { .. } => None,
        }
    }

    /// The in-flight marker for this call.
    pub const fn operation(&self) -> PendingOperation {
        match self {
            StakingCall::Deposit { .. } => PendingOperation::Staking,
            StakingCall::Unstake { .. } => PendingOperation::Unstaking,
            StakingCall::Withdraw { .. } => PendingOperation::Withdrawing,
        }
    }
}

/// The authoritative outcome of a submitted call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FinalityStatus {
    /// The call executed successfully.
    Success,
    /// The call was included but reverted.
    Reverted,
}

/// Read, write and wait-for-finality access to a chain.
///
/// Implementations must allow concurrent calls from multiple flows; no call may rely on a
/// previous call having completed.
pub trait StakingClient: Send + Sync + 'static {
    /// Identifies a submitted call, e.g. a transaction hash.
    type CallHandle: Clone + fmt::Debug + fmt::Display + Send + Sync + 'static;

    /// Reads state at the latest block.
    fn read(
        &self,
        contract: Address,
        query: StakingQuery,
    ) -> impl Future<Output = ClientResult<QueryResponse>> + Send;

    /// Signs and submits `call` on behalf of `from`.
    ///
    /// Resolves once the network has accepted the call, not once it is final.
    fn write(
        &self,
        from: Address,
        contract: Address,
        call: StakingCall,
    ) -> impl Future<Output = ClientResult<Self::CallHandle>> + Send;

    /// Waits until the outcome of a submitted call is final.
    fn wait_for_finality(
        &self,
        handle: Self::CallHandle,
    ) -> impl Future<Output = ClientResult<FinalityStatus>> + Send;
}

/// Access to the user's wallet.
pub trait WalletProvider: Send + Sync + 'static {
    /// Returns the accounts the user has already authorized, active account first.
    fn accounts(&self) -> impl Future<Output = ClientResult<Vec<Address>>> + Send;

    /// Subscribes to changes of the authorized accounts.
    ///
    /// Every item is the full new list, active account first. An empty list means the wallet
    /// disconnected. Dropping the subscription removes the listener.
    fn subscribe_accounts(&self) -> Subscription<Vec<Address>>;
}

/// Typed access to the staking contract through a [`StakingClient`].
///
/// Refuses to talk to the zero address: every contract read or write fails with
/// [`ClientError::NotConfigured`] without touching the network.
#[derive(Debug)]
pub struct StakingContract<C> {
    client: Arc<C>,
    address: Address,
}

impl<C> Clone for StakingContract<C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            address: self.address,
        }
    }
}

impl<C: StakingClient> StakingContract<C> {
    /// Binds `client` to the contract at `address`.
    pub const fn new(client: Arc<C>, address: Address) -> Self {
        Self { client, address }
    }

    /// The contract address.
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Whether the contract address has been configured.
    pub fn is_configured(&self) -> bool {
        !self.address.is_zero()
    }

    async fn query(&self, query: StakingQuery) -> ClientResult<QueryResponse> {
        if query.targets_contract() && !self.is_configured() {
            return Err(ClientError::NotConfigured);
        }
        trace!(signature = query.signature(), ?query, "reading");
        self.client.read(self.address, query).await
    }

    /// Reads the native balance of `account`.
    pub async fn native_balance(&self, account: Address) -> ClientResult<EthAmount> {
        match self.query(StakingQuery::NativeBalance { account }).await? {
            QueryResponse::Amount(amount) => Ok(amount),
            other => Err(unexpected("native balance", other)),
        }
    }

    /// Reads the principal `account` has staked in `pool`.
    pub async fn staking_balance(&self, pool: PoolId, account: Address) -> ClientResult<EthAmount> {
        match self
            .query(StakingQuery::StakingBalance { pool, account })
            .await?
        {
            QueryResponse::Amount(amount) => Ok(amount),
            other => Err(unexpected("staking balance", other)),
        }
    }

    /// Reads `(requested, withdrawable)` for `account` in `pool`.
    pub async fn withdraw_status(
        &self,
        pool: PoolId,
        account: Address,
    ) -> ClientResult<(EthAmount, EthAmount)> {
        match self
            .query(StakingQuery::WithdrawAmount { pool, account })
            .await?
        {
            QueryResponse::WithdrawStatus {
                requested,
                withdrawable,
            } => Ok((requested, withdrawable)),
            other => Err(unexpected("withdraw status", other)),
        }
    }

    /// Submits `call` from `from`.
    pub async fn submit(&self, from: Address, call: StakingCall) -> ClientResult<C::CallHandle> {
        if !self.is_configured() {
            return Err(ClientError::NotConfigured);
        }
        debug!(%from, signature = call.signature(), ?call, "submitting call");
        self.client.write(from, self.address, call).await
    }

    /// Waits for the outcome of a submitted call.
    pub async fn wait_for_finality(&self, handle: C::CallHandle) -> ClientResult<FinalityStatus> {
        self.client.wait_for_finality(handle).await
    }
}

fn unexpected(what: &str, got: QueryResponse) -> ClientError {
    ClientError::UnexpectedResponse(format!("expected {what}, got {got:?}"))
}
