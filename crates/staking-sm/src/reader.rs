//! Reads of the user's free and staked balances.

use staking_primitives::{Address, EthAmount, PoolId};
use tracing::warn;

use crate::{
    client::{StakingClient, StakingContract},
    errors::ClientResult,
};

/// Free and staked balances of one account, as read at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Balances {
    /// Native currency available to stake.
    pub free: EthAmount,
    /// Principal currently staked in the pool.
    pub staked: EthAmount,
}

/// Side-effect-free reads of an account's balances.
///
/// Holds no cursor or cache, so any number of reads may run at the same time.
#[derive(Debug)]
pub struct BalanceReader<C> {
    contract: StakingContract<C>,
}

impl<C> Clone for BalanceReader<C> {
    fn clone(&self) -> Self {
        Self {
            contract: self.contract.clone(),
        }
    }
}

impl<C: StakingClient> BalanceReader<C> {
    /// Creates a reader over `contract`.
    pub const fn new(contract: StakingContract<C>) -> Self {
        Self { contract }
    }

    /// The contract this reader reads from.
    pub const fn contract(&self) -> &StakingContract<C> {
        &self.contract
    }

    /// Native currency available to stake. Zero if the read fails.
    pub async fn free_balance(&self, address: Address) -> EthAmount {
        self.try_free_balance(address).await.unwrap_or_else(|err| {
            warn!(%address, %err, "failed to read free balance");
            EthAmount::ZERO
        })
    }

    /// Principal `address` has staked in `pool`. Zero if the read fails.
    pub async fn staked_amount(&self, pool: PoolId, address: Address) -> EthAmount {
        self.try_staked_amount(pool, address)
            .await
            .unwrap_or_else(|err| {
                warn!(%pool, %address, %err, "failed to read staked amount");
                EthAmount::ZERO
            })
    }

    /// Like [`free_balance`](Self::free_balance) but surfaces the error.
    pub async fn try_free_balance(&self, address: Address) -> ClientResult<EthAmount> {
        self.contract.native_balance(address).await
    }

    /// Like [`staked_amount`](Self::staked_amount) but surfaces the error.
    pub async fn try_staked_amount(&self, pool: PoolId, address: Address) -> ClientResult<EthAmount> {
        self.contract.staking_balance(pool, address).await
    }

    /// Reads both balances concurrently.
    ///
    /// Each field is `None` if its read failed, so callers can keep their last-known value.
    pub async fn refresh(&self, pool: PoolId, address: Address) -> PartialBalances {
        let (free, staked) = tokio::join!(
            self.try_free_balance(address),
            self.try_staked_amount(pool, address)
        );

        PartialBalances {
            free: free
                .inspect_err(|err| warn!(%address, %err, "failed to read free balance"))
                .ok(),
            staked: staked
                .inspect_err(|err| warn!(%pool, %address, %err, "failed to read staked amount"))
                .ok(),
        }
    }
}

/// The result of [`BalanceReader::refresh`], with `None` for every read that failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartialBalances {
    /// Free balance, if it could be read.
    pub free: Option<EthAmount>,
    /// Staked amount, if it could be read.
    pub staked: Option<EthAmount>,
}

impl PartialBalances {
    /// Overlays the successful reads onto `last_known`.
    pub fn merge_into(self, last_known: Balances) -> Balances {
        Balances {
            free: self.free.unwrap_or(last_known.free),
            staked: self.staked.unwrap_or(last_known.staked),
        }
    }
}
