//! [`StakingClient`] over an alloy [`Provider`].

use std::time::Duration;

use alloy::{
    network::{EthereumWallet, ReceiptResponse},
    primitives::TxHash,
    providers::{DynProvider, Provider, ProviderBuilder},
    transports::http::reqwest::Url,
};
use staking_primitives::{Address, EthAmount};
use staking_sm::{
    client::{FinalityStatus, QueryResponse, StakingCall, StakingClient, StakingQuery},
    errors::ClientResult,
};
use tracing::{debug, trace};

use crate::{
    contract::IStake,
    errors::{from_contract, from_transport, EvmClientError},
};

/// How often a submitted transaction's receipt is polled for by default.
pub const DEFAULT_RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Connects to `rpc_url`.
///
/// With a `wallet`, transactions are signed locally; without one they are sent with
/// `eth_sendTransaction` and the node signs them.
pub fn connect(rpc_url: &str, wallet: Option<EthereumWallet>) -> Result<DynProvider, EvmClientError> {
    let url = rpc_url
        .parse::<Url>()
        .map_err(|e| EvmClientError::InvalidRpcUrl {
            url: rpc_url.to_string(),
            reason: e.to_string(),
        })?;

    let provider = match wallet {
        Some(wallet) => ProviderBuilder::new().wallet(wallet).on_http(url).erased(),
        None => ProviderBuilder::new().on_http(url).erased(),
    };

    Ok(provider)
}

/// Reads, writes and waits for the staking contract through a JSON-RPC provider.
#[derive(Debug, Clone)]
pub struct AlloyStakingClient<P = DynProvider> {
    provider: P,
    poll_interval: Duration,
}

impl<P: Provider + Clone + 'static> AlloyStakingClient<P> {
    /// Creates a client that polls for receipts every [`DEFAULT_RECEIPT_POLL_INTERVAL`].
    pub const fn new(provider: P) -> Self {
        Self {
            provider,
            poll_interval: DEFAULT_RECEIPT_POLL_INTERVAL,
        }
    }

    /// Overrides the receipt polling interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// The underlying provider.
    pub const fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P: Provider + Clone + 'static> StakingClient for AlloyStakingClient<P> {
    type CallHandle = TxHash;

    async fn read(&self, contract: Address, query: StakingQuery) -> ClientResult<QueryResponse> {
        let stake = IStake::new(contract, self.provider.clone());

        let response = match query {
            StakingQuery::NativeBalance { account } => {
                let wei = self
                    .provider
                    .get_balance(account)
                    .await
                    .map_err(from_transport)?;
                QueryResponse::Amount(EthAmount::from_wei(wei))
            }
            StakingQuery::StakingBalance { pool, account } => {
                let staked = stake
                    .stakingBalance(pool.to_u256(), account)
                    .call()
                    .await
                    .map_err(from_contract)?;
                QueryResponse::Amount(EthAmount::from_wei(staked._0))
            }
            StakingQuery::WithdrawAmount { pool, account } => {
                let status = stake
                    .withdrawAmount(pool.to_u256(), account)
                    .call()
                    .await
                    .map_err(from_contract)?;
                QueryResponse::WithdrawStatus {
                    requested: EthAmount::from_wei(status.requestAmount),
                    withdrawable: EthAmount::from_wei(status.pendingWithdrawAmount),
                }
            }
        };

        trace!(signature = query.signature(), ?response, "read");
        Ok(response)
    }

    async fn write(&self, from: Address, contract: Address, call: StakingCall) -> ClientResult<TxHash> {
        let stake = IStake::new(contract, self.provider.clone());

        let pending = match call {
            StakingCall::Deposit { value } => {
                stake
                    .depositETH()
                    .value(value.wei())
                    .from(from)
                    .send()
                    .await
            }
            StakingCall::Unstake { pool, amount } => {
                stake
                    .unstake(pool.to_u256(), amount.wei())
                    .from(from)
                    .send()
                    .await
            }
            StakingCall::Withdraw { pool } => stake.withdraw(pool.to_u256()).from(from).send().await,
        }
        .map_err(from_contract)?;

        let tx_hash = *pending.tx_hash();
        debug!(%from, %tx_hash, signature = call.signature(), "transaction sent");
        Ok(tx_hash)
    }

    async fn wait_for_finality(&self, tx_hash: TxHash) -> ClientResult<FinalityStatus> {
        loop {
            let receipt = self
                .provider
                .get_transaction_receipt(tx_hash)
                .await
                .map_err(from_transport)?;

            match receipt {
                Some(receipt) => {
                    let status = if receipt.status() {
                        FinalityStatus::Success
                    } else {
                        FinalityStatus::Reverted
                    };
                    debug!(%tx_hash, ?status, block = ?receipt.block_number(), "receipt found");
                    return Ok(status);
                }
                None => {
                    trace!(%tx_hash, "no receipt yet");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }
}
