//! Wallet providers backed by a local key or by the RPC node's own accounts.

use std::time::Duration;

use alloy::{
    network::EthereumWallet,
    providers::{DynProvider, Provider},
    signers::local::PrivateKeySigner,
};
use alloy_signer::k256::ecdsa::SigningKey;
use parking_lot::Mutex;
use staking_primitives::Address;
use staking_sm::{
    client::WalletProvider, errors::ClientResult, subscription::Subscription,
};
use tokio::{sync::mpsc, time::MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::errors::{from_transport, EvmClientError};

/// A wallet holding a single private key.
///
/// The active account never changes, so subscriptions stay open but never yield.
#[derive(Debug)]
pub struct LocalSignerWallet {
    signer: PrivateKeySigner,
    listeners: Mutex<Vec<mpsc::UnboundedSender<Vec<Address>>>>,
}

impl LocalSignerWallet {
    /// Wraps `signer`.
    pub const fn new(signer: PrivateKeySigner) -> Self {
        Self {
            signer,
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Parses a hex-encoded private key, with or without a `0x` prefix.
    pub fn from_hex(private_key: &str) -> Result<Self, EvmClientError> {
        let private_key = private_key.trim();
        let private_key = private_key.strip_prefix("0x").unwrap_or(private_key);
        let private_key_bytes = hex::decode(private_key)?;

        let signing_key = SigningKey::from_slice(&private_key_bytes)
            .map_err(|e| EvmClientError::InvalidKey(e.to_string()))?;

        Ok(Self::new(PrivateKeySigner::from(signing_key)))
    }

    /// The account this wallet signs for.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// A transaction signer for building a provider.
    pub fn ethereum_wallet(&self) -> EthereumWallet {
        EthereumWallet::new(self.signer.clone())
    }
}

impl WalletProvider for LocalSignerWallet {
    async fn accounts(&self) -> ClientResult<Vec<Address>> {
        Ok(vec![self.address()])
    }

    fn subscribe_accounts(&self) -> Subscription<Vec<Address>> {
        let (send, subscription) = Subscription::channel();
        let mut listeners = self.listeners.lock();
        listeners.retain(|listener| !listener.is_closed());
        listeners.push(send);
        subscription
    }
}

/// Uses the accounts unlocked on the RPC node (`eth_accounts`).
///
/// Account changes are detected by polling, since plain HTTP has no push notifications.
#[derive(Debug, Clone)]
pub struct NodeAccountsWallet<P = DynProvider> {
    provider: P,
    poll_interval: Duration,
}

impl<P: Provider + Clone + 'static> NodeAccountsWallet<P> {
    /// Creates a wallet that polls `provider` every `poll_interval`.
    pub const fn new(provider: P, poll_interval: Duration) -> Self {
        Self {
            provider,
            poll_interval,
        }
    }
}

impl<P: Provider + Clone + 'static> WalletProvider for NodeAccountsWallet<P> {
    async fn accounts(&self) -> ClientResult<Vec<Address>> {
        self.provider.get_accounts().await.map_err(from_transport)
    }

    /// Spawns a poller on the current tokio runtime. The poller stops once the subscription is
    /// dropped.
    fn subscribe_accounts(&self) -> Subscription<Vec<Address>> {
        let (send, subscription) = Subscription::channel();
        let provider = self.provider.clone();
        let poll_interval = self.poll_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last_seen: Option<Vec<Address>> = None;

            loop {
                ticker.tick().await;
                if send.is_closed() {
                    break;
                }

                let accounts = match provider.get_accounts().await {
                    Ok(accounts) => accounts,
                    Err(err) => {
                        warn!(%err, "failed to poll node accounts");
                        continue;
                    }
                };

                match &last_seen {
                    Some(previous) if *previous == accounts => {}
                    Some(_) => {
                        info!(?accounts, "node accounts changed");
                        if send.send(accounts.clone()).is_err() {
                            break;
                        }
                        last_seen = Some(accounts);
                    }
                    None => last_seen = Some(accounts),
                }
            }

            debug!("node account poller stopped");
        });

        subscription
    }
}
