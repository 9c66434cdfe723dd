//! Deployment configuration shared by the readers and flows.

use std::env;

use serde::{Deserialize, Serialize};
use staking_primitives::{Address, PoolId};
use thiserror::Error;

/// Environment variable holding the staking contract address.
pub const STAKE_ADDRESS_ENVVAR: &str = "STAKE_ADDRESS";
/// Environment variable holding the RPC endpoint.
pub const RPC_URL_ENVVAR: &str = "STAKE_RPC_URL";
/// Environment variable holding the wallet-connect project identifier.
pub const WALLETCONNECT_PROJECT_ID_ENVVAR: &str = "WALLETCONNECT_PROJECT_ID";
/// Environment variable holding the pool identifier.
pub const POOL_ID_ENVVAR: &str = "STAKE_POOL_ID";
/// Environment variable holding the chain identifier.
pub const CHAIN_ID_ENVVAR: &str = "CHAIN_ID";

/// Public Sepolia endpoint used when no RPC URL is configured.
pub const DEFAULT_RPC_URL: &str = "https://ethereum-sepolia-rpc.publicnode.com";

/// Sepolia.
pub const DEFAULT_CHAIN_ID: u64 = 11_155_111;

/// Errors raised while reading configuration from the environment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A variable was set but could not be parsed.
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        /// The offending variable.
        var: &'static str,
        /// The value it was set to.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// The values that pin a deployment to one contract, pool and chain.
///
/// Every field has a default, so a partial TOML file or a partial environment is fine. A zero
/// contract address means the deployment is not configured: balances read as zero and every
/// transaction fails with a clear error instead of being sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StakingConfig {
    /// Address of the staking contract.
    pub stake_contract_address: Address,

    /// JSON-RPC endpoint of the chain.
    pub rpc_url: String,

    /// Wallet-connect project identifier, passed through to wallet integrations.
    pub wallet_connect_project_id: String,

    /// The one pool this deployment stakes into.
    pub pool_id: PoolId,

    /// The chain the contract lives on.
    pub chain_id: u64,
}

impl Default for StakingConfig {
    fn default() -> Self {
        Self {
            stake_contract_address: Address::ZERO,
            rpc_url: DEFAULT_RPC_URL.to_string(),
            wallet_connect_project_id: String::new(),
            pool_id: PoolId::new(0),
            chain_id: DEFAULT_CHAIN_ID,
        }
    }
}

impl StakingConfig {
    /// Whether a contract address has been set.
    pub fn is_configured(&self) -> bool {
        !self.stake_contract_address.is_zero()
    }

    /// Reads the configuration from the process environment, using defaults for anything unset
    /// or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env()
    }

    /// Overrides every field whose environment variable is set and non-empty.
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.with_lookup(|var| env::var(var).ok())
    }

    /// Like [`with_env`](Self::with_env) but with a custom variable lookup.
    pub fn with_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(value) = get(STAKE_ADDRESS_ENVVAR) {
            self.stake_contract_address = parse_var(STAKE_ADDRESS_ENVVAR, &value)?;
        }
        if let Some(value) = get(RPC_URL_ENVVAR) {
            self.rpc_url = value;
        }
        if let Some(value) = get(WALLETCONNECT_PROJECT_ID_ENVVAR) {
            self.wallet_connect_project_id = value;
        }
        if let Some(value) = get(POOL_ID_ENVVAR) {
            self.pool_id = PoolId::new(parse_var(POOL_ID_ENVVAR, &value)?);
        }
        if let Some(value) = get(CHAIN_ID_ENVVAR) {
            self.chain_id = parse_var(CHAIN_ID_ENVVAR, &value)?;
        }

        Ok(self)
    }
}

fn parse_var<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            var,
            value: value.to_string(),
            reason: e.to_string(),
        })
}
