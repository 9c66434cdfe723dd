use std::time::Duration;

pub(crate) const SERVICE_NAME: &str = "stake-cli";

pub(crate) const DEFAULT_RECEIPT_POLL_MS: u64 = 2_000;

/// How often `eth_accounts` is polled when the node manages the accounts.
pub(crate) const NODE_ACCOUNTS_POLL_INTERVAL: Duration = Duration::from_secs(4);

pub(crate) const UNIT: &str = "ETH";
