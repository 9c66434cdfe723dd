//! An [`alloy`] implementation of the staking session's chain and wallet collaborators.
//!
//! - [`AlloyStakingClient`] reads and writes the staking contract over JSON-RPC.
//! - [`LocalSignerWallet`] is a wallet holding one private key.
//! - [`NodeAccountsWallet`] uses the accounts the RPC node manages and polls them for changes.

mod client;
mod contract;
mod errors;
mod wallet;

pub use client::{connect, AlloyStakingClient, DEFAULT_RECEIPT_POLL_INTERVAL};
pub use contract::IStake;
pub use errors::EvmClientError;
pub use wallet::{LocalSignerWallet, NodeAccountsWallet};
