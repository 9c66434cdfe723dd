//! This crate implements the staking session: the reads and writes a user performs against a
//! single staking contract, and the rules that gate them.
//!
//! The session is made of cooperating parts that share one [`Session`](session::Session):
//!
//! - the [`ConnectionTracker`](session::ConnectionTracker) follows the wallet's active account and
//!   is the only writer of the session,
//! - the [`BalanceReader`](reader::BalanceReader) reads free and staked balances,
//! - the [`StakeFlow`](stake::StakeFlow) validates and submits deposits,
//! - the [`UnstakeFlow`](unstake::UnstakeFlow) validates and submits unstake requests and
//!   withdrawals.
//!
//! Flows never push state. Every successful mutation is followed by a fresh read of the contract.
//! The chain and the wallet are reached only through the traits in [`client`].

pub mod client;
pub mod config;
pub mod errors;
pub mod phase;
pub mod reader;
pub mod session;
pub mod stake;
pub mod subscription;
pub mod unstake;

#[cfg(test)]
pub(crate) mod testing;
