//! Domain primitives shared by every crate in the staking workspace.
//!
//! This crate sits at the bottom of the workspace hierarchy and has no knowledge of wallets,
//! clients or flows. It only knows how to represent and parse amounts and pool identifiers.

mod amount;
mod input;
mod pool;

pub use alloy_primitives::{Address, U256};
pub use amount::{AmountParseError, EthAmount, NATIVE_DECIMALS};
pub use input::is_numeric_entry;
pub use pool::PoolId;
