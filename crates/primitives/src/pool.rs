//! Identifiers for staking pools.

use std::fmt;

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// Identifier of a pool inside the staking contract.
///
/// A deployment only ever talks to one pool, selected by configuration.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PoolId(u64);

impl PoolId {
    /// Creates a new [`PoolId`].
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier.
    pub const fn get(&self) -> u64 {
        self.0
    }

    /// Returns the identifier as the `uint256` the contract expects.
    pub fn to_u256(&self) -> U256 {
        U256::from(self.0)
    }
}

impl From<u64> for PoolId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
