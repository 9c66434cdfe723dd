//! Proptest strategies for amounts, positions and amount-field text.

use proptest::prelude::*;
use staking_primitives::{EthAmount, U256};

use crate::unstake::StakePosition;

use super::POOL;

/// Amounts up to roughly 18 million ether, in wei.
pub(crate) fn arb_amount() -> impl Strategy<Value = EthAmount> {
    (0u64..18_000_000, 0u64..1_000_000_000_000_000_000).prop_map(|(whole, frac)| {
        let wei = U256::from(whole) * U256::from(1_000_000_000_000_000_000u64) + U256::from(frac);
        EthAmount::from_wei(wei)
    })
}

/// Positions as the contract can report them, including a withdrawable part that exceeds the
/// requested total.
pub(crate) fn arb_position() -> impl Strategy<Value = StakePosition> {
    (arb_amount(), arb_amount(), arb_amount()).prop_map(|(staked, requested, withdrawable)| {
        StakePosition {
            pool: POOL,
            staked,
            requested_withdraw_total: requested,
            withdrawable,
        }
    })
}

/// Free-form text a user might type into an amount field.
pub(crate) fn arb_amount_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[0-9]{0,6}(\\.[0-9]{0,20})?",
        "[0-9.eE+\\- ,a-z]{0,12}",
        any::<String>(),
    ]
}
