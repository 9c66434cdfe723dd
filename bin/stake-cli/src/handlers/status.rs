use staking_sm::{
    client::StakingClient,
    reader::Balances,
    session::Session,
    unstake::{StakePosition, COOLDOWN_LABEL},
};

use super::Staking;
use crate::constants::UNIT;

pub(crate) fn print_status<C: StakingClient>(staking: &Staking<C>) {
    let report = render_status(
        &staking.tracker.current(),
        &staking.config.stake_contract_address.to_string(),
        staking.config.is_configured(),
        &staking.stake.balances(),
        &staking.unstake.position(),
        staking.unstake.withdraw_enabled(),
    );
    println!("{report}");
}

fn render_status(
    session: &Session,
    contract: &str,
    configured: bool,
    balances: &Balances,
    position: &StakePosition,
    withdraw_enabled: bool,
) -> String {
    let mut lines = vec![format!("session:      {session}")];

    if configured {
        lines.push(format!("contract:     {contract} (pool {})", position.pool));
    } else {
        lines.push("contract:     not configured".to_string());
    }

    if session.is_connected() {
        lines.push(format!("free:         {} {UNIT}", balances.free));
        lines.push(format!("staked:       {} {UNIT}", balances.staked));
        lines.push(format!(
            "withdrawable: {} {UNIT}{}",
            position.withdrawable_display(),
            if withdraw_enabled { "" } else { " (nothing to withdraw)" }
        ));
        lines.push(format!(
            "pending:      {} {UNIT} ({COOLDOWN_LABEL})",
            position.pending_cooldown_display()
        ));
    } else {
        lines.push("connect a wallet to see balances".to_string());
    }

    lines.join("\n")
}
