//! The unstake and withdraw flows.
//!
//! Unstaking is a two-step process. An unstake request moves principal out of the pool and starts
//! a cooldown that the contract enforces. Once the cooldown has elapsed the amount becomes
//! withdrawable, and a withdraw pays out everything that is withdrawable at that point.
//!
//! Unlike the stake amount, the unstake amount field filters what is typed into it: only text of
//! the form `digits[.digits]` is accepted, anything else leaves the field as it was.

use std::sync::Arc;

use parking_lot::Mutex;
use staking_primitives::{is_numeric_entry, Address, EthAmount, PoolId};
use tracing::{debug, info, warn};

use crate::{
    client::{StakingCall, StakingClient, StakingContract},
    config::StakingConfig,
    errors::{FlowResult, PreconditionError},
    phase::{FlowPhase, PendingOperation, PhaseSlot},
    session::{Session, SessionWatch},
    stake::{parse_positive, submit_and_confirm, Completed},
};

/// Confirmation text for a successful unstake request.
pub const UNSTAKE_SUCCESS: &str = "Unstake successful!";

/// Confirmation text for a successful withdrawal.
pub const WITHDRAW_SUCCESS: &str = "Withdraw successful!";

/// Label describing the cooldown the contract enforces between unstake and withdraw.
pub const COOLDOWN_LABEL: &str = "~20 min cooldown";

/// Number of decimals the pending-cooldown amount is shown with.
pub const PENDING_DISPLAY_DECIMALS: usize = 4;

/// The user's position in the pool, as last read from the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StakePosition {
    /// The pool this position is in.
    pub pool: PoolId,
    /// Principal still staked.
    pub staked: EthAmount,
    /// Everything requested for unstaking and not yet withdrawn.
    pub requested_withdraw_total: EthAmount,
    /// The part of `requested_withdraw_total` whose cooldown has elapsed.
    pub withdrawable: EthAmount,
}

impl StakePosition {
    /// An empty position in `pool`.
    pub const fn empty(pool: PoolId) -> Self {
        Self {
            pool,
            staked: EthAmount::ZERO,
            requested_withdraw_total: EthAmount::ZERO,
            withdrawable: EthAmount::ZERO,
        }
    }

    /// Requested but still cooling down. Never negative, even if the contract reports more
    /// withdrawable than requested.
    pub fn pending_cooldown(&self) -> EthAmount {
        self.requested_withdraw_total
            .saturating_sub(self.withdrawable)
    }

    /// [`pending_cooldown`](Self::pending_cooldown) rounded for display.
    pub fn pending_cooldown_display(&self) -> String {
        self.pending_cooldown().to_fixed(PENDING_DISPLAY_DECIMALS)
    }

    /// The withdrawable amount, unrounded.
    pub fn withdrawable_display(&self) -> String {
        self.withdrawable.to_string()
    }
}

/// Whether a withdraw can be attempted for `position` in a session that is or is not connected.
pub fn is_withdrawable(position: &StakePosition, connected: bool) -> bool {
    !position.withdrawable.is_zero() && connected
}

/// Enable/disable state of the unstake controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnstakeControls {
    /// Show a connect affordance instead of the unstake button.
    pub show_connect: bool,
    /// The amount field accepts edits.
    pub input_enabled: bool,
    /// The unstake button can be pressed.
    pub submit_enabled: bool,
}

#[derive(Debug)]
struct UnstakeState {
    amount: String,
    position: StakePosition,
    /// Epoch of the session `position` was read under.
    position_epoch: Option<u64>,
}

/// Requests unstakes from and withdraws out of the configured pool.
#[derive(Debug)]
pub struct UnstakeFlow<C> {
    contract: Option<StakingContract<C>>,
    session: SessionWatch,
    pool: PoolId,
    state: Mutex<UnstakeState>,
    unstake_slot: PhaseSlot,
    withdraw_slot: PhaseSlot,
}

impl<C: StakingClient> UnstakeFlow<C> {
    /// Creates the flow. `client` is `None` when no wallet is installed.
    pub fn new(client: Option<Arc<C>>, config: &StakingConfig, session: SessionWatch) -> Self {
        Self {
            contract: client
                .map(|client| StakingContract::new(client, config.stake_contract_address)),
            session,
            pool: config.pool_id,
            state: Mutex::new(UnstakeState {
                amount: String::new(),
                position: StakePosition::empty(config.pool_id),
                position_epoch: None,
            }),
            unstake_slot: PhaseSlot::default(),
            withdraw_slot: PhaseSlot::default(),
        }
    }

    /// The current unstake amount text.
    pub fn amount(&self) -> String {
        self.state.lock().amount.clone()
    }

    /// Offers `text` as the new amount.
    ///
    /// Returns `false` and keeps the previous value unless `text` is a partial decimal number.
    pub fn input_amount(&self, text: &str) -> bool {
        if !is_numeric_entry(text) {
            return false;
        }
        self.state.lock().amount = text.to_string();
        true
    }

    /// The position of the current session, or an empty one if it has not been read yet.
    pub fn position(&self) -> StakePosition {
        let epoch = self.session.borrow().epoch();
        let state = self.state.lock();
        if state.position_epoch == Some(epoch) {
            state.position
        } else {
            StakePosition::empty(self.pool)
        }
    }

    /// Whether a withdraw can be attempted right now, ignoring any withdraw already in flight.
    pub fn is_withdrawable(&self) -> bool {
        let connected = self.session.borrow().is_connected();
        is_withdrawable(&self.position(), connected)
    }

    /// Phase of the unstake operation.
    pub fn unstake_phase(&self) -> FlowPhase {
        self.unstake_slot.get()
    }

    /// Phase of the withdraw operation.
    pub fn withdraw_phase(&self) -> FlowPhase {
        self.withdraw_slot.get()
    }

    /// In-flight markers of this flow. Unstake and withdraw may be in flight together.
    pub fn pending(&self) -> Vec<PendingOperation> {
        let mut pending = Vec::new();
        if !self.unstake_phase().is_idle() {
            pending.push(PendingOperation::Unstaking);
        }
        if !self.withdraw_phase().is_idle() {
            pending.push(PendingOperation::Withdrawing);
        }
        pending
    }

    /// What the unstake controls should look like right now.
    pub fn unstake_controls(&self) -> UnstakeControls {
        let idle = self.unstake_phase().is_idle();
        UnstakeControls {
            show_connect: !self.session.borrow().is_connected(),
            input_enabled: idle,
            submit_enabled: idle && !self.state.lock().amount.is_empty(),
        }
    }

    /// Whether the withdraw button can be pressed.
    pub fn withdraw_enabled(&self) -> bool {
        self.is_withdrawable() && self.withdraw_phase().is_idle()
    }

    /// Re-reads the position of the current session.
    ///
    /// Both reads must succeed for the position to change. The result is dropped if the session
    /// changed while the reads were in flight.
    pub async fn refresh(&self) {
        let session = self.session.borrow().clone();
        let (Some(contract), Some(address)) = (&self.contract, session.address()) else {
            return;
        };

        let (staked, status) = tokio::join!(
            contract.staking_balance(self.pool, address),
            contract.withdraw_status(self.pool, address)
        );

        let (staked, (requested, withdrawable)) = match (staked, status) {
            (Ok(staked), Ok(status)) => (staked, status),
            (Err(err), _) | (_, Err(err)) => {
                warn!(pool = %self.pool, %address, %err, "failed to read position, keeping the last one");
                return;
            }
        };

        if self.session.borrow().epoch() != session.epoch() {
            debug!(%address, epoch = session.epoch(), "session changed during refresh, discarding position");
            return;
        }

        let mut state = self.state.lock();
        state.position = StakePosition {
            pool: self.pool,
            staked,
            requested_withdraw_total: requested,
            withdrawable,
        };
        state.position_epoch = Some(session.epoch());
    }

    /// Requests that the amount in the field be unstaked.
    pub async fn unstake(&self) -> FlowResult<Completed> {
        let guard = self
            .unstake_slot
            .begin(PendingOperation::Unstaking)
            .ok_or(PreconditionError::OperationInFlight(PendingOperation::Unstaking))?;

        let session = self.session.borrow().clone();
        let (contract, from, amount) = match self.validate_unstake(&session) {
            Ok(checked) => checked,
            Err(err) => {
                if err.clears_amount() {
                    self.state.lock().amount.clear();
                }
                info!(%err, "unstake rejected");
                return Err(err.into());
            }
        };

        let call = StakingCall::Unstake {
            pool: self.pool,
            amount,
        };
        let tx = submit_and_confirm(&guard, contract, from, call).await?;

        info!(%from, %amount, pool = %self.pool, %tx, "unstake finalized");
        self.state.lock().amount.clear();
        self.refresh().await;

        Ok(Completed {
            operation: PendingOperation::Unstaking,
            tx,
        })
    }

    /// Withdraws everything whose cooldown has elapsed.
    pub async fn withdraw(&self) -> FlowResult<Completed> {
        let guard = self
            .withdraw_slot
            .begin(PendingOperation::Withdrawing)
            .ok_or(PreconditionError::OperationInFlight(PendingOperation::Withdrawing))?;

        let session = self.session.borrow().clone();
        let (contract, from) = self.validate_withdraw(&session).inspect_err(|err| {
            info!(%err, "withdraw rejected");
        })?;

        let tx = submit_and_confirm(
            &guard,
            contract,
            from,
            StakingCall::Withdraw { pool: self.pool },
        )
        .await?;

        info!(%from, pool = %self.pool, %tx, "withdraw finalized");
        self.refresh().await;

        Ok(Completed {
            operation: PendingOperation::Withdrawing,
            tx,
        })
    }

    fn validate_unstake(
        &self,
        session: &Session,
    ) -> Result<(&StakingContract<C>, Address, EthAmount), PreconditionError> {
        let contract = self
            .contract
            .as_ref()
            .ok_or(PreconditionError::WalletUnavailable)?;
        let from = session.address().ok_or(PreconditionError::NotConnected)?;
        let amount = parse_positive(&self.amount(), PreconditionError::ExceedsStaked)?;

        if amount > self.position().staked {
            return Err(PreconditionError::ExceedsStaked);
        }

        Ok((contract, from, amount))
    }

    fn validate_withdraw(
        &self,
        session: &Session,
    ) -> Result<(&StakingContract<C>, Address), PreconditionError> {
        let contract = self
            .contract
            .as_ref()
            .ok_or(PreconditionError::WalletUnavailable)?;
        let from = session.address().ok_or(PreconditionError::NotConnected)?;

        if !is_withdrawable(&self.position(), session.is_connected()) {
            return Err(PreconditionError::NothingToWithdraw);
        }

        Ok((contract, from))
    }
}
