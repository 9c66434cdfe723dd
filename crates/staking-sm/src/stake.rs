//! The deposit flow.
//!
//! The amount field takes arbitrary text; nothing is checked until [`StakeFlow::stake`] runs.
//! Checks run in a fixed order and the first failure is reported:
//!
//! 1. a wallet client exists,
//! 2. the session is connected,
//! 3. the amount parses to something strictly positive,
//! 4. the amount does not exceed the free balance.
//!
//! After a successful deposit the amount is cleared and both balances are re-read from the chain.

use std::sync::Arc;

use parking_lot::Mutex;
use staking_primitives::{Address, AmountParseError, EthAmount, PoolId};
use tracing::{debug, info, warn};

use crate::{
    client::{FinalityStatus, StakingCall, StakingClient, StakingContract},
    config::StakingConfig,
    errors::{FlowError, FlowResult, PreconditionError},
    phase::{FlowPhase, PendingOperation, PhaseGuard, PhaseSlot},
    reader::{BalanceReader, Balances},
    session::{Session, SessionWatch},
};

/// Confirmation text for a successful deposit.
pub const STAKE_SUCCESS: &str = "Stake successful!";

/// The outcome of a finalized, successful call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completed {
    /// What was done.
    pub operation: PendingOperation,
    /// The handle of the finalized call.
    pub tx: String,
}

/// Enable/disable state of the stake controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StakeControls {
    /// Show a connect affordance instead of the stake button.
    pub show_connect: bool,
    /// The amount field accepts edits.
    pub input_enabled: bool,
    /// The stake button can be pressed.
    pub submit_enabled: bool,
}

#[derive(Debug, Default)]
struct StakeState {
    amount: String,
    balances: Balances,
    /// Epoch of the session `balances` was read under.
    balances_epoch: Option<u64>,
}

/// Stakes native currency into the configured pool.
#[derive(Debug)]
pub struct StakeFlow<C> {
    reader: Option<BalanceReader<C>>,
    session: SessionWatch,
    pool: PoolId,
    state: Mutex<StakeState>,
    slot: PhaseSlot,
}

impl<C: StakingClient> StakeFlow<C> {
    /// Creates the flow.
    ///
    /// `client` is `None` when no wallet is installed; the flow then reads nothing and every stake
    /// attempt reports that a wallet is needed.
    pub fn new(client: Option<Arc<C>>, config: &StakingConfig, session: SessionWatch) -> Self {
        let reader = client.map(|client| {
            BalanceReader::new(StakingContract::new(client, config.stake_contract_address))
        });
        Self {
            reader,
            session,
            pool: config.pool_id,
            state: Mutex::new(StakeState::default()),
            slot: PhaseSlot::default(),
        }
    }

    /// The current amount text.
    pub fn amount(&self) -> String {
        self.state.lock().amount.clone()
    }

    /// Replaces the amount text. Any text is accepted here.
    pub fn set_amount(&self, text: impl Into<String>) {
        self.state.lock().amount = text.into();
    }

    /// Balances of the current session, or zeros if none have been read for it yet.
    pub fn balances(&self) -> Balances {
        let epoch = self.session.borrow().epoch();
        let state = self.state.lock();
        if state.balances_epoch == Some(epoch) {
            state.balances
        } else {
            Balances::default()
        }
    }

    /// The phase of the stake operation.
    pub fn phase(&self) -> FlowPhase {
        self.slot.get()
    }

    /// The in-flight marker of this flow.
    pub fn pending(&self) -> PendingOperation {
        if self.phase().is_idle() {
            PendingOperation::None
        } else {
            PendingOperation::Staking
        }
    }

    /// What the stake controls should look like right now.
    pub fn controls(&self) -> StakeControls {
        let idle = self.phase().is_idle();
        StakeControls {
            show_connect: !self.session.borrow().is_connected(),
            input_enabled: idle,
            submit_enabled: idle && !self.state.lock().amount.is_empty(),
        }
    }

    /// Re-reads the free and staked balances of the current session.
    ///
    /// Results are dropped if the session changed while the reads were in flight. Failed reads
    /// keep their last-known value.
    pub async fn refresh(&self) {
        let session = self.session.borrow().clone();
        let (Some(reader), Some(address)) = (&self.reader, session.address()) else {
            return;
        };
        if !session.is_connected() {
            return;
        }

        let read = reader.refresh(self.pool, address).await;

        if self.session.borrow().epoch() != session.epoch() {
            debug!(%address, epoch = session.epoch(), "session changed during refresh, discarding balances");
            return;
        }

        let mut state = self.state.lock();
        let last_known = if state.balances_epoch == Some(session.epoch()) {
            state.balances
        } else {
            Balances::default()
        };
        state.balances = read.merge_into(last_known);
        state.balances_epoch = Some(session.epoch());
    }

    /// Deposits the amount currently in the field.
    pub async fn stake(&self) -> FlowResult<Completed> {
        let guard = self
            .slot
            .begin(PendingOperation::Staking)
            .ok_or(PreconditionError::OperationInFlight(PendingOperation::Staking))?;

        let session = self.session.borrow().clone();
        let (reader, from, value) = match self.validate(&session) {
            Ok(checked) => checked,
            Err(err) => {
                if err.clears_amount() {
                    self.state.lock().amount.clear();
                }
                info!(%err, "stake rejected");
                return Err(err.into());
            }
        };

        let tx = submit_and_confirm(
            &guard,
            reader.contract(),
            from,
            StakingCall::Deposit { value },
        )
        .await?;

        info!(%from, %value, %tx, "stake finalized");
        self.state.lock().amount.clear();
        self.refresh().await;

        Ok(Completed {
            operation: PendingOperation::Staking,
            tx,
        })
    }

    fn validate(
        &self,
        session: &Session,
    ) -> Result<(&BalanceReader<C>, Address, EthAmount), PreconditionError> {
        let reader = self
            .reader
            .as_ref()
            .ok_or(PreconditionError::WalletUnavailable)?;

        let from = session
            .address()
            .filter(|_| session.is_connected())
            .ok_or(PreconditionError::NotConnected)?;

        let value = parse_positive(&self.amount(), PreconditionError::ExceedsBalance)?;

        if value > self.balances().free {
            return Err(PreconditionError::ExceedsBalance);
        }

        Ok((reader, from, value))
    }
}

/// Parses an amount field, requiring a strictly positive value.
///
/// A well-formed amount too large to represent can never be covered, so it fails with
/// `too_large` instead of [`PreconditionError::InvalidAmount`].
pub(crate) fn parse_positive(
    text: &str,
    too_large: PreconditionError,
) -> Result<EthAmount, PreconditionError> {
    match EthAmount::parse_ether(text) {
        Ok(amount) if !amount.is_zero() => Ok(amount),
        Err(AmountParseError::Overflow) => Err(too_large),
        _ => Err(PreconditionError::InvalidAmount),
    }
}

/// Runs the Submitting and Confirming phases of a call.
///
/// Returns the call handle once the call has finalized successfully. The caller refreshes
/// afterwards, still inside the Confirming phase.
pub(crate) async fn submit_and_confirm<C: StakingClient>(
    guard: &PhaseGuard<'_>,
    contract: &StakingContract<C>,
    from: Address,
    call: StakingCall,
) -> FlowResult<String> {
    let op = call.operation();

    guard.advance(FlowPhase::Submitting);
    let handle = contract.submit(from, call).await.map_err(|err| {
        warn!(%op, %err, "submission failed");
        FlowError::Submission(err)
    })?;

    guard.advance(FlowPhase::Confirming);
    debug!(%op, %handle, "call accepted, waiting for finality");

    let tx = handle.to_string();
    match contract.wait_for_finality(handle).await {
        Ok(FinalityStatus::Success) => Ok(tx),
        Ok(FinalityStatus::Reverted) => {
            warn!(%op, %tx, "call reverted");
            Err(FlowError::Reverted { tx })
        }
        Err(err) => {
            warn!(%op, %tx, %err, "finality wait failed");
            Err(FlowError::Finality(err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        client::StakingCall,
        errors::ClientError,
        testing::{address, config, connected, disconnected, eth, FinalityBehavior, MockChain, POOL},
    };

    const USER: u8 = 1;

    async fn funded_flow(free: &str, staked: &str) -> (Arc<MockChain>, StakeFlow<MockChain>) {
        let chain = Arc::new(MockChain::default());
        chain.set_native(address(USER), eth(free));
        chain.set_staked(POOL, address(USER), eth(staked));

        let (_tx, watch) = connected(address(USER));
        let flow = StakeFlow::new(Some(chain.clone()), &config(), watch);
        flow.refresh().await;
        (chain, flow)
    }

    #[tokio::test]
    async fn refresh_reads_both_balances() {
        let (_chain, flow) = funded_flow("3", "1").await;

        assert_eq!(
            flow.balances(),
            Balances {
                free: eth("3"),
                staked: eth("1"),
            }
        );
    }

    #[tokio::test]
    async fn disconnected_session_shows_connect_and_touches_nothing() {
        let chain = Arc::new(MockChain::default());
        let (_tx, watch) = disconnected();
        let flow = StakeFlow::new(Some(chain.clone()), &config(), watch);

        assert!(flow.controls().show_connect);

        flow.set_amount("1");
        let err = flow.stake().await.unwrap_err();

        assert_eq!(err.precondition(), Some(PreconditionError::NotConnected));
        assert_eq!(err.user_message(), "Please connect wallet");
        assert_eq!(chain.total_reads(), 0);
        assert!(chain.writes().is_empty());
        assert_eq!(flow.amount(), "");
    }

    #[tokio::test]
    async fn missing_wallet_is_reported_first() {
        let (_tx, watch) = disconnected();
        let flow = StakeFlow::<MockChain>::new(None, &config(), watch);
        flow.set_amount("abc");

        let err = flow.stake().await.unwrap_err();
        assert_eq!(err.precondition(), Some(PreconditionError::WalletUnavailable));
        assert_eq!(err.user_message(), "Please install a wallet");
    }

    #[tokio::test]
    async fn amount_above_balance_is_rejected_and_kept() {
        let (chain, flow) = funded_flow("1.0", "0").await;
        flow.set_amount("2.0");

        let err = flow.stake().await.unwrap_err();

        assert_eq!(err.precondition(), Some(PreconditionError::ExceedsBalance));
        assert_eq!(
            err.user_message(),
            "Amount cannot be greater than current balance"
        );
        assert!(chain.writes().is_empty());
        assert_eq!(flow.amount(), "2.0");
        assert_eq!(flow.phase(), FlowPhase::Idle);
    }

    #[tokio::test]
    async fn unrepresentable_amount_exceeds_balance() {
        let (chain, flow) = funded_flow("1.0", "0").await;
        flow.set_amount("9".repeat(80));

        let err = flow.stake().await.unwrap_err();

        assert_eq!(err.precondition(), Some(PreconditionError::ExceedsBalance));
        assert!(chain.writes().is_empty());
        assert_eq!(flow.amount(), "9".repeat(80));
    }

    #[tokio::test]
    async fn invalid_amount_is_reported_before_balance() {
        // zero balance, so every candidate would also exceed it
        let (chain, flow) = funded_flow("0", "0").await;

        for text in ["", "0", "-5", "abc", "1.2.3"] {
            flow.set_amount(text);
            let err = flow.stake().await.unwrap_err();
            assert_eq!(
                err.precondition(),
                Some(PreconditionError::InvalidAmount),
                "{text:?}"
            );
            assert_eq!(flow.amount(), text);
        }
        assert!(chain.writes().is_empty());
    }

    #[tokio::test]
    async fn successful_stake_clears_amount_and_refreshes() {
        let (chain, flow) = funded_flow("3", "1").await;
        flow.set_amount("2");

        let done = flow.stake().await.expect("stake succeeds");

        assert_eq!(done.operation, PendingOperation::Staking);
        assert_eq!(
            chain.writes(),
            vec![(address(USER), StakingCall::Deposit { value: eth("2") })]
        );
        assert_eq!(flow.amount(), "");
        assert_eq!(
            flow.balances(),
            Balances {
                free: eth("1"),
                staked: eth("3"),
            }
        );
        assert_eq!(flow.phase(), FlowPhase::Idle);
    }

    #[tokio::test]
    async fn submission_failure_keeps_amount_and_balances() {
        let (chain, flow) = funded_flow("3", "1").await;
        chain.fail_submissions(Some(ClientError::Rejected(Some(
            "user rejected the request".to_string(),
        ))));
        flow.set_amount("2");

        let err = flow.stake().await.unwrap_err();

        assert_eq!(err.user_message(), "user rejected the request");
        assert_eq!(flow.amount(), "2");
        assert_eq!(flow.balances().free, eth("3"));
        assert_eq!(flow.phase(), FlowPhase::Idle);
    }

    #[tokio::test]
    async fn revert_reports_generic_failure_without_refresh() {
        let (chain, flow) = funded_flow("3", "1").await;
        chain.set_finality(FinalityBehavior::Revert);
        flow.set_amount("2");
        let reads_before = chain.total_reads();

        let err = flow.stake().await.unwrap_err();

        assert!(matches!(err, FlowError::Reverted { .. }));
        assert_eq!(err.user_message(), crate::errors::GENERIC_TX_FAILURE);
        assert_eq!(flow.amount(), "2");
        assert_eq!(chain.total_reads(), reads_before);
    }

    #[tokio::test]
    async fn second_stake_while_in_flight_is_rejected() {
        let (chain, flow) = funded_flow("3", "0").await;
        let release = chain.hold_finality();
        flow.set_amount("1");

        let first = flow.stake();
        let second = async {
            // let the first stake reach the finality wait
            while flow.phase() != FlowPhase::Confirming {
                tokio::task::yield_now().await;
            }
            assert!(!flow.controls().submit_enabled);
            assert!(!flow.controls().input_enabled);
            let rejected = flow.stake().await;
            release.notify_one();
            rejected
        };

        let (first, second) = tokio::join!(first, second);

        assert!(first.is_ok());
        assert_eq!(
            second.unwrap_err().precondition(),
            Some(PreconditionError::OperationInFlight(PendingOperation::Staking))
        );
        assert_eq!(chain.writes().len(), 1);
    }

    #[tokio::test]
    async fn balances_of_a_previous_session_are_hidden() {
        let chain = Arc::new(MockChain::default());
        chain.set_native(address(USER), eth("3"));
        let (tx, watch) = connected(address(USER));
        let flow = StakeFlow::new(Some(chain.clone()), &config(), watch);
        flow.refresh().await;
        assert_eq!(flow.balances().free, eth("3"));

        tx.send_replace(Session::connected(address(2), 2));

        assert_eq!(flow.balances(), Balances::default());
    }

    #[tokio::test]
    async fn unconfigured_contract_fails_cleanly() {
        let chain = Arc::new(MockChain::default());
        chain.set_native(address(USER), eth("3"));
        let (_tx, watch) = connected(address(USER));
        let config = StakingConfig {
            stake_contract_address: Address::ZERO,
            ..config()
        };
        let flow = StakeFlow::new(Some(chain.clone()), &config, watch);
        flow.refresh().await;
        flow.set_amount("1");

        let err = flow.stake().await.unwrap_err();

        assert_eq!(err, FlowError::Submission(ClientError::NotConfigured));
        assert!(chain.writes().is_empty());
        assert_eq!(flow.amount(), "1");
    }
}
