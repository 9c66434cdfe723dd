//! Phases shared by every flow and the in-flight markers derived from them.
//!
//! A flow always moves through its phases in the same order:
//!
//! ```text
//! Idle -> Validating -> Submitting -> Confirming -> Idle   (success or failure on-chain)
//! Idle -> Validating -> Idle                             (rejected locally)
//! Idle -> Validating -> Submitting -> Idle               (rejected on submission)
//! ```
//!
//! A phase other than [`FlowPhase::Idle`] means the triggering control is disabled.

use std::fmt::Display;

use parking_lot::Mutex;
use tracing::trace;

/// The phase of a single flow operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FlowPhase {
    /// Nothing in flight. The control is enabled.
    #[default]
    Idle,
    /// Local checks are running.
    Validating,
    /// The call has been handed to the wallet but not yet accepted by the network.
    Submitting,
    /// The call was accepted and the flow is waiting for its outcome, then refreshing.
    Confirming,
}

impl FlowPhase {
    /// Returns `true` if the flow is not doing anything.
    pub const fn is_idle(&self) -> bool {
        matches!(self, FlowPhase::Idle)
    }

    /// Returns `true` if moving from `self` to `next` respects the phase ordering.
    pub const fn can_advance_to(&self, next: FlowPhase) -> bool {
        matches!(
            (*self, next),
            (FlowPhase::Idle, FlowPhase::Validating)
                | (FlowPhase::Validating, FlowPhase::Submitting)
                | (FlowPhase::Validating, FlowPhase::Idle)
                | (FlowPhase::Submitting, FlowPhase::Confirming)
                | (FlowPhase::Submitting, FlowPhase::Idle)
                | (FlowPhase::Confirming, FlowPhase::Idle)
        )
    }
}

impl Display for FlowPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let phase_str = match self {
            FlowPhase::Idle => "Idle",
            FlowPhase::Validating => "Validating",
            FlowPhase::Submitting => "Submitting",
            FlowPhase::Confirming => "Confirming",
        };
        write!(f, "{phase_str}")
    }
}

/// The kind of mutation a flow has in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PendingOperation {
    /// No mutation in flight.
    #[default]
    None,
    /// A deposit is in flight.
    Staking,
    /// An unstake request is in flight.
    Unstaking,
    /// A withdrawal is in flight.
    Withdrawing,
}

impl Display for PendingOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let op_str = match self {
            PendingOperation::None => "none",
            PendingOperation::Staking => "stake",
            PendingOperation::Unstaking => "unstake",
            PendingOperation::Withdrawing => "withdraw",
        };
        write!(f, "{op_str}")
    }
}

/// A phase slot owned by one kind of operation.
#[derive(Debug, Default)]
pub(crate) struct PhaseSlot {
    phase: Mutex<FlowPhase>,
}

impl PhaseSlot {
    pub(crate) fn get(&self) -> FlowPhase {
        *self.phase.lock()
    }

    /// Claims the slot for `op`, moving it from `Idle` to `Validating`.
    ///
    /// Returns `None` if the slot is already busy. The returned guard puts the slot back into
    /// `Idle` when dropped, whatever happened in between.
    pub(crate) fn begin(&self, op: PendingOperation) -> Option<PhaseGuard<'_>> {
        let mut phase = self.phase.lock();
        if !phase.is_idle() {
            return None;
        }
        *phase = FlowPhase::Validating;
        trace!(%op, "phase Idle -> Validating");
        Some(PhaseGuard { slot: self, op })
    }
}

/// Holds a [`PhaseSlot`] out of `Idle` for the duration of one operation.
#[derive(Debug)]
pub(crate) struct PhaseGuard<'a> {
    slot: &'a PhaseSlot,
    op: PendingOperation,
}

impl PhaseGuard<'_> {
    /// Moves the slot to `next`.
    ///
    /// Transitions that break the phase ordering are a programming error and are caught in debug
    /// builds.
    pub(crate) fn advance(&self, next: FlowPhase) {
        let mut phase = self.slot.phase.lock();
        let from = *phase;
        debug_assert!(
            from.can_advance_to(next),
            "illegal phase transition {from} -> {next}"
        );
        trace!(op = %self.op, %from, to = %next, "phase transition");
        *phase = next;
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        let mut phase = self.slot.phase.lock();
        if !phase.is_idle() {
            let from = *phase;
            trace!(op = %self.op, %from, "phase -> Idle");
            *phase = FlowPhase::Idle;
        }
    }
}
