//! Errors raised by the staking session.
//!
//! Errors fall into four groups:
//! - [`PreconditionError`]: detected locally before anything is sent to the network.
//! - [`FlowError::Submission`]: the wallet or the network refused the call.
//! - [`FlowError::Finality`] and [`FlowError::Reverted`]: the call was accepted but did not end
//!   in a successful, finalized state.
//! - Read failures, which are never returned to the caller of a flow. They are logged and the
//!   affected value falls back to its last-known or zero value.

use thiserror::Error;

use crate::phase::PendingOperation;

/// Fallback text shown when a failed transaction carries no usable message.
pub const GENERIC_TX_FAILURE: &str = "Transaction failed. Please try again.";

/// Errors reported by a [`StakingClient`](crate::client::StakingClient) or
/// [`WalletProvider`](crate::client::WalletProvider) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The staking contract address is the zero address.
    #[error("staking contract address is not configured")]
    NotConfigured,

    /// The node or wallet rejected the request.
    ///
    /// The message is whatever the collaborator reported, if anything.
    #[error("request rejected: {}", .0.as_deref().unwrap_or("no reason given"))]
    Rejected(Option<String>),

    /// The request could not be delivered or its response could not be received.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response did not have the expected shape.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl ClientError {
    /// Returns the message this error should surface to the user, if it has a meaningful one.
    pub fn message(&self) -> Option<String> {
        match self {
            ClientError::Rejected(msg) => msg.clone().filter(|m| !m.trim().is_empty()),
            ClientError::NotConfigured
            | ClientError::Transport(_)
            | ClientError::UnexpectedResponse(_) => Some(self.to_string()),
        }
    }
}

/// Result type for collaborator calls.
pub type ClientResult<T> = Result<T, ClientError>;

/// Checks that fail before any network call is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PreconditionError {
    /// No chain client is available, i.e. no wallet is installed.
    #[error("no wallet client is available")]
    WalletUnavailable,

    /// A client exists but no account is connected.
    #[error("wallet is not connected")]
    NotConnected,

    /// The amount is empty, not a number, or not strictly positive.
    #[error("amount is not a valid positive number")]
    InvalidAmount,

    /// The amount to stake is larger than the free balance.
    #[error("amount exceeds free balance")]
    ExceedsBalance,

    /// The amount to unstake is larger than the staked principal.
    #[error("amount exceeds staked amount")]
    ExceedsStaked,

    /// There is nothing whose cooldown has elapsed.
    #[error("nothing is withdrawable")]
    NothingToWithdraw,

    /// An operation of the same kind is already in flight.
    #[error("a {0} operation is already in flight")]
    OperationInFlight(PendingOperation),
}

impl PreconditionError {
    /// Whether the amount field should be cleared after this error.
    ///
    /// Only connection problems clear the field; amount problems keep it so the user can fix the
    /// value instead of retyping it.
    pub const fn clears_amount(&self) -> bool {
        matches!(self, Self::WalletUnavailable | Self::NotConnected)
    }
}

/// Errors returned by the stake, unstake and withdraw operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    /// A local check failed.
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    /// The call was not accepted by the wallet or the network.
    #[error("submission failed: {0}")]
    Submission(ClientError),

    /// The call was accepted but waiting for its outcome failed.
    #[error("finality wait failed: {0}")]
    Finality(ClientError),

    /// The call was finalized with a failure status.
    #[error("transaction {tx} reverted")]
    Reverted {
        /// The handle of the reverted call.
        tx: String,
    },
}

impl FlowError {
    /// Returns the notification text for this error.
    pub fn user_message(&self) -> String {
        match self {
            FlowError::Precondition(err) => match err {
                PreconditionError::WalletUnavailable => "Please install a wallet".to_string(),
                PreconditionError::NotConnected => "Please connect wallet".to_string(),
                PreconditionError::InvalidAmount => "Please enter a valid amount".to_string(),
                PreconditionError::ExceedsBalance => {
                    "Amount cannot be greater than current balance".to_string()
                }
                PreconditionError::ExceedsStaked => {
                    "Amount cannot be greater than staked amount".to_string()
                }
                PreconditionError::NothingToWithdraw => "Nothing to withdraw yet".to_string(),
                PreconditionError::OperationInFlight(_) => {
                    "Another transaction is already in progress".to_string()
                }
            },
            FlowError::Submission(err) | FlowError::Finality(err) => err
                .message()
                .unwrap_or_else(|| GENERIC_TX_FAILURE.to_string()),
            FlowError::Reverted { .. } => GENERIC_TX_FAILURE.to_string(),
        }
    }

    /// Returns the precondition that failed, if this is a local failure.
    pub const fn precondition(&self) -> Option<PreconditionError> {
        match self {
            FlowError::Precondition(err) => Some(*err),
            _ => None,
        }
    }
}

/// Result type for flow operations.
pub type FlowResult<T> = Result<T, FlowError>;
