//! Errors specific to the alloy adapter and their translation into [`ClientError`].

use alloy::transports::{RpcError, TransportError};
use staking_sm::errors::ClientError;
use thiserror::Error;

/// Errors raised while setting up the adapter.
#[derive(Debug, Error)]
pub enum EvmClientError {
    /// The RPC endpoint is not a valid URL.
    #[error("invalid rpc url {url:?}: {reason}")]
    InvalidRpcUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The private key is not valid hex.
    #[error("private key is not valid hex: {0}")]
    KeyEncoding(#[from] hex::FromHexError),

    /// The private key is not a valid secp256k1 scalar.
    #[error("invalid private key: {0}")]
    InvalidKey(String),
}

/// Maps a JSON-RPC failure onto the session's error type.
///
/// Error responses carry a message meant for the user (e.g. "insufficient funds"), so they become
/// [`ClientError::Rejected`]. Everything else is a transport problem.
pub(crate) fn from_transport(err: TransportError) -> ClientError {
    match err {
        RpcError::ErrorResp(payload) => ClientError::Rejected(Some(payload.message.to_string())),
        RpcError::NullResp => ClientError::UnexpectedResponse("null response".to_string()),
        RpcError::DeserError { err, .. } => ClientError::UnexpectedResponse(err.to_string()),
        other => ClientError::Transport(other.to_string()),
    }
}

/// Maps a contract-call failure onto the session's error type.
pub(crate) fn from_contract(err: alloy::contract::Error) -> ClientError {
    match err {
        alloy::contract::Error::TransportError(err) => from_transport(err),
        other => ClientError::UnexpectedResponse(other.to_string()),
    }
}
