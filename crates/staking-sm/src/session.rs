//! The connected user's [`Session`] and the [`ConnectionTracker`] that owns it.
//!
//! The tracker is the only writer of the session. Flows hold a [`watch::Receiver`] and read the
//! current value whenever they need it.

use std::fmt::Display;

use futures::StreamExt;
use staking_primitives::Address;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::client::WalletProvider;

/// Read handle on the current [`Session`].
pub type SessionWatch = watch::Receiver<Session>;

/// The connected user's view of the world.
///
/// A session is never patched. Every wallet notification produces a fresh session with a new
/// [`epoch`](Session::epoch), and anything read under an older epoch is stale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Session {
    address: Option<Address>,
    connected: bool,
    epoch: u64,
}

impl Session {
    /// The disconnected session every tracker starts with.
    pub const fn disconnected() -> Self {
        Self {
            address: None,
            connected: false,
            epoch: 0,
        }
    }

    /// A session connected as `address`.
    pub const fn connected(address: Address, epoch: u64) -> Self {
        Self {
            address: Some(address),
            connected: true,
            epoch,
        }
    }

    fn disconnected_at(epoch: u64) -> Self {
        Self {
            epoch,
            ..Self::disconnected()
        }
    }

    /// The active account, if any.
    pub const fn address(&self) -> Option<Address> {
        self.address
    }

    /// Whether the wallet reports the account as active.
    pub const fn is_connected(&self) -> bool {
        self.address.is_some() && self.connected
    }

    /// Identifies this session instance.
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Builds the session that follows `self` after the wallet reported `accounts`.
    fn next(&self, accounts: &[Address]) -> Self {
        let epoch = self.epoch + 1;
        match accounts.first() {
            Some(address) => Self::connected(*address, epoch),
            None => Self::disconnected_at(epoch),
        }
    }
}

impl Display for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.address {
            Some(address) if self.connected => write!(f, "connected as {address}"),
            _ => write!(f, "disconnected"),
        }
    }
}

/// Tracks the wallet's active account.
///
/// Dropping the tracker deregisters the account listener.
#[derive(Debug)]
pub struct ConnectionTracker {
    session: watch::Sender<Session>,
    listener: Option<JoinHandle<()>>,
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionTracker {
    /// Creates a tracker with a disconnected session and no listener.
    pub fn new() -> Self {
        let (session, _) = watch::channel(Session::disconnected());
        Self {
            session,
            listener: None,
        }
    }

    /// Returns a new read handle on the session.
    pub fn watch(&self) -> SessionWatch {
        self.session.subscribe()
    }

    /// Returns a copy of the current session.
    pub fn current(&self) -> Session {
        self.session.borrow().clone()
    }

    /// Whether an account listener is currently registered.
    pub fn is_listening(&self) -> bool {
        self.listener.as_ref().is_some_and(|l| !l.is_finished())
    }

    /// Connects to `wallet`, if there is one.
    ///
    /// Picks up an already-authorized account and registers a listener that applies every later
    /// account change. Without a wallet, or if the wallet cannot be queried, the session stays
    /// disconnected; this is a normal state, not an error.
    ///
    /// Calling this again replaces the previous listener.
    pub async fn initialize<W: WalletProvider>(&mut self, wallet: Option<&W>) {
        self.teardown();

        let Some(wallet) = wallet else {
            info!("no wallet provider available, staying disconnected");
            return;
        };

        // subscribe before querying so that a change racing with the query is not lost
        let mut changes = wallet.subscribe_accounts();

        match wallet.accounts().await {
            Ok(accounts) => {
                if !accounts.is_empty() {
                    apply_accounts(&self.session, &accounts);
                }
            }
            Err(err) => {
                warn!(%err, "failed to query wallet accounts, staying disconnected");
                return;
            }
        }

        let session = self.session.clone();
        self.listener = Some(tokio::spawn(async move {
            while let Some(accounts) = changes.next().await {
                apply_accounts(&session, &accounts);
            }
            debug!("account change subscription closed");
        }));
    }

    /// Deregisters the account listener. Safe to call repeatedly or before
    /// [`initialize`](Self::initialize).
    pub fn teardown(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
            debug!("account listener removed");
        }
    }
}

impl Drop for ConnectionTracker {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn apply_accounts(session: &watch::Sender<Session>, accounts: &[Address]) {
    session.send_modify(|current| {
        let next = current.next(accounts);
        info!(from = %current, to = %next, epoch = next.epoch(), "session changed");
        *current = next;
    });
}
