//! The [`Subscription`] stream handed out by wallet providers for account-change notifications.
use std::{
    pin::Pin,
    task::{Context, Poll},
};

use tokio::sync::mpsc;

/// A stream of notifications backed by an unbounded channel.
///
/// Producers keep the sending half. The subscription ends when every sender is dropped, and the
/// producer learns that the listener is gone when a send fails.
#[derive(Debug)]
pub struct Subscription<T> {
    receiver: mpsc::UnboundedReceiver<T>,
}

impl<T> Subscription<T> {
    /// Wraps the receiving half of an unbounded channel.
    pub const fn from_receiver(receiver: mpsc::UnboundedReceiver<T>) -> Subscription<T> {
        Subscription { receiver }
    }

    /// Creates a connected sender and subscription pair.
    pub fn channel() -> (mpsc::UnboundedSender<T>, Subscription<T>) {
        let (send, recv) = mpsc::unbounded_channel();
        (send, Subscription::from_receiver(recv))
    }
}

impl<T> futures::Stream for Subscription<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}
