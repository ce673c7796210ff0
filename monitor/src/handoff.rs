//! Zero-buffer handoff channel.
//!
//! Tokio's `mpsc` channels need a capacity of at least one, which would let a
//! producer run one value ahead of its consumer. [`HandoffSender::send`]
//! closes that gap: it parks the value in a one-slot channel together with a
//! `oneshot` acknowledgement and only returns once the receiver has taken it.
//! Values are therefore handed over strictly in order, and the producer can
//! never get ahead of the consumer.
//!
//! # Example
//!
//! ```no_run
//! use json_tail::handoff;
//!
//! # async fn example() {
//! let (tx, mut rx) = handoff::channel::<Vec<String>>();
//!
//! tokio::spawn(async move {
//!     // Suspends until the receiver below has taken the batch.
//!     tx.send(vec!["entry".to_string()]).await.ok();
//! });
//!
//! while let Some(batch) = rx.recv().await {
//!     println!("{batch:?}");
//! }
//! # }
//! ```

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// The receiving half was dropped before the value was taken.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("handoff receiver dropped")]
pub struct HandoffClosed;

#[derive(Debug)]
struct Parcel<T> {
    value: T,
    taken: oneshot::Sender<()>,
}

/// Sending half of a handoff channel.
#[derive(Debug)]
pub struct HandoffSender<T> {
    tx: mpsc::Sender<Parcel<T>>,
}

/// Receiving half of a handoff channel.
#[derive(Debug)]
pub struct HandoffReceiver<T> {
    rx: mpsc::Receiver<Parcel<T>>,
}

/// Creates a handoff channel.
#[must_use]
pub fn channel<T>() -> (HandoffSender<T>, HandoffReceiver<T>) {
    let (tx, rx) = mpsc::channel(1);
    (HandoffSender { tx }, HandoffReceiver { rx })
}

impl<T> HandoffSender<T> {
    /// Hands `value` to the receiver, waiting until it has been taken.
    ///
    /// # Errors
    ///
    /// Returns [`HandoffClosed`] if the receiver is dropped before taking the
    /// value. The value is lost in that case.
    pub async fn send(&self, value: T) -> Result<(), HandoffClosed> {
        let (taken, on_taken) = oneshot::channel();
        self.tx
            .send(Parcel { value, taken })
            .await
            .map_err(|_| HandoffClosed)?;
        on_taken.await.map_err(|_| HandoffClosed)
    }

    /// Returns `true` once the receiver has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<T> HandoffReceiver<T> {
    /// Takes the next value, releasing the sender that offered it.
    ///
    /// Returns `None` once the sender has been dropped. Cancel safe: if the
    /// future is dropped before completing, no value is taken.
    pub async fn recv(&mut self) -> Option<T> {
        let parcel = self.rx.recv().await?;
        // The sender may have given up waiting; the value is still delivered.
        let _ = parcel.taken.send(());
        Some(parcel.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready, assert_ready_ok, task};

    #[tokio::test]
    async fn test_send_waits_until_taken() {
        let (tx, mut rx) = channel::<u32>();

        let mut send = task::spawn(tx.send(7));
        assert_pending!(send.poll());
        assert_pending!(send.poll());

        assert_eq!(rx.recv().await, Some(7));

        assert!(send.is_woken());
        assert_ready_ok!(send.poll());
    }

    #[tokio::test]
    async fn test_values_arrive_in_order() {
        let (tx, mut rx) = channel::<usize>();

        let producer = tokio::spawn(async move {
            for i in 0..20 {
                tx.send(i).await.unwrap();
            }
        });

        let mut received = Vec::new();
        while let Some(value) = rx.recv().await {
            received.push(value);
        }
        producer.await.unwrap();

        assert_eq!(received, (0..20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_send_fails_when_receiver_dropped() {
        let (tx, rx) = channel::<&str>();
        drop(rx);

        assert!(tx.is_closed());
        assert_eq!(tx.send("lost").await, Err(HandoffClosed));
    }

    #[tokio::test]
    async fn test_send_fails_when_receiver_dropped_while_waiting() {
        let (tx, rx) = channel::<&str>();

        let mut send = task::spawn(tx.send("parked"));
        assert_pending!(send.poll());

        drop(rx);
        assert!(send.is_woken());
        assert_eq!(assert_ready!(send.poll()), Err(HandoffClosed));
    }

    #[tokio::test]
    async fn test_recv_returns_none_when_sender_dropped() {
        let (tx, mut rx) = channel::<u8>();
        drop(tx);
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn test_handoff_closed_display() {
        assert_eq!(HandoffClosed.to_string(), "handoff receiver dropped");
    }
}
