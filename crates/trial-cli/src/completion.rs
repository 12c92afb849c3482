//! Single-settlement completion signal.
//!
//! Every dispatch owns one [`Completion`] and hands clones of its [`Settler`]
//! to the places that may finish the invocation. The first settlement wins;
//! later attempts are ignored and reported back as `false`.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;

/// Create a fresh signal for one invocation
pub(crate) fn channel<T>() -> (Settler<T>, Completion<T>) {
    let (tx, rx) = oneshot::channel();
    let settler = Settler {
        slot: Arc::new(Mutex::new(Some(tx))),
    };
    (settler, Completion { rx })
}

/// Write side of the signal; cheap to clone
pub(crate) struct Settler<T> {
    slot: Arc<Mutex<Option<oneshot::Sender<T>>>>,
}

impl<T> Clone for Settler<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Settler<T> {
    /// Settle with `value`; returns `false` if the signal already settled
    pub(crate) fn settle(&self, value: T) -> bool {
        let sender = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match sender {
            // A dropped receiver still counts as settled for this invocation
            Some(tx) => {
                let _ = tx.send(value);
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_settled(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

/// Read side of the signal
pub(crate) struct Completion<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> Completion<T> {
    /// Wait for the settled value; `None` if every settler went away unsettled
    pub(crate) async fn wait(self) -> Option<T> {
        self.rx.await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_settlement_wins() {
        let (settler, completion) = channel();
        let late = settler.clone();

        assert!(settler.settle("first"));
        assert!(!late.settle("second"));
        assert!(late.is_settled());

        assert_eq!(completion.wait().await, Some("first"));
    }

    #[tokio::test]
    async fn test_dropped_settlers_yield_none() {
        let (settler, completion) = channel::<u8>();
        let copy = settler.clone();
        drop(settler);
        drop(copy);

        assert_eq!(completion.wait().await, None);
    }

    #[tokio::test]
    async fn test_settle_from_another_task() {
        let (settler, completion) = channel();

        let handle = tokio::spawn(async move { settler.settle(42) });

        assert_eq!(completion.wait().await, Some(42));
        assert!(handle.await.unwrap());
    }

    #[test]
    fn test_settle_after_receiver_dropped() {
        let (settler, completion) = channel();
        drop(completion);

        assert!(settler.settle(1));
        assert!(!settler.settle(2));
    }
}
