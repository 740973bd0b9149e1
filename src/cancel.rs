//! Abort signal threaded through outbound calls.
//!
//! An [`AbortController`] owns the trigger; any number of [`AbortSignal`]
//! clones observe it. Once aborted a signal stays aborted.

use tokio::sync::watch;

#[derive(Debug)]
pub struct AbortController {
    sender: watch::Sender<bool>,
    signal: AbortSignal,
}

impl AbortController {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender,
            signal: AbortSignal {
                receiver: Some(receiver),
            },
        }
    }

    pub fn signal(&self) -> AbortSignal {
        self.signal.clone()
    }

    pub fn abort(&self) {
        // send_replace never fails, even with no live receivers
        self.sender.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.sender.borrow()
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct AbortSignal {
    receiver: Option<watch::Receiver<bool>>,
}

impl AbortSignal {
    /// A signal that can never fire.
    pub fn never() -> Self {
        Self { receiver: None }
    }

    pub fn is_aborted(&self) -> bool {
        self.receiver
            .as_ref()
            .map(|rx| *rx.borrow())
            .unwrap_or(false)
    }

    /// Resolves once the signal fires. Pending forever for [`AbortSignal::never`]
    /// or when the controller is dropped without aborting.
    pub async fn aborted(&self) {
        let Some(receiver) = &self.receiver else {
            return std::future::pending().await;
        };
        let mut rx = receiver.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return std::future::pending().await;
            }
        }
    }
}

impl Default for AbortSignal {
    fn default() -> Self {
        Self::never()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn never_signal_is_not_aborted() {
        assert!(!AbortSignal::never().is_aborted());
    }

    #[tokio::test]
    async fn abort_is_visible_to_every_clone() {
        let controller = AbortController::new();
        let first = controller.signal();
        let second = first.clone();
        controller.abort();
        assert!(first.is_aborted());
        assert!(second.is_aborted());
        tokio::time::timeout(Duration::from_secs(1), second.aborted())
            .await
            .expect("aborted() should resolve");
    }

    #[tokio::test]
    async fn aborted_wakes_pending_waiter() {
        let controller = AbortController::new();
        let signal = controller.signal();
        let waiter = tokio::spawn(async move { signal.aborted().await });
        tokio::task::yield_now().await;
        controller.abort();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should finish")
            .expect("task should not panic");
    }
}
