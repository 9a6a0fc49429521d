//! Fatal error taxonomy and the first-error-wins report channel.
//!
//! Only three conditions abort the whole feed: failing to establish the head
//! subscription, the subscription ending on its own, and failing to recover a
//! transaction sender from an otherwise well-formed signature. Everything else
//! is scoped to a single block or candidate and handled where it occurs.

use alloy_consensus::crypto::RecoveryError;
use alloy_transport::TransportError;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FatalError {
    #[error("could not subscribe to new Ethereum headers: {0}")]
    Subscribe(#[source] TransportError),

    #[error("Ethereum headers subscription closed unexpectedly")]
    SubscriptionClosed,

    #[error("could not recover transaction sender: {0}")]
    SenderRecovery(#[source] RecoveryError),
}

/// Write side of the single-slot fatal error channel.
///
/// Many classification tasks may hit a fatal condition near-simultaneously;
/// only the first report matters because the pipeline is already shutting down
/// once it is consumed. `report` therefore never blocks: a second error sent
/// while the slot is full is dropped.
#[derive(Clone)]
pub struct FatalReporter(mpsc::Sender<FatalError>);

impl FatalReporter {
    pub fn channel() -> (Self, mpsc::Receiver<FatalError>) {
        let (tx, rx) = mpsc::channel(1);
        (Self(tx), rx)
    }

    pub fn report(&self, err: FatalError) {
        if let Err(unsent) = self.0.try_send(err) {
            debug!(
                err = %unsent.into_inner(),
                "fatal error dropped, pipeline is already shutting down"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_fatal_error_wins() {
        let (reporter, mut rx) = FatalReporter::channel();

        reporter.report(FatalError::SubscriptionClosed);
        // The slot is full; this must not block and must be dropped.
        reporter.report(FatalError::SubscriptionClosed);

        assert!(matches!(
            rx.recv().await,
            Some(FatalError::SubscriptionClosed)
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_report_after_receiver_dropped_does_not_panic() {
        let (reporter, rx) = FatalReporter::channel();
        drop(rx);
        reporter.report(FatalError::SubscriptionClosed);
    }
}
