//! Periodic reconciliation against the authoritative store.

use crate::error::MatchError;
use crate::local::{MatchClient, Reconciliation};
use crate::session::{MatchSession, SessionStatus};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Capacity of the event channel.
const EVENT_BUFFER: usize = 32;

/// Something the poller observed.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A snapshot changed the local view.
    Reconciled(Reconciliation),
    /// A poll failed; the next tick retries.
    PollFailed(MatchError),
    /// The poller stopped because the match is over.
    Stopped,
}

/// Spawns the per-match polling task.
#[derive(Debug, Clone, Copy)]
pub struct ReconciliationPoller;

impl ReconciliationPoller {
    /// Starts polling for `client` every `interval`.
    ///
    /// Each cycle fetches, reconciles and then sleeps, so cycles never
    /// overlap. The task stops once the followed match is finished with no
    /// pending rematch offer, when the handle is cancelled or dropped, or
    /// when the event receiver is dropped.
    #[instrument(skip(client))]
    pub fn spawn(
        client: MatchClient,
        interval: Duration,
    ) -> (PollerHandle, mpsc::Receiver<SyncEvent>) {
        let (events, receiver) = mpsc::channel(EVENT_BUFFER);
        let (cancel, cancelled) = watch::channel(false);
        let task = tokio::spawn(run(client, interval, events, cancelled));
        info!("Reconciliation poller started");
        (
            PollerHandle {
                cancel,
                task: Some(task),
            },
            receiver,
        )
    }
}

/// Handle on a running poller. Dropping it stops the poller.
#[derive(Debug)]
pub struct PollerHandle {
    cancel: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Asks the poller to stop after the current cycle.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// Whether the polling task has ended.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Waits for the polling task to end.
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Poller task ended abnormally");
            }
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel.send_replace(true);
    }
}

/// Whether polling has nothing left to observe.
fn is_settled(session: &MatchSession) -> bool {
    session.status() == SessionStatus::Finished
        && session.rematch_offer().is_none()
        && session.rematch_id().is_none()
}

async fn run(
    client: MatchClient,
    interval: Duration,
    events: mpsc::Sender<SyncEvent>,
    mut cancelled: watch::Receiver<bool>,
) {
    loop {
        if *cancelled.borrow() {
            debug!("Poller cancelled");
            return;
        }

        let event = match client.refresh().await {
            Ok(Reconciliation::Unchanged | Reconciliation::Skipped) => None,
            Ok(change) => Some(SyncEvent::Reconciled(change)),
            Err(e) => {
                warn!(error = %e, "Poll failed, retrying next tick");
                Some(SyncEvent::PollFailed(e))
            }
        };
        if let Some(event) = event {
            if events.send(event).await.is_err() {
                debug!("Event receiver dropped, stopping poller");
                return;
            }
        }

        if is_settled(client.view().await.session()) {
            info!("Match finished, stopping poller");
            let _ = events.send(SyncEvent::Stopped).await;
            return;
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = cancelled.changed() => {
                debug!("Poller cancelled");
                return;
            }
        }
    }
}
