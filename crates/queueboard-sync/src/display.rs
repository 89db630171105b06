//! Display Sync: keeps the public board in step with the backend.
//!
//! The board never edits queue state itself. Every lifecycle event from the
//! feed triggers a fresh `GET /queue`, and the result replaces the snapshot
//! wholesale. Fetches are coalesced through [`RefetchCoalescer`]: at most
//! one is in flight, and events that arrive meanwhile collapse into a
//! single follow-up fetch.

use std::sync::Arc;

use futures::future::{FusedFuture, FutureExt};
use queueboard_client::{ClientError, FeedEvent, QueueApi};
use queueboard_types::DisplayState;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What the board shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayView {
    /// Latest snapshot that was fetched successfully.
    pub state: Option<DisplayState>,
    /// Whether the push feed is currently connected.
    pub connected: bool,
}

/// Fetch bookkeeping: one fetch in flight, at most one queued behind it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefetchCoalescer {
    in_flight: bool,
    pending: bool,
}

impl RefetchCoalescer {
    /// Ask for a fetch. Returns `true` when the caller should start one now.
    pub const fn request(&mut self) -> bool {
        if self.in_flight {
            self.pending = true;
            false
        } else {
            self.in_flight = true;
            true
        }
    }

    /// Record that the in-flight fetch finished. Returns `true` when a
    /// follow-up fetch should start now.
    pub const fn complete(&mut self) -> bool {
        self.in_flight = self.pending;
        self.pending = false;
        self.in_flight
    }

    /// Whether a fetch is running.
    pub const fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Whether a follow-up fetch is queued.
    pub const fn pending(&self) -> bool {
        self.pending
    }
}

/// Drives the board from push events and snapshot fetches.
pub struct DisplaySync<A> {
    api: Arc<A>,
    view: watch::Sender<DisplayView>,
}

impl<A: QueueApi> DisplaySync<A> {
    /// Create a sync over `api`. Nothing runs until [`run`](Self::run).
    pub fn new(api: Arc<A>) -> Self {
        let (view, _) = watch::channel(DisplayView::default());
        Self { api, view }
    }

    /// Watch the published view.
    pub fn subscribe(&self) -> watch::Receiver<DisplayView> {
        self.view.subscribe()
    }

    /// Run [`run`](Self::run) on a background task.
    pub fn spawn(self, events: mpsc::Receiver<FeedEvent>) -> JoinHandle<()> {
        tokio::spawn(self.run(events))
    }

    /// Fetch once, then follow `events` until the channel closes.
    ///
    /// A fetch still in flight when the channel closes is dropped with the
    /// loop.
    pub async fn run(self, mut events: mpsc::Receiver<FeedEvent>) {
        let api = self.api.as_ref();
        let mut coalescer = RefetchCoalescer::default();

        coalescer.request();
        let fetch = api.display_state().fuse();
        tokio::pin!(fetch);

        loop {
            tokio::select! {
                result = &mut fetch, if !fetch.is_terminated() => {
                    self.apply(result);
                    if coalescer.complete() {
                        debug!("events arrived during fetch, fetching again");
                        fetch.set(api.display_state().fuse());
                    }
                }
                event = events.recv() => {
                    let Some(event) = event else {
                        info!("event feed closed, display sync stopping");
                        break;
                    };
                    match event {
                        FeedEvent::Connected => self.set_connected(true),
                        FeedEvent::Disconnected => self.set_connected(false),
                        FeedEvent::Queue(event) if event.triggers_refetch() => {
                            debug!(event = %event.kind(), "queue event, refreshing snapshot");
                            if coalescer.request() {
                                fetch.set(api.display_state().fuse());
                            }
                        }
                        FeedEvent::Queue(event) => {
                            debug!(event = %event.kind(), "ignoring event");
                        }
                    }
                }
            }
        }
    }

    fn apply(&self, result: Result<DisplayState, ClientError>) {
        match result {
            Ok(state) => {
                debug!(
                    counters = state.services.len(),
                    waiting = state.waiting().count(),
                    "display snapshot updated"
                );
                self.view.send_modify(|view| view.state = Some(state));
            }
            Err(error) => {
                warn!(error = %error, "display snapshot fetch failed, keeping previous snapshot");
            }
        }
    }

    fn set_connected(&self, connected: bool) {
        info!(connected, "event feed connectivity changed");
        self.view.send_if_modified(|view| {
            let changed = view.connected != connected;
            view.connected = connected;
            changed
        });
    }
}
