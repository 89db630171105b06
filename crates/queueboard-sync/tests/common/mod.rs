//! In-memory fakes shared by the sync integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::arithmetic_side_effects)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use queueboard_client::{ClientError, QueueApi};
use queueboard_sync::{SpeechEngine, SpeechError, Utterance};
use queueboard_types::{
    CounterStatus, CounterType, DisplayState, Ticket, TicketId, TicketStatus,
};
use tokio::sync::{Notify, mpsc};

/// How long a test waits for something that should happen promptly.
pub const PATIENCE: Duration = Duration::from_secs(2);

/// Poll `condition` until it holds or [`PATIENCE`] runs out.
pub async fn eventually(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + PATIENCE;
    while !condition() {
        assert!(tokio::time::Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Queue backend fake.
///
/// Snapshot responses are fed through a channel, so a test decides when
/// each `GET /queue` completes. Command responses are queued up front.
pub struct FakeApi {
    display_calls: AtomicUsize,
    snapshots: tokio::sync::Mutex<mpsc::UnboundedReceiver<Result<DisplayState, ClientError>>>,
    next: Mutex<VecDeque<Result<Ticket, ClientError>>>,
    finish: Mutex<VecDeque<Result<(), ClientError>>>,
    called: Mutex<Vec<CounterType>>,
    finished: Mutex<Vec<TicketId>>,
    gate_commands: AtomicBool,
    release: Notify,
}

impl FakeApi {
    /// A fake plus the sender that answers its snapshot fetches.
    pub fn new() -> (Self, mpsc::UnboundedSender<Result<DisplayState, ClientError>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let api = Self {
            display_calls: AtomicUsize::new(0),
            snapshots: tokio::sync::Mutex::new(rx),
            next: Mutex::new(VecDeque::new()),
            finish: Mutex::new(VecDeque::new()),
            called: Mutex::new(Vec::new()),
            finished: Mutex::new(Vec::new()),
            gate_commands: AtomicBool::new(false),
            release: Notify::new(),
        };
        (api, tx)
    }

    pub fn queue_next(&self, response: Result<Ticket, ClientError>) {
        self.next.lock().unwrap().push_back(response);
    }

    pub fn queue_finish(&self, response: Result<(), ClientError>) {
        self.finish.lock().unwrap().push_back(response);
    }

    /// Make commands wait for [`release_command`](Self::release_command).
    pub fn gate_commands(&self) {
        self.gate_commands.store(true, Ordering::SeqCst);
    }

    pub fn release_command(&self) {
        self.release.notify_one();
    }

    pub fn display_calls(&self) -> usize {
        self.display_calls.load(Ordering::SeqCst)
    }

    pub fn called(&self) -> Vec<CounterType> {
        self.called.lock().unwrap().clone()
    }

    pub fn finished(&self) -> Vec<TicketId> {
        self.finished.lock().unwrap().clone()
    }

    async fn wait_for_release(&self) {
        if self.gate_commands.load(Ordering::SeqCst) {
            self.release.notified().await;
        }
    }
}

impl QueueApi for FakeApi {
    async fn display_state(&self) -> Result<DisplayState, ClientError> {
        self.display_calls.fetch_add(1, Ordering::SeqCst);
        let mut snapshots = self.snapshots.lock().await;
        snapshots
            .recv()
            .await
            .unwrap_or_else(|| Err(ClientError::Decode("no snapshot scripted".into())))
    }

    async fn call_next(&self, counter: CounterType) -> Result<Ticket, ClientError> {
        self.called.lock().unwrap().push(counter);
        self.wait_for_release().await;
        let response = self.next.lock().unwrap().pop_front();
        response.unwrap_or_else(|| Err(ClientError::Decode("no call-next scripted".into())))
    }

    async fn finish(&self, id: &TicketId) -> Result<(), ClientError> {
        self.finished.lock().unwrap().push(id.clone());
        self.wait_for_release().await;
        let response = self.finish.lock().unwrap().pop_front();
        response.unwrap_or_else(|| Err(ClientError::Decode("no finish scripted".into())))
    }
}

/// Speech fake that records what it was asked to do.
#[derive(Default)]
pub struct RecordingSpeech {
    log: Mutex<Vec<String>>,
    hold: AtomicBool,
}

impl RecordingSpeech {
    /// Make every later utterance hang until the announcement is dropped.
    pub fn hold(&self, hold: bool) {
        self.hold.store(hold, Ordering::SeqCst);
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

impl SpeechEngine for RecordingSpeech {
    async fn speak(&self, utterance: &Utterance) -> Result<(), SpeechError> {
        self.record(format!("start {}", utterance.text));
        if self.hold.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.record(format!("end {}", utterance.text));
        Ok(())
    }

    fn cancel(&self) {
        self.record("cancel".to_owned());
    }
}

pub fn ticket(id: &str, counter: CounterType, status: TicketStatus) -> Ticket {
    let at = Utc.with_ymd_and_hms(2025, 3, 1, 8, 14, 0).unwrap();
    Ticket {
        id: TicketId::new(id),
        counter_type: counter,
        status,
        created_at: at,
        updated_at: at,
    }
}

/// A snapshot with one ticket serving at each listed counter.
pub fn snapshot(serving: &[(CounterType, &str)], waiting: &[&str]) -> DisplayState {
    DisplayState {
        services: serving
            .iter()
            .map(|(counter, id)| CounterStatus {
                counter_type: *counter,
                serving: vec![TicketId::new(*id)],
            })
            .collect(),
        waiting: Some(waiting.iter().copied().map(TicketId::new).collect()),
        ..DisplayState::default()
    }
}

pub fn rejection(status: u16, message: Option<&str>) -> ClientError {
    ClientError::Server {
        status,
        message: message.map(str::to_owned),
    }
}
