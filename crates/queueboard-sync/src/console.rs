//! Console Sync: the staff side of a counter.
//!
//! The console loads the aggregate snapshot once and projects a current
//! ticket per counter from it. After that, local state changes only from
//! command responses:
//!
//! - **call next** replaces the selected counter's current ticket with the
//!   ticket the backend returned and announces it
//! - **finish** marks the current ticket finished and clears it
//!
//! Only one command runs at a time. A command issued while another is
//! loading is rejected with [`ConsoleError::Busy`] and sends nothing.
//!
//! Commands only ever target the operator's own counter. Other counters are
//! shown but cannot be selected.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use queueboard_client::{ClientError, QueueApi};
use queueboard_types::{CounterType, CurrentTicket, Ticket, TicketId};
use tracing::{debug, info, warn};

use crate::announcer::{Announcer, SpeechEngine};
use crate::error::ConsoleError;

/// Shown when call-next fails and the backend gave no message.
pub const CALL_NEXT_FALLBACK: &str = "No queues available";

/// Shown when finish fails and the backend gave no message.
pub const FINISH_FALLBACK: &str = "Failed to finish queue";

/// Whether a command is waiting on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Ready for a command.
    Idle,
    /// A command is in flight; NEXT and FINISH are disabled.
    Loading,
}

/// Tone of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// The command succeeded.
    Success,
    /// The command failed or was not allowed.
    Error,
}

/// Message for the operator, shown until dismissed or replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Success or error.
    pub kind: NoticeKind,
    /// Text to display.
    pub text: String,
}

impl Notice {
    fn success(text: String) -> Self {
        Self {
            kind: NoticeKind::Success,
            text,
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}

/// Point-in-time copy of the console for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleView {
    /// The operator's own counter, the only one that can be selected.
    pub home: CounterType,
    /// Counter the commands apply to.
    pub selected: CounterType,
    /// Current ticket per counter.
    pub current: BTreeMap<CounterType, CurrentTicket>,
    /// Notice awaiting dismissal, if any.
    pub notice: Option<Notice>,
    /// Command phase.
    pub phase: Phase,
}

impl ConsoleView {
    /// Current ticket at the selected counter.
    pub fn selected_ticket(&self) -> Option<&CurrentTicket> {
        self.current.get(&self.selected)
    }

    /// Whether FINISH would be enabled.
    pub fn can_finish(&self) -> bool {
        self.phase == Phase::Idle && self.selected_ticket().is_some()
    }

    /// Whether `counter` can be selected.
    pub fn can_select(&self, counter: CounterType) -> bool {
        counter == self.home
    }
}

#[derive(Debug)]
struct ConsoleState {
    selected: CounterType,
    current: BTreeMap<CounterType, CurrentTicket>,
    notice: Option<Notice>,
}

/// Clears the loading flag when a command ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Staff console for one operator.
pub struct ConsoleSync<A, E> {
    api: Arc<A>,
    announcer: Announcer<E>,
    home: CounterType,
    loading: AtomicBool,
    state: Mutex<ConsoleState>,
}

impl<A: QueueApi, E: SpeechEngine> ConsoleSync<A, E> {
    /// A console with `home` selected and no tickets loaded.
    pub fn new(api: Arc<A>, announcer: Announcer<E>, home: CounterType) -> Self {
        Self {
            api,
            announcer,
            home,
            loading: AtomicBool::new(false),
            state: Mutex::new(ConsoleState {
                selected: home,
                current: BTreeMap::new(),
                notice: None,
            }),
        }
    }

    /// The operator's own counter.
    pub const fn home(&self) -> CounterType {
        self.home
    }

    /// The announcer used for called tickets.
    pub const fn announcer(&self) -> &Announcer<E> {
        &self.announcer
    }

    /// Fetch the snapshot and project a current ticket for each counter.
    ///
    /// On failure the error is logged and every counter is left empty.
    pub async fn load(&self) {
        match self.api.display_state().await {
            Ok(state) => {
                let current: BTreeMap<_, _> = state
                    .projections()
                    .into_iter()
                    .map(|(counter, projection)| (counter, CurrentTicket::Projected(projection)))
                    .collect();
                info!(serving = current.len(), "console snapshot loaded");
                self.with_state(|s| s.current = current);
            }
            Err(error) => {
                warn!(error = %error, "console snapshot fetch failed");
                self.with_state(|s| s.current.clear());
            }
        }
    }

    /// Call the next ticket at the selected counter.
    ///
    /// On success the returned ticket becomes the counter's current ticket
    /// and is announced. On failure the current ticket is unchanged.
    pub async fn call_next(&self) -> Result<Ticket, ConsoleError> {
        let _guard = self.begin()?;
        let counter = self.selected();

        match self.api.call_next(counter).await {
            Ok(ticket) => {
                info!(counter = %counter, ticket = %ticket.id, "ticket called");
                let notice = Notice::success(format!("Called: {}", ticket.id));
                self.with_state(|s| {
                    s.current
                        .insert(counter, CurrentTicket::Confirmed(ticket.clone()));
                    s.notice = Some(notice);
                });
                self.announcer.announce(ticket.id.as_str(), counter.label());
                Ok(ticket)
            }
            Err(source) => Err(self.command_failed(counter, source, CALL_NEXT_FALLBACK)),
        }
    }

    /// Finish the current ticket at the selected counter.
    ///
    /// With no current ticket nothing is sent and
    /// [`ConsoleError::NoActiveTicket`] is returned.
    pub async fn finish(&self) -> Result<TicketId, ConsoleError> {
        let _guard = self.begin()?;
        let counter = self.selected();

        let Some(id) = self.current(counter).map(|ticket| ticket.id().clone()) else {
            debug!(counter = %counter, "finish with no current ticket");
            let error = ConsoleError::NoActiveTicket;
            self.with_state(|s| s.notice = Some(Notice::error(error.to_string())));
            return Err(error);
        };

        match self.api.finish(&id).await {
            Ok(()) => {
                info!(counter = %counter, ticket = %id, "ticket finished");
                let notice = Notice::success(format!("Finished: {id}"));
                self.with_state(|s| {
                    if s.current.get(&counter).is_some_and(|t| t.id() == &id) {
                        s.current.remove(&counter);
                    }
                    s.notice = Some(notice);
                });
                Ok(id)
            }
            Err(source) => Err(self.command_failed(counter, source, FINISH_FALLBACK)),
        }
    }

    /// Switch the counter commands apply to.
    ///
    /// Only the operator's own counter can be selected. Any other counter is
    /// rejected with [`ConsoleError::CounterNotAssigned`] and an error notice,
    /// and the selection stays as it was.
    pub fn select(&self, counter: CounterType) -> Result<(), ConsoleError> {
        if counter != self.home {
            warn!(counter = %counter, home = %self.home, "selection of another counter refused");
            let error = ConsoleError::CounterNotAssigned {
                counter,
                home: self.home,
            };
            self.with_state(|s| s.notice = Some(Notice::error(error.to_string())));
            return Err(error);
        }
        debug!(counter = %counter, "counter selected");
        self.with_state(|s| s.selected = counter);
        Ok(())
    }

    /// Counter commands apply to.
    pub fn selected(&self) -> CounterType {
        self.with_state(|s| s.selected)
    }

    /// Current ticket at `counter`.
    pub fn current(&self, counter: CounterType) -> Option<CurrentTicket> {
        self.with_state(|s| s.current.get(&counter).cloned())
    }

    /// The notice awaiting dismissal.
    pub fn notice(&self) -> Option<Notice> {
        self.with_state(|s| s.notice.clone())
    }

    /// Clear the notice.
    pub fn dismiss(&self) {
        self.with_state(|s| s.notice = None);
    }

    /// Command phase.
    pub fn phase(&self) -> Phase {
        if self.loading.load(Ordering::Acquire) {
            Phase::Loading
        } else {
            Phase::Idle
        }
    }

    /// Whether FINISH is available: idle with a current ticket selected.
    pub fn can_finish(&self) -> bool {
        self.phase() == Phase::Idle && self.current(self.selected()).is_some()
    }

    /// Copy of everything the console shows.
    pub fn view(&self) -> ConsoleView {
        let phase = self.phase();
        self.with_state(|s| ConsoleView {
            home: self.home,
            selected: s.selected,
            current: s.current.clone(),
            notice: s.notice.clone(),
            phase,
        })
    }

    fn begin(&self) -> Result<InFlight<'_>, ConsoleError> {
        let guard = InFlight::acquire(&self.loading).ok_or(ConsoleError::Busy)?;
        self.dismiss();
        Ok(guard)
    }

    fn command_failed(
        &self,
        counter: CounterType,
        source: ClientError,
        fallback: &str,
    ) -> ConsoleError {
        let message = source.server_message().unwrap_or(fallback).to_owned();
        warn!(counter = %counter, error = %source, "console command failed");
        self.with_state(|s| s.notice = Some(Notice::error(message.clone())));
        ConsoleError::Command { message, source }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut ConsoleState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }
}
