//! Spoken "now serving" announcements.
//!
//! An announcement is one utterance spoken [`REPETITIONS`] times, each
//! repetition starting after the previous one finishes. There is no queue:
//! a new announcement aborts the running one and cancels the engine before
//! it starts, then waits for the aborted one to wind down.
//!
//! Speech output goes through the [`SpeechEngine`] trait. [`CommandSpeech`]
//! drives an external TTS program; [`LogSpeech`] only logs.

use std::future::Future;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use queueboard_client::SpeechConfig;
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::SpeechError;

/// How many times each announcement is spoken.
pub const REPETITIONS: usize = 2;

/// Language tag for announcements.
pub const ANNOUNCEMENT_LANG: &str = "en-US";

/// Default TTS program for [`CommandSpeech`].
pub const DEFAULT_TTS_PROGRAM: &str = "espeak-ng";

/// Words per minute at rate 1.0 (espeak's default speed).
const BASE_WORDS_PER_MINUTE: f32 = 175.0;

/// How often a running TTS child is checked for exit.
const EXIT_POLL: Duration = Duration::from_millis(20);

/// One thing to say, with Web Speech style parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    /// Text to speak.
    pub text: String,
    /// Speaking rate; 1.0 is normal.
    pub rate: f32,
    /// Pitch; 1.0 is normal, range 0 to 2.
    pub pitch: f32,
    /// Volume from 0 to 1.
    pub volume: f32,
    /// BCP 47 language tag.
    pub lang: String,
}

impl Utterance {
    /// `"Now serving {ticket} at {counter}"` at the given rate.
    pub fn announcement(ticket: &str, counter: &str, rate: f32) -> Self {
        Self {
            text: format!("Now serving {ticket} at {counter}"),
            rate,
            pitch: 1.0,
            volume: 1.0,
            lang: ANNOUNCEMENT_LANG.to_owned(),
        }
    }
}

/// A text-to-speech backend.
///
/// Async methods are not dyn-compatible, so the announcer is generic over
/// its engine.
pub trait SpeechEngine: Send + Sync + 'static {
    /// Speak `utterance`, resolving once it has been said.
    fn speak(&self, utterance: &Utterance) -> impl Future<Output = Result<(), SpeechError>> + Send;

    /// Stop any output in progress.
    fn cancel(&self);
}

// ---------------------------------------------------------------------------
// Engines
// ---------------------------------------------------------------------------

/// Speaks by running an espeak-compatible program once per utterance.
///
/// The running child is kept where [`SpeechEngine::cancel`] can reach it.
/// Cancel kills it on the spot, and the next utterance reaps every killed
/// child before it spawns, so two utterances never play at once. Clones
/// share the same playback slot.
#[derive(Debug, Clone)]
pub struct CommandSpeech {
    program: String,
    playback: Arc<Mutex<Playback>>,
}

/// Children owned by a [`CommandSpeech`].
#[derive(Debug, Default)]
struct Playback {
    running: Option<Child>,
    stopping: Vec<Child>,
}

impl Playback {
    /// Kill the running child, if any, and park it for reaping.
    fn stop_running(&mut self, program: &str) {
        let Some(mut child) = self.running.take() else {
            return;
        };
        if let Err(error) = child.start_kill() {
            // Exited and reaped before the kill.
            debug!(program, error = %error, "tts process was not running");
            return;
        }
        info!(program, pid = child.id(), "tts process killed");
        self.stopping.push(child);
    }
}

impl Default for CommandSpeech {
    fn default() -> Self {
        Self::new(DEFAULT_TTS_PROGRAM)
    }
}

impl CommandSpeech {
    /// Use `program` as the TTS command.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            playback: Arc::default(),
        }
    }

    /// The TTS command.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Command-line arguments for `utterance`.
    pub fn args(utterance: &Utterance) -> Vec<String> {
        vec![
            "-v".to_owned(),
            utterance.lang.to_ascii_lowercase(),
            "-s".to_owned(),
            scaled(utterance.rate, BASE_WORDS_PER_MINUTE, 80, 500).to_string(),
            "-p".to_owned(),
            scaled(utterance.pitch, 50.0, 0, 99).to_string(),
            "-a".to_owned(),
            scaled(utterance.volume, 100.0, 0, 200).to_string(),
            utterance.text.clone(),
        ]
    }

    fn playback(&self) -> MutexGuard<'_, Playback> {
        self.playback.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait for every killed child to exit.
    async fn reap_stopped(&self) {
        let stopping = std::mem::take(&mut self.playback().stopping);
        for mut child in stopping {
            if let Err(error) = child.wait().await {
                debug!(program = %self.program, error = %error, "failed to reap tts process");
            }
        }
    }

    /// Poll the child spawned as `pid` until it exits or is cancelled.
    async fn wait_for(&self, pid: Option<u32>) -> Result<ExitStatus, SpeechError> {
        loop {
            {
                let mut playback = self.playback();
                let Some(child) = playback.running.as_mut().filter(|child| child.id() == pid) else {
                    return Err(SpeechError::Cancelled {
                        program: self.program.clone(),
                    });
                };
                let exited = child.try_wait().map_err(|source| SpeechError::Wait {
                    program: self.program.clone(),
                    source,
                })?;
                if let Some(status) = exited {
                    playback.running = None;
                    return Ok(status);
                }
            }
            tokio::time::sleep(EXIT_POLL).await;
        }
    }
}

/// `value * unit`, rounded and clamped to `[min, max]`.
fn scaled(value: f32, unit: f32, min: u16, max: u16) -> u16 {
    let raw = (value * unit).round();
    if raw.is_nan() || raw <= f32::from(min) {
        min
    } else if raw >= f32::from(max) {
        max
    } else {
        // In range: min < raw < max and both bounds fit u16.
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let value = raw as u16;
        value
    }
}

impl SpeechEngine for CommandSpeech {
    async fn speak(&self, utterance: &Utterance) -> Result<(), SpeechError> {
        self.reap_stopped().await;

        debug!(program = %self.program, text = %utterance.text, "speaking");
        let child = Command::new(&self.program)
            .args(Self::args(utterance))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SpeechError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        let pid = child.id();
        {
            let mut playback = self.playback();
            playback.stop_running(&self.program);
            playback.running = Some(child);
        }

        let status = self.wait_for(pid).await?;
        if status.success() {
            Ok(())
        } else {
            Err(SpeechError::Exit {
                program: self.program.clone(),
                status,
            })
        }
    }

    fn cancel(&self) {
        self.playback().stop_running(&self.program);
    }
}

/// Logs announcements instead of speaking them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSpeech;

impl SpeechEngine for LogSpeech {
    async fn speak(&self, utterance: &Utterance) -> Result<(), SpeechError> {
        info!(text = %utterance.text, rate = utterance.rate, lang = %utterance.lang, "announcement");
        Ok(())
    }

    fn cancel(&self) {}
}

/// Engine chosen from configuration.
///
/// Enum dispatch keeps [`Announcer`] generic while the engine is picked at
/// runtime.
#[derive(Debug, Clone)]
pub enum ConfiguredSpeech {
    /// External TTS program.
    Command(CommandSpeech),
    /// Log only.
    Log(LogSpeech),
}

impl ConfiguredSpeech {
    /// [`CommandSpeech`] when a TTS command is configured, else [`LogSpeech`].
    pub fn from_config(config: &SpeechConfig) -> Self {
        config.command.as_deref().map_or(Self::Log(LogSpeech), |program| {
            Self::Command(CommandSpeech::new(program))
        })
    }
}

impl SpeechEngine for ConfiguredSpeech {
    async fn speak(&self, utterance: &Utterance) -> Result<(), SpeechError> {
        match self {
            Self::Command(engine) => engine.speak(utterance).await,
            Self::Log(engine) => engine.speak(utterance).await,
        }
    }

    fn cancel(&self) {
        match self {
            Self::Command(engine) => engine.cancel(),
            Self::Log(engine) => engine.cancel(),
        }
    }
}

// ---------------------------------------------------------------------------
// Announcer
// ---------------------------------------------------------------------------

/// How an announcement ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnouncementOutcome {
    /// Every repetition was spoken.
    Completed,
    /// The engine failed; remaining repetitions were skipped.
    Failed,
    /// A newer announcement replaced this one.
    Preempted,
}

/// Handle to a running announcement.
#[derive(Debug)]
pub struct Announcement {
    text: String,
    done: oneshot::Receiver<AnnouncementOutcome>,
}

impl Announcement {
    /// What is being said.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Wait for the announcement to end.
    pub async fn finished(self) -> AnnouncementOutcome {
        self.done.await.unwrap_or(AnnouncementOutcome::Preempted)
    }
}

/// Speaks announcements through an engine, one at a time.
pub struct Announcer<E> {
    engine: Arc<E>,
    rate: f32,
    current: Mutex<Option<JoinHandle<()>>>,
}

impl<E: SpeechEngine> Announcer<E> {
    /// An announcer speaking at `rate`.
    pub fn new(engine: E, rate: f32) -> Self {
        Self {
            engine: Arc::new(engine),
            rate,
            current: Mutex::new(None),
        }
    }

    /// The engine in use.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Announce `ticket` at `counter`, preempting any announcement in
    /// progress.
    ///
    /// Must be called from within a tokio runtime.
    pub fn announce(&self, ticket: &str, counter: &str) -> Announcement {
        let utterance = Utterance::announcement(ticket, counter, self.rate);
        let text = utterance.text.clone();

        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = current.take().filter(|task| !task.is_finished());
        if let Some(previous) = &previous {
            debug!("preempting announcement in progress");
            previous.abort();
        }
        self.engine.cancel();

        let (done_tx, done) = oneshot::channel();
        let engine = Arc::clone(&self.engine);
        *current = Some(tokio::spawn(async move {
            // The aborted task must be fully dropped before anything new plays.
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            let outcome = speak_repeated(engine.as_ref(), &utterance).await;
            let _ = done_tx.send(outcome);
        }));

        Announcement { text, done }
    }
}

async fn speak_repeated<E: SpeechEngine>(engine: &E, utterance: &Utterance) -> AnnouncementOutcome {
    for repetition in 1..=REPETITIONS {
        if let Err(error) = engine.speak(utterance).await {
            warn!(error = %error, repetition, text = %utterance.text, "announcement failed");
            return AnnouncementOutcome::Failed;
        }
    }
    AnnouncementOutcome::Completed
}
