//! Error types for the sync layer.

use queueboard_client::ClientError;
use queueboard_types::CounterType;

/// Why a console command did not complete.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// Another command is still waiting on the backend.
    #[error("a command is already in flight")]
    Busy,

    /// Finish was requested with no current ticket at the selected counter.
    #[error("No active queue to finish")]
    NoActiveTicket,

    /// Selection of a counter other than the operator's own.
    #[error("Counter {counter} is not assigned to you (your counter is {home})")]
    CounterNotAssigned {
        /// Counter that was requested.
        counter: CounterType,
        /// The operator's own counter.
        home: CounterType,
    },

    /// The backend rejected the command or could not be reached.
    #[error("{message}")]
    Command {
        /// Operator-facing text: the backend's message or a fallback.
        message: String,
        /// The underlying client error.
        #[source]
        source: ClientError,
    },
}

/// Failures from a speech engine.
#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    /// The TTS program could not be started.
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        /// Program that was launched.
        program: String,
        /// The spawn failure.
        #[source]
        source: std::io::Error,
    },

    /// The TTS program exited unsuccessfully.
    #[error("`{program}` exited with {status}")]
    Exit {
        /// Program that was launched.
        program: String,
        /// Its exit status.
        status: std::process::ExitStatus,
    },

    /// The TTS program could not be polled for its exit status.
    #[error("failed to wait for `{program}`: {source}")]
    Wait {
        /// Program that was launched.
        program: String,
        /// The wait failure.
        #[source]
        source: std::io::Error,
    },

    /// The utterance was cut off by a cancel.
    #[error("`{program}` was stopped mid-utterance")]
    Cancelled {
        /// Program that was launched.
        program: String,
    },
}
