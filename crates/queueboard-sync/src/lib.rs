//! Queue-state synchronization for the Queueboard board and console.
//!
//! - [`display`]: follows push events and keeps the public board equal to
//!   the latest backend snapshot, with coalesced re-fetches
//! - [`console`]: the staff counter view with call-next and finish
//! - [`announcer`]: speaks called tickets, twice, preempting older speech
//! - [`render`]: plain-text views for a terminal
//!
//! Both sync types are generic over [`queueboard_client::QueueApi`] so they
//! can run against in-memory fakes.

pub mod announcer;
pub mod console;
pub mod display;
pub mod error;
pub mod render;

// Re-export primary types for convenience.
pub use announcer::{
    Announcement, AnnouncementOutcome, Announcer, CommandSpeech, ConfiguredSpeech, LogSpeech,
    SpeechEngine, Utterance,
};
pub use console::{ConsoleSync, ConsoleView, Notice, NoticeKind, Phase};
pub use display::{DisplaySync, DisplayView, RefetchCoalescer};
pub use error::{ConsoleError, SpeechError};
