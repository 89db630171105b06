//! Configuration for Queueboard clients.
//!
//! All configuration comes from environment variables, each with a default
//! that points at a backend on `localhost:3000`. Command-line flags in the
//! binary override individual values after loading.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ClientError;

/// Default backend base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// Default directory for persisted credentials.
pub const DEFAULT_STATE_DIR: &str = ".queueboard";

/// File inside the state directory holding the `token` and `user` keys.
pub const CREDENTIALS_FILE: &str = "credentials.json";

/// Default speech rate (1.0 is the engine's normal speed).
pub const DEFAULT_SPEECH_RATE: f32 = 0.6;

/// Complete client configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// REST base URL (e.g. `http://localhost:3000`).
    pub api_url: String,
    /// WebSocket base URL of the event gateway (e.g. `ws://localhost:3000`).
    pub ws_url: String,
    /// Whether `ws_url` was given explicitly rather than derived from
    /// `api_url`. An explicit gateway survives [`ClientConfig::with_api_url`].
    pub ws_url_explicit: bool,
    /// Directory holding persisted credentials.
    pub state_dir: PathBuf,
    /// Per-request timeout for REST calls.
    pub request_timeout: Duration,
    /// Announcement settings.
    pub speech: SpeechConfig,
}

/// How announcements are spoken.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechConfig {
    /// External text-to-speech program. `None` logs announcements instead.
    pub command: Option<String>,
    /// Speaking rate relative to the engine default.
    pub rate: f32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            command: None,
            rate: DEFAULT_SPEECH_RATE,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            ws_url: "ws://localhost:3000".to_owned(),
            ws_url_explicit: false,
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            request_timeout: Duration::from_millis(10_000),
            speech: SpeechConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional variables:
    /// - `QUEUEBOARD_API_URL` -- REST base URL (default `http://localhost:3000`)
    /// - `QUEUEBOARD_WS_URL` -- gateway URL (default: API URL with `ws`/`wss` scheme)
    /// - `QUEUEBOARD_STATE_DIR` -- credential directory (default `.queueboard`)
    /// - `QUEUEBOARD_REQUEST_TIMEOUT_MS` -- REST timeout in milliseconds (default 10000)
    /// - `QUEUEBOARD_TTS_COMMAND` -- text-to-speech program (unset logs announcements)
    /// - `QUEUEBOARD_SPEECH_RATE` -- speaking rate, 0.1 to 10 (default 0.6)
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("QUEUEBOARD_API_URL")
            .unwrap_or_else(|| DEFAULT_API_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();

        let (ws_url, ws_url_explicit) = match lookup("QUEUEBOARD_WS_URL") {
            Some(url) => (checked_ws_url(&url)?, true),
            None => (ws_url_for(&api_url)?, false),
        };

        let state_dir = lookup("QUEUEBOARD_STATE_DIR")
            .map_or_else(|| PathBuf::from(DEFAULT_STATE_DIR), PathBuf::from);

        let request_timeout_ms: u64 = lookup("QUEUEBOARD_REQUEST_TIMEOUT_MS")
            .unwrap_or_else(|| "10000".to_owned())
            .parse()
            .map_err(|e| ClientError::Config(format!("invalid QUEUEBOARD_REQUEST_TIMEOUT_MS: {e}")))?;

        let command = lookup("QUEUEBOARD_TTS_COMMAND").filter(|c| !c.trim().is_empty());

        let rate: f32 = lookup("QUEUEBOARD_SPEECH_RATE")
            .unwrap_or_else(|| DEFAULT_SPEECH_RATE.to_string())
            .parse()
            .map_err(|e| ClientError::Config(format!("invalid QUEUEBOARD_SPEECH_RATE: {e}")))?;
        validate_rate(rate)?;

        Ok(Self {
            api_url,
            ws_url,
            ws_url_explicit,
            state_dir,
            request_timeout: Duration::from_millis(request_timeout_ms),
            speech: SpeechConfig { command, rate },
        })
    }

    /// Path of the persisted credentials file.
    pub fn credentials_path(&self) -> PathBuf {
        self.state_dir.join(CREDENTIALS_FILE)
    }

    /// Point the client at a different backend.
    ///
    /// The gateway URL is re-derived from the new base URL unless it was set
    /// explicitly, in which case it is kept.
    pub fn with_api_url(mut self, api_url: &str) -> Result<Self, ClientError> {
        let derived = ws_url_for(api_url.trim_end_matches('/'))?;
        api_url.trim_end_matches('/').clone_into(&mut self.api_url);
        if !self.ws_url_explicit {
            self.ws_url = derived;
        }
        Ok(self)
    }

    /// Use an explicit gateway URL.
    pub fn with_ws_url(mut self, ws_url: &str) -> Result<Self, ClientError> {
        self.ws_url = checked_ws_url(ws_url)?;
        self.ws_url_explicit = true;
        Ok(self)
    }

    /// Use a different credential directory.
    #[must_use]
    pub fn with_state_dir(mut self, dir: &Path) -> Self {
        self.state_dir = dir.to_path_buf();
        self
    }
}

/// Derive the gateway URL from the REST base URL.
fn ws_url_for(api_url: &str) -> Result<String, ClientError> {
    if let Some(rest) = api_url.strip_prefix("https://") {
        Ok(format!("wss://{rest}"))
    } else if let Some(rest) = api_url.strip_prefix("http://") {
        Ok(format!("ws://{rest}"))
    } else {
        Err(ClientError::Config(format!(
            "QUEUEBOARD_API_URL must start with http:// or https://, got {api_url}"
        )))
    }
}

/// An explicit gateway URL, without its trailing slash.
fn checked_ws_url(url: &str) -> Result<String, ClientError> {
    if url.starts_with("ws://") || url.starts_with("wss://") {
        Ok(url.trim_end_matches('/').to_owned())
    } else {
        Err(ClientError::Config(format!(
            "QUEUEBOARD_WS_URL must start with ws:// or wss://, got {url}"
        )))
    }
}

/// Reject rates outside what speech engines accept.
fn validate_rate(rate: f32) -> Result<(), ClientError> {
    if (0.1..=10.0).contains(&rate) {
        Ok(())
    } else {
        Err(ClientError::Config(format!(
            "QUEUEBOARD_SPEECH_RATE must be between 0.1 and 10, got {rate}"
        )))
    }
}
