//! Error types for display sessions

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::Arc;
use thiserror::Error;

/// Why a display server could not be brought up.
///
/// This travels from the worker thread to the caller through the handoff
/// channel, so it has to be `Clone`.
#[derive(Debug, Clone, Error)]
pub enum LaunchError {
    #[error("Display :{display} is not available")]
    DisplayInUse { display: u32 },

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("Failed to wait for display server: {source}")]
    Wait {
        #[source]
        source: Arc<io::Error>,
    },

    #[error("Display server exited with {status}")]
    Exited { status: ExitStatus },
}

#[derive(Debug, Error)]
pub enum SessionError {
    /// The backing display server failed to launch.
    #[error("Display server failed to launch: {0}")]
    Launch(#[source] LaunchError),

    #[error("X11 display :{display} is not running")]
    NotRunning { display: u32 },

    /// Captured byte stream does not reshape to (height, width, 3).
    #[error("Frame size mismatch: expected {expected} bytes, got {actual}")]
    FrameSize { expected: usize, actual: usize },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("X11 request failed: {0}")]
    X11(String),

    #[error("Invalid config {path:?}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl SessionError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// True when activation failed because another server already owns the display.
    pub fn is_display_in_use(&self) -> bool {
        matches!(self, Self::Launch(LaunchError::DisplayInUse { .. }))
    }
}

pub type Result<T, E = SessionError> = std::result::Result<T, E>;
