//! Error types for the browser collaborator

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while driving a browser
#[derive(Debug, Error)]
pub enum BrowserError {
    /// The browser process could not be started
    #[error("failed to launch browser: {reason}")]
    LaunchFailed { reason: String },

    /// Failed to establish a WebSocket connection to Chrome DevTools
    #[error("failed to connect to Chrome DevTools at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    /// A CDP command returned an error response
    #[error("CDP error {code}: {message}")]
    CdpError {
        code: i64,
        message: String,
        data: Option<String>,
    },

    /// An operation did not complete in time
    #[error("'{method}' timed out after {duration:?}")]
    Timeout { method: String, duration: Duration },

    /// Serialization failures and unexpected message shapes
    #[error("CDP protocol error: {detail}")]
    Protocol { detail: String },

    #[error("element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("navigation failed: {reason}")]
    NavigationFailed { reason: String },

    #[error("JavaScript exception: {message}")]
    JsException { message: String },

    /// The element exists but cannot receive input (hidden, covered, zero-size)
    #[error("element not interactable: {reason}")]
    ElementNotInteractable { reason: String },

    #[error("page is closed")]
    PageClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BrowserError {
    /// Returns true for errors that only mean "it took too long"
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Result type alias for browser operations
pub type BrowserResult<T> = std::result::Result<T, BrowserError>;
