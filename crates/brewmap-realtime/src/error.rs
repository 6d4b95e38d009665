// Error types for the realtime layer

use thiserror::Error;

/// Result type alias for realtime operations
pub type Result<T> = std::result::Result<T, RealtimeError>;

/// Errors that can occur while multiplexing change streams
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Opening or activating a physical channel failed
    #[error("failed to open channel {channel}: {reason}")]
    ChannelOpen { channel: String, reason: String },

    /// Transport-level failure on a live channel
    #[error("transport error: {0}")]
    Transport(String),
}

impl RealtimeError {
    /// Create a channel open error
    pub fn channel_open(channel: impl Into<String>, reason: impl Into<String>) -> Self {
        RealtimeError::ChannelOpen {
            channel: channel.into(),
            reason: reason.into(),
        }
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        RealtimeError::Transport(msg.into())
    }
}
