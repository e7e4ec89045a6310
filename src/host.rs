//! Interfaces towards the embedding voice chat host.

use async_trait::async_trait;

/// Identifier of one server connection within the host.
pub type ConnectionId = u64;

/// Control surface the host exposes to the playback pipeline.
#[async_trait]
pub trait VoiceHost: Send + Sync {
    /// Toggle the host's voice activity detection for a connection.
    ///
    /// Detection needs to be disabled while injected audio is playing,
    /// otherwise the host suppresses the outgoing frames as silence.
    async fn set_voice_activity_detection(&self, connection: ConnectionId, enabled: bool);
}
