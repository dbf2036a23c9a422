use async_trait::async_trait;

/// Peer connection states reported by the media layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("Microphone unavailable: {0}")]
    MediaUnavailable(String),

    #[error("Peer connection failed: {0}")]
    ConnectFailed(String),
}

/// Audio-only peer connection. Implementations wrap the actual WebRTC stack;
/// the room controller only drives it.
#[async_trait]
pub trait MediaTransport: Send {
    /// Opens the local microphone track.
    async fn acquire_local_audio(&mut self) -> Result<(), TransportError>;

    /// Creates the peer connection, publishes the local track and starts
    /// negotiation.
    async fn connect(&mut self, ice_servers: &[String]) -> Result<(), TransportError>;

    fn set_local_enabled(&mut self, enabled: bool);

    fn set_remote_muted(&mut self, muted: bool);

    fn stop_local_tracks(&mut self);

    fn close(&mut self);
}
