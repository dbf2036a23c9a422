use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::transport::{ConnectionState, TransportError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoomState {
    Waiting,
    Active,
    Ended,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    HangUp,
    TimeUp,
    ConnectionFailed,
    MediaUnavailable,
}

/// What the room UI renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    pub state: RoomState,
    pub time_remaining: u32,
    pub is_connected: bool,
    pub is_muted: bool,
    pub remote_audio_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSummary {
    pub end_reason: EndReason,
    pub elapsed_seconds: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomCommand {
    ToggleMute,
    ToggleRemoteAudio,
    HangUp,
    ConnectionState(ConnectionState),
}

/// Served to the room client before it connects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomConfig {
    pub session_id: Uuid,
    pub duration_seconds: u32,
    pub ice_servers: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomConfigQuery {
    pub patient_id: String,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RoomError {
    #[error("Room already {0:?}")]
    InvalidState(RoomState),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Session not found")]
    SessionNotFound,

    #[error("Session cannot be joined")]
    SessionNotJoinable,

    #[error("Session payment has not completed")]
    PaymentRequired,

    #[error("Session API error: {0}")]
    Api(String),
}
