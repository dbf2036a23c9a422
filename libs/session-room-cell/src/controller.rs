use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::models::{EndReason, RoomCommand, RoomError, RoomSnapshot, RoomState, RoomSummary};
use crate::transport::{ConnectionState, MediaTransport};

const TICK: Duration = Duration::from_secs(1);

/// `MM:SS` for the countdown display.
pub fn format_time(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Call lifecycle of one session room: `waiting -> active -> ended`.
/// `ended` is terminal and releases the audio resources exactly once.
pub struct SessionRoomController<T: MediaTransport> {
    transport: T,
    state: RoomState,
    duration_seconds: u32,
    time_remaining: u32,
    is_connected: bool,
    is_muted: bool,
    remote_audio_enabled: bool,
    end_reason: Option<EndReason>,
    released: bool,
}

impl<T: MediaTransport> SessionRoomController<T> {
    pub fn new(transport: T, duration_seconds: u32) -> Self {
        Self {
            transport,
            state: RoomState::Waiting,
            duration_seconds,
            time_remaining: duration_seconds,
            is_connected: false,
            is_muted: false,
            remote_audio_enabled: true,
            end_reason: None,
            released: false,
        }
    }

    pub fn state(&self) -> RoomState {
        self.state
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.duration_seconds - self.time_remaining
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            state: self.state,
            time_remaining: self.time_remaining,
            is_connected: self.is_connected,
            is_muted: self.is_muted,
            remote_audio_enabled: self.remote_audio_enabled,
        }
    }

    /// Acquires the microphone and connects. Any failure ends the room; there
    /// is no reconnection.
    pub async fn connect(&mut self, ice_servers: &[String]) -> Result<(), RoomError> {
        if self.state != RoomState::Waiting {
            return Err(RoomError::InvalidState(self.state));
        }

        if let Err(e) = self.transport.acquire_local_audio().await {
            warn!("Could not acquire microphone: {}", e);
            self.end(EndReason::MediaUnavailable);
            return Err(e.into());
        }

        if let Err(e) = self.transport.connect(ice_servers).await {
            warn!("Could not open peer connection: {}", e);
            self.end(EndReason::ConnectionFailed);
            return Err(e.into());
        }

        self.is_connected = true;
        self.state = RoomState::Active;
        info!("Session room active, {} remaining", format_time(self.time_remaining));
        Ok(())
    }

    pub fn on_connection_state(&mut self, connection: ConnectionState) {
        if self.state == RoomState::Ended {
            return;
        }

        match connection {
            // Only `connect` leaves Waiting, since it alone acquires local audio.
            ConnectionState::Connected if self.state == RoomState::Active => {
                self.is_connected = true;
            }
            ConnectionState::Connected => {
                debug!("Ignoring connected report while {:?}", self.state);
            }
            ConnectionState::Failed => {
                self.end(EndReason::ConnectionFailed);
            }
            ConnectionState::Disconnected => {
                // The media layer may still recover on its own.
                self.is_connected = false;
            }
            ConnectionState::New | ConnectionState::Connecting | ConnectionState::Closed => {
                debug!("Ignoring connection state {:?}", connection);
            }
        }
    }

    /// One second of countdown. Returns `true` when this tick ended the room.
    pub fn tick(&mut self) -> bool {
        if self.state != RoomState::Active {
            return false;
        }

        if self.time_remaining <= 1 {
            self.time_remaining = 0;
            return self.end(EndReason::TimeUp);
        }

        self.time_remaining -= 1;
        false
    }

    pub fn toggle_mute(&mut self) {
        if self.state == RoomState::Ended {
            return;
        }
        self.is_muted = !self.is_muted;
        self.transport.set_local_enabled(!self.is_muted);
    }

    pub fn toggle_remote_audio(&mut self) {
        if self.state == RoomState::Ended {
            return;
        }
        self.remote_audio_enabled = !self.remote_audio_enabled;
        self.transport.set_remote_muted(!self.remote_audio_enabled);
    }

    /// Moves to `ended`. Returns `false` if the room had already ended.
    pub fn end(&mut self, reason: EndReason) -> bool {
        if self.state == RoomState::Ended {
            return false;
        }

        self.state = RoomState::Ended;
        self.is_connected = false;
        self.end_reason = Some(reason);
        self.release();

        info!("Session room ended ({:?}) after {}s", reason, self.elapsed_seconds());
        true
    }

    pub fn apply(&mut self, command: RoomCommand) {
        match command {
            RoomCommand::ToggleMute => self.toggle_mute(),
            RoomCommand::ToggleRemoteAudio => self.toggle_remote_audio(),
            RoomCommand::HangUp => {
                self.end(EndReason::HangUp);
            }
            RoomCommand::ConnectionState(connection) => self.on_connection_state(connection),
        }
    }

    /// Drives the room until it ends: a 1 s countdown and user/transport
    /// commands on one task. Every change is published on `snapshots`.
    /// Dropping the command sender counts as hanging up.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<RoomCommand>,
        snapshots: watch::Sender<RoomSnapshot>,
    ) -> RoomSummary {
        let mut ticker = interval_at(Instant::now() + TICK, TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        snapshots.send_replace(self.snapshot());

        while self.state != RoomState::Ended {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick();
                }
                command = commands.recv() => match command {
                    Some(command) => self.apply(command),
                    None => {
                        debug!("Room command channel closed");
                        self.end(EndReason::HangUp);
                    }
                },
            }
            snapshots.send_replace(self.snapshot());
        }

        RoomSummary {
            end_reason: self.end_reason.unwrap_or(EndReason::HangUp),
            elapsed_seconds: self.elapsed_seconds(),
        }
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.transport.stop_local_tracks();
        self.transport.close();
    }
}

impl<T: MediaTransport> Drop for SessionRoomController<T> {
    fn drop(&mut self) {
        self.release();
    }
}
