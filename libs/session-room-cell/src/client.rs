use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde_json::json;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::controller::SessionRoomController;
use crate::models::{RoomCommand, RoomConfig, RoomError, RoomSnapshot, RoomSummary};
use crate::transport::MediaTransport;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Room client's view of the session endpoints.
pub struct SessionRoomApi {
    client: Client,
    base_url: String,
}

impl SessionRoomApi {
    pub fn new(base_url: &str) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                error!("Failed to build session API client, falling back to defaults: {}", e);
                Client::new()
            });

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn fetch_room_config(
        &self,
        session_id: Uuid,
        patient_id: &str,
    ) -> Result<RoomConfig, RoomError> {
        let url = format!("{}/sessions/{}/room", self.base_url, session_id);
        let response = self.client
            .get(&url)
            .query(&[("patientId", patient_id)])
            .send()
            .await
            .map_err(|e| RoomError::Api(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(RoomError::SessionNotFound),
            StatusCode::CONFLICT => Err(RoomError::SessionNotJoinable),
            StatusCode::PAYMENT_REQUIRED => Err(RoomError::PaymentRequired),
            status if !status.is_success() => Err(RoomError::Api(format!("HTTP {}", status))),
            _ => response
                .json::<RoomConfig>()
                .await
                .map_err(|e| RoomError::Api(e.to_string())),
        }
    }

    pub async fn report_start(&self, session_id: Uuid, patient_id: &str) -> Result<(), RoomError> {
        self.report(session_id, patient_id, "start").await
    }

    pub async fn report_end(&self, session_id: Uuid, patient_id: &str) -> Result<(), RoomError> {
        self.report(session_id, patient_id, "end").await
    }

    async fn report(&self, session_id: Uuid, patient_id: &str, event: &str) -> Result<(), RoomError> {
        let url = format!("{}/sessions/{}/{}", self.base_url, session_id, event);
        debug!("Reporting session {} {}", session_id, event);

        let response = self.client
            .post(&url)
            .json(&json!({ "patientId": patient_id }))
            .send()
            .await
            .map_err(|e| RoomError::Api(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RoomError::Api(format!("HTTP {}", response.status())));
        }
        Ok(())
    }

    /// Fetches the room config, connects, runs the room to its end and
    /// reports start and end to the server. Reporting failures are logged;
    /// they do not interrupt the call.
    pub async fn attend<T: MediaTransport>(
        &self,
        transport: T,
        session_id: Uuid,
        patient_id: &str,
        commands: mpsc::Receiver<RoomCommand>,
        snapshots: watch::Sender<RoomSnapshot>,
    ) -> Result<RoomSummary, RoomError> {
        let config = self.fetch_room_config(session_id, patient_id).await?;

        let mut controller = SessionRoomController::new(transport, config.duration_seconds);
        let connected = controller.connect(&config.ice_servers).await;
        snapshots.send_replace(controller.snapshot());
        connected?;

        if let Err(e) = self.report_start(session_id, patient_id).await {
            warn!("Could not report start of session {}: {}", session_id, e);
        }

        let summary = controller.run(commands, snapshots).await;

        if let Err(e) = self.report_end(session_id, patient_id).await {
            warn!("Could not report end of session {}: {}", session_id, e);
        }

        Ok(summary)
    }
}
