// SPDX-License-Identifier: GPL-3.0-only

//! Lifecycle notifications
//!
//! Each event is sent once per occurrence on a broadcast channel. Sending
//! with no subscribers is not an error.

use super::detector::{CaptureMode, DeviceClass};
use crate::backends::camera::{CaptureTarget, FacingMode, TrackSettings};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

/// Descriptive data attached to a captured photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoMetadata {
    pub timestamp: DateTime<Utc>,
    pub mode: CaptureMode,
    pub target: CaptureTarget,
    pub facing_mode: FacingMode,
    pub mime_type: String,
    pub bytes: usize,
    pub source_width: u32,
    pub source_height: u32,
    pub output_width: u32,
    pub output_height: u32,
    pub quality: f32,
    pub passes: u8,
    pub quality_profile: Option<String>,
    pub device_class: DeviceClass,
    pub user_agent: String,
    pub screen_width: u32,
    pub screen_height: u32,
    pub pixel_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CaptureEvent {
    CameraStart {
        mode: CaptureMode,
        target: CaptureTarget,
        facing_mode: FacingMode,
        tier: String,
        settings: TrackSettings,
    },
    CameraStop,
    CameraError {
        kind: String,
        message: String,
    },
    /// Carries the encoded image; subscribers share one allocation
    PhotoTaken {
        data: Arc<[u8]>,
        metadata: PhotoMetadata,
    },
    PhotoError {
        kind: String,
        message: String,
    },
    CameraSwitch {
        facing_mode: FacingMode,
    },
    CameraSwitchError {
        message: String,
    },
}

impl CaptureEvent {
    pub fn name(&self) -> &'static str {
        match self {
            CaptureEvent::CameraStart { .. } => "cameraStart",
            CaptureEvent::CameraStop => "cameraStop",
            CaptureEvent::CameraError { .. } => "cameraError",
            CaptureEvent::PhotoTaken { .. } => "photoTaken",
            CaptureEvent::PhotoError { .. } => "photoError",
            CaptureEvent::CameraSwitch { .. } => "cameraSwitch",
            CaptureEvent::CameraSwitchError { .. } => "cameraSwitchError",
        }
    }
}

/// Sending half shared by a manager and its strategy
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: broadcast::Sender<CaptureEvent>,
}

impl EventEmitter {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn emit(&self, event: CaptureEvent) {
        trace!(event = event.name(), "Emitting capture event");
        // Err only means nobody is listening
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CaptureEvent> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_events_once() {
        let emitter = EventEmitter::new(4);
        emitter.emit(CaptureEvent::CameraStop);

        let mut rx = emitter.subscribe();
        emitter.emit(CaptureEvent::CameraSwitch {
            facing_mode: FacingMode::User,
        });
        assert_eq!(
            rx.recv().await.unwrap(),
            CaptureEvent::CameraSwitch {
                facing_mode: FacingMode::User
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let json = serde_json::to_value(CaptureEvent::CameraError {
            kind: "CameraInitTimeout".into(),
            message: "no frame".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "cameraError");
        assert_eq!(json["kind"], "CameraInitTimeout");
    }
}
