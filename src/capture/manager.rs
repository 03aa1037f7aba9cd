// SPDX-License-Identifier: GPL-3.0-only

//! Capture manager
//!
//! The single entry point the rest of an application talks to. A manager
//! detects capabilities once, builds the matching strategy, delegates the
//! lifecycle calls to it and reports every outcome as a [`CaptureEvent`].
//! Managers are explicit values; [`CaptureRegistry`] keeps several of them
//! apart by session id when a host needs more than one.

use super::detector::{
    CapabilityDetector, CaptureMode, DeviceCapabilityReport, EnvironmentInfo, HostEnvironment,
};
use super::events::{CaptureEvent, EventEmitter, PhotoMetadata};
use super::strategy::{ActiveStream, CaptureStrategy, StopHandle, StrategyStatus, SwitchOutcome};
use super::tiers::ConstraintOverrides;
use crate::backends::camera::{CaptureSurfaces, CaptureTarget, FacingMode, MediaDevices};
use crate::config::CaptureConfig;
use crate::errors::{CaptureError, CaptureResult};
use crate::pipelines::photo::CapturedPhoto;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Per-call inputs to [`CaptureManager::start_camera`]
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    pub surfaces: CaptureSurfaces,
    /// Constraint values that replace the tier defaults
    pub overrides: ConstraintOverrides,
    /// Replaces the facing mode derived from the target
    pub facing_mode: Option<FacingMode>,
}

impl StartOptions {
    pub fn with_surfaces(surfaces: CaptureSurfaces) -> Self {
        Self {
            surfaces,
            ..Self::default()
        }
    }
}

/// A captured photo with its descriptive metadata
#[derive(Debug, Clone)]
pub struct PhotoResult {
    pub photo: CapturedPhoto,
    pub metadata: PhotoMetadata,
}

/// Snapshot returned by [`CaptureManager::get_status`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureStatus {
    pub session_id: Uuid,
    pub initialized: bool,
    pub mode: Option<CaptureMode>,
    pub capabilities: Option<DeviceCapabilityReport>,
    pub strategy: Option<StrategyStatus>,
    pub supports_camera_switch: bool,
}

pub struct CaptureManager {
    session_id: Uuid,
    devices: Arc<dyn MediaDevices>,
    host: HostEnvironment,
    config: CaptureConfig,
    capabilities: Option<DeviceCapabilityReport>,
    mode: Option<CaptureMode>,
    strategy: Option<CaptureStrategy>,
    target: Option<CaptureTarget>,
    events: EventEmitter,
    stop_handle: StopHandle,
}

impl CaptureManager {
    pub fn new(
        devices: Arc<dyn MediaDevices>,
        host: HostEnvironment,
        config: CaptureConfig,
    ) -> Self {
        let events = EventEmitter::new(config.event_channel_capacity);
        Self {
            session_id: Uuid::new_v4(),
            devices,
            host,
            config,
            capabilities: None,
            mode: None,
            strategy: None,
            target: None,
            events,
            stop_handle: StopHandle::new(),
        }
    }

    /// Detect capabilities and build the strategy
    ///
    /// Detection runs once; later calls reuse the cached report. Fails with
    /// [`CaptureError::NoCameraAvailable`] when no camera was found, in which
    /// case no strategy exists.
    pub async fn initialize(&mut self) -> CaptureResult<CaptureMode> {
        if let Some(strategy) = &self.strategy {
            return Ok(strategy.mode());
        }

        let report = match &self.capabilities {
            Some(report) => report.clone(),
            None => {
                let detector = CapabilityDetector::new(
                    self.devices.clone(),
                    self.host.clone(),
                    self.config.clone(),
                );
                let report = detector.detect().await;
                self.capabilities = Some(report.clone());
                report
            }
        };

        let mode = report.recommend_mode();
        self.mode = Some(mode);

        let Some(strategy) = CaptureStrategy::for_mode(
            mode,
            self.devices.clone(),
            self.config.clone(),
            report.can_switch_camera(),
        ) else {
            error!(session = %self.session_id, "No camera available");
            return Err(CaptureError::NoCameraAvailable);
        };

        info!(
            session = %self.session_id,
            %mode,
            device_class = %report.device_class,
            "Capture manager initialized"
        );
        self.strategy = Some(strategy.with_stop_handle(self.stop_handle.clone()));
        Ok(mode)
    }

    /// Drop the cached report and strategy, then detect again
    pub async fn reinitialize(&mut self) -> CaptureResult<CaptureMode> {
        self.destroy();
        self.initialize().await
    }

    pub async fn start_camera(
        &mut self,
        target: CaptureTarget,
        options: StartOptions,
    ) -> CaptureResult<ActiveStream> {
        match self.start_inner(target, options).await {
            Ok(active) => {
                self.events.emit(CaptureEvent::CameraStart {
                    mode: self.mode.unwrap_or(CaptureMode::Desktop),
                    target,
                    facing_mode: active.facing_mode,
                    tier: active.tier.clone(),
                    settings: active.settings.clone(),
                });
                Ok(active)
            }
            Err(e) => {
                warn!(session = %self.session_id, error = %e, "Camera start failed");
                self.events.emit(CaptureEvent::CameraError {
                    kind: e.kind_name().to_string(),
                    message: e.user_message(),
                });
                Err(e)
            }
        }
    }

    async fn start_inner(
        &mut self,
        target: CaptureTarget,
        options: StartOptions,
    ) -> CaptureResult<ActiveStream> {
        self.initialize().await?;
        let strategy = self
            .strategy
            .as_mut()
            .ok_or(CaptureError::NoCameraAvailable)?;

        let facing = options.facing_mode.unwrap_or_else(|| target.facing_mode());
        self.target = Some(target);
        strategy
            .start_camera(target, facing, options.surfaces, options.overrides)
            .await
    }

    pub async fn take_photo(&mut self) -> CaptureResult<PhotoResult> {
        let result = match self.strategy.as_mut() {
            Some(strategy) => strategy.take_photo().await,
            None => Err(CaptureError::CaptureNotReady(
                "camera has not been started".into(),
            )),
        };

        match result {
            Ok(photo) => {
                let metadata = self.describe(&photo);
                info!(
                    session = %self.session_id,
                    bytes = metadata.bytes,
                    width = metadata.output_width,
                    height = metadata.output_height,
                    "Photo taken"
                );
                self.events.emit(CaptureEvent::PhotoTaken {
                    data: Arc::from(photo.data.as_slice()),
                    metadata: metadata.clone(),
                });
                Ok(PhotoResult { photo, metadata })
            }
            Err(e) => {
                warn!(session = %self.session_id, error = %e, "Photo capture failed");
                self.events.emit(CaptureEvent::PhotoError {
                    kind: e.kind_name().to_string(),
                    message: e.user_message(),
                });
                Err(e)
            }
        }
    }

    fn describe(&self, photo: &CapturedPhoto) -> PhotoMetadata {
        let env = self.environment();
        PhotoMetadata {
            timestamp: photo.captured_at,
            mode: self.mode.unwrap_or(CaptureMode::Desktop),
            target: self.target.unwrap_or_default(),
            facing_mode: photo.facing_mode,
            mime_type: photo.mime_type.to_string(),
            bytes: photo.len(),
            source_width: photo.source_resolution.0,
            source_height: photo.source_resolution.1,
            output_width: photo.output_resolution.0,
            output_height: photo.output_resolution.1,
            quality: photo.quality,
            passes: photo.passes,
            quality_profile: photo.profile.clone(),
            device_class: env.device_class,
            user_agent: env.user_agent,
            screen_width: env.screen_width,
            screen_height: env.screen_height,
            pixel_ratio: env.pixel_ratio,
        }
    }

    /// Toggle between the front and rear camera
    pub async fn switch_camera(&mut self) -> CaptureResult<SwitchOutcome> {
        let Some(strategy) = self.strategy.as_mut() else {
            return Ok(SwitchOutcome::Unsupported(
                "Camera has not been initialized".into(),
            ));
        };

        match strategy.switch_camera().await {
            Ok(SwitchOutcome::Switched(facing_mode)) => {
                self.events.emit(CaptureEvent::CameraSwitch { facing_mode });
                Ok(SwitchOutcome::Switched(facing_mode))
            }
            Ok(SwitchOutcome::Unsupported(notice)) => {
                info!(session = %self.session_id, %notice, "Camera switch unavailable");
                Ok(SwitchOutcome::Unsupported(notice))
            }
            Err(e) => {
                warn!(session = %self.session_id, error = %e, "Camera switch failed");
                self.events.emit(CaptureEvent::CameraSwitchError {
                    message: e.user_message(),
                });
                Err(e)
            }
        }
    }

    /// Release the camera and leave the session `Stopped`
    ///
    /// `cameraStop` is emitted only when a stream was actually released.
    /// Before initialization there is no session and nothing happens.
    pub fn stop_camera(&mut self) {
        let Some(strategy) = self.strategy.as_mut() else {
            return;
        };
        if strategy.stop_camera() {
            self.events.emit(CaptureEvent::CameraStop);
        }
    }

    pub fn get_status(&self) -> CaptureStatus {
        CaptureStatus {
            session_id: self.session_id,
            initialized: self.strategy.is_some(),
            mode: self.mode,
            capabilities: self.capabilities.clone(),
            strategy: self.strategy.as_ref().map(|s| s.get_status()),
            supports_camera_switch: self.supports_camera_switch(),
        }
    }

    /// Recommended mode, once detection has run
    pub fn get_mode(&self) -> Option<CaptureMode> {
        self.mode
    }

    pub fn supports_camera_switch(&self) -> bool {
        self.mode == Some(CaptureMode::Mobile)
            && self
                .strategy
                .as_ref()
                .is_some_and(|s| s.supports_camera_switch())
    }

    pub fn capabilities(&self) -> Option<&DeviceCapabilityReport> {
        self.capabilities.as_ref()
    }

    pub fn environment(&self) -> EnvironmentInfo {
        EnvironmentInfo::new(&self.host, &self.config)
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CaptureEvent> {
        self.events.subscribe()
    }

    /// Handle that stops the camera from another task
    pub fn stop_handle(&self) -> StopHandle {
        self.stop_handle.clone()
    }

    /// Stop capture and forget the strategy and cached report
    pub fn destroy(&mut self) {
        if self.strategy.is_none() && self.capabilities.is_none() {
            return;
        }
        self.stop_camera();
        self.strategy = None;
        self.capabilities = None;
        self.mode = None;
        self.target = None;
        info!(session = %self.session_id, "Capture manager destroyed");
    }
}

impl Drop for CaptureManager {
    fn drop(&mut self) {
        if let Some(strategy) = self.strategy.as_mut() {
            strategy.stop_camera();
        }
    }
}

/// Managers keyed by session id
#[derive(Default)]
pub struct CaptureRegistry {
    managers: HashMap<Uuid, Arc<Mutex<CaptureManager>>>,
}

impl CaptureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a manager and register it under its session id
    pub fn create(
        &mut self,
        devices: Arc<dyn MediaDevices>,
        host: HostEnvironment,
        config: CaptureConfig,
    ) -> (Uuid, Arc<Mutex<CaptureManager>>) {
        let manager = CaptureManager::new(devices, host, config);
        let id = manager.session_id();
        let manager = Arc::new(Mutex::new(manager));
        self.managers.insert(id, manager.clone());
        (id, manager)
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<Mutex<CaptureManager>>> {
        self.managers.get(id).cloned()
    }

    /// Unregister and destroy; false if the id was unknown
    pub async fn remove(&mut self, id: &Uuid) -> bool {
        match self.managers.remove(id) {
            Some(manager) => {
                manager.lock().await.destroy();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.managers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }

    pub fn session_ids(&self) -> Vec<Uuid> {
        self.managers.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::virtual_camera::{VirtualCameraConfig, VirtualDevices};

    fn desktop_host() -> HostEnvironment {
        HostEnvironment {
            user_agent: "Mozilla/5.0 (X11; Linux x86_64)".into(),
            viewport_width: 1920,
            viewport_height: 1080,
            max_touch_points: 0,
            pixel_ratio: 1.0,
        }
    }

    fn fast_config() -> CaptureConfig {
        CaptureConfig {
            desktop_start_timeout_ms: 500,
            desktop_ready_timeout_ms: 500,
            poll_interval_ms: 5,
            ..CaptureConfig::default()
        }
    }

    #[tokio::test]
    async fn test_no_camera_has_no_strategy() {
        let devices = Arc::new(VirtualDevices::new(VirtualCameraConfig::no_cameras()));
        let mut manager = CaptureManager::new(devices, desktop_host(), fast_config());

        let err = manager.initialize().await.unwrap_err();
        assert!(matches!(err, CaptureError::NoCameraAvailable));
        assert_eq!(manager.get_mode(), Some(CaptureMode::NoCamera));
        assert!(manager.get_status().strategy.is_none());
        assert!(!manager.get_status().initialized);
    }

    #[tokio::test]
    async fn test_detection_is_cached() {
        let devices = Arc::new(VirtualDevices::new(
            VirtualCameraConfig::webcam().with_max_resolution(64, 48),
        ));
        let mut manager = CaptureManager::new(devices.clone(), desktop_host(), fast_config());

        manager.initialize().await.unwrap();
        let probes = devices.attempts().len();
        manager.initialize().await.unwrap();
        assert_eq!(devices.attempts().len(), probes);
        assert_eq!(manager.get_mode(), Some(CaptureMode::Desktop));
        assert!(!manager.supports_camera_switch());
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent() {
        let devices = Arc::new(VirtualDevices::new(
            VirtualCameraConfig::webcam().with_max_resolution(64, 48),
        ));
        let mut manager = CaptureManager::new(devices.clone(), desktop_host(), fast_config());
        manager
            .start_camera(CaptureTarget::Back, StartOptions::default())
            .await
            .unwrap();

        manager.destroy();
        manager.destroy();
        assert_eq!(devices.live_stream_count(), 0);
        assert!(manager.capabilities().is_none());
        assert_eq!(manager.get_mode(), None);
    }

    #[tokio::test]
    async fn test_registry_remove_destroys() {
        let devices = Arc::new(VirtualDevices::new(
            VirtualCameraConfig::webcam().with_max_resolution(64, 48),
        ));
        let mut registry = CaptureRegistry::new();
        let (id, manager) = registry.create(devices.clone(), desktop_host(), fast_config());
        manager
            .lock()
            .await
            .start_camera(CaptureTarget::Front, StartOptions::default())
            .await
            .unwrap();
        assert_eq!(devices.live_stream_count(), 1);

        assert!(registry.get(&id).is_some());
        assert!(registry.remove(&id).await);
        assert!(!registry.remove(&id).await);
        assert!(registry.is_empty());
        assert_eq!(devices.live_stream_count(), 0);
    }
}
