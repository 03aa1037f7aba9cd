// SPDX-License-Identifier: GPL-3.0-only

//! Capture strategies
//!
//! A strategy owns exactly one capture session: the live stream, the surfaces
//! it draws on and the session status. The two variants share one session
//! core and differ in their tier table, timeouts, photo tuning and whether
//! the camera can be switched.
//!
//! ```text
//! Idle ──▶ Starting ──▶ Active ──▶ Capturing ──▶ Active ──▶ Stopped
//!   ▲                     │                                    │
//!   └──── Error ◀─────────┴──── (any state) ◀──────────────────┘
//! ```
//!
//! Lifecycle methods take `&mut self`, so a strategy can never have two of
//! them in flight. [`StopHandle`] is the one way to reach into a running
//! call: it releases the device and makes any pending readiness wait fail.

use super::detector::CaptureMode;
use super::negotiation::negotiate;
use super::tiers::{ConstraintOverrides, ConstraintTier, tiers_for};
use crate::backends::camera::{
    CaptureSurfaces, CaptureTarget, FacingMode, MediaDevices, MediaStream, TrackSettings,
};
use crate::config::CaptureConfig;
use crate::errors::{CaptureError, CaptureResult};
use crate::pipelines::photo::{CapturedPhoto, PhotoPipeline, PhotoVariant};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Starting,
    Active,
    Capturing,
    Stopped,
    Error,
}

impl SessionStatus {
    /// States from which `start_camera` may run
    pub fn can_start(&self) -> bool {
        !matches!(self, SessionStatus::Starting | SessionStatus::Capturing)
    }

    pub fn is_live(&self) -> bool {
        matches!(self, SessionStatus::Active | SessionStatus::Capturing)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Starting => "starting",
            SessionStatus::Active => "active",
            SessionStatus::Capturing => "capturing",
            SessionStatus::Stopped => "stopped",
            SessionStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Summary of a successful start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveStream {
    pub tier: String,
    pub settings: TrackSettings,
    pub facing_mode: FacingMode,
}

/// Result of a camera switch request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    Switched(FacingMode),
    /// Nothing was changed; the string is a user-facing notice
    Unsupported(String),
}

impl SwitchOutcome {
    /// Treat an unsupported switch as [`CaptureError::SwitchUnsupported`]
    pub fn into_result(self) -> CaptureResult<FacingMode> {
        match self {
            SwitchOutcome::Switched(facing_mode) => Ok(facing_mode),
            SwitchOutcome::Unsupported(notice) => Err(CaptureError::SwitchUnsupported(notice)),
        }
    }
}

/// Strategy state visible to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyStatus {
    pub status: SessionStatus,
    pub is_active: bool,
    pub has_stream: bool,
    pub facing_mode: FacingMode,
    pub target: Option<CaptureTarget>,
    pub tier: Option<String>,
    pub settings: Option<TrackSettings>,
    pub supports_camera_switch: bool,
}

type StreamSlot = Arc<Mutex<Option<Arc<dyn MediaStream>>>>;

/// Cross-task handle that tears down the active session
#[derive(Clone)]
pub struct StopHandle {
    signal: Arc<AtomicBool>,
    stream: StreamSlot,
}

impl Default for StopHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl StopHandle {
    pub fn new() -> Self {
        Self {
            signal: Arc::new(AtomicBool::new(false)),
            stream: Arc::new(Mutex::new(None)),
        }
    }

    /// Release the device; a pending wait fails on its next poll
    pub fn stop(&self) {
        self.signal.store(true, Ordering::SeqCst);
        let stream = self.stream.lock().ok().and_then(|mut slot| slot.take());
        if let Some(stream) = stream {
            stream.stop();
            info!("Capture stopped from stop handle");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.signal.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.signal.store(false, Ordering::SeqCst);
    }

    fn publish(&self, stream: Option<Arc<dyn MediaStream>>) {
        if let Ok(mut slot) = self.stream.lock() {
            *slot = stream;
        }
    }
}

impl std::fmt::Debug for StopHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopHandle")
            .field("stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}

/// Why a readiness wait ended without a frame
enum WaitFailure {
    TimedOut(Duration),
    Stopped,
    Ended,
}

/// Mutable state of one capture session
#[derive(Default)]
struct CaptureSession {
    status: SessionStatus,
    stream: Option<Arc<dyn MediaStream>>,
    facing_mode: FacingMode,
    surfaces: Option<CaptureSurfaces>,
    target: Option<CaptureTarget>,
    tier: Option<ConstraintTier>,
    settings: Option<TrackSettings>,
}

/// Shared machinery of both strategy variants
struct SessionCore {
    mode: CaptureMode,
    devices: Arc<dyn MediaDevices>,
    config: CaptureConfig,
    pipeline: PhotoPipeline,
    session: CaptureSession,
    supports_facing_mode: bool,
    overrides: ConstraintOverrides,
    stop_handle: StopHandle,
}

impl SessionCore {
    fn new(
        mode: CaptureMode,
        devices: Arc<dyn MediaDevices>,
        config: CaptureConfig,
        supports_facing_mode: bool,
    ) -> Self {
        let variant = match mode {
            CaptureMode::Mobile => PhotoVariant::Mobile,
            _ => PhotoVariant::Desktop,
        };
        Self {
            mode,
            devices,
            pipeline: PhotoPipeline::new(variant, config.clone()),
            config,
            session: CaptureSession::default(),
            supports_facing_mode,
            overrides: ConstraintOverrides::default(),
            stop_handle: StopHandle::new(),
        }
    }

    /// Session status as seen from outside; a fired stop handle wins
    fn current_status(&self) -> SessionStatus {
        let status = self.session.status;
        if self.stop_handle.is_stopped()
            && (status.is_live() || status == SessionStatus::Starting)
        {
            SessionStatus::Stopped
        } else {
            status
        }
    }

    /// Finish a teardown started through the stop handle
    fn settle_stop(&mut self) {
        if self.current_status() != self.session.status {
            self.stop();
        }
    }

    fn status(&self) -> StrategyStatus {
        let s = &self.session;
        let status = self.current_status();
        StrategyStatus {
            status,
            is_active: status.is_live(),
            has_stream: s.stream.is_some(),
            facing_mode: s.facing_mode,
            target: s.target,
            tier: s.tier.map(|t| t.name.to_string()),
            settings: s.settings.clone(),
            supports_camera_switch: self.can_switch(),
        }
    }

    fn can_switch(&self) -> bool {
        self.mode == CaptureMode::Mobile && self.supports_facing_mode
    }

    fn set_status(&mut self, status: SessionStatus) {
        if self.session.status != status {
            debug!(from = %self.session.status, to = %status, "Session status");
            self.session.status = status;
        }
    }

    async fn start(
        &mut self,
        target: CaptureTarget,
        facing: FacingMode,
        surfaces: CaptureSurfaces,
        overrides: ConstraintOverrides,
    ) -> CaptureResult<ActiveStream> {
        if self.session.status.is_live() {
            info!("Restarting active session");
            self.stop();
        }

        self.stop_handle.reset();
        self.set_status(SessionStatus::Starting);
        self.session.target = Some(target);
        self.session.surfaces = Some(surfaces.clone());
        self.overrides = overrides.clone();

        info!(mode = %self.mode, %target, facing_mode = %facing, "Starting camera");

        let devices = self.devices.clone();
        let tiers = tiers_for(self.mode);
        let negotiated = tokio::task::spawn_blocking(move || {
            negotiate(devices.as_ref(), tiers, facing, &overrides)
        })
        .await
        .map_err(|e| CaptureError::unavailable(format!("negotiation task failed: {}", e), None))
        .and_then(|r| r);

        let negotiated = match negotiated {
            Ok(negotiated) => negotiated,
            Err(e) => {
                self.set_status(SessionStatus::Error);
                return Err(e);
            }
        };

        if negotiated.fell_back_to_any() && self.supports_facing_mode {
            warn!("Camera only accepts unconstrained requests, disabling camera switch");
            self.supports_facing_mode = false;
        }

        self.session.stream = Some(negotiated.stream.clone());
        self.session.facing_mode = negotiated.facing_mode;
        self.session.tier = Some(negotiated.tier);
        self.session.settings = Some(negotiated.settings.clone());
        self.stop_handle.publish(Some(negotiated.stream.clone()));

        if self.stop_handle.is_stopped() {
            self.stop();
            return Err(CaptureError::unavailable("camera was stopped during start", None));
        }

        surfaces.display.attach(Some(negotiated.stream.clone()));

        let timeout = self.config.start_timeout(self.mode);
        match self.wait_for_frame(&surfaces, timeout).await {
            Ok(()) => {}
            Err(WaitFailure::TimedOut(waited)) => {
                warn!(waited_ms = waited.as_millis() as u64, "Camera never delivered a frame");
                self.release();
                self.set_status(SessionStatus::Error);
                return Err(CaptureError::CameraInitTimeout {
                    waited_ms: waited.as_millis() as u64,
                });
            }
            Err(WaitFailure::Stopped) => {
                self.stop();
                return Err(CaptureError::unavailable("camera was stopped during start", None));
            }
            Err(WaitFailure::Ended) => {
                self.release();
                self.set_status(SessionStatus::Error);
                return Err(CaptureError::unavailable("camera stream ended during start", None));
            }
        }

        self.set_status(SessionStatus::Active);
        info!(
            tier = negotiated.tier.name,
            width = negotiated.settings.width,
            height = negotiated.settings.height,
            facing_mode = %negotiated.facing_mode,
            "Camera active"
        );

        Ok(ActiveStream {
            tier: negotiated.tier.name.to_string(),
            settings: negotiated.settings,
            facing_mode: negotiated.facing_mode,
        })
    }

    /// Poll the display surface until it reports a ready frame
    async fn wait_for_frame(
        &self,
        surfaces: &CaptureSurfaces,
        timeout: Duration,
    ) -> Result<(), WaitFailure> {
        let started = Instant::now();
        let poll = self.config.poll_interval();
        loop {
            if self.stop_handle.is_stopped() {
                return Err(WaitFailure::Stopped);
            }
            let state = surfaces.display.frame_state();
            if state.is_ready() {
                debug!(
                    waited_ms = started.elapsed().as_millis() as u64,
                    width = state.width,
                    height = state.height,
                    "Frame ready"
                );
                return Ok(());
            }
            if state.ended {
                // A stop handle ends the stream before the next poll sees the flag
                return Err(if self.stop_handle.is_stopped() {
                    WaitFailure::Stopped
                } else {
                    WaitFailure::Ended
                });
            }
            if started.elapsed() >= timeout {
                return Err(WaitFailure::TimedOut(started.elapsed()));
            }
            tokio::time::sleep(poll).await;
        }
    }

    async fn take_photo(&mut self) -> CaptureResult<CapturedPhoto> {
        self.settle_stop();
        if self.session.status != SessionStatus::Active {
            return Err(CaptureError::CaptureNotReady(format!(
                "camera is {}",
                self.session.status
            )));
        }
        let Some(surfaces) = self.session.surfaces.clone() else {
            return Err(CaptureError::CaptureNotReady("no surfaces bound".into()));
        };

        self.set_status(SessionStatus::Capturing);
        let result = self.capture(&surfaces).await;

        if self.stop_handle.is_stopped() {
            self.stop();
        } else if self.session.stream.as_ref().is_some_and(|s| !s.is_live()) {
            self.release();
            self.set_status(SessionStatus::Error);
        } else {
            self.set_status(SessionStatus::Active);
        }
        result
    }

    async fn capture(&mut self, surfaces: &CaptureSurfaces) -> CaptureResult<CapturedPhoto> {
        if self.mode == CaptureMode::Mobile {
            let settle = self.config.settle_delay();
            if !settle.is_zero() {
                debug!(settle_ms = settle.as_millis() as u64, "Settling before capture");
                tokio::time::sleep(settle).await;
            }
        }

        let timeout = self.config.ready_timeout(self.mode);
        self.wait_for_frame(surfaces, timeout)
            .await
            .map_err(|failure| match failure {
                WaitFailure::TimedOut(waited) => CaptureError::CaptureNotReady(format!(
                    "no ready frame after {}ms",
                    waited.as_millis()
                )),
                WaitFailure::Stopped => {
                    CaptureError::CaptureNotReady("camera was stopped".into())
                }
                WaitFailure::Ended => CaptureError::CaptureNotReady("camera stream ended".into()),
            })?;

        let frame = surfaces
            .display
            .current_frame()
            .ok_or_else(|| CaptureError::CaptureNotReady("display has no frame".into()))?;
        let source = (frame.width, frame.height);

        let image = {
            let mut buffer = surfaces
                .frame_buffer
                .lock()
                .map_err(|_| CaptureError::EncodeFailed("frame buffer lock poisoned".into()))?;
            buffer.draw_frame(&frame).map_err(CaptureError::EncodeFailed)?;
            if let Some(max) = self.config.max_output_dimension {
                buffer.fit_within(max, self.config.smooth_downscale);
            }
            buffer
                .to_image()
                .ok_or_else(|| CaptureError::EncodeFailed("frame buffer is empty".into()))?
        };

        debug!(
            width = source.0,
            height = source.1,
            buffer_width = image.width(),
            buffer_height = image.height(),
            "Frame drawn"
        );

        self.pipeline
            .process(image, source, self.session.facing_mode)
            .await
            .map_err(CaptureError::EncodeFailed)
    }

    /// Toggle the facing mode and restart with the same target
    ///
    /// A restart that lands on the same facing mode means there is no
    /// second camera; switching is disabled from then on.
    async fn switch(&mut self) -> CaptureResult<SwitchOutcome> {
        self.settle_stop();
        if !self.can_switch() {
            return Ok(SwitchOutcome::Unsupported(
                "This device does not support switching cameras".into(),
            ));
        }
        let (Some(target), Some(surfaces)) =
            (self.session.target, self.session.surfaces.clone())
        else {
            return Err(CaptureError::CaptureNotReady("camera has not been started".into()));
        };

        let previous = self.session.facing_mode;
        let next = previous.toggled();
        info!(from = %previous, to = %next, "Switching camera");
        self.stop();

        let overrides = self.overrides.clone();
        let active = self.start(target, next, surfaces, overrides).await?;
        if active.facing_mode == previous {
            warn!(facing_mode = %previous, "Camera switch reopened the same camera");
            self.supports_facing_mode = false;
            return Ok(SwitchOutcome::Unsupported("No second camera is available".into()));
        }
        Ok(SwitchOutcome::Switched(active.facing_mode))
    }

    /// Stop and detach the stream, keeping the status untouched
    fn release(&mut self) {
        if let Some(stream) = self.session.stream.take() {
            stream.stop();
        }
        self.stop_handle.publish(None);
        if let Some(surfaces) = &self.session.surfaces {
            surfaces.display.attach(None);
        }
    }

    /// Returns whether a stream was released
    fn stop(&mut self) -> bool {
        let had_stream = self.session.stream.is_some();
        self.release();
        self.set_status(SessionStatus::Stopped);
        if had_stream {
            info!("Camera stopped");
        }
        had_stream
    }
}

/// Webcam-oriented strategy: short timeouts, fixed quality, no switching
pub struct DesktopStrategy {
    core: SessionCore,
}

impl DesktopStrategy {
    pub fn new(devices: Arc<dyn MediaDevices>, config: CaptureConfig) -> Self {
        Self {
            core: SessionCore::new(CaptureMode::Desktop, devices, config, false),
        }
    }
}

/// Phone/tablet strategy: tiered 4K→1080p negotiation, settle delay,
/// adaptive encoding and front/back switching
pub struct MobileStrategy {
    core: SessionCore,
}

impl MobileStrategy {
    pub fn new(
        devices: Arc<dyn MediaDevices>,
        config: CaptureConfig,
        supports_facing_mode: bool,
    ) -> Self {
        Self {
            core: SessionCore::new(CaptureMode::Mobile, devices, config, supports_facing_mode),
        }
    }
}

/// The strategy selected at initialization
pub enum CaptureStrategy {
    Desktop(DesktopStrategy),
    Mobile(MobileStrategy),
}

impl CaptureStrategy {
    /// Build the strategy for a recommended mode; `None` without a camera
    pub fn for_mode(
        mode: CaptureMode,
        devices: Arc<dyn MediaDevices>,
        config: CaptureConfig,
        supports_facing_mode: bool,
    ) -> Option<Self> {
        match mode {
            CaptureMode::Desktop => Some(Self::Desktop(DesktopStrategy::new(devices, config))),
            CaptureMode::Mobile => Some(Self::Mobile(MobileStrategy::new(
                devices,
                config,
                supports_facing_mode,
            ))),
            CaptureMode::NoCamera => None,
        }
    }

    /// Share `handle` with this strategy so it outlives re-initialization
    pub fn with_stop_handle(mut self, handle: StopHandle) -> Self {
        self.core_mut().stop_handle = handle;
        self
    }

    fn core(&self) -> &SessionCore {
        match self {
            CaptureStrategy::Desktop(s) => &s.core,
            CaptureStrategy::Mobile(s) => &s.core,
        }
    }

    fn core_mut(&mut self) -> &mut SessionCore {
        match self {
            CaptureStrategy::Desktop(s) => &mut s.core,
            CaptureStrategy::Mobile(s) => &mut s.core,
        }
    }

    pub fn mode(&self) -> CaptureMode {
        self.core().mode
    }

    /// Negotiate, attach and wait for the first frame
    ///
    /// `facing` is the requested camera; negotiation may fall back and the
    /// returned [`ActiveStream`] reports what was actually obtained.
    pub async fn start_camera(
        &mut self,
        target: CaptureTarget,
        facing: FacingMode,
        surfaces: CaptureSurfaces,
        overrides: ConstraintOverrides,
    ) -> CaptureResult<ActiveStream> {
        self.core_mut()
            .start(target, facing, surfaces, overrides)
            .await
    }

    pub async fn take_photo(&mut self) -> CaptureResult<CapturedPhoto> {
        self.core_mut().take_photo().await
    }

    pub async fn switch_camera(&mut self) -> CaptureResult<SwitchOutcome> {
        match self {
            CaptureStrategy::Desktop(_) => Ok(SwitchOutcome::Unsupported(
                "Camera switching is only available on mobile devices".into(),
            )),
            CaptureStrategy::Mobile(s) => s.core.switch().await,
        }
    }

    /// Always ends in `Stopped`; safe from any state
    ///
    /// Returns `true` when a live stream was released.
    pub fn stop_camera(&mut self) -> bool {
        self.core_mut().stop()
    }

    pub fn get_status(&self) -> StrategyStatus {
        self.core().status()
    }

    pub fn status(&self) -> SessionStatus {
        self.core().current_status()
    }

    pub fn facing_mode(&self) -> FacingMode {
        self.core().session.facing_mode
    }

    pub fn supports_camera_switch(&self) -> bool {
        self.core().can_switch()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.core().stop_handle.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::virtual_camera::{VirtualCameraConfig, VirtualDeviceSpec, VirtualDevices};

    fn fast_config() -> CaptureConfig {
        CaptureConfig {
            mobile_settle_delay_ms: 0,
            desktop_start_timeout_ms: 200,
            mobile_start_timeout_ms: 200,
            desktop_ready_timeout_ms: 200,
            mobile_ready_timeout_ms: 200,
            poll_interval_ms: 5,
            ..CaptureConfig::default()
        }
    }

    fn devices(config: VirtualCameraConfig) -> Arc<VirtualDevices> {
        Arc::new(VirtualDevices::new(config))
    }

    #[tokio::test]
    async fn test_take_photo_requires_active() {
        let mut strategy = CaptureStrategy::for_mode(
            CaptureMode::Desktop,
            devices(VirtualCameraConfig::webcam().with_max_resolution(64, 48)),
            fast_config(),
            false,
        )
        .unwrap();
        let err = strategy.take_photo().await.unwrap_err();
        assert!(matches!(err, CaptureError::CaptureNotReady(_)));
        assert_eq!(strategy.status(), SessionStatus::Idle);
    }

    #[tokio::test]
    async fn test_start_from_active_restarts() {
        let virt = devices(VirtualCameraConfig::webcam().with_max_resolution(64, 48));
        let mut strategy =
            CaptureStrategy::for_mode(CaptureMode::Desktop, virt.clone(), fast_config(), false)
                .unwrap();
        let surfaces = CaptureSurfaces::default();

        strategy
            .start_camera(
                CaptureTarget::Front,
                FacingMode::Environment,
                surfaces.clone(),
                ConstraintOverrides::default(),
            )
            .await
            .unwrap();
        strategy
            .start_camera(
                CaptureTarget::Back,
                FacingMode::Environment,
                surfaces,
                ConstraintOverrides::default(),
            )
            .await
            .unwrap();

        assert_eq!(strategy.status(), SessionStatus::Active);
        assert_eq!(virt.live_stream_count(), 1);
        assert_eq!(virt.acquired_count(), 2);
    }

    #[tokio::test]
    async fn test_init_timeout_releases_stream() {
        let virt = devices(VirtualCameraConfig {
            never_ready: true,
            ..VirtualCameraConfig::webcam().with_max_resolution(64, 48)
        });
        let mut strategy =
            CaptureStrategy::for_mode(CaptureMode::Desktop, virt.clone(), fast_config(), false)
                .unwrap();

        let err = strategy
            .start_camera(
                CaptureTarget::Back,
                FacingMode::Environment,
                CaptureSurfaces::default(),
                ConstraintOverrides::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CaptureError::CameraInitTimeout { .. }));
        assert_eq!(strategy.status(), SessionStatus::Error);
        assert_eq!(virt.live_stream_count(), 0);
    }

    #[tokio::test]
    async fn test_desktop_switch_is_unsupported() {
        let mut strategy = CaptureStrategy::for_mode(
            CaptureMode::Desktop,
            devices(VirtualCameraConfig::default()),
            fast_config(),
            true,
        )
        .unwrap();
        assert!(!strategy.supports_camera_switch());
        let err = strategy.switch_camera().await.unwrap().into_result().unwrap_err();
        assert!(matches!(err, CaptureError::SwitchUnsupported(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_stop_from_idle() {
        let virt = devices(VirtualCameraConfig::webcam());
        let mut strategy =
            CaptureStrategy::for_mode(CaptureMode::Desktop, virt.clone(), fast_config(), false)
                .unwrap();
        assert_eq!(strategy.status(), SessionStatus::Idle);

        assert!(!strategy.stop_camera());
        assert!(!strategy.stop_camera());
        assert_eq!(strategy.status(), SessionStatus::Stopped);
        assert!(!strategy.get_status().has_stream);
        assert_eq!(virt.acquired_count(), 0);
    }

    #[tokio::test]
    async fn test_stop_handle_marks_session_stopped() {
        let virt = devices(VirtualCameraConfig::webcam().with_max_resolution(64, 48));
        let mut strategy =
            CaptureStrategy::for_mode(CaptureMode::Desktop, virt.clone(), fast_config(), false)
                .unwrap();
        strategy
            .start_camera(
                CaptureTarget::Back,
                FacingMode::Environment,
                CaptureSurfaces::default(),
                ConstraintOverrides::default(),
            )
            .await
            .unwrap();

        strategy.stop_handle().stop();
        assert_eq!(strategy.status(), SessionStatus::Stopped);
        assert!(!strategy.get_status().is_active);
        assert_eq!(virt.live_stream_count(), 0);
    }

    #[tokio::test]
    async fn test_switch_to_same_camera_disables_switching() {
        // Two rear cameras and no front one
        let virt = devices(VirtualCameraConfig {
            devices: vec![
                VirtualDeviceSpec::new("Wide", Some(FacingMode::Environment)),
                VirtualDeviceSpec::new("Tele", Some(FacingMode::Environment)),
            ],
            ..VirtualCameraConfig::default().with_max_resolution(1920, 1080)
        });
        let mut strategy =
            CaptureStrategy::for_mode(CaptureMode::Mobile, virt.clone(), fast_config(), true)
                .unwrap();
        strategy
            .start_camera(
                CaptureTarget::Back,
                FacingMode::Environment,
                CaptureSurfaces::default(),
                ConstraintOverrides::default(),
            )
            .await
            .unwrap();
        assert!(strategy.supports_camera_switch());

        let outcome = strategy.switch_camera().await.unwrap();
        assert!(matches!(outcome, SwitchOutcome::Unsupported(_)));
        assert_eq!(strategy.facing_mode(), FacingMode::Environment);
        assert_eq!(strategy.status(), SessionStatus::Active);
        assert!(!strategy.supports_camera_switch());

        // Later requests do not touch the device
        let acquired = virt.acquired_count();
        assert!(matches!(
            strategy.switch_camera().await.unwrap(),
            SwitchOutcome::Unsupported(_)
        ));
        assert_eq!(virt.acquired_count(), acquired);
    }

    #[test]
    fn test_no_camera_has_no_strategy() {
        assert!(
            CaptureStrategy::for_mode(
                CaptureMode::NoCamera,
                devices(VirtualCameraConfig::no_cameras()),
                fast_config(),
                false
            )
            .is_none()
        );
    }
}
