// SPDX-License-Identifier: GPL-3.0-only

//! Scripted in-process camera backend
//!
//! `VirtualDevices` behaves like a media runtime with a configurable set of
//! cameras. It honors `min` bounds against a maximum resolution, can accept,
//! reject or ignore facing-mode requests, replays scripted failures and keeps
//! a log of every constraint set it was asked for. The CLI uses it when no
//! hardware is wanted and the integration tests drive every negotiation path
//! through it.

mod file_source;

pub use file_source::FrameSource;

use crate::backends::camera::types::*;
use crate::backends::camera::{MediaDevices, MediaStream};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// How the virtual runtime treats a facing-mode constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacingSupport {
    /// Pick the device facing the requested way, reject if there is none
    #[default]
    Honored,
    /// Reject every request carrying a facing mode
    RejectExplicit,
    /// Accept the constraint but hand out the first device anyway
    Ignored,
}

/// One simulated camera
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualDeviceSpec {
    /// May be empty, as with an unlabeled device before permission is granted
    pub label: String,
    pub facing_mode: Option<FacingMode>,
}

impl VirtualDeviceSpec {
    pub fn new(label: impl Into<String>, facing_mode: Option<FacingMode>) -> Self {
        Self {
            label: label.into(),
            facing_mode,
        }
    }
}

/// Behaviour of a [`VirtualDevices`] runtime
#[derive(Debug, Clone)]
pub struct VirtualCameraConfig {
    pub devices: Vec<VirtualDeviceSpec>,
    pub max_width: u32,
    pub max_height: u32,
    pub max_frame_rate: f64,
    pub facing_support: FacingSupport,
    /// Whether settings report the facing mode of the device
    pub reports_facing_mode: bool,
    pub source: FrameSource,
    /// Time from acquisition until the first frame is available
    pub ready_delay: Duration,
    /// A stream that never produces a frame
    pub never_ready: bool,
    /// Fail enumeration outright
    pub enumerate_error: Option<String>,
    /// Consumed one per acquisition attempt; `None` lets the attempt proceed
    pub scripted_failures: Vec<Option<AcquireError>>,
}

impl Default for VirtualCameraConfig {
    /// A phone: rear and front camera, 4K sensor, facing modes honored
    fn default() -> Self {
        Self {
            devices: vec![
                VirtualDeviceSpec::new("Virtual Back Camera", Some(FacingMode::Environment)),
                VirtualDeviceSpec::new("Virtual Front Camera", Some(FacingMode::User)),
            ],
            max_width: 3840,
            max_height: 2160,
            max_frame_rate: 30.0,
            facing_support: FacingSupport::Honored,
            reports_facing_mode: true,
            source: FrameSource::Pattern,
            ready_delay: Duration::ZERO,
            never_ready: false,
            enumerate_error: None,
            scripted_failures: Vec::new(),
        }
    }
}

impl VirtualCameraConfig {
    /// A laptop webcam: one device, 1080p, no facing-mode support
    pub fn webcam() -> Self {
        Self {
            devices: vec![VirtualDeviceSpec::new("Virtual Webcam", None)],
            max_width: 1920,
            max_height: 1080,
            facing_support: FacingSupport::RejectExplicit,
            reports_facing_mode: false,
            ..Self::default()
        }
    }

    /// A runtime with no video inputs
    pub fn no_cameras() -> Self {
        Self {
            devices: Vec::new(),
            ..Self::default()
        }
    }

    pub fn with_max_resolution(mut self, width: u32, height: u32) -> Self {
        self.max_width = width;
        self.max_height = height;
        self
    }

    pub fn with_facing_support(mut self, support: FacingSupport) -> Self {
        self.facing_support = support;
        self
    }

    pub fn with_source(mut self, source: FrameSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_ready_delay(mut self, delay: Duration) -> Self {
        self.ready_delay = delay;
        self
    }

    pub fn with_scripted_failures(mut self, failures: Vec<Option<AcquireError>>) -> Self {
        self.scripted_failures = failures;
        self
    }
}

/// In-process [`MediaDevices`] implementation
pub struct VirtualDevices {
    config: VirtualCameraConfig,
    failures: Mutex<VecDeque<Option<AcquireError>>>,
    attempts: Mutex<Vec<VideoConstraints>>,
    live_streams: Arc<AtomicUsize>,
    acquired: AtomicUsize,
}

impl VirtualDevices {
    pub fn new(config: VirtualCameraConfig) -> Self {
        let failures = config.scripted_failures.iter().cloned().collect();
        Self {
            config,
            failures: Mutex::new(failures),
            attempts: Mutex::new(Vec::new()),
            live_streams: Arc::new(AtomicUsize::new(0)),
            acquired: AtomicUsize::new(0),
        }
    }

    /// Every constraint set passed to `get_user_media`, oldest first
    pub fn attempts(&self) -> Vec<VideoConstraints> {
        self.attempts
            .lock()
            .map(|a| a.clone())
            .unwrap_or_default()
    }

    pub fn clear_attempts(&self) {
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.clear();
        }
    }

    /// Streams handed out and not yet stopped
    pub fn live_stream_count(&self) -> usize {
        self.live_streams.load(Ordering::SeqCst)
    }

    /// Streams handed out in total
    pub fn acquired_count(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &VirtualCameraConfig {
        &self.config
    }

    fn pick_device(
        &self,
        constraints: &VideoConstraints,
    ) -> Result<&VirtualDeviceSpec, AcquireError> {
        let devices = &self.config.devices;
        if devices.is_empty() {
            return Err(AcquireError::new(
                AcquireErrorKind::NotFound,
                "Requested device not found",
            ));
        }

        if let Some(id) = constraints.device_id.as_deref() {
            return devices
                .iter()
                .enumerate()
                .find(|(i, _)| device_id(*i) == id)
                .map(|(_, d)| d)
                .ok_or_else(|| {
                    AcquireError::overconstrained("deviceId", format!("unknown device {}", id))
                });
        }

        match (constraints.facing_mode, self.config.facing_support) {
            (None, _) | (Some(_), FacingSupport::Ignored) => Ok(&devices[0]),
            (Some(mode), FacingSupport::RejectExplicit) => Err(AcquireError::overconstrained(
                "facingMode",
                format!("facing mode {} is not supported", mode),
            )),
            (Some(mode), FacingSupport::Honored) => devices
                .iter()
                .find(|d| d.facing_mode == Some(mode))
                .ok_or_else(|| {
                    AcquireError::overconstrained("facingMode", format!("no {} camera", mode))
                }),
        }
    }

    fn check_limits(&self, constraints: &VideoConstraints) -> Result<(), AcquireError> {
        let cfg = &self.config;
        if constraints.width.min.is_some_and(|min| min > cfg.max_width) {
            return Err(AcquireError::overconstrained(
                "width",
                format!("maximum width is {}", cfg.max_width),
            ));
        }
        if constraints.height.min.is_some_and(|min| min > cfg.max_height) {
            return Err(AcquireError::overconstrained(
                "height",
                format!("maximum height is {}", cfg.max_height),
            ));
        }
        if constraints
            .frame_rate
            .min
            .is_some_and(|min| min > cfg.max_frame_rate)
        {
            return Err(AcquireError::overconstrained(
                "frameRate",
                format!("maximum frame rate is {}", cfg.max_frame_rate),
            ));
        }
        Ok(())
    }

    /// Resolution the simulated driver settles on
    fn resolve_size(&self, constraints: &VideoConstraints) -> (u32, u32) {
        let cfg = &self.config;
        let (default_w, default_h) = cfg
            .source
            .native_size()
            .unwrap_or((cfg.max_width, cfg.max_height));
        let width = constraints.width.ideal.unwrap_or(default_w).min(cfg.max_width);
        let height = constraints
            .height
            .ideal
            .unwrap_or(default_h)
            .min(cfg.max_height);
        (width.max(1), height.max(1))
    }
}

fn device_id(index: usize) -> String {
    format!("virtual:{}", index)
}

impl MediaDevices for VirtualDevices {
    fn enumerate_devices(&self) -> BackendResult<Vec<MediaDeviceInfo>> {
        if let Some(msg) = &self.config.enumerate_error {
            return Err(BackendError::NotAvailable(msg.clone()));
        }
        Ok(self
            .config
            .devices
            .iter()
            .enumerate()
            .map(|(i, d)| MediaDeviceInfo {
                device_id: device_id(i),
                label: d.label.clone(),
                group_id: None,
                facing_mode: d.facing_mode,
            })
            .collect())
    }

    fn get_user_media(
        &self,
        constraints: &VideoConstraints,
    ) -> Result<Arc<dyn MediaStream>, AcquireError> {
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.push(constraints.clone());
        }
        debug!(%constraints, "Virtual acquisition attempt");

        let scripted = self
            .failures
            .lock()
            .ok()
            .and_then(|mut failures| failures.pop_front())
            .flatten();
        if let Some(err) = scripted {
            debug!(error = %err, "Scripted acquisition failure");
            return Err(err);
        }

        let device = self.pick_device(constraints)?;
        self.check_limits(constraints)?;

        let (width, height) = self.resolve_size(constraints);
        let frame_rate = Some(
            constraints
                .frame_rate
                .ideal
                .unwrap_or(self.config.max_frame_rate)
                .min(self.config.max_frame_rate),
        );
        let index = self
            .config
            .devices
            .iter()
            .position(|d| d == device)
            .unwrap_or(0);

        let settings = TrackSettings {
            device_id: device_id(index),
            width,
            height,
            frame_rate,
            facing_mode: if self.config.reports_facing_mode {
                device.facing_mode
            } else {
                None
            },
        };
        info!(
            device = %settings.device_id,
            width,
            height,
            "Virtual stream acquired"
        );

        let frame = (!self.config.never_ready).then(|| self.config.source.render(width, height));
        self.live_streams.fetch_add(1, Ordering::SeqCst);
        self.acquired.fetch_add(1, Ordering::SeqCst);

        Ok(Arc::new(VirtualStream {
            settings,
            frame,
            started_at: Instant::now(),
            ready_delay: self.config.ready_delay,
            live: AtomicBool::new(true),
            live_streams: self.live_streams.clone(),
        }))
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::Virtual
    }
}

/// Stream handed out by [`VirtualDevices`]
pub struct VirtualStream {
    settings: TrackSettings,
    frame: Option<CameraFrame>,
    started_at: Instant,
    ready_delay: Duration,
    live: AtomicBool,
    live_streams: Arc<AtomicUsize>,
}

impl MediaStream for VirtualStream {
    fn settings(&self) -> TrackSettings {
        self.settings.clone()
    }

    fn latest_frame(&self) -> Option<CameraFrame> {
        if !self.is_live() || self.started_at.elapsed() < self.ready_delay {
            return None;
        }
        let mut frame = self.frame.clone()?;
        frame.captured_at = Instant::now();
        Some(frame)
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        if self.live.swap(false, Ordering::SeqCst) {
            self.live_streams.fetch_sub(1, Ordering::SeqCst);
            debug!(device = %self.settings.device_id, "Virtual stream stopped");
        }
    }
}

impl Drop for VirtualStream {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> VirtualCameraConfig {
        VirtualCameraConfig::default().with_max_resolution(64, 36)
    }

    #[test]
    fn test_min_above_max_is_overconstrained() {
        let devices = VirtualDevices::new(small());
        let constraints = VideoConstraints {
            width: ConstrainRange::new(128, 100),
            ..VideoConstraints::default()
        };
        let err = devices.get_user_media(&constraints).err().unwrap();
        assert!(err.kind.is_resolution_rejection());
        assert_eq!(devices.attempts().len(), 1);
        assert_eq!(devices.live_stream_count(), 0);
    }

    #[test]
    fn test_ideal_is_clamped_to_max() {
        let devices = VirtualDevices::new(small());
        let constraints = VideoConstraints {
            width: ConstrainRange::ideal(3840),
            height: ConstrainRange::ideal(2160),
            ..VideoConstraints::facing(FacingMode::User)
        };
        let stream = devices.get_user_media(&constraints).unwrap();
        let settings = stream.settings();
        assert_eq!((settings.width, settings.height), (64, 36));
        assert_eq!(settings.facing_mode, Some(FacingMode::User));
    }

    #[test]
    fn test_facing_support_modes() {
        let rejecting =
            VirtualDevices::new(VirtualCameraConfig::webcam().with_max_resolution(32, 18));
        let err = rejecting
            .get_user_media(&VideoConstraints::facing(FacingMode::Environment))
            .err()
            .unwrap();
        assert!(err.kind.is_facing_mode_rejection());
        assert!(
            rejecting
                .get_user_media(&VideoConstraints::unconstrained())
                .is_ok()
        );

        let ignoring = VirtualDevices::new(
            VirtualCameraConfig::webcam()
                .with_max_resolution(32, 18)
                .with_facing_support(FacingSupport::Ignored),
        );
        assert!(
            ignoring
                .get_user_media(&VideoConstraints::facing(FacingMode::User))
                .is_ok()
        );
    }

    #[test]
    fn test_scripted_failures_are_consumed_in_order() {
        let devices = VirtualDevices::new(small().with_scripted_failures(vec![
            Some(AcquireError::new(AcquireErrorKind::NotReadable, "busy")),
            None,
        ]));
        let first = devices.get_user_media(&VideoConstraints::unconstrained());
        assert_eq!(first.err().unwrap().kind, AcquireErrorKind::NotReadable);
        assert!(devices.get_user_media(&VideoConstraints::unconstrained()).is_ok());
    }

    #[test]
    fn test_stream_stop_is_idempotent() {
        let devices = VirtualDevices::new(small());
        let stream = devices
            .get_user_media(&VideoConstraints::unconstrained())
            .unwrap();
        assert_eq!(devices.live_stream_count(), 1);
        assert!(stream.latest_frame().is_some());

        stream.stop();
        stream.stop();
        assert_eq!(devices.live_stream_count(), 0);
        assert!(stream.latest_frame().is_none());
    }

    #[test]
    fn test_ready_delay_holds_back_frames() {
        let devices = VirtualDevices::new(small().with_ready_delay(Duration::from_secs(60)));
        let stream = devices
            .get_user_media(&VideoConstraints::unconstrained())
            .unwrap();
        assert!(stream.is_live());
        assert!(stream.latest_frame().is_none());
    }

    #[test]
    fn test_no_cameras() {
        let devices = VirtualDevices::new(VirtualCameraConfig::no_cameras());
        assert!(devices.enumerate_devices().unwrap().is_empty());
        let err = devices
            .get_user_media(&VideoConstraints::unconstrained())
            .err()
            .unwrap();
        assert_eq!(err.kind, AcquireErrorKind::NotFound);
    }
}
