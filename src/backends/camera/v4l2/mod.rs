// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 media backend
//!
//! Enumerates `/dev/video*` capture nodes and turns constraint requests into
//! concrete V4L2 formats. V4L2 has no notion of facing mode, so the mounting
//! direction is inferred from the card name; a facing-mode request that no
//! device can be matched against is reported as overconstrained, which lets
//! the negotiation layer fall back to an unconstrained request.

mod stream;

pub use stream::V4l2Stream;

use super::MediaStream;
use super::types::*;
use crate::constants::V4L2_BUFFER_COUNT;
use std::sync::Arc;
use tracing::{debug, info, warn};
use v4l::FourCC;
use v4l::prelude::*;
use v4l::video::Capture;

/// Formats we can decode, in order of preference
const PREFERRED_FOURCCS: [&[u8; 4]; 3] = [b"MJPG", b"YUYV", b"RGB3"];

/// One enumerated capture node
#[derive(Debug, Clone)]
struct V4l2Node {
    path: String,
    card: String,
    bus: String,
    facing_mode: Option<FacingMode>,
}

/// A frame size a device offers for a given pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SizeCandidate {
    fourcc: [u8; 4],
    width: u32,
    height: u32,
}

/// V4L2 implementation of [`super::MediaDevices`]
#[derive(Debug, Default)]
pub struct V4l2Devices;

impl V4l2Devices {
    pub fn new() -> Self {
        Self
    }

    /// Scan /dev for video capture nodes
    fn scan_nodes() -> Vec<V4l2Node> {
        let mut paths: Vec<_> = std::fs::read_dir("/dev")
            .into_iter()
            .flatten()
            .flatten()
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with("video"))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        let mut nodes = Vec::new();
        for path in paths {
            let path_str = path.to_string_lossy().to_string();
            let Ok(dev) = Device::with_path(&path) else {
                continue;
            };
            let Ok(caps) = dev.query_caps() else {
                continue;
            };
            // Metadata nodes share the card name but cannot capture video
            if !caps
                .capabilities
                .contains(v4l::capability::Flags::VIDEO_CAPTURE)
            {
                continue;
            }
            let has_decodable_format = dev
                .enum_formats()
                .map(|formats| {
                    formats
                        .iter()
                        .any(|f| PREFERRED_FOURCCS.iter().any(|cc| f.fourcc == FourCC::new(cc)))
                })
                .unwrap_or(false);
            if !has_decodable_format {
                debug!(path = %path_str, "Skipping node without decodable format");
                continue;
            }

            debug!(
                path = %path_str,
                card = %caps.card,
                driver = %caps.driver,
                "Found capture node"
            );
            nodes.push(V4l2Node {
                path: path_str,
                facing_mode: FacingMode::from_hint(&caps.card),
                card: caps.card,
                bus: caps.bus,
            });
        }
        nodes
    }

    /// Pick the node that should serve a request
    fn select_node(
        nodes: &[V4l2Node],
        constraints: &VideoConstraints,
    ) -> Result<V4l2Node, AcquireError> {
        if nodes.is_empty() {
            return Err(AcquireError::new(
                AcquireErrorKind::NotFound,
                "no V4L2 capture devices",
            ));
        }

        if let Some(id) = constraints.device_id.as_deref() {
            return nodes.iter().find(|n| n.path == id).cloned().ok_or_else(|| {
                AcquireError::overconstrained("deviceId", format!("no device at {}", id))
            });
        }

        match constraints.facing_mode {
            Some(mode) => nodes
                .iter()
                .find(|n| n.facing_mode == Some(mode))
                .cloned()
                .ok_or_else(|| {
                    AcquireError::overconstrained(
                        "facingMode",
                        format!("no {} camera among {} device(s)", mode, nodes.len()),
                    )
                }),
            None => Ok(nodes[0].clone()),
        }
    }

    /// List every frame size the device offers in a decodable format
    fn size_candidates(dev: &Device) -> Vec<SizeCandidate> {
        let mut candidates = Vec::new();
        for cc in PREFERRED_FOURCCS {
            let fourcc = FourCC::new(cc);
            let Ok(sizes) = dev.enum_framesizes(fourcc) else {
                continue;
            };
            for size in sizes {
                match size.size {
                    v4l::framesize::FrameSizeEnum::Discrete(discrete) => {
                        candidates.push(SizeCandidate {
                            fourcc: *cc,
                            width: discrete.width,
                            height: discrete.height,
                        });
                    }
                    v4l::framesize::FrameSizeEnum::Stepwise(step) => {
                        // Offer the bounds plus common card-scanning sizes
                        for (w, h) in [
                            (step.max_width, step.max_height),
                            (3840, 2160),
                            (2560, 1440),
                            (1920, 1080),
                            (1280, 720),
                            (640, 480),
                            (step.min_width, step.min_height),
                        ] {
                            if (step.min_width..=step.max_width).contains(&w)
                                && (step.min_height..=step.max_height).contains(&h)
                            {
                                candidates.push(SizeCandidate {
                                    fourcc: *cc,
                                    width: w,
                                    height: h,
                                });
                            }
                        }
                    }
                }
            }
        }
        candidates
    }

    /// Choose the size closest to the ideal that honors the minimums
    fn choose_size(
        candidates: &[SizeCandidate],
        constraints: &VideoConstraints,
    ) -> Result<SizeCandidate, AcquireError> {
        if candidates.is_empty() {
            return Err(AcquireError::new(
                AcquireErrorKind::NotReadable,
                "device reports no usable frame sizes",
            ));
        }

        let acceptable: Vec<_> = candidates
            .iter()
            .filter(|c| constraints.width.accepts(c.width) && constraints.height.accepts(c.height))
            .collect();

        if acceptable.is_empty() {
            let max_w = candidates.iter().map(|c| c.width).max().unwrap_or(0);
            let culprit = if constraints.width.accepts(max_w) {
                "height"
            } else {
                "width"
            };
            return Err(AcquireError::overconstrained(
                culprit,
                format!(
                    "device maximum is below the requested {}x{} minimum",
                    constraints.width.min.unwrap_or(0),
                    constraints.height.min.unwrap_or(0)
                ),
            ));
        }

        let best = match (constraints.width.ideal, constraints.height.ideal) {
            (Some(iw), Some(ih)) => acceptable.into_iter().min_by_key(|c| {
                let distance = c.width.abs_diff(iw) as u64 + c.height.abs_diff(ih) as u64;
                let format_rank = PREFERRED_FOURCCS
                    .iter()
                    .position(|cc| **cc == c.fourcc)
                    .unwrap_or(PREFERRED_FOURCCS.len());
                (distance, format_rank)
            }),
            _ => acceptable
                .into_iter()
                .max_by_key(|c| c.width as u64 * c.height as u64),
        };

        best.copied().ok_or_else(|| {
            AcquireError::new(AcquireErrorKind::Other, "no frame size could be selected")
        })
    }

    /// Highest frame rate offered for a size, if the device reports one
    fn max_frame_rate(dev: &Device, candidate: &SizeCandidate) -> Option<f64> {
        let intervals = dev
            .enum_frameintervals(FourCC::new(&candidate.fourcc), candidate.width, candidate.height)
            .ok()?;
        intervals
            .iter()
            .filter_map(|interval| match interval.interval {
                v4l::frameinterval::FrameIntervalEnum::Discrete(frac) if frac.numerator > 0 => {
                    Some(frac.denominator as f64 / frac.numerator as f64)
                }
                v4l::frameinterval::FrameIntervalEnum::Stepwise(ref step)
                    if step.min.numerator > 0 =>
                {
                    Some(step.min.denominator as f64 / step.min.numerator as f64)
                }
                _ => None,
            })
            .max_by(|a, b| a.total_cmp(b))
    }
}

impl super::MediaDevices for V4l2Devices {
    fn enumerate_devices(&self) -> BackendResult<Vec<MediaDeviceInfo>> {
        let nodes = Self::scan_nodes();
        info!(count = nodes.len(), "Enumerated V4L2 cameras");
        Ok(nodes
            .into_iter()
            .map(|n| MediaDeviceInfo {
                device_id: n.path,
                label: n.card,
                group_id: Some(n.bus),
                facing_mode: n.facing_mode,
            })
            .collect())
    }

    fn get_user_media(
        &self,
        constraints: &VideoConstraints,
    ) -> Result<Arc<dyn MediaStream>, AcquireError> {
        let nodes = Self::scan_nodes();
        let node = Self::select_node(&nodes, constraints)?;

        let dev = Device::with_path(&node.path).map_err(|e| {
            let kind = match e.kind() {
                std::io::ErrorKind::PermissionDenied => AcquireErrorKind::NotAllowed,
                std::io::ErrorKind::NotFound => AcquireErrorKind::NotFound,
                _ => AcquireErrorKind::NotReadable,
            };
            AcquireError::new(kind, format!("failed to open {}: {}", node.path, e))
        })?;

        let candidate = Self::choose_size(&Self::size_candidates(&dev), constraints)?;

        if let Some(min_fps) = constraints.frame_rate.min
            && let Some(max_fps) = Self::max_frame_rate(&dev, &candidate)
            && max_fps < min_fps
        {
            return Err(AcquireError::overconstrained(
                "frameRate",
                format!("{}x{} tops out at {:.1}fps", candidate.width, candidate.height, max_fps),
            ));
        }

        let requested = v4l::Format::new(
            candidate.width,
            candidate.height,
            FourCC::new(&candidate.fourcc),
        );
        let actual = dev.set_format(&requested).map_err(|e| {
            AcquireError::new(AcquireErrorKind::NotReadable, format!("set_format failed: {}", e))
        })?;

        // Drivers may silently substitute; re-check the minimums
        if !constraints.width.accepts(actual.width) || !constraints.height.accepts(actual.height) {
            return Err(AcquireError::overconstrained(
                "width",
                format!("driver substituted {}x{}", actual.width, actual.height),
            ));
        }

        let frame_rate = constraints.frame_rate.ideal.and_then(|ideal| {
            let params = v4l::video::capture::Parameters::with_fps(ideal.round().max(1.0) as u32);
            match dev.set_params(&params) {
                Ok(applied) if applied.interval.numerator > 0 => {
                    Some(applied.interval.denominator as f64 / applied.interval.numerator as f64)
                }
                Ok(_) => None,
                Err(e) => {
                    warn!(error = %e, "Failed to set frame interval, using driver default");
                    None
                }
            }
        });

        info!(
            path = %node.path,
            card = %node.card,
            width = actual.width,
            height = actual.height,
            fourcc = ?actual.fourcc,
            ?frame_rate,
            "V4L2 format negotiated"
        );

        let settings = TrackSettings {
            device_id: node.path.clone(),
            width: actual.width,
            height: actual.height,
            frame_rate,
            facing_mode: node.facing_mode,
        };

        let stream = V4l2Stream::start(dev, actual, settings, V4L2_BUFFER_COUNT)?;
        Ok(Arc::new(stream))
    }

    fn backend_type(&self) -> CameraBackendType {
        CameraBackendType::V4l2
    }
}
