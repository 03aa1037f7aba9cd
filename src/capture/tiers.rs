// SPDX-License-Identifier: GPL-3.0-only

//! Constraint tier table
//!
//! Static, ordered presets per capture mode, most ambitious first. A tier has
//! no facing mode of its own; negotiation fills it in per attempt.

use super::detector::CaptureMode;
use crate::backends::camera::{ConstrainRange, FacingMode, VideoConstraints};
use serde::{Deserialize, Serialize};

/// One resolution/frame-rate preset
///
/// Tiers are shared constants, so the facing mode is not part of the record.
/// [`ConstraintTier::to_constraints`] takes it per attempt and writes it into
/// the resulting [`VideoConstraints`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConstraintTier {
    pub name: &'static str,
    pub width: ConstrainRange<u32>,
    pub height: ConstrainRange<u32>,
    pub frame_rate: ConstrainRange<f64>,
    pub aspect_ratio: Option<f64>,
}

/// Phones and tablets: 4K, then 2K, then 1080p with a 720p floor
pub const MOBILE_TIERS: [ConstraintTier; 3] = [
    ConstraintTier {
        name: "ultra-high",
        width: ConstrainRange::new(3840, 1920),
        height: ConstrainRange::new(2160, 1080),
        frame_rate: ConstrainRange::new(30.0, 15.0),
        aspect_ratio: Some(16.0 / 9.0),
    },
    ConstraintTier {
        name: "high",
        width: ConstrainRange::new(2560, 1280),
        height: ConstrainRange::new(1440, 720),
        frame_rate: ConstrainRange::new(30.0, 15.0),
        aspect_ratio: None,
    },
    ConstraintTier {
        name: "baseline",
        width: ConstrainRange::new(1920, 1280),
        height: ConstrainRange::new(1080, 720),
        frame_rate: ConstrainRange::any(),
        aspect_ratio: None,
    },
];

/// Webcams: ideal-only requests, so they rarely fail
pub const DESKTOP_TIERS: [ConstraintTier; 2] = [
    ConstraintTier {
        name: "hd",
        width: ConstrainRange::ideal(1280),
        height: ConstrainRange::ideal(720),
        frame_rate: ConstrainRange::any(),
        aspect_ratio: None,
    },
    ConstraintTier {
        name: "vga",
        width: ConstrainRange::ideal(640),
        height: ConstrainRange::ideal(480),
        frame_rate: ConstrainRange::any(),
        aspect_ratio: None,
    },
];

/// Tiers for a capture mode; empty without a camera
pub fn tiers_for(mode: CaptureMode) -> &'static [ConstraintTier] {
    match mode {
        CaptureMode::Mobile => &MOBILE_TIERS,
        CaptureMode::Desktop => &DESKTOP_TIERS,
        CaptureMode::NoCamera => &[],
    }
}

/// Caller-supplied constraint values; any field set here wins over the tier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintOverrides {
    pub width: Option<ConstrainRange<u32>>,
    pub height: Option<ConstrainRange<u32>>,
    pub frame_rate: Option<ConstrainRange<f64>>,
    pub aspect_ratio: Option<f64>,
    pub device_id: Option<String>,
}

impl ConstraintOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl ConstraintTier {
    /// Build the request for one attempt
    pub fn to_constraints(
        &self,
        facing_mode: Option<FacingMode>,
        overrides: &ConstraintOverrides,
    ) -> VideoConstraints {
        VideoConstraints {
            facing_mode,
            device_id: overrides.device_id.clone(),
            width: overrides.width.unwrap_or(self.width),
            height: overrides.height.unwrap_or(self.height),
            frame_rate: overrides.frame_rate.unwrap_or(self.frame_rate),
            aspect_ratio: overrides.aspect_ratio.or(self.aspect_ratio),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers_descend_in_ambition() {
        for tiers in [&MOBILE_TIERS[..], &DESKTOP_TIERS[..]] {
            for pair in tiers.windows(2) {
                assert!(pair[0].width.ideal > pair[1].width.ideal);
            }
        }
        assert!(tiers_for(CaptureMode::NoCamera).is_empty());
    }

    #[test]
    fn test_overrides_win() {
        let overrides = ConstraintOverrides {
            width: Some(ConstrainRange::ideal(1000)),
            device_id: Some("cam-2".into()),
            ..ConstraintOverrides::default()
        };
        let c = MOBILE_TIERS[0].to_constraints(Some(FacingMode::User), &overrides);
        assert_eq!(c.width, ConstrainRange::ideal(1000));
        assert_eq!(c.height, ConstrainRange::new(2160, 1080));
        assert_eq!(c.device_id.as_deref(), Some("cam-2"));
        assert_eq!(c.facing_mode, Some(FacingMode::User));
        assert_eq!(c.aspect_ratio, Some(16.0 / 9.0));
    }

    #[test]
    fn test_facing_mode_comes_from_attempt() {
        let none = ConstraintOverrides::default();
        let tier = DESKTOP_TIERS[0];
        assert_eq!(tier.to_constraints(None, &none).facing_mode, None);
        assert_eq!(
            tier.to_constraints(Some(FacingMode::Environment), &none).facing_mode,
            Some(FacingMode::Environment)
        );
    }
}
