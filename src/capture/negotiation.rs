// SPDX-License-Identifier: GPL-3.0-only

//! Tier-by-tier constraint negotiation
//!
//! Tiers are tried in order until one is accepted. Only an overconstrained
//! failure that does not name the facing mode moves on to the next tier; a
//! facing-mode rejection abandons the remaining tiers and restarts from the
//! first tier with the next entry of the facing chain:
//!
//! ```text
//! user        → environment → (any camera)
//! environment → (any camera)
//! ```
//!
//! Permission, missing-device and busy-device failures abort immediately.

use super::tiers::{ConstraintOverrides, ConstraintTier};
use crate::backends::camera::{AcquireError, FacingMode, MediaDevices, MediaStream, TrackSettings};
use crate::errors::CaptureError;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A stream that was accepted, and how it was obtained
#[derive(Clone)]
pub struct NegotiatedStream {
    pub stream: Arc<dyn MediaStream>,
    pub tier: ConstraintTier,
    /// Facing mode that was requested on the successful attempt
    pub requested_facing: Option<FacingMode>,
    /// Facing mode in effect, read back from the stream when reported
    pub facing_mode: FacingMode,
    pub settings: TrackSettings,
    /// Acquisition attempts made, including the successful one
    pub attempts: usize,
}

impl NegotiatedStream {
    /// The request had to drop its facing mode entirely
    pub fn fell_back_to_any(&self) -> bool {
        self.requested_facing.is_none()
    }
}

impl std::fmt::Debug for NegotiatedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NegotiatedStream")
            .field("tier", &self.tier.name)
            .field("requested_facing", &self.requested_facing)
            .field("facing_mode", &self.facing_mode)
            .field("settings", &self.settings)
            .field("attempts", &self.attempts)
            .finish_non_exhaustive()
    }
}

/// Facing modes to try, in order
pub fn facing_chain(requested: FacingMode) -> Vec<Option<FacingMode>> {
    let default = FacingMode::default();
    if requested == default {
        vec![Some(requested), None]
    } else {
        vec![Some(requested), Some(default), None]
    }
}

/// Acquire a stream for `facing`, walking the tier table
///
/// Blocking; each attempt calls straight into the backend.
pub fn negotiate(
    devices: &dyn MediaDevices,
    tiers: &[ConstraintTier],
    facing: FacingMode,
    overrides: &ConstraintOverrides,
) -> Result<NegotiatedStream, CaptureError> {
    if tiers.is_empty() {
        return Err(CaptureError::unavailable("no constraint tiers to try", None));
    }

    let mut attempts = 0;
    let mut last_error: Option<AcquireError> = None;

    'facing: for requested in facing_chain(facing) {
        for tier in tiers {
            let constraints = tier.to_constraints(requested, overrides);
            attempts += 1;
            debug!(attempt = attempts, tier = tier.name, %constraints, "Requesting camera");

            match devices.get_user_media(&constraints) {
                Ok(stream) => {
                    let settings = stream.settings();
                    let facing_mode = settings
                        .facing_mode
                        .or(requested)
                        .unwrap_or_default();
                    info!(
                        tier = tier.name,
                        attempts,
                        width = settings.width,
                        height = settings.height,
                        facing_mode = %facing_mode,
                        "Camera negotiated"
                    );
                    return Ok(NegotiatedStream {
                        stream,
                        tier: *tier,
                        requested_facing: requested,
                        facing_mode,
                        settings,
                        attempts,
                    });
                }
                Err(e) if e.kind.is_facing_mode_rejection() => {
                    warn!(tier = tier.name, error = %e, "Facing mode rejected, falling back");
                    last_error = Some(e);
                    continue 'facing;
                }
                Err(e) if e.kind.is_resolution_rejection() => {
                    debug!(tier = tier.name, error = %e, "Tier rejected, trying next");
                    last_error = Some(e);
                }
                Err(e) => {
                    warn!(tier = tier.name, error = %e, "Camera acquisition failed");
                    return Err(CaptureError::unavailable(e.kind.user_message(), Some(e)));
                }
            }
        }

        // Every tier rejected for a reason other than the facing mode
        return Err(CaptureError::unavailable(
            format!("all {} constraint tiers were rejected", tiers.len()),
            last_error,
        ));
    }

    Err(CaptureError::unavailable(
        "no camera accepted any facing mode",
        last_error,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facing_chain() {
        assert_eq!(
            facing_chain(FacingMode::User),
            vec![Some(FacingMode::User), Some(FacingMode::Environment), None]
        );
        assert_eq!(
            facing_chain(FacingMode::Environment),
            vec![Some(FacingMode::Environment), None]
        );
    }
}
