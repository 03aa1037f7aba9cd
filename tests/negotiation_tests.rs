// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for tier negotiation against the virtual camera

use cardcam::backends::camera::{AcquireError, AcquireErrorKind, FacingMode};
use cardcam::backends::virtual_camera::{
    FacingSupport, VirtualCameraConfig, VirtualDeviceSpec, VirtualDevices,
};
use cardcam::capture::{ConstraintOverrides, DESKTOP_TIERS, MOBILE_TIERS, negotiate};
use cardcam::CaptureError;

fn width_rejection() -> Option<AcquireError> {
    Some(AcquireError::overconstrained("width", "too wide"))
}

#[test]
fn test_tiers_are_tried_in_order() {
    let devices = VirtualDevices::new(
        VirtualCameraConfig::default()
            .with_scripted_failures(vec![width_rejection(), width_rejection()]),
    );

    let negotiated = negotiate(
        &devices,
        &MOBILE_TIERS,
        FacingMode::Environment,
        &ConstraintOverrides::default(),
    )
    .unwrap();

    assert_eq!(negotiated.tier.name, "baseline");
    assert_eq!(negotiated.attempts, 3);
    let widths: Vec<_> = devices.attempts().iter().map(|c| c.width.ideal).collect();
    assert_eq!(widths, vec![Some(3840), Some(2560), Some(1920)]);
    assert!(
        devices
            .attempts()
            .iter()
            .all(|c| c.facing_mode == Some(FacingMode::Environment))
    );
}

#[test]
fn test_frame_rate_floor_falls_through_to_baseline() {
    let devices = VirtualDevices::new(VirtualCameraConfig {
        max_frame_rate: 10.0,
        ..VirtualCameraConfig::default()
    });

    let negotiated = negotiate(
        &devices,
        &MOBILE_TIERS,
        FacingMode::Environment,
        &ConstraintOverrides::default(),
    )
    .unwrap();

    assert_eq!(negotiated.tier.name, "baseline");
    assert_eq!(negotiated.attempts, 3);
    assert_eq!(negotiated.facing_mode, FacingMode::Environment);
}

#[test]
fn test_first_tier_wins_on_capable_hardware() {
    let devices =
        VirtualDevices::new(VirtualCameraConfig::default().with_max_resolution(1920, 1080));
    let negotiated = negotiate(
        &devices,
        &MOBILE_TIERS,
        FacingMode::Environment,
        &ConstraintOverrides::default(),
    )
    .unwrap();

    assert_eq!(negotiated.tier.name, "ultra-high");
    assert_eq!(negotiated.attempts, 1);
    assert_eq!((negotiated.settings.width, negotiated.settings.height), (1920, 1080));
    negotiated.stream.stop();
    assert_eq!(devices.live_stream_count(), 0);
}

#[test]
fn test_user_falls_back_to_environment_then_any() {
    let devices = VirtualDevices::new(VirtualCameraConfig::webcam());

    let negotiated = negotiate(
        &devices,
        &DESKTOP_TIERS,
        FacingMode::User,
        &ConstraintOverrides::default(),
    )
    .unwrap();

    let facing: Vec<_> = devices.attempts().iter().map(|c| c.facing_mode).collect();
    assert_eq!(
        facing,
        vec![Some(FacingMode::User), Some(FacingMode::Environment), None]
    );
    assert!(negotiated.fell_back_to_any());
    // Each facing step restarts from the first tier
    assert_eq!(negotiated.tier.name, "hd");
    // Nothing reported, nothing requested: the default applies
    assert_eq!(negotiated.facing_mode, FacingMode::Environment);
}

#[test]
fn test_missing_front_camera_uses_rear() {
    let devices = VirtualDevices::new(VirtualCameraConfig {
        devices: vec![VirtualDeviceSpec::new(
            "Rear",
            Some(FacingMode::Environment),
        )],
        ..VirtualCameraConfig::default().with_max_resolution(1920, 1080)
    });

    let negotiated = negotiate(
        &devices,
        &MOBILE_TIERS,
        FacingMode::User,
        &ConstraintOverrides::default(),
    )
    .unwrap();

    assert_eq!(negotiated.attempts, 2);
    assert_eq!(negotiated.facing_mode, FacingMode::Environment);
    assert!(!negotiated.fell_back_to_any());
}

#[test]
fn test_ignored_facing_reports_actual_camera() {
    let devices = VirtualDevices::new(
        VirtualCameraConfig::default()
            .with_facing_support(FacingSupport::Ignored)
            .with_max_resolution(1920, 1080),
    );

    let negotiated = negotiate(
        &devices,
        &MOBILE_TIERS,
        FacingMode::User,
        &ConstraintOverrides::default(),
    )
    .unwrap();

    // The first device is the rear camera and its settings say so
    assert_eq!(negotiated.requested_facing, Some(FacingMode::User));
    assert_eq!(negotiated.facing_mode, FacingMode::Environment);
}

#[test]
fn test_permission_denied_aborts_immediately() {
    let devices = VirtualDevices::new(VirtualCameraConfig::default().with_scripted_failures(vec![
        Some(AcquireError::new(AcquireErrorKind::NotAllowed, "denied")),
    ]));

    let err = negotiate(
        &devices,
        &MOBILE_TIERS,
        FacingMode::Environment,
        &ConstraintOverrides::default(),
    )
    .unwrap_err();

    assert_eq!(devices.attempts().len(), 1);
    match err {
        CaptureError::CameraUnavailable { source, .. } => {
            assert_eq!(source.map(|s| s.kind), Some(AcquireErrorKind::NotAllowed));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_exhausted_tiers_do_not_retry_facing() {
    let devices =
        VirtualDevices::new(VirtualCameraConfig::default().with_max_resolution(1000, 700));

    let err = negotiate(
        &devices,
        &MOBILE_TIERS,
        FacingMode::User,
        &ConstraintOverrides::default(),
    )
    .unwrap_err();

    assert!(matches!(err, CaptureError::CameraUnavailable { .. }));
    assert_eq!(devices.attempts().len(), MOBILE_TIERS.len());
}

#[test]
fn test_overrides_reach_the_backend() {
    let devices =
        VirtualDevices::new(VirtualCameraConfig::default().with_max_resolution(1920, 1080));
    let overrides = ConstraintOverrides {
        device_id: Some("virtual:1".into()),
        ..ConstraintOverrides::default()
    };

    let negotiated =
        negotiate(&devices, &MOBILE_TIERS, FacingMode::Environment, &overrides).unwrap();

    assert_eq!(negotiated.settings.device_id, "virtual:1");
    assert_eq!(
        devices.attempts()[0].device_id.as_deref(),
        Some("virtual:1")
    );
}
