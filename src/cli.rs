// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for capture operations
//!
//! This module provides command-line functionality for:
//! - Inspecting what the capability detector sees
//! - Listing available cameras
//! - Taking photos through the full capture manager

use crate::HostArgs;
use cardcam::backends::camera::{self, ConstrainRange, MediaDevices};
use cardcam::backends::virtual_camera::{FrameSource, VirtualCameraConfig, VirtualDevices};
use cardcam::capture::{
    CapabilityDetector, CaptureEvent, CaptureManager, CaptureMode, HostEnvironment, StartOptions,
    tiers_for,
};
use cardcam::{CaptureConfig, CaptureTarget};
use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// User agent presented by `--mobile`
const PHONE_USER_AGENT: &str =
    "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 Chrome/120 Mobile Safari/537.36";

/// Build the host description from the config and command-line overrides
fn build_host(args: &HostArgs, config: &CaptureConfig) -> Result<HostEnvironment, String> {
    let mut host = HostEnvironment::from_host(config);
    if args.mobile {
        host.user_agent = PHONE_USER_AGENT.to_string();
        host.viewport_width = 412;
        host.viewport_height = 915;
        host.max_touch_points = 5;
        host.pixel_ratio = 2.625;
    }
    if let Some(ua) = &args.user_agent {
        host.user_agent = ua.clone();
    }
    if let Some(viewport) = &args.viewport {
        let (w, h) = parse_viewport(viewport)?;
        host.viewport_width = w;
        host.viewport_height = h;
    }
    if let Some(touch) = args.touch {
        host.max_touch_points = touch;
    }
    Ok(host)
}

fn parse_viewport(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("viewport '{}' is not WIDTHxHEIGHT", value))?;
    let w = w
        .trim()
        .parse()
        .map_err(|_| format!("invalid viewport width '{}'", w))?;
    let h = h
        .trim()
        .parse()
        .map_err(|_| format!("invalid viewport height '{}'", h))?;
    Ok((w, h))
}

/// Pick the media backend
fn build_devices(
    virtual_camera: bool,
    mobile: bool,
    source: Option<&Path>,
) -> Result<Arc<dyn MediaDevices>, Box<dyn std::error::Error>> {
    if !virtual_camera {
        return Ok(camera::get_backend());
    }
    let mut config = if mobile {
        VirtualCameraConfig::default()
    } else {
        VirtualCameraConfig::webcam()
    };
    if let Some(path) = source {
        config = config.with_source(FrameSource::from_file(path)?);
    }
    Ok(Arc::new(VirtualDevices::new(config)))
}

/// Print the capability report and environment
pub fn detect(args: &HostArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = CaptureConfig::load();
    let host = build_host(args, &config)?;
    let devices = build_devices(args.virtual_camera, args.mobile, None)?;

    let detector = CapabilityDetector::new(devices, host, config);
    let report = detector.detect_blocking();
    let output = serde_json::json!({
        "recommendedMode": report.recommend_mode(),
        "capabilities": report,
        "environment": detector.environment(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// List all available cameras
pub fn list_cameras(virtual_camera: bool) -> Result<(), Box<dyn std::error::Error>> {
    let devices = build_devices(virtual_camera, true, None)?;
    let cameras = devices.enumerate_devices()?;

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras ({}):", devices.backend_type());
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        let label = if camera.label.is_empty() {
            format!("Camera {}", index + 1)
        } else {
            camera.label.clone()
        };
        println!("  [{}] {}", index, label);
        println!("      Id: {}", camera.device_id);
        if let Some(facing) = camera.facing_mode {
            println!("      Facing: {}", facing);
        }
        println!();
    }

    Ok(())
}

fn format_range<T: std::fmt::Display>(range: &ConstrainRange<T>) -> String {
    match (&range.ideal, &range.min) {
        (Some(ideal), Some(min)) => format!("{} (min {})", ideal, min),
        (Some(ideal), None) => format!("{}", ideal),
        (None, Some(min)) => format!(">= {}", min),
        (None, None) => "any".to_string(),
    }
}

/// Print the constraint tiers for each capture mode
pub fn print_tiers() -> Result<(), Box<dyn std::error::Error>> {
    for mode in [CaptureMode::Mobile, CaptureMode::Desktop] {
        println!("{} tiers:", mode);
        for (index, tier) in tiers_for(mode).iter().enumerate() {
            println!(
                "  {}. {:<11} width {:<16} height {:<16} fps {}",
                index + 1,
                tier.name,
                format_range(&tier.width),
                format_range(&tier.height),
                format_range(&tier.frame_rate),
            );
            if let Some(ratio) = tier.aspect_ratio {
                println!("     aspect ratio {:.3}", ratio);
            }
        }
        println!();
    }
    Ok(())
}

/// Take a photo through the capture manager
pub fn take_photo(
    target: CaptureTarget,
    output: Option<PathBuf>,
    source: Option<PathBuf>,
    args: &HostArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = CaptureConfig::load();
    let host = build_host(args, &config)?;
    let devices = build_devices(args.virtual_camera, args.mobile, source.as_deref())?;

    let output_path = resolve_output_path(output, target)?;

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(async {
        let mut manager = CaptureManager::new(devices, host, config);
        let mut events = manager.subscribe();

        println!("Starting camera for the {} side...", target);
        let started = manager.start_camera(target, StartOptions::default()).await;
        let photo = match started {
            Ok(active) => {
                println!(
                    "Camera active: {}x{} ({} tier, {})",
                    active.settings.width, active.settings.height, active.tier, active.facing_mode
                );
                println!("Capturing...");
                manager.take_photo().await
            }
            Err(e) => Err(e),
        };
        manager.destroy();

        while let Ok(event) = events.try_recv() {
            debug!(event = event.name(), "Capture event");
            if let CaptureEvent::CameraError { message, .. }
            | CaptureEvent::PhotoError { message, .. } = &event
            {
                eprintln!("{}", message);
            }
        }
        photo
    })?;

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&output_path, &result.photo.data)?;

    let sidecar = output_path.with_extension("json");
    std::fs::write(&sidecar, serde_json::to_string_pretty(&result.metadata)?)?;

    println!(
        "Photo saved: {} ({} bytes, {}x{}, quality {:.2})",
        output_path.display(),
        result.photo.len(),
        result.metadata.output_width,
        result.metadata.output_height,
        result.metadata.quality
    );
    println!("Metadata: {}", sidecar.display());
    Ok(())
}

/// File path for a new photo; a directory gets a timestamped name
fn resolve_output_path(
    output: Option<PathBuf>,
    target: CaptureTarget,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let filename = format!(
        "card_{}_{}.jpg",
        target,
        Local::now().format("%Y%m%d_%H%M%S")
    );
    Ok(match output {
        Some(path) if path.is_dir() => path.join(filename),
        Some(path) => path,
        None => get_default_photo_dir().join(filename),
    })
}

/// Print version and configuration details
pub fn print_info() -> Result<(), Box<dyn std::error::Error>> {
    println!("cardcam {}", env!("GIT_VERSION"));
    println!("Backend: {}", camera::get_default_backend());
    match CaptureConfig::default_path() {
        Some(path) => {
            let state = if path.exists() { "" } else { " (not created)" };
            println!("Config: {}{}", path.display(), state);
        }
        None => println!("Config: unavailable"),
    }
    println!("Photos: {}", get_default_photo_dir().display());
    Ok(())
}

/// Get the default photo directory
fn get_default_photo_dir() -> PathBuf {
    dirs::picture_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cardcam")
}
