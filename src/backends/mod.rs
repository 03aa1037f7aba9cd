// SPDX-License-Identifier: MPL-2.0

//! Backend abstraction layer for camera access
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               Capture layer                 │
//! └────────────────────┬────────────────────────┘
//!                      │ MediaDevices / MediaStream
//! ┌────────────────────┴────────────────────────┐
//! │  ┌─────────────┐    ┌──────────────────┐    │
//! │  │    V4L2     │    │  Virtual camera  │    │
//! │  │  (Linux)    │    │  (scripted)      │    │
//! │  └─────────────┘    └──────────────────┘    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! - [`camera`]: platform traits, shared types, surfaces and the V4L2 backend
//! - [`virtual_camera`]: in-process runtime for tests, demos and image replay

pub mod camera;
pub mod virtual_camera;
