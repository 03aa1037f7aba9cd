// SPDX-License-Identifier: MPL-2.0

//! Processing pipelines for captured frames
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────┐
//! │ Frame buffer │ ──▶ │  Photo Pipeline   │ ──▶ │ JPEG bytes + │
//! │   (RGBA)     │     │  - Tone filter    │     │  metadata    │
//! │              │     │  - Sharpen        │     │              │
//! │              │     │  - Contrast       │     │              │
//! │              │     │  - Encoding       │     │              │
//! └──────────────┘     └───────────────────┘     └──────────────┘
//! ```
//!
//! Heavy work runs on blocking tasks so the preview keeps updating.

pub mod photo;
