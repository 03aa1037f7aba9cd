// SPDX-License-Identifier: GPL-3.0-only

//! Live V4L2 stream
//!
//! Frames are pulled from a memory-mapped stream on a dedicated thread and the
//! most recent one is kept in a shared slot for the display surface to sample.

use crate::backends::camera::MediaStream;
use crate::backends::camera::types::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::{FourCC, Format};

/// Consecutive dequeue failures before the device is considered gone
const MAX_CONSECUTIVE_ERRORS: u32 = 30;

/// How long to wait for the capture thread to map its buffers
const STREAM_START_TIMEOUT: Duration = Duration::from_secs(3);

/// A running V4L2 capture
pub struct V4l2Stream {
    settings: TrackSettings,
    latest_frame: Arc<Mutex<Option<CameraFrame>>>,
    stop_signal: Arc<AtomicBool>,
    live: Arc<AtomicBool>,
    capture_thread: Mutex<Option<JoinHandle<()>>>,
}

impl V4l2Stream {
    /// Start streaming from an already configured device
    pub fn start(
        dev: Device,
        format: Format,
        settings: TrackSettings,
        buffer_count: u32,
    ) -> Result<Self, AcquireError> {
        let latest_frame = Arc::new(Mutex::new(None));
        let stop_signal = Arc::new(AtomicBool::new(false));
        let live = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), String>>(1);

        let thread_frame = latest_frame.clone();
        let thread_stop = stop_signal.clone();
        let thread_live = live.clone();
        let handle = thread::Builder::new()
            .name("v4l2-capture".to_string())
            .spawn(move || {
                capture_loop(
                    dev,
                    format,
                    buffer_count,
                    ready_tx,
                    thread_stop,
                    thread_live.clone(),
                    thread_frame,
                );
                thread_live.store(false, Ordering::SeqCst);
            })
            .map_err(|e| {
                AcquireError::new(
                    AcquireErrorKind::Other,
                    format!("failed to spawn capture thread: {}", e),
                )
            })?;

        match ready_rx.recv_timeout(STREAM_START_TIMEOUT) {
            Ok(Ok(())) => {}
            Ok(Err(msg)) => {
                let _ = handle.join();
                return Err(AcquireError::new(AcquireErrorKind::NotReadable, msg));
            }
            Err(_) => {
                stop_signal.store(true, Ordering::SeqCst);
                return Err(AcquireError::new(
                    AcquireErrorKind::NotReadable,
                    "capture thread did not start streaming",
                ));
            }
        }

        Ok(Self {
            settings,
            latest_frame,
            stop_signal,
            live,
            capture_thread: Mutex::new(Some(handle)),
        })
    }
}

impl MediaStream for V4l2Stream {
    fn settings(&self) -> TrackSettings {
        self.settings.clone()
    }

    fn latest_frame(&self) -> Option<CameraFrame> {
        self.latest_frame.lock().ok()?.clone()
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
        self.live.store(false, Ordering::SeqCst);

        let handle = self
            .capture_thread
            .lock()
            .ok()
            .and_then(|mut guard| guard.take());
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("V4L2 capture thread panicked");
            }
            info!(device = %self.settings.device_id, "V4L2 stream stopped");
        }
        if let Ok(mut guard) = self.latest_frame.lock() {
            *guard = None;
        }
    }
}

impl Drop for V4l2Stream {
    fn drop(&mut self) {
        self.stop();
    }
}

fn capture_loop(
    dev: Device,
    format: Format,
    buffer_count: u32,
    ready: mpsc::SyncSender<Result<(), String>>,
    stop_signal: Arc<AtomicBool>,
    live: Arc<AtomicBool>,
    latest_frame: Arc<Mutex<Option<CameraFrame>>>,
) {
    let mut stream = match Stream::with_buffers(&dev, Type::VideoCapture, buffer_count) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(format!("failed to create stream: {}", e)));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    debug!(
        width = format.width,
        height = format.height,
        fourcc = ?format.fourcc,
        "V4L2 capture loop started"
    );

    let mut consecutive_errors = 0;
    while !stop_signal.load(Ordering::SeqCst) {
        let buf = match stream.next() {
            Ok((buf, _meta)) => buf,
            Err(e) => {
                consecutive_errors += 1;
                warn!(error = %e, consecutive_errors, "Failed to dequeue frame");
                if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                    error!("Camera stopped delivering frames, ending stream");
                    live.store(false, Ordering::SeqCst);
                    break;
                }
                continue;
            }
        };
        consecutive_errors = 0;

        match decode_buffer(buf, &format) {
            Some(frame) => {
                if let Ok(mut guard) = latest_frame.lock() {
                    *guard = Some(frame);
                }
            }
            None => debug!(len = buf.len(), "Dropping undecodable frame"),
        }
    }

    debug!("V4L2 capture loop stopped");
}

/// Turn a raw driver buffer into a [`CameraFrame`]
fn decode_buffer(buf: &[u8], format: &Format) -> Option<CameraFrame> {
    let captured_at = Instant::now();

    if format.fourcc == FourCC::new(b"MJPG") {
        let image = image::load_from_memory_with_format(buf, image::ImageFormat::Jpeg)
            .ok()?
            .to_rgba8();
        let (width, height) = image.dimensions();
        let mut frame = CameraFrame::from_rgba(width, height, image.into_raw());
        frame.captured_at = captured_at;
        return Some(frame);
    }

    let (pixel_format, bpp) = if format.fourcc == FourCC::new(b"YUYV") {
        (PixelFormat::YUYV, 2)
    } else if format.fourcc == FourCC::new(b"RGB3") {
        (PixelFormat::RGB24, 3)
    } else {
        return None;
    };

    let stride = if format.stride > 0 {
        format.stride
    } else {
        format.width * bpp
    };
    if buf.len() < (stride * format.height) as usize {
        return None;
    }

    Some(CameraFrame {
        width: format.width,
        height: format.height,
        data: Arc::from(buf.to_vec().into_boxed_slice()),
        format: pixel_format,
        stride,
        captured_at,
    })
}
