use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::camera::error::{CameraError, Result};
use crate::camera::source::{FrameCallback, FrameSource};
use crate::camera::types::{CameraFrame, PixelFormat, Plane};
use crate::settings::types::DummyFrameSettings;

/// A fake AR camera for running without real hardware.
///
/// Produces a moving colour-gradient test pattern in the configured pixel
/// format and fires frame notifications from its own thread at the
/// configured rate. Tracks frames handed out but not yet released.
///
/// Enable via `DUMMY_CAMERA=1` or the `dummyCamera` config key.
pub struct DummyFrameSource {
    width: u32,
    height: u32,
    format: PixelFormat,
    frame_interval: Duration,
    start: Instant,
    sequence: AtomicU64,
    outstanding: Arc<AtomicUsize>,
    running: Arc<AtomicBool>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl DummyFrameSource {
    pub fn new(settings: &DummyFrameSettings) -> Self {
        let fps = if settings.fps.is_finite() && settings.fps > 0.0 {
            settings.fps
        } else {
            30.0
        };
        Self {
            width: settings.width,
            height: settings.height,
            format: settings.format,
            frame_interval: Duration::from_secs_f32(1.0 / fps),
            start: Instant::now(),
            sequence: AtomicU64::new(0),
            outstanding: Arc::new(AtomicUsize::new(0)),
            running: Arc::new(AtomicBool::new(true)),
            threads: Mutex::new(Vec::new()),
        }
    }

    /// Whether the dummy camera is enabled via environment variable.
    pub fn is_enabled() -> bool {
        std::env::var("DUMMY_CAMERA").is_ok_and(|v| v == "1" || v == "true")
    }

    /// Frames handed out whose release hook has not run yet.
    pub fn outstanding_frames(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Stop the notification threads. Idempotent.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
        for handle in self.threads.lock().drain(..) {
            let _ = handle.join();
        }
    }
}

impl FrameSource for DummyFrameSource {
    fn try_latest_frame(&self) -> Option<CameraFrame> {
        if self.width == 0 || self.height == 0 {
            return None;
        }

        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let phase = (seq % 256) as u8;
        let planes = test_pattern(self.width, self.height, self.format, phase);
        let timestamp_us = self.start.elapsed().as_micros() as u64;

        self.outstanding.fetch_add(1, Ordering::SeqCst);
        let outstanding = Arc::clone(&self.outstanding);
        Some(
            CameraFrame::new(self.width, self.height, self.format, planes, timestamp_us)
                .with_release(move || {
                    outstanding.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }),
        )
    }

    fn watch_frames(&self, callback: FrameCallback) -> Result<()> {
        let running = Arc::clone(&self.running);
        let interval = self.frame_interval;

        let handle = std::thread::Builder::new()
            .name("dummy-camera".to_string())
            .spawn(move || {
                while running.load(Ordering::Relaxed) {
                    std::thread::sleep(interval);
                    if !running.load(Ordering::Relaxed) {
                        break;
                    }
                    callback();
                }
            })
            .map_err(|e| CameraError::FrameEvents(format!("failed to spawn frame thread: {e}")))?;

        self.threads.lock().push(handle);
        Ok(())
    }
}

impl Drop for DummyFrameSource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Gradient colour for a pixel: red across, green down, blue animated.
fn pattern_rgb(x: u32, y: u32, width: u32, height: u32, phase: u8) -> [u8; 3] {
    let r = (x * 255 / (width.max(2) - 1)).min(255) as u8;
    let g = (y * 255 / (height.max(2) - 1)).min(255) as u8;
    [r, g, phase]
}

/// Full-range BT.601 RGB to YUV with fixed-point integer arithmetic (<<8),
/// the inverse of the preview converter's decode.
fn rgb_to_yuv([r, g, b]: [u8; 3]) -> [u8; 3] {
    let (r, g, b) = (i32::from(r), i32::from(g), i32::from(b));
    let y = (77 * r + 150 * g + 29 * b + 128) >> 8;
    let u = ((-43 * r - 85 * g + 128 * b + 128) >> 8) + 128;
    let v = ((128 * r - 107 * g - 21 * b + 128) >> 8) + 128;
    [
        y.clamp(0, 255) as u8,
        u.clamp(0, 255) as u8,
        v.clamp(0, 255) as u8,
    ]
}

/// Render the test pattern as tightly packed planes in `format`.
fn test_pattern(width: u32, height: u32, format: PixelFormat, phase: u8) -> Vec<Plane> {
    let w = width as usize;
    let h = height as usize;
    let row_bytes = format.min_row_bytes(w);
    let mut main = vec![0u8; row_bytes * h];

    for y in 0..height {
        let row = &mut main[y as usize * row_bytes..(y as usize + 1) * row_bytes];
        for x in 0..width {
            let rgb = pattern_rgb(x, y, width, height, phase);
            let [r, g, b] = rgb;
            let i = x as usize;
            match format {
                PixelFormat::Rgba32 => row[i * 4..i * 4 + 4].copy_from_slice(&[r, g, b, 255]),
                PixelFormat::Bgra32 => row[i * 4..i * 4 + 4].copy_from_slice(&[b, g, r, 255]),
                PixelFormat::Argb32 => row[i * 4..i * 4 + 4].copy_from_slice(&[255, r, g, b]),
                PixelFormat::Rgb24 => row[i * 3..i * 3 + 3].copy_from_slice(&[r, g, b]),
                PixelFormat::Bgr24 => row[i * 3..i * 3 + 3].copy_from_slice(&[b, g, r]),
                PixelFormat::Gray8 | PixelFormat::Nv12 | PixelFormat::Nv21 => {
                    row[i] = rgb_to_yuv(rgb)[0];
                }
                PixelFormat::Yuy2 => {
                    let [luma, u, v] = rgb_to_yuv(rgb);
                    let pair = (i / 2) * 4;
                    row[pair + (i % 2) * 2] = luma;
                    if i % 2 == 0 {
                        row[pair + 1] = u;
                        row[pair + 3] = v;
                        // Odd width: the trailing pair repeats the last pixel
                        if i + 1 == w {
                            row[pair + 2] = luma;
                        }
                    }
                }
            }
        }
    }

    let mut planes = vec![Plane::new(main, row_bytes)];

    if matches!(format, PixelFormat::Nv12 | PixelFormat::Nv21) {
        let chroma_w = w.div_ceil(2);
        let chroma_h = h.div_ceil(2);
        let chroma_row = chroma_w * 2;
        let mut chroma = vec![0u8; chroma_row * chroma_h];
        for cy in 0..chroma_h {
            for cx in 0..chroma_w {
                let rgb = pattern_rgb((cx * 2) as u32, (cy * 2) as u32, width, height, phase);
                let [_, u, v] = rgb_to_yuv(rgb);
                let base = cy * chroma_row + cx * 2;
                let (first, second) = if format == PixelFormat::Nv12 {
                    (u, v)
                } else {
                    (v, u)
                };
                chroma[base] = first;
                chroma[base + 1] = second;
            }
        }
        planes.push(Plane::new(chroma, chroma_row));
    }

    planes
}
