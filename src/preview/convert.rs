//! Native camera formats to RGBA8, mirrored, in a single pass.

use serde::Serialize;

use crate::camera::types::{CameraFrame, PixelFormat, Plane};
use crate::device::types::Orientation;
use crate::preview::error::{ConversionError, Result};

/// Flip applied while converting a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TransformMode {
    /// Reverse column order (horizontal flip).
    MirrorX,
    /// Reverse row order (vertical flip).
    MirrorY,
}

impl TransformMode {
    /// `LandscapeRight` flips vertically; every other orientation, including
    /// portrait, upside down and the flat states, flips horizontally.
    pub fn for_orientation(orientation: Orientation) -> Self {
        if orientation == Orientation::LandscapeRight {
            Self::MirrorY
        } else {
            Self::MirrorX
        }
    }
}

/// Convert `frame` into tightly packed RGBA8 pixels in `dst`.
///
/// `dst` must hold exactly `width * height * 4` bytes. Plane sizes and row
/// strides are checked before anything is written.
pub fn convert_to_rgba(frame: &CameraFrame, transform: TransformMode, dst: &mut [u8]) -> Result<()> {
    let width = frame.width() as usize;
    let height = frame.height() as usize;
    let format = frame.format();

    if width == 0 || height == 0 {
        return Err(ConversionError::ConversionFailed(format!(
            "empty {format} frame ({width}x{height})"
        )));
    }

    let expected = width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| {
            ConversionError::ConversionFailed(format!("{width}x{height} RGBA size overflows"))
        })?;
    if dst.len() != expected {
        return Err(ConversionError::ConversionFailed(format!(
            "destination holds {} bytes, {width}x{height} RGBA needs {expected}",
            dst.len()
        )));
    }

    let planes = frame.planes();
    if planes.len() < format.plane_count() {
        return Err(ConversionError::ConversionFailed(format!(
            "{format} needs {} planes, frame has {}",
            format.plane_count(),
            planes.len()
        )));
    }

    check_plane(&planes[0], format.min_row_bytes(width), height, "image")?;
    if format.plane_count() > 1 {
        check_plane(&planes[1], width.div_ceil(2) * 2, height.div_ceil(2), "chroma")?;
    }

    let pixels: &mut [[u8; 4]] = bytemuck::cast_slice_mut(dst);
    for (y, out) in pixels.chunks_exact_mut(width).enumerate() {
        let src_y = match transform {
            TransformMode::MirrorY => height - 1 - y,
            TransformMode::MirrorX => y,
        };
        convert_row(format, planes, src_y, out);
        if transform == TransformMode::MirrorX {
            out.reverse();
        }
    }

    Ok(())
}

/// Verify a plane holds `rows` rows of at least `row_bytes` visible bytes.
fn check_plane(plane: &Plane, row_bytes: usize, rows: usize, name: &str) -> Result<()> {
    if plane.row_stride < row_bytes {
        return Err(ConversionError::ConversionFailed(format!(
            "{name} plane stride {} is below the {row_bytes}-byte row",
            plane.row_stride
        )));
    }
    let needed = plane
        .row_stride
        .checked_mul(rows - 1)
        .and_then(|n| n.checked_add(row_bytes))
        .ok_or_else(|| {
            ConversionError::ConversionFailed(format!(
                "{name} plane stride {} overflows {rows} rows",
                plane.row_stride
            ))
        })?;
    if plane.data.len() < needed {
        return Err(ConversionError::ConversionFailed(format!(
            "{name} plane has {} bytes, needs {needed}",
            plane.data.len()
        )));
    }
    Ok(())
}

/// Convert source row `src_y` into one output row.
fn convert_row(format: PixelFormat, planes: &[Plane], src_y: usize, out: &mut [[u8; 4]]) {
    let width = out.len();
    let main = &planes[0];
    // In bounds: `check_plane` passed for every plane
    let start = src_y * main.row_stride;
    let row = &main.data[start..start + format.min_row_bytes(width)];

    match format {
        PixelFormat::Rgba32 => {
            for (px, s) in out.iter_mut().zip(row.chunks_exact(4)) {
                *px = [s[0], s[1], s[2], s[3]];
            }
        }
        PixelFormat::Bgra32 => {
            for (px, s) in out.iter_mut().zip(row.chunks_exact(4)) {
                *px = [s[2], s[1], s[0], s[3]];
            }
        }
        PixelFormat::Argb32 => {
            for (px, s) in out.iter_mut().zip(row.chunks_exact(4)) {
                *px = [s[1], s[2], s[3], s[0]];
            }
        }
        PixelFormat::Rgb24 => {
            for (px, s) in out.iter_mut().zip(row.chunks_exact(3)) {
                *px = [s[0], s[1], s[2], 255];
            }
        }
        PixelFormat::Bgr24 => {
            for (px, s) in out.iter_mut().zip(row.chunks_exact(3)) {
                *px = [s[2], s[1], s[0], 255];
            }
        }
        PixelFormat::Gray8 => {
            for (px, &luma) in out.iter_mut().zip(row) {
                *px = [luma, luma, luma, 255];
            }
        }
        PixelFormat::Yuy2 => {
            for (x, px) in out.iter_mut().enumerate() {
                let pair = &row[(x / 2) * 4..(x / 2) * 4 + 4];
                let luma = if x % 2 == 0 { pair[0] } else { pair[2] };
                *px = yuv_to_rgba(luma, pair[1], pair[3]);
            }
        }
        PixelFormat::Nv12 | PixelFormat::Nv21 => {
            let chroma = &planes[1];
            let chroma_start = (src_y / 2) * chroma.row_stride;
            let chroma_row = &chroma.data[chroma_start..chroma_start + width.div_ceil(2) * 2];
            for (x, (px, &luma)) in out.iter_mut().zip(row).enumerate() {
                let uv = &chroma_row[(x / 2) * 2..(x / 2) * 2 + 2];
                let (u, v) = if format == PixelFormat::Nv12 {
                    (uv[0], uv[1])
                } else {
                    (uv[1], uv[0])
                };
                *px = yuv_to_rgba(luma, u, v);
            }
        }
    }
}

/// BT.601 conversion with fixed-point integer arithmetic (<<8).
#[inline]
fn yuv_to_rgba(y: u8, u: u8, v: u8) -> [u8; 4] {
    let y = i32::from(y) * 256;
    let u = i32::from(u) - 128;
    let v = i32::from(v) - 128;
    [
        ((y + 359 * v) >> 8).clamp(0, 255) as u8,
        ((y - 88 * u - 183 * v) >> 8).clamp(0, 255) as u8,
        ((y + 454 * u) >> 8).clamp(0, 255) as u8,
        255,
    ]
}
