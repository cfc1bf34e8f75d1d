// src/depth.rs
use image::{ImageBuffer, Luma};
use std::path::Path;

use crate::error::{Result, TrackingError};

/// Default half-width of the sampling patch (3x3 neighbourhood)
pub const DEFAULT_PATCH_RADIUS: u32 = 1;

/// Depth map aligned to the color image. Distances are in meters, `0.0`
/// means the sensor had no reading at that pixel.
pub trait DepthSurface {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn distance(&self, x: u32, y: u32) -> Result<f32>;
}

/// 16-bit depth frame plus the scale that converts raw units to meters.
pub struct DepthImage {
    buffer: ImageBuffer<Luma<u16>, Vec<u16>>,
    depth_scale: f32,
}

impl DepthImage {
    pub fn new(buffer: ImageBuffer<Luma<u16>, Vec<u16>>, depth_scale: f32) -> Self {
        Self { buffer, depth_scale }
    }

    pub fn from_raw(width: u32, height: u32, data: Vec<u16>, depth_scale: f32) -> Result<Self> {
        let buffer = ImageBuffer::from_raw(width, height, data).ok_or_else(|| {
            TrackingError::Surface(format!("buffer does not match {}x{}", width, height))
        })?;
        Ok(Self::new(buffer, depth_scale))
    }

    /// Load a 16-bit grayscale PNG.
    pub fn open(path: impl AsRef<Path>, depth_scale: f32) -> Result<Self> {
        let img = image::open(path.as_ref())?;
        Ok(Self::new(img.into_luma16(), depth_scale))
    }

    pub fn depth_scale(&self) -> f32 {
        self.depth_scale
    }
}

impl DepthSurface for DepthImage {
    fn width(&self) -> u32 {
        self.buffer.width()
    }

    fn height(&self) -> u32 {
        self.buffer.height()
    }

    fn distance(&self, x: u32, y: u32) -> Result<f32> {
        if x >= self.buffer.width() || y >= self.buffer.height() {
            return Err(TrackingError::Surface(format!("pixel ({}, {}) out of bounds", x, y)));
        }
        Ok(self.buffer.get_pixel(x, y).0[0] as f32 * self.depth_scale)
    }
}

/// Mean of the valid (> 0) readings in the `(2r+1)^2` patch around
/// `(px, py)`, clipped to `width` x `height`.
///
/// A failed read from the surface invalidates the whole sample.
pub fn sample<S: DepthSurface + ?Sized>(
    surface: &S,
    px: u32,
    py: u32,
    width: u32,
    height: u32,
    patch_radius: u32,
) -> Result<f32> {
    let r = patch_radius as i64;
    let (cx, cy) = (px as i64, py as i64);

    let mut sum = 0.0f64;
    let mut count = 0usize;

    for dx in -r..=r {
        for dy in -r..=r {
            let (x, y) = (cx + dx, cy + dy);
            if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
                continue;
            }
            let d = match surface.distance(x as u32, y as u32) {
                Ok(d) => d,
                Err(e) => {
                    tracing::debug!("Depth read failed at ({}, {}): {}", x, y, e);
                    return Err(TrackingError::NoData);
                }
            };
            if d > 0.0 {
                sum += d as f64;
                count += 1;
            }
        }
    }

    if count == 0 {
        return Err(TrackingError::NoData);
    }
    Ok((sum / count as f64) as f32)
}
