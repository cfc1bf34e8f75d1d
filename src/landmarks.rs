// src/landmarks.rs
//! Pose landmark vocabulary.
//!
//! Ids follow the 33-point MediaPipe pose topology. Only the limb joints
//! used for angles get named constants.

use serde::{Deserialize, Serialize};

/// Number of landmarks produced by the pose detector per frame
pub const POSE_LANDMARK_COUNT: usize = 33;

// Upper body
pub const LEFT_SHOULDER: usize = 11;
pub const RIGHT_SHOULDER: usize = 12;
pub const LEFT_ELBOW: usize = 13;
pub const RIGHT_ELBOW: usize = 14;
pub const LEFT_WRIST: usize = 15;
pub const RIGHT_WRIST: usize = 16;

// Lower body
pub const LEFT_HIP: usize = 23;
pub const RIGHT_HIP: usize = 24;
pub const LEFT_KNEE: usize = 25;
pub const RIGHT_KNEE: usize = 26;
pub const LEFT_ANKLE: usize = 27;
pub const RIGHT_ANKLE: usize = 28;

/// One 2D detection, coordinates normalized to the image size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseLandmark {
    pub id: usize,
    pub x: f64,
    pub y: f64,
}

impl PoseLandmark {
    pub fn new(id: usize, x: f64, y: f64) -> Self {
        Self { id, x, y }
    }

    /// Pixel coordinates inside a `width` x `height` image, or `None` when
    /// the landmark falls outside it.
    pub fn to_pixel(&self, width: u32, height: u32) -> Option<(u32, u32)> {
        if !self.x.is_finite() || !self.y.is_finite() {
            return None;
        }

        let px = (self.x * width as f64).floor();
        let py = (self.y * height as f64).floor();

        if px < 0.0 || py < 0.0 || px >= width as f64 || py >= height as f64 {
            return None;
        }

        Some((px as u32, py as u32))
    }
}
