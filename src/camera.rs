// src/camera.rs
//! Camera intrinsics and pixel deprojection.
//!
//! The distortion models and their inversion follow the conventions of
//! depth cameras that report Brown-Conrady style coefficients
//! `[k1, k2, p1, p2, k3]` (or `[k1, k2, k3, k4, _]` for fisheye lenses).

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackingError};

const BROWN_CONRADY_ITERATIONS: usize = 10;
const KANNALA_BRANDT_ITERATIONS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistortionModel {
    /// Rectilinear image, no correction
    #[default]
    None,
    /// Forward-only model; deprojection uses the normalized coordinate as-is
    ModifiedBrownConrady,
    InverseBrownConrady,
    BrownConrady,
    KannalaBrandt4,
    FTheta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub width: u32,
    pub height: u32,
    /// Principal point, pixels
    pub ppx: f64,
    pub ppy: f64,
    /// Focal lengths, pixels
    pub fx: f64,
    pub fy: f64,
    #[serde(default)]
    pub model: DistortionModel,
    #[serde(default)]
    pub coeffs: [f64; 5],
}

impl CameraIntrinsics {
    /// Undistorted pinhole intrinsics.
    pub fn pinhole(width: u32, height: u32, fx: f64, fy: f64, ppx: f64, ppy: f64) -> Self {
        Self {
            width,
            height,
            ppx,
            ppy,
            fx,
            fy,
            model: DistortionModel::None,
            coeffs: [0.0; 5],
        }
    }

    fn validate(&self) -> Result<()> {
        let focal_ok = self.fx.is_finite() && self.fy.is_finite() && self.fx != 0.0 && self.fy != 0.0;
        if !focal_ok {
            return Err(TrackingError::Deprojection(format!(
                "invalid focal length ({}, {})",
                self.fx, self.fy
            )));
        }
        if !self.ppx.is_finite() || !self.ppy.is_finite() {
            return Err(TrackingError::Deprojection("invalid principal point".into()));
        }
        if self.coeffs.iter().any(|c| !c.is_finite()) {
            return Err(TrackingError::Deprojection("invalid distortion coefficients".into()));
        }
        Ok(())
    }

    /// Map a pixel with a known depth (meters along the optical axis) to a
    /// camera-space point.
    pub fn deproject(&self, px: f64, py: f64, depth: f64) -> Result<Vector3<f64>> {
        if !depth.is_finite() || depth <= 0.0 {
            return Err(TrackingError::Deprojection(format!("non-positive depth {}", depth)));
        }
        self.validate()?;

        let x = (px - self.ppx) / self.fx;
        let y = (py - self.ppy) / self.fy;
        let (x, y) = self.undistort(x, y);

        let point = Vector3::new(depth * x, depth * y, depth);
        if point.iter().any(|v| !v.is_finite()) {
            return Err(TrackingError::Deprojection(format!(
                "non-finite point for pixel ({}, {})",
                px, py
            )));
        }
        Ok(point)
    }

    fn undistort(&self, x: f64, y: f64) -> (f64, f64) {
        let c = &self.coeffs;
        match self.model {
            DistortionModel::None | DistortionModel::ModifiedBrownConrady => (x, y),
            DistortionModel::InverseBrownConrady => {
                let (xo, yo) = (x, y);
                let (mut x, mut y) = (x, y);
                for _ in 0..BROWN_CONRADY_ITERATIONS {
                    let r2 = x * x + y * y;
                    let icdist = 1.0 / (1.0 + ((c[4] * r2 + c[1]) * r2 + c[0]) * r2);
                    let xq = x / icdist;
                    let yq = y / icdist;
                    let delta_x = 2.0 * c[2] * xq * yq + c[3] * (r2 + 2.0 * xq * xq);
                    let delta_y = 2.0 * c[3] * xq * yq + c[2] * (r2 + 2.0 * yq * yq);
                    x = (xo - delta_x) * icdist;
                    y = (yo - delta_y) * icdist;
                }
                (x, y)
            }
            DistortionModel::BrownConrady => {
                let (xo, yo) = (x, y);
                let (mut x, mut y) = (x, y);
                for _ in 0..BROWN_CONRADY_ITERATIONS {
                    let r2 = x * x + y * y;
                    let icdist = 1.0 / (1.0 + ((c[4] * r2 + c[1]) * r2 + c[0]) * r2);
                    let delta_x = 2.0 * c[2] * x * y + c[3] * (r2 + 2.0 * x * x);
                    let delta_y = 2.0 * c[3] * x * y + c[2] * (r2 + 2.0 * y * y);
                    x = (xo - delta_x) * icdist;
                    y = (yo - delta_y) * icdist;
                }
                (x, y)
            }
            DistortionModel::KannalaBrandt4 => {
                let rd = (x * x + y * y).sqrt().max(f64::EPSILON);
                let mut theta = rd;
                let mut theta2 = rd * rd;
                for _ in 0..KANNALA_BRANDT_ITERATIONS {
                    let f = theta * (1.0 + theta2 * (c[0] + theta2 * (c[1] + theta2 * (c[2] + theta2 * c[3])))) - rd;
                    if f.abs() < f64::EPSILON {
                        break;
                    }
                    let df = 1.0 + theta2 * (3.0 * c[0] + theta2 * (5.0 * c[1] + theta2 * (7.0 * c[2] + 9.0 * theta2 * c[3])));
                    theta -= f / df;
                    theta2 = theta * theta;
                }
                let r = theta.tan();
                (x * r / rd, y * r / rd)
            }
            DistortionModel::FTheta => {
                let rd = (x * x + y * y).sqrt().max(f64::EPSILON);
                let r = (c[0] * rd).tan() / (2.0 * (c[0] / 2.0).tan()).atan();
                (x * r / rd, y * r / rd)
            }
        }
    }
}

/// Free-function form used by the frame loop.
pub fn deproject(intrinsics: &CameraIntrinsics, px: f64, py: f64, depth: f64) -> Result<Vector3<f64>> {
    intrinsics.deproject(px, py, depth)
}
