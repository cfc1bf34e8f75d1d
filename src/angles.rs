// src/angles.rs
//! Joint angle calculation with plane correction.
//!
//! Both limb vectors are projected onto the plane of the joint triplet
//! before measuring the angle between them. Depth noise mostly moves points
//! out of that plane, so the projection keeps it out of the angle.

use nalgebra::Vector3;
use std::collections::HashMap;
use std::fmt;

use crate::landmarks::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointAngle {
    LeftElbow,
    RightElbow,
    LeftShoulder,
    RightShoulder,
    LeftKnee,
    RightKnee,
    LeftHip,
    RightHip,
}

impl JointAngle {
    /// Every angle in output order.
    pub const ALL: [JointAngle; 8] = [
        JointAngle::LeftElbow,
        JointAngle::RightElbow,
        JointAngle::LeftShoulder,
        JointAngle::RightShoulder,
        JointAngle::LeftKnee,
        JointAngle::RightKnee,
        JointAngle::LeftHip,
        JointAngle::RightHip,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            JointAngle::LeftElbow => "left_elbow",
            JointAngle::RightElbow => "right_elbow",
            JointAngle::LeftShoulder => "left_shoulder",
            JointAngle::RightShoulder => "right_shoulder",
            JointAngle::LeftKnee => "left_knee",
            JointAngle::RightKnee => "right_knee",
            JointAngle::LeftHip => "left_hip",
            JointAngle::RightHip => "right_hip",
        }
    }

    /// Landmark ids `(a, b, c)`; the angle is measured at `b`.
    pub fn triplet(&self) -> (usize, usize, usize) {
        match self {
            JointAngle::LeftElbow => (LEFT_SHOULDER, LEFT_ELBOW, LEFT_WRIST),
            JointAngle::RightElbow => (RIGHT_SHOULDER, RIGHT_ELBOW, RIGHT_WRIST),
            JointAngle::LeftShoulder => (LEFT_ELBOW, LEFT_SHOULDER, LEFT_HIP),
            JointAngle::RightShoulder => (RIGHT_ELBOW, RIGHT_SHOULDER, RIGHT_HIP),
            JointAngle::LeftKnee => (LEFT_HIP, LEFT_KNEE, LEFT_ANKLE),
            JointAngle::RightKnee => (RIGHT_HIP, RIGHT_KNEE, RIGHT_ANKLE),
            JointAngle::LeftHip => (LEFT_SHOULDER, LEFT_HIP, LEFT_KNEE),
            JointAngle::RightHip => (RIGHT_SHOULDER, RIGHT_HIP, RIGHT_KNEE),
        }
    }

    /// Landmark id of the vertex joint, used to place overlay labels.
    pub fn vertex(&self) -> usize {
        self.triplet().1
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for JointAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Angles for one frame, in degrees. `None` means the angle could not be
/// computed because one of its joints was missing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JointAngles {
    values: [Option<f64>; 8],
}

impl JointAngles {
    pub fn get(&self, angle: JointAngle) -> Option<f64> {
        self.values[angle.index()]
    }

    pub fn set(&mut self, angle: JointAngle, value: Option<f64>) {
        self.values[angle.index()] = value;
    }

    pub fn iter(&self) -> impl Iterator<Item = (JointAngle, Option<f64>)> + '_ {
        JointAngle::ALL.iter().map(move |a| (*a, self.get(*a)))
    }

    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}

/// Angle between two vectors in degrees. Zero-length input gives 0.0.
pub fn angle_between(v1: &Vector3<f64>, v2: &Vector3<f64>) -> f64 {
    let mag1 = v1.norm();
    let mag2 = v2.norm();

    if mag1 == 0.0 || mag2 == 0.0 {
        return 0.0;
    }

    let cos_angle = (v1.dot(v2) / (mag1 * mag2)).clamp(-1.0, 1.0);
    cos_angle.acos().to_degrees()
}

/// Vector rejection of `v` from `normal`. `normal` need not be unit length
/// but must be non-zero.
pub fn project_to_plane(v: &Vector3<f64>, normal: &Vector3<f64>) -> Vector3<f64> {
    let n = normal.normalize();
    v - n * v.dot(&n)
}

/// Angle at `b` formed by `a - b - c`, or `None` if any joint is missing.
pub fn safe_angle(points: &HashMap<usize, Vector3<f64>>, a: usize, b: usize, c: usize) -> Option<f64> {
    let a = points.get(&a)?;
    let b = points.get(&b)?;
    let c = points.get(&c)?;

    let v1 = a - b;
    let v2 = c - b;

    let plane_normal = v1.cross(&v2);
    if plane_normal.norm() == 0.0 {
        // Collinear: no plane to project onto
        return Some(angle_between(&v1, &v2));
    }

    let v1_proj = project_to_plane(&v1, &plane_normal);
    let v2_proj = project_to_plane(&v2, &plane_normal);

    Some(angle_between(&v1_proj, &v2_proj))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AngleEstimator;

impl AngleEstimator {
    pub fn new() -> Self {
        Self
    }

    pub fn calculate(&self, points: &HashMap<usize, Vector3<f64>>) -> JointAngles {
        let mut angles = JointAngles::default();
        for angle in JointAngle::ALL {
            let (a, b, c) = angle.triplet();
            angles.set(angle, safe_angle(points, a, b, c));
        }
        angles
    }
}
