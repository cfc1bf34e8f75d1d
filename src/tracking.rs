// src/tracking.rs - Per-frame pipeline: depth sampling, deprojection, smoothing, angles
use nalgebra::Vector3;
use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use crate::angles::{AngleEstimator, JointAngles};
use crate::camera::CameraIntrinsics;
use crate::config::TrackerConfig;
use crate::depth::{self, DepthSurface};
use crate::filter::JointFilterBank;
use crate::landmarks::PoseLandmark;

const METRICS_WINDOW: usize = 30;

#[derive(Debug, Clone)]
pub struct PerformanceMetrics {
    pub avg_fps: f32,
    pub avg_processing_time: f32,
    pub tracked_joints: usize,
    pub skipped_joints: usize,
    frame_times: VecDeque<f32>,
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self {
            avg_fps: 0.0,
            avg_processing_time: 0.0,
            tracked_joints: 0,
            skipped_joints: 0,
            frame_times: VecDeque::with_capacity(METRICS_WINDOW),
        }
    }

    fn record(&mut self, elapsed: f32, tracked: usize, skipped: usize) {
        self.frame_times.push_front(elapsed);
        if self.frame_times.len() > METRICS_WINDOW {
            self.frame_times.pop_back();
        }

        self.avg_processing_time =
            self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32;
        self.avg_fps = if self.avg_processing_time > 0.0 {
            1.0 / self.avg_processing_time
        } else {
            0.0
        };
        self.tracked_joints = tracked;
        self.skipped_joints = skipped;
    }
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FrameResult {
    pub frame: u64,
    /// Nominal session time in seconds (frame index times dt)
    pub timestamp: f64,
    pub joints: HashMap<usize, Vector3<f64>>,
    pub angles: JointAngles,
}

impl FrameResult {
    pub fn tracking_lost(&self) -> bool {
        self.joints.is_empty()
    }
}

pub struct PoseTracker {
    config: TrackerConfig,
    filters: JointFilterBank,
    estimator: AngleEstimator,
    metrics: PerformanceMetrics,
    frame_counter: u64,
}

impl PoseTracker {
    pub fn new(config: TrackerConfig) -> Self {
        let filters = JointFilterBank::new(config.num_joints, config.dt);
        Self {
            config,
            filters,
            estimator: AngleEstimator::new(),
            metrics: PerformanceMetrics::new(),
            frame_counter: 0,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn filters(&self) -> &JointFilterBank {
        &self.filters
    }

    pub fn metrics(&self) -> &PerformanceMetrics {
        &self.metrics
    }

    /// Run one frame through the pipeline. Joints without usable depth are
    /// left out of the result; the frame itself never fails.
    pub fn process_frame<S: DepthSurface + ?Sized>(
        &mut self,
        landmarks: &[PoseLandmark],
        depth_frame: &S,
        intrinsics: &CameraIntrinsics,
    ) -> FrameResult {
        let start = Instant::now();
        let (w, h) = (depth_frame.width(), depth_frame.height());

        let mut result = FrameResult {
            frame: self.frame_counter,
            timestamp: self.frame_counter as f64 * self.config.dt,
            ..Default::default()
        };
        self.frame_counter += 1;

        let mut skipped = 0;
        for lm in landmarks {
            match self.locate_joint(lm, depth_frame, intrinsics, w, h) {
                Some(point) => {
                    result.joints.insert(lm.id, point);
                }
                None => skipped += 1,
            }
        }

        result.angles = self.estimator.calculate(&result.joints);

        self.metrics
            .record(start.elapsed().as_secs_f32(), result.joints.len(), skipped);
        result
    }

    fn locate_joint<S: DepthSurface + ?Sized>(
        &mut self,
        lm: &PoseLandmark,
        depth_frame: &S,
        intrinsics: &CameraIntrinsics,
        w: u32,
        h: u32,
    ) -> Option<Vector3<f64>> {
        let (px, py) = lm.to_pixel(w, h)?;

        let depth = match depth::sample(depth_frame, px, py, w, h, self.config.patch_radius) {
            Ok(d) => d,
            Err(e) => {
                tracing::debug!("Joint {} at ({}, {}): {}", lm.id, px, py, e);
                return None;
            }
        };

        let raw = match intrinsics.deproject(px as f64, py as f64, depth as f64) {
            Ok(p) => p,
            Err(e) => {
                tracing::debug!("Joint {}: {}", lm.id, e);
                return None;
            }
        };

        if self.config.use_kalman {
            Some(self.filters.update(lm.id, raw.x, raw.y, raw.z))
        } else {
            Some(raw)
        }
    }

    /// Forget all joint history, e.g. when switching to a new session.
    pub fn reset(&mut self) {
        self.filters.reset();
        self.metrics = PerformanceMetrics::new();
        self.frame_counter = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angles::JointAngle;
    use crate::depth::DepthImage;
    use crate::landmarks::*;
    use approx::assert_relative_eq;

    const W: u32 = 64;
    const H: u32 = 48;

    fn intrinsics() -> CameraIntrinsics {
        CameraIntrinsics::pinhole(W, H, 60.0, 60.0, 32.0, 24.0)
    }

    fn flat_depth(mm: u16) -> DepthImage {
        DepthImage::from_raw(W, H, vec![mm; (W * H) as usize], 0.001).unwrap()
    }

    fn right_arm() -> Vec<PoseLandmark> {
        vec![
            PoseLandmark::new(RIGHT_SHOULDER, 0.50, 0.20),
            PoseLandmark::new(RIGHT_ELBOW, 0.50, 0.50),
            PoseLandmark::new(RIGHT_WRIST, 0.75, 0.50),
        ]
    }

    #[test]
    fn test_first_frame_is_unsmoothed_deprojection() {
        let mut tracker = PoseTracker::new(TrackerConfig::default());
        let result = tracker.process_frame(&right_arm(), &flat_depth(2000), &intrinsics());

        assert_eq!(result.frame, 0);
        assert_eq!(result.joints.len(), 3);

        // Elbow at pixel (32, 24) is the principal point.
        let elbow = result.joints[&RIGHT_ELBOW];
        assert_relative_eq!(elbow, Vector3::new(0.0, 0.0, 2.0), epsilon = 1e-6);

        let wrist = result.joints[&RIGHT_WRIST];
        assert_relative_eq!(wrist.x, 16.0 / 60.0 * 2.0, epsilon = 1e-6);

        // Shoulder straight above the elbow, wrist straight out: right angle.
        assert_relative_eq!(result.angles.get(JointAngle::RightElbow).unwrap(), 90.0, epsilon = 1e-6);
        assert_eq!(result.angles.get(JointAngle::LeftElbow), None);
    }

    #[test]
    fn test_joint_without_depth_is_skipped() {
        let mut data = vec![2000u16; (W * H) as usize];
        // Blank a 5x5 hole around the wrist pixel (48, 24).
        for y in 22..=26 {
            for x in 46..=50 {
                data[(y * W + x) as usize] = 0;
            }
        }
        let depth = DepthImage::from_raw(W, H, data, 0.001).unwrap();

        let mut tracker = PoseTracker::new(TrackerConfig::default());
        let result = tracker.process_frame(&right_arm(), &depth, &intrinsics());

        assert!(!result.joints.contains_key(&RIGHT_WRIST));
        assert!(result.joints.contains_key(&RIGHT_ELBOW));
        assert_eq!(result.angles.get(JointAngle::RightElbow), None);
        assert_eq!(tracker.metrics().skipped_joints, 1);
        assert!(!tracker.filters().contains(RIGHT_WRIST));
    }

    #[test]
    fn test_out_of_frame_landmark_is_skipped() {
        let mut tracker = PoseTracker::new(TrackerConfig::default());
        let lms = [PoseLandmark::new(LEFT_ANKLE, 0.5, 1.2)];
        let result = tracker.process_frame(&lms, &flat_depth(1500), &intrinsics());
        assert!(result.tracking_lost());
        assert_eq!(result.angles.defined_count(), 0);
    }

    #[test]
    fn test_kalman_smooths_depth_jump() {
        let mut tracker = PoseTracker::new(TrackerConfig::default());
        tracker.process_frame(&right_arm(), &flat_depth(2000), &intrinsics());
        let result = tracker.process_frame(&right_arm(), &flat_depth(2400), &intrinsics());

        let z = result.joints[&RIGHT_ELBOW].z;
        assert!(z > 2.0 && z < 2.4);
        assert_eq!(result.frame, 1);
        assert_relative_eq!(result.timestamp, 1.0 / 30.0);
    }

    #[test]
    fn test_raw_mode_bypasses_filters() {
        let config = TrackerConfig {
            use_kalman: false,
            ..Default::default()
        };
        let mut tracker = PoseTracker::new(config);
        tracker.process_frame(&right_arm(), &flat_depth(2000), &intrinsics());
        let result = tracker.process_frame(&right_arm(), &flat_depth(2400), &intrinsics());

        assert_relative_eq!(result.joints[&RIGHT_ELBOW].z, 2.4, epsilon = 1e-6);
        assert!(tracker.filters().is_empty());
    }

    #[test]
    fn test_reset() {
        let mut tracker = PoseTracker::new(TrackerConfig::default());
        tracker.process_frame(&right_arm(), &flat_depth(2000), &intrinsics());
        tracker.reset();
        assert!(tracker.filters().is_empty());

        let result = tracker.process_frame(&right_arm(), &flat_depth(2400), &intrinsics());
        assert_eq!(result.frame, 0);
        assert_relative_eq!(result.joints[&RIGHT_ELBOW].z, 2.4, epsilon = 1e-6);
    }
}
