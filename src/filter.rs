// src/filter.rs - Per-joint constant-velocity Kalman smoothing
use nalgebra::{Matrix3, Matrix3x6, Matrix6, Vector3, Vector6};
use std::collections::HashMap;

use crate::error::{Result, TrackingError};
use crate::landmarks::POSE_LANDMARK_COUNT;

/// Nominal frame interval. Used as a constant, not measured per frame.
pub const DEFAULT_DT: f64 = 1.0 / 30.0;

const INITIAL_COVARIANCE_SCALE: f64 = 0.1;
const PROCESS_NOISE_SCALE: f64 = 0.01;
const MEASUREMENT_NOISE_SCALE: f64 = 0.01;

#[derive(Debug, Clone)]
pub struct KalmanFilter {
    state: Vector6<f64>,  // [x, y, z, vx, vy, vz]
    covariance: Matrix6<f64>,
    process_noise: Matrix6<f64>,
    measurement_noise: Matrix3<f64>,
    transition: Matrix6<f64>,
    observation: Matrix3x6<f64>,
}

impl KalmanFilter {
    pub fn new(dt: f64) -> Self {
        let mut transition = Matrix6::identity();
        transition.fixed_view_mut::<3, 3>(0, 3).fill_diagonal(dt);

        // H observes position only
        let mut observation = Matrix3x6::zeros();
        observation.fixed_view_mut::<3, 3>(0, 0).fill_diagonal(1.0);

        Self {
            state: Vector6::zeros(),
            covariance: Matrix6::identity() * INITIAL_COVARIANCE_SCALE,
            process_noise: Matrix6::identity() * PROCESS_NOISE_SCALE,
            measurement_noise: Matrix3::identity() * MEASUREMENT_NOISE_SCALE,
            transition,
            observation,
        }
    }

    /// A filter counts as seeded once its position is anywhere but the
    /// exact origin. A true measurement at (0, 0, 0) therefore re-seeds;
    /// the origin is the optical center and no body joint can sit there.
    pub fn is_seeded(&self) -> bool {
        self.position() != Vector3::zeros()
    }

    pub fn seed(&mut self, measurement: Vector3<f64>) {
        self.state.fixed_rows_mut::<3>(0).copy_from(&measurement);
        self.state.fixed_rows_mut::<3>(3).fill(0.0);
    }

    /// One predict + update cycle. On failure the filter is left exactly
    /// as it was.
    pub fn step(&mut self, measurement: Vector3<f64>) -> Result<Vector3<f64>> {
        if measurement.iter().any(|v| !v.is_finite()) {
            return Err(TrackingError::NumericFailure("non-finite measurement".into()));
        }

        let f = &self.transition;
        let h = &self.observation;

        // Predict
        let state = f * self.state;
        let covariance = f * self.covariance * f.transpose() + self.process_noise;

        // Update
        let innovation = measurement - h * state;
        let s = h * covariance * h.transpose() + self.measurement_noise;
        let s_inv = s
            .try_inverse()
            .ok_or_else(|| TrackingError::NumericFailure("singular innovation covariance".into()))?;
        let k = covariance * h.transpose() * s_inv;

        let state = state + k * innovation;
        let covariance = (Matrix6::identity() - k * h) * covariance;

        if state.iter().chain(covariance.iter()).any(|v| !v.is_finite()) {
            return Err(TrackingError::NumericFailure("non-finite filter state".into()));
        }

        self.state = state;
        self.covariance = covariance;
        Ok(self.position())
    }

    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(self.state[0], self.state[1], self.state[2])
    }

    pub fn velocity(&self) -> Vector3<f64> {
        Vector3::new(self.state[3], self.state[4], self.state[5])
    }

    pub fn covariance(&self) -> &Matrix6<f64> {
        &self.covariance
    }
}

/// One independent filter per joint id. Filters are created the first time
/// an id is seen and live until `reset`.
#[derive(Debug, Clone)]
pub struct JointFilterBank {
    filters: HashMap<usize, KalmanFilter>,
    dt: f64,
}

impl Default for JointFilterBank {
    fn default() -> Self {
        Self::new(POSE_LANDMARK_COUNT, DEFAULT_DT)
    }
}

impl JointFilterBank {
    pub fn new(num_joints: usize, dt: f64) -> Self {
        Self {
            filters: HashMap::with_capacity(num_joints),
            dt,
        }
    }

    /// Smooth one measurement for `joint_id`.
    ///
    /// The first measurement for a joint seeds its position and is returned
    /// untouched. After that every call runs predict + update. A numeric
    /// failure passes the measurement through and keeps the previous state
    /// so the next frame can retry.
    pub fn update(&mut self, joint_id: usize, x: f64, y: f64, z: f64) -> Vector3<f64> {
        let dt = self.dt;
        let measurement = Vector3::new(x, y, z);
        let kalman = self
            .filters
            .entry(joint_id)
            .or_insert_with(|| KalmanFilter::new(dt));

        if !kalman.is_seeded() {
            kalman.seed(measurement);
            return measurement;
        }

        match kalman.step(measurement) {
            Ok(smoothed) => smoothed,
            Err(e) => {
                tracing::warn!("Kalman update failed for joint {}: {}", joint_id, e);
                measurement
            }
        }
    }

    pub fn contains(&self, joint_id: usize) -> bool {
        self.filters.contains_key(&joint_id)
    }

    pub fn get(&self, joint_id: usize) -> Option<&KalmanFilter> {
        self.filters.get(&joint_id)
    }

    pub fn position(&self, joint_id: usize) -> Option<Vector3<f64>> {
        self.get(joint_id).map(KalmanFilter::position)
    }

    pub fn velocity(&self, joint_id: usize) -> Option<Vector3<f64>> {
        self.get(joint_id).map(KalmanFilter::velocity)
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Drop every filter. Only called when a new session starts.
    pub fn reset(&mut self) {
        self.filters.clear();
    }
}
