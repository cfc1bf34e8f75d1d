// src/lib.rs
//! Depth-aware 3D pose tracking.
//!
//! 2D pose landmarks are lifted to camera space by sampling an aligned depth
//! map and deprojecting through the camera intrinsics, smoothed with one
//! constant-velocity Kalman filter per joint, and turned into a fixed set of
//! plane-corrected limb angles.

pub mod angles;
pub mod camera;
pub mod config;
pub mod data;
pub mod depth;
pub mod error;
pub mod filter;
pub mod landmarks;
pub mod session;
pub mod tracking;

pub use angles::{AngleEstimator, JointAngle, JointAngles};
pub use camera::{CameraIntrinsics, DistortionModel};
pub use config::TrackerConfig;
pub use data::AngleLogger;
pub use depth::{DepthImage, DepthSurface};
pub use error::{Result, TrackingError};
pub use filter::{JointFilterBank, KalmanFilter};
pub use landmarks::PoseLandmark;
pub use session::SessionReader;
pub use tracking::{FrameResult, PoseTracker};
