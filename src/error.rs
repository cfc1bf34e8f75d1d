// src/error.rs
//! Error types for the tracking pipeline.
//!
//! None of these are fatal to a frame: `NoData` and `Deprojection` skip a
//! single joint, `NumericFailure` makes the filter pass the raw measurement
//! through. The IO variants only surface from the session and CSV glue.

/// Result type alias
pub type Result<T> = std::result::Result<T, TrackingError>;

#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    /// No valid depth reading around the requested pixel
    #[error("no valid depth data")]
    NoData,

    /// Pixel + depth could not be mapped back to camera space
    #[error("deprojection failed: {0}")]
    Deprojection(String),

    /// Degenerate matrix operation inside a joint filter
    #[error("numeric failure: {0}")]
    NumericFailure(String),

    /// Depth surface rejected a point query
    #[error("depth surface error: {0}")]
    Surface(String),

    /// Recorded session is missing or malformed
    #[error("session error: {0}")]
    Session(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}
