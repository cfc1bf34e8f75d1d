// src/session.rs - Replays a recorded capture session from disk
//
// Layout of a session directory:
//   intrinsics.json      camera intrinsics + depth_scale
//   landmarks.jsonl      one {"frame": n, "landmarks": [{"id", "x", "y"}, ...]} per line
//   depth/frame_NNNNN.png  16-bit depth aligned to the color stream
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::camera::CameraIntrinsics;
use crate::depth::{DepthImage, DepthSurface};
use crate::error::{Result, TrackingError};
use crate::landmarks::PoseLandmark;

/// Meters per raw depth unit when the session does not say otherwise
pub const DEFAULT_DEPTH_SCALE: f32 = 0.001;

fn default_depth_scale() -> f32 {
    DEFAULT_DEPTH_SCALE
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionInfo {
    #[serde(flatten)]
    pub intrinsics: CameraIntrinsics,
    #[serde(default = "default_depth_scale")]
    pub depth_scale: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LandmarkFrame {
    pub frame: u64,
    #[serde(default)]
    pub landmarks: Vec<PoseLandmark>,
}

pub struct SessionFrame {
    pub index: u64,
    pub landmarks: Vec<PoseLandmark>,
    pub depth: DepthImage,
}

pub struct SessionReader {
    root: PathBuf,
    info: SessionInfo,
    frames: Vec<LandmarkFrame>,
    current: usize,
}

impl SessionReader {
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(TrackingError::Session(format!(
                "session directory does not exist: {}",
                root.display()
            )));
        }

        let info: SessionInfo = serde_json::from_str(&fs::read_to_string(root.join("intrinsics.json"))?)?;
        if !(info.depth_scale.is_finite() && info.depth_scale > 0.0) {
            return Err(TrackingError::Session(format!("invalid depth_scale {}", info.depth_scale)));
        }

        let frames = Self::parse_landmarks(&fs::read_to_string(root.join("landmarks.jsonl"))?)?;

        tracing::info!(
            "Opened session {} ({} frames, {}x{})",
            root.display(),
            frames.len(),
            info.intrinsics.width,
            info.intrinsics.height
        );

        Ok(Self {
            root,
            info,
            frames,
            current: 0,
        })
    }

    fn parse_landmarks(contents: &str) -> Result<Vec<LandmarkFrame>> {
        contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line)
                    .map_err(|e| TrackingError::Session(format!("landmarks.jsonl line {}: {}", i + 1, e)))
            })
            .collect()
    }

    pub fn intrinsics(&self) -> &CameraIntrinsics {
        &self.info.intrinsics
    }

    pub fn depth_scale(&self) -> f32 {
        self.info.depth_scale
    }

    pub fn total_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn get_progress(&self) -> f32 {
        if self.frames.is_empty() {
            0.0
        } else {
            self.current as f32 / self.frames.len() as f32
        }
    }

    pub fn depth_path(&self, frame: u64) -> PathBuf {
        self.root.join("depth").join(format!("frame_{:05}.png", frame))
    }

    fn load_frame(&self, entry: &LandmarkFrame) -> Result<SessionFrame> {
        let path = self.depth_path(entry.frame);
        if !path.exists() {
            return Err(TrackingError::Session(format!("missing depth frame {}", path.display())));
        }

        let depth = DepthImage::open(&path, self.info.depth_scale)?;
        let intr = &self.info.intrinsics;
        if depth.width() != intr.width || depth.height() != intr.height {
            tracing::warn!(
                "Depth frame {} is {}x{}, intrinsics say {}x{}",
                entry.frame,
                depth.width(),
                depth.height(),
                intr.width,
                intr.height
            );
        }

        Ok(SessionFrame {
            index: entry.frame,
            landmarks: entry.landmarks.clone(),
            depth,
        })
    }
}

impl Iterator for SessionReader {
    type Item = Result<SessionFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.frames.get(self.current)?;
        let frame = self.load_frame(entry);
        self.current += 1;
        Some(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::DistortionModel;
    use image::{ImageBuffer, Luma};
    use tempfile::TempDir;

    fn write_depth(dir: &Path, frame: u64, mm: u16) {
        let img: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::from_pixel(8, 6, Luma([mm]));
        img.save(dir.join("depth").join(format!("frame_{:05}.png", frame))).unwrap();
    }

    fn make_session() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("depth")).unwrap();
        fs::write(
            dir.path().join("intrinsics.json"),
            r#"{"width": 8, "height": 6, "ppx": 4.0, "ppy": 3.0, "fx": 7.5, "fy": 7.5,
                "model": "brown_conrady", "coeffs": [0, 0, 0, 0, 0], "depth_scale": 0.001}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("landmarks.jsonl"),
            concat!(
                r#"{"frame": 1, "landmarks": [{"id": 13, "x": 0.5, "y": 0.5}]}"#,
                "\n\n",
                r#"{"frame": 2, "landmarks": []}"#,
                "\n",
                r#"{"frame": 3, "landmarks": [{"id": 14, "x": 0.1, "y": 0.9}]}"#,
                "\n"
            ),
        )
        .unwrap();
        write_depth(dir.path(), 1, 1200);
        write_depth(dir.path(), 2, 1300);
        dir
    }

    #[test]
    fn test_reads_frames_in_order() {
        let dir = make_session();
        let mut reader = SessionReader::open(dir.path()).unwrap();

        assert_eq!(reader.total_frames(), 3);
        assert_eq!(reader.intrinsics().model, DistortionModel::BrownConrady);
        assert_eq!(reader.depth_scale(), 0.001);

        let first = reader.next().unwrap().unwrap();
        assert_eq!(first.index, 1);
        assert_eq!(first.landmarks, vec![PoseLandmark::new(13, 0.5, 0.5)]);
        assert_eq!(first.depth.width(), 8);
        assert!((first.depth.distance(2, 2).unwrap() - 1.2).abs() < 1e-6);

        let second = reader.next().unwrap().unwrap();
        assert!(second.landmarks.is_empty());
        assert!((reader.get_progress() - 2.0 / 3.0).abs() < 1e-6);

        // Frame 3 has no depth image on disk.
        assert!(matches!(reader.next(), Some(Err(TrackingError::Session(_)))));
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_bad_landmark_line_reports_line_number() {
        let dir = make_session();
        fs::write(dir.path().join("landmarks.jsonl"), "{\"frame\": 1}\nnot json\n").unwrap();

        match SessionReader::open(dir.path()) {
            Err(TrackingError::Session(msg)) => assert!(msg.contains("line 2")),
            other => panic!("unexpected: {:?}", other.err()),
        }
    }

    #[test]
    fn test_missing_directory() {
        assert!(SessionReader::open("/nonexistent/session").is_err());
    }
}
