// src/data.rs
use chrono::{DateTime, Local};
use csv::{Writer, WriterBuilder};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::angles::{JointAngle, JointAngles};
use crate::error::Result;

/// Default directory for angle logs: `~/Documents/PoseTracker`, or
/// `./output` when there is no documents folder.
pub fn default_output_dir() -> PathBuf {
    directories::UserDirs::new()
        .and_then(|dirs| dirs.document_dir().map(|p| p.join("PoseTracker")))
        .unwrap_or_else(|| PathBuf::from("./output"))
}

/// `angles_YYYYMMDD_HHMMSS.csv`
pub fn default_file_name() -> String {
    format!("angles_{}.csv", Local::now().format("%Y%m%d_%H%M%S"))
}

/// Appends one row per frame: a timestamp followed by every joint angle.
///
/// Opening an existing, non-empty file appends without repeating the
/// header, so a destination only ever gets one header row. Undefined
/// angles are written as empty fields.
pub struct AngleLogger {
    path: PathBuf,
    writer: Writer<File>,
    rows_written: usize,
}

impl AngleLogger {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let needs_header = match std::fs::metadata(&path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);

        if needs_header {
            writer.write_record(Self::header())?;
            writer.flush()?;
        }

        tracing::info!("Logging angles to {}", path.display());

        Ok(Self {
            path,
            writer,
            rows_written: 0,
        })
    }

    /// Open a timestamped file inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Result<Self> {
        Self::open(dir.as_ref().join(default_file_name()))
    }

    pub fn header() -> Vec<&'static str> {
        std::iter::once("timestamp")
            .chain(JointAngle::ALL.iter().map(JointAngle::name))
            .collect()
    }

    pub fn log(&mut self, angles: &JointAngles) -> Result<()> {
        self.log_at(Local::now(), angles)
    }

    pub fn log_at(&mut self, timestamp: DateTime<Local>, angles: &JointAngles) -> Result<()> {
        let mut record = Vec::with_capacity(JointAngle::ALL.len() + 1);
        record.push(timestamp.format("%Y-%m-%dT%H:%M:%S%.6f").to_string());
        record.extend(
            angles
                .iter()
                .map(|(_, value)| value.map(|v| v.to_string()).unwrap_or_default()),
        );

        self.writer.write_record(&record)?;
        // Keep the file consistent if the process dies mid-session
        self.writer.flush()?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn sample_angles() -> JointAngles {
        let mut angles = JointAngles::default();
        angles.set(JointAngle::LeftElbow, Some(90.5));
        angles.set(JointAngle::RightKnee, Some(172.25));
        angles
    }

    #[test]
    fn test_header_and_row_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("angles.csv");

        let mut logger = AngleLogger::open(&path).unwrap();
        let ts = Local.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        logger.log_at(ts, &sample_angles()).unwrap();
        assert_eq!(logger.rows_written(), 1);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(
            lines[0],
            "timestamp,left_elbow,right_elbow,left_shoulder,right_shoulder,left_knee,right_knee,left_hip,right_hip"
        );
        assert_eq!(lines[1], "2024-03-01T12:30:05.000000,90.5,,,,,172.25,,");
    }

    #[test]
    fn test_header_written_once_per_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("angles.csv");

        {
            let mut logger = AngleLogger::open(&path).unwrap();
            logger.log(&sample_angles()).unwrap();
        }
        {
            let mut logger = AngleLogger::open(&path).unwrap();
            logger.log(&sample_angles()).unwrap();
            logger.log(&JointAngles::default()).unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let headers = contents.lines().filter(|l| l.starts_with("timestamp")).count();
        assert_eq!(headers, 1);
        assert_eq!(contents.lines().count(), 4);
    }

    #[test]
    fn test_empty_existing_file_gets_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("angles.csv");
        File::create(&path).unwrap();

        AngleLogger::open(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("timestamp,left_elbow"));
    }

    #[test]
    fn test_in_dir_uses_timestamped_name() {
        let dir = TempDir::new().unwrap();
        let logger = AngleLogger::in_dir(dir.path()).unwrap();
        let name = logger.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("angles_") && name.ends_with(".csv"));
    }
}
