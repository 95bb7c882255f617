//! Study configuration, loaded from an optional JSON file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shared::duration_arg::DurationArg;

use crate::conditions::ConditionLists;
use crate::display_mode::Xrandr;
use crate::error::{StudyError, StudyResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    /// Pipe read by the display process
    pub fifo_path: PathBuf,
    /// CSV file ratings are appended to
    pub log_path: PathBuf,
    /// Viewing time before the rating prompt
    pub trial_timeout: DurationArg,
    /// Full walks over all conditions
    pub passes: usize,
    /// Wait after a refresh-rate switch
    pub settle_delay: DurationArg,
    pub xrandr_output: String,
    pub xrandr_mode: String,
    pub conditions: ConditionLists,
}

impl Default for StudyConfig {
    fn default() -> Self {
        let xrandr = Xrandr::default();
        Self {
            fifo_path: PathBuf::from("../studyfifo"),
            log_path: PathBuf::from("logfiles/log.csv"),
            trial_timeout: DurationArg::from_secs(5),
            passes: 3,
            settle_delay: DurationArg::from_secs(2),
            xrandr_output: xrandr.output,
            xrandr_mode: xrandr.mode,
            conditions: ConditionLists::default(),
        }
    }
}

impl StudyConfig {
    pub fn load(path: &Path) -> StudyResult<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|source| StudyError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn trial_timeout(&self) -> Duration {
        self.trial_timeout.as_duration()
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay.as_duration()
    }

    pub fn xrandr(&self) -> Xrandr {
        Xrandr::new(&self.xrandr_output, &self.xrandr_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StudyConfig::default();
        assert_eq!(config.fifo_path, PathBuf::from("../studyfifo"));
        assert_eq!(config.log_path, PathBuf::from("logfiles/log.csv"));
        assert_eq!(config.trial_timeout(), Duration::from_secs(5));
        assert_eq!(config.settle_delay(), Duration::from_secs(2));
        assert_eq!(config.passes, 3);
        assert_eq!(config.xrandr().args(60)[1], "DP-4");
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("study.json");
        std::fs::write(
            &path,
            r#"{
                "trial_timeout": "1500ms",
                "passes": 1,
                "xrandr_output": "HDMI-0",
                "conditions": { "markers": ["qr"] }
            }"#,
        )
        .unwrap();

        let config = StudyConfig::load(&path).unwrap();
        assert_eq!(config.trial_timeout(), Duration::from_millis(1500));
        assert_eq!(config.passes, 1);
        assert_eq!(config.xrandr_output, "HDMI-0");
        assert_eq!(config.conditions.markers, vec!["qr"]);
        assert_eq!(config.conditions.framerates.len(), 4);
        assert_eq!(config.fifo_path, PathBuf::from("../studyfifo"));
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("study.json");
        std::fs::write(&path, r#"{ "passes": "three" }"#).unwrap();
        assert!(matches!(
            StudyConfig::load(&path),
            Err(StudyError::Config { .. })
        ));
    }
}
