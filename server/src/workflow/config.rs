use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use trackcore::track_interface::TrackingOptions;
use trackcore::tracker::{RemoteTrackerConfig, TrackerConfig};

/// Shape of the `/process_video` success body.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// Return the track document text as-is.
    #[default]
    Raw,
    /// Require `pixel_to_meter` and return position/velocity series.
    Kinematics,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RelayConfig {
    pub bind: SocketAddr,
    pub output_dir: PathBuf,
    pub response: ResponseMode,
    pub max_upload_bytes: u64,
    pub tracker: TrackerConfig,
    pub tracking: TrackingOptions,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 5000)),
            output_dir: PathBuf::from("sam2_output"),
            response: ResponseMode::Raw,
            max_upload_bytes: 512 * 1024 * 1024,
            tracker: TrackerConfig::default(),
            tracking: TrackingOptions::default(),
        }
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub bind: Option<SocketAddr>,
    pub output_dir: Option<PathBuf>,
    pub tracker_url: Option<String>,
    pub kinematics: bool,
}

impl RelayConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading relay config {}", path_ref.display()))?;
        let config: RelayConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing relay config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(bind) = overrides.bind {
            self.bind = bind;
        }
        if let Some(dir) = &overrides.output_dir {
            self.output_dir = dir.clone();
        }
        if let Some(url) = &overrides.tracker_url {
            let mut remote = match &self.tracker {
                TrackerConfig::Remote(remote) => remote.clone(),
                TrackerConfig::Replay(_) => RemoteTrackerConfig::default(),
            };
            remote.endpoint = url.clone();
            self.tracker = TrackerConfig::Remote(remote);
        }
        if overrides.kinematics {
            self.response = ResponseMode::Kinematics;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use trackcore::track_interface::ModelType;

    #[test]
    fn defaults_store_jobs_under_sam2_output() {
        let cfg = RelayConfig::default();
        assert_eq!(cfg.output_dir, PathBuf::from("sam2_output"));
        assert_eq!(cfg.response, ResponseMode::Raw);
        assert_eq!(cfg.tracking.frame_interval, 3);
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"bind: 0.0.0.0:8000\n\
              response: kinematics\n\
              tracker:\n  kind: replay\n  debug_video: fixtures/debug.mp4\n  bbox_tracking: fixtures/track.json\n\
              tracking:\n  model_type: small\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = RelayConfig::load(&path).unwrap();
        assert_eq!(cfg.bind.port(), 8000);
        assert_eq!(cfg.response, ResponseMode::Kinematics);
        assert_eq!(cfg.tracking.model_type, ModelType::Small);
        assert!(matches!(cfg.tracker, TrackerConfig::Replay(_)));
        assert_eq!(cfg.output_dir, PathBuf::from("sam2_output"));
    }

    #[test]
    fn example_config_parses() {
        let cfg: RelayConfig =
            serde_yaml::from_str(include_str!("../../../config/relay.example.yaml")).unwrap();
        assert_eq!(
            cfg,
            RelayConfig {
                tracker: cfg.tracker.clone(),
                ..RelayConfig::default()
            }
        );
        assert!(matches!(cfg.tracker, TrackerConfig::Remote(_)));
    }

    #[test]
    fn tracker_url_override_switches_to_remote() {
        let mut cfg = RelayConfig::default();
        cfg.tracker = TrackerConfig::Replay(trackcore::tracker::ReplayTrackerConfig {
            debug_video: "a.mp4".into(),
            bbox_tracking: "a.json".into(),
        });
        let cfg = cfg.with_overrides(&ConfigOverrides {
            tracker_url: Some("http://gpu-box:9000/track".into()),
            kinematics: true,
            ..Default::default()
        });
        assert_eq!(cfg.response, ResponseMode::Kinematics);
        match cfg.tracker {
            TrackerConfig::Remote(remote) => assert_eq!(remote.endpoint, "http://gpu-box:9000/track"),
            other => panic!("unexpected tracker {other:?}"),
        }
    }
}
