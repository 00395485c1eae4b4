use crate::workflow::runner::{JobOutcome, TrackPayload};
use serde::{Deserialize, Serialize};
use trackcore::telemetry::MetricsSnapshot;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Success body of `POST /process_video`.
#[derive(Debug, Clone, Serialize)]
pub struct JobResponse {
    pub job_id: String,
    #[serde(flatten)]
    pub track: TrackPayload,
    pub debug_video_url: String,
}

impl From<JobOutcome> for JobResponse {
    fn from(outcome: JobOutcome) -> Self {
        let job_id = outcome.job_id.to_string();
        Self {
            debug_video_url: format!("/get_debug_video/{}", job_id),
            job_id,
            track: outcome.track,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthBody {
    pub status: &'static str,
    #[serde(flatten)]
    pub jobs: MetricsSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackcore::processing::KinematicSeries;
    use trackcore::storage::JobId;

    #[test]
    fn raw_response_has_flat_fields() {
        let job_id = JobId::generate();
        let response = JobResponse::from(JobOutcome {
            job_id,
            track: TrackPayload::Raw {
                bbox_tracking: "{}".into(),
            },
        });
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["job_id"], job_id.to_string());
        assert_eq!(value["bbox_tracking"], "{}");
        assert_eq!(
            value["debug_video_url"],
            format!("/get_debug_video/{}", job_id)
        );
    }

    #[test]
    fn kinematics_response_lists_series() {
        let response = JobResponse::from(JobOutcome {
            job_id: JobId::generate(),
            track: TrackPayload::Kinematics(KinematicSeries::default()),
        });
        let value = serde_json::to_value(&response).unwrap();
        assert!(value["positions"].as_array().unwrap().is_empty());
        assert!(value["velocities"].as_array().unwrap().is_empty());
        assert!(value.get("bbox_tracking").is_none());
    }
}
