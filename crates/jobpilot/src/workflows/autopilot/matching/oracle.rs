use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::super::domain::{JobPosting, UserProfile};

const MAX_RETRIES: u32 = 3;

/// Judgement returned by the scoring oracle for one profile/posting pair.
/// The breakdown and narrative fields keep the oracle's camelCase wire names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleAssessment {
    pub score: f64,
    pub confidence: f64,
    pub success_probability: f64,
    #[serde(default, rename = "categoryBreakdown")]
    pub category_breakdown: BTreeMap<String, f64>,
    #[serde(default, rename = "narrativeJustification")]
    pub narrative: Option<String>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub concerns: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("oracle request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("oracle returned status {code}")]
    Status { code: u16 },
    #[error("oracle payload malformed: {0}")]
    Payload(String),
    #[error("no oracle endpoint configured")]
    Unconfigured,
}

impl OracleError {
    fn is_transient(&self) -> bool {
        match self {
            OracleError::Http(err) => err.is_timeout() || err.is_connect(),
            OracleError::Status { code } => *code == 429 || *code >= 500,
            OracleError::Payload(_) | OracleError::Unconfigured => false,
        }
    }
}

/// Port for the external match-assessment oracle.
#[async_trait]
pub trait MatchOracle: Send + Sync {
    async fn assess(
        &self,
        profile: &UserProfile,
        job: &JobPosting,
    ) -> Result<OracleAssessment, OracleError>;
}

#[derive(Debug, Serialize)]
struct AssessmentRequest<'a> {
    title: &'a str,
    company: &'a str,
    description: &'a str,
    required_skills: &'a [String],
    preferred_skills: &'a [String],
    candidate_skills: &'a [String],
    years_of_experience: u8,
}

/// Oracle adapter speaking JSON over HTTP with capped-backoff retries.
pub struct HttpMatchOracle {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpMatchOracle {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/v1/assess", base_url.trim_end_matches('/')),
        }
    }

    async fn request_once(
        &self,
        payload: &AssessmentRequest<'_>,
    ) -> Result<OracleAssessment, OracleError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(payload)
            .timeout(Duration::from_secs(20))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(OracleError::Status {
                code: status.as_u16(),
            });
        }

        let assessment: OracleAssessment = response
            .json()
            .await
            .map_err(|err| OracleError::Payload(err.to_string()))?;

        if !(0.0..=100.0).contains(&assessment.score)
            || !(0.0..=1.0).contains(&assessment.confidence)
        {
            return Err(OracleError::Payload(format!(
                "score {} / confidence {} out of range",
                assessment.score, assessment.confidence
            )));
        }

        Ok(assessment)
    }
}

#[async_trait]
impl MatchOracle for HttpMatchOracle {
    async fn assess(
        &self,
        profile: &UserProfile,
        job: &JobPosting,
    ) -> Result<OracleAssessment, OracleError> {
        let payload = AssessmentRequest {
            title: &job.title,
            company: &job.company,
            description: &job.description,
            required_skills: &job.required_skills,
            preferred_skills: &job.preferred_skills,
            candidate_skills: &profile.skills,
            years_of_experience: profile.years_of_experience,
        };

        let mut last_error = OracleError::Unconfigured;
        for attempt in 0..MAX_RETRIES {
            match self.request_once(&payload).await {
                Ok(assessment) => return Ok(assessment),
                Err(err) if err.is_transient() && attempt + 1 < MAX_RETRIES => {
                    let delay = Duration::from_secs(1 << attempt);
                    tracing::warn!(attempt, error = %err, "oracle request failed; retrying");
                    tokio::time::sleep(delay).await;
                    last_error = err;
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_error)
    }
}
