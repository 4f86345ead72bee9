pub mod attempt;
pub mod form;
pub mod machine;

pub use attempt::{
    ApplicationAttempt, AttemptId, AttemptStatus, StepData, StepFailure,
};
pub use form::{detect_form_type, ApplicationStep, FormType};
pub use machine::{RetryPolicy, SubmissionMachine};

use async_trait::async_trait;

use super::domain::{JobPosting, UserProfile};
use super::queue::repository::RepositoryError;

/// Everything a step needs to fill a form for one user/job pair.
#[derive(Debug, Clone)]
pub struct SubmissionPayload {
    pub profile: UserProfile,
    pub job: JobPosting,
    pub cover_letter: Option<String>,
}

/// Port executing one form step. Implementations drive whatever automation
/// backend is wired in; the shipped executor fills values from the profile.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    async fn execute(
        &self,
        step: ApplicationStep,
        payload: &SubmissionPayload,
    ) -> Result<StepData, StepFailure>;
}

/// Port persisting attempts between transitions.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    async fn upsert(&self, attempt: &ApplicationAttempt) -> Result<(), RepositoryError>;
    async fn fetch(&self, id: &AttemptId) -> Result<Option<ApplicationAttempt>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum FormFetchError {
    #[error("form fetch failed: {0}")]
    Unreachable(String),
    #[error("form returned status {code}")]
    Status { code: u16 },
}

/// Port fetching the application page for classification.
#[async_trait]
pub trait FormFetcher: Send + Sync {
    async fn fetch(&self, apply_url: &str) -> Result<String, FormFetchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

const MAX_RESUME_BYTES: u64 = 5 * 1024 * 1024;

/// Default executor that fills every step from the collected profile.
#[derive(Debug, Default, Clone)]
pub struct ProfileStepExecutor;

#[async_trait]
impl StepExecutor for ProfileStepExecutor {
    async fn execute(
        &self,
        step: ApplicationStep,
        payload: &SubmissionPayload,
    ) -> Result<StepData, StepFailure> {
        let profile = &payload.profile;
        let mut data = StepData::new();

        match step {
            ApplicationStep::BasicInfo => {
                data.insert("full_name".to_string(), profile.full_name.clone());
                data.insert("email".to_string(), profile.email.clone());
            }
            ApplicationStep::ContactDetails => {
                data.insert("email".to_string(), profile.email.clone());
                if let Some(city) = &profile.location.city {
                    data.insert("city".to_string(), city.clone());
                }
            }
            ApplicationStep::Experience => {
                data.insert(
                    "years_of_experience".to_string(),
                    profile.years_of_experience.to_string(),
                );
            }
            ApplicationStep::Education => {
                data.insert(
                    "education".to_string(),
                    profile
                        .education
                        .map(|level| format!("{level:?}"))
                        .unwrap_or_else(|| "unspecified".to_string()),
                );
            }
            ApplicationStep::Skills => {
                data.insert("skills".to_string(), profile.skills.join(", "));
            }
            ApplicationStep::CoverLetter => {
                let letter = payload
                    .cover_letter
                    .clone()
                    .unwrap_or_else(|| format!("Application for {}", payload.job.title));
                data.insert("cover_letter".to_string(), letter);
            }
            ApplicationStep::ResumeUpload => {
                let resume = profile.resume.as_ref().ok_or_else(|| {
                    StepFailure::permanent(step, "no resume on file")
                })?;
                if resume.size_bytes > MAX_RESUME_BYTES {
                    return Err(StepFailure::permanent(
                        step,
                        format!("resume exceeds 5 MiB ({} bytes)", resume.size_bytes),
                    ));
                }
                data.insert("resume_id".to_string(), resume.resume_id.clone());
            }
            ApplicationStep::PortfolioLinks => {
                data.insert("portfolio".to_string(), profile.portfolio_urls.join(", "));
            }
            ApplicationStep::Availability => {
                data.insert("availability".to_string(), "immediate".to_string());
            }
            ApplicationStep::SalaryExpectations => {
                if let Some(target) = profile.salary_expectation.target {
                    data.insert("target_salary".to_string(), target.to_string());
                }
            }
            ApplicationStep::AdditionalQuestions => {
                data.insert("answered".to_string(), "true".to_string());
            }
            ApplicationStep::LegalAgreements => {
                data.insert("accepted".to_string(), "true".to_string());
            }
            ApplicationStep::PreviewSubmit => {
                data.insert("submitted".to_string(), "true".to_string());
            }
        }

        Ok(data)
    }
}
