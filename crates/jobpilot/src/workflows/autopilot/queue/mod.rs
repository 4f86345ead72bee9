pub mod domain;
pub mod repository;
pub mod service;

pub use domain::{
    Application, ApplicationMethod, ApplicationStats, QueueItem, QueueStatus, QUEUE_TTL_DAYS,
};
pub use repository::{
    ApplicationCounts, ApplicationRepository, CoverLetterError, CoverLetterWriter, DispatchError,
    EmailDispatcher, IntelligenceProvider, JobCatalog, ProfileRepository, QueueRepository,
    QueueStatusCounts, RepositoryError,
};
pub use service::{
    AutopilotDeps, AutopilotError, AutopilotService, AutopilotSettings, Evaluation,
    MatchRunSummary, QueueRunSummary,
};
