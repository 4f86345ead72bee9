//! Automated job-application pipeline: matching, safety and risk gating,
//! decision synthesis, form submission, and the auto-apply queue.

pub mod decision;
pub mod domain;
pub mod matching;
pub mod queue;
pub mod risk;
pub mod router;
pub mod safety;
pub mod submission;
pub mod timing;

pub use decision::{Decision, DecisionCache, DecisionEngine, Verdict};
pub use domain::{JobId, JobPosting, UserId, UserProfile};
pub use matching::{MatchResult, MatchStrategy, MatchingEngine};
pub use queue::{AutopilotDeps, AutopilotError, AutopilotService, AutopilotSettings};
pub use router::autopilot_router;
pub use safety::{SafetyEvaluator, SafetyLimits, SafetyReport};
pub use submission::{SubmissionMachine, SubmissionPayload};
