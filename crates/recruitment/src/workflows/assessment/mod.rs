//! Timed multiple-choice assessment with a one-attempt-per-applicant guard.
//!
//! The client side ([`AssessmentRunner`], [`AttemptGuard`], [`SessionTimer`]) runs one attempt
//! against a [`ScoreAuthority`]; the server side ([`AssessmentService`], [`assessment_router`])
//! owns the conditional score write that makes the guarantee hold across clients.

pub mod authority;
pub mod bank;
pub mod cache;
pub mod guard;
pub mod remote;
pub mod router;
pub mod runner;
pub mod scoring;
pub mod service;
pub mod session;
pub mod timer;

#[cfg(test)]
mod tests;

pub use authority::{AuthorityError, RemoteScore, RepositoryScoreAuthority, ScoreAuthority};
pub use bank::{PublicQuestion, Question, QuestionBank, QuestionBankError, QuestionId};
pub use cache::{
    CacheError, CompletionCache, CompletionMarker, FileCompletionCache, InMemoryCompletionCache,
};
pub use guard::{AttemptGuard, Eligibility, GuardError, RecordOutcome};
pub use remote::HttpScoreAuthority;
pub use router::assessment_router;
pub use runner::{AssessmentRunner, AssessmentSettings, Attempt, SubmissionOutcome};
pub use scoring::{score_answers, Answers, AttemptScore, ScoringPolicy};
pub use service::{
    AnswerSheet, AssessmentService, AssessmentServiceError, GradedSubmission, QuestionSheet,
    ScoreSubmission, ScoreView,
};
pub use session::{
    AssessmentSession, AttemptState, NavigationDecision, NavigationEvent, PageView, QuestionSlot,
    SessionError, SubmitTrigger,
};
pub use timer::{SessionTimer, TimerOutcome};
