use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::bank::{PublicQuestion, QuestionBank};
use super::runner::AssessmentSettings;
use super::scoring::{score_answers, Answers, AttemptScore};
use crate::workflows::applicants::{
    Applicant, ApplicantId, ApplicantRepository, RepositoryError, ScoreRecord,
};

/// Body of the conditional score write.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub score: f64,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerSheet {
    pub answers: Answers,
}

/// Score lookup response; nulls mean the applicant has not taken the assessment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreView {
    pub applicant_id: ApplicantId,
    pub score: Option<f64>,
    pub passed: Option<bool>,
}

impl From<&Applicant> for ScoreView {
    fn from(applicant: &Applicant) -> Self {
        Self {
            applicant_id: applicant.id,
            score: applicant.assessment.map(|record| record.score),
            passed: applicant.assessment.map(|record| record.passed),
        }
    }
}

/// Everything a client needs to render the assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionSheet {
    pub version: String,
    pub duration_secs: u64,
    pub questions_per_page: usize,
    pub pass_threshold: f64,
    pub questions: Vec<PublicQuestion>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GradedSubmission {
    pub applicant_id: ApplicantId,
    pub result: AttemptScore,
}

/// Server side of the assessment: publishes the bank and owns the conditional score write.
pub struct AssessmentService<R> {
    repository: Arc<R>,
    bank: Arc<QuestionBank>,
    settings: AssessmentSettings,
}

impl<R> AssessmentService<R>
where
    R: ApplicantRepository + 'static,
{
    pub fn new(repository: Arc<R>, bank: Arc<QuestionBank>, settings: AssessmentSettings) -> Self {
        Self {
            repository,
            bank,
            settings,
        }
    }

    pub fn question_sheet(&self) -> QuestionSheet {
        QuestionSheet {
            version: self.bank.version().to_string(),
            duration_secs: self.settings.duration.as_secs(),
            questions_per_page: self.settings.questions_per_page,
            pass_threshold: self.settings.policy.pass_threshold,
            questions: self.bank.public_questions(),
        }
    }

    pub fn score_of(&self, applicant_id: ApplicantId) -> Result<ScoreView, AssessmentServiceError> {
        let applicant = self
            .repository
            .fetch(applicant_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(ScoreView::from(&applicant))
    }

    pub fn has_taken(&self, applicant_id: ApplicantId) -> Result<bool, AssessmentServiceError> {
        Ok(self.score_of(applicant_id)?.score.is_some())
    }

    /// Store a client-computed score if the applicant has none yet.
    pub fn record(
        &self,
        applicant_id: ApplicantId,
        submission: ScoreSubmission,
    ) -> Result<ScoreView, AssessmentServiceError> {
        if !submission.score.is_finite() || !(0.0..=100.0).contains(&submission.score) {
            return Err(AssessmentServiceError::InvalidScore(submission.score));
        }

        let record = ScoreRecord {
            score: submission.score,
            passed: submission.passed,
            submitted_at: Utc::now(),
        };
        let applicant = self.repository.record_score(applicant_id, record)?;
        info!(%applicant_id, score = submission.score, passed = submission.passed, "score persisted");
        Ok(ScoreView::from(&applicant))
    }

    /// Grade answers with the server's bank and policy, then store the score.
    pub fn grade_and_record(
        &self,
        applicant_id: ApplicantId,
        sheet: AnswerSheet,
    ) -> Result<GradedSubmission, AssessmentServiceError> {
        let result = score_answers(&self.bank, &sheet.answers, self.settings.policy);
        self.record(
            applicant_id,
            ScoreSubmission {
                score: result.score,
                passed: result.passed,
            },
        )?;
        Ok(GradedSubmission {
            applicant_id,
            result,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssessmentServiceError {
    #[error("score {0} is outside 0..=100")]
    InvalidScore(f64),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
