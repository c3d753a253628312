use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Numeric identifier assigned when an applicant registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicantId(pub u64);

impl fmt::Display for ApplicantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Intake form submitted by a prospective candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantRegistration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub job_id: Option<u64>,
}

/// Hiring stages an applicant moves through, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Application,
    Test,
    Assessment,
    Interview,
    Training,
    Completed,
}

impl PipelineStage {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Application => "Application",
            Self::Test => "Test",
            Self::Assessment => "Assessment",
            Self::Interview => "Interview",
            Self::Training => "Training",
            Self::Completed => "Completed",
        }
    }
}

/// Persisted assessment result. Written once; never replaced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub score: f64,
    pub passed: bool,
    pub submitted_at: DateTime<Utc>,
}

/// Staff-driven stage change, optionally scheduling the interview or training slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageUpdate {
    pub stage: PipelineStage,
    #[serde(default)]
    pub interview_date: Option<NaiveDate>,
    #[serde(default)]
    pub training_date: Option<NaiveDate>,
}

/// Server-side applicant record, the single source of truth for "has this applicant been scored".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Applicant {
    pub id: ApplicantId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub job_id: Option<u64>,
    pub stage: PipelineStage,
    pub interview_date: Option<NaiveDate>,
    pub training_date: Option<NaiveDate>,
    pub assessment: Option<ScoreRecord>,
    pub created_at: DateTime<Utc>,
}

/// Raised when a score write targets an applicant that already carries one.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("applicant has already taken the assessment (score {existing})")]
pub struct AlreadyScored {
    pub existing: f64,
}

impl Applicant {
    pub fn from_registration(
        id: ApplicantId,
        registration: ApplicantRegistration,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            first_name: registration.first_name.trim().to_string(),
            last_name: registration.last_name.trim().to_string(),
            email: registration.email.trim().to_string(),
            phone: registration.phone,
            job_id: registration.job_id,
            stage: PipelineStage::Application,
            interview_date: None,
            training_date: None,
            assessment: None,
            created_at,
        }
    }

    pub fn has_taken_assessment(&self) -> bool {
        self.assessment.is_some()
    }

    /// Attach an assessment result if none exists yet. Passing moves early-stage applicants on
    /// to the assessment stage.
    pub fn apply_score(&mut self, record: ScoreRecord) -> Result<(), AlreadyScored> {
        if let Some(existing) = &self.assessment {
            return Err(AlreadyScored {
                existing: existing.score,
            });
        }

        if record.passed && self.stage < PipelineStage::Assessment {
            self.stage = PipelineStage::Assessment;
        }
        self.assessment = Some(record);
        Ok(())
    }

    pub fn apply_stage(&mut self, update: StageUpdate) {
        self.stage = update.stage;
        if update.interview_date.is_some() {
            self.interview_date = update.interview_date;
        }
        if update.training_date.is_some() {
            self.training_date = update.training_date;
        }
    }

    pub fn view(&self) -> ApplicantView {
        ApplicantView {
            id: self.id,
            name: format!("{} {}", self.first_name, self.last_name),
            email: self.email.clone(),
            stage: self.stage,
            stage_label: self.stage.label(),
            interview_date: self.interview_date,
            training_date: self.training_date,
            score: self.assessment.map(|record| record.score),
            passed: self.assessment.map(|record| record.passed),
        }
    }
}

/// Representation returned by the applicant endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicantView {
    pub id: ApplicantId,
    pub name: String,
    pub email: String,
    pub stage: PipelineStage,
    pub stage_label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interview_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub training_date: Option<NaiveDate>,
    pub score: Option<f64>,
    pub passed: Option<bool>,
}
