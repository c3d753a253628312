use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::bank::{PublicQuestion, QuestionBank, QuestionId};
use super::guard::Eligibility;
use super::scoring::{score_answers, Answers, AttemptScore, ScoringPolicy};
use crate::workflows::applicants::ApplicantId;

/// Lifecycle of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AttemptState {
    Checking,
    Blocked { prior_score: Option<f64> },
    InProgress,
    Submitting,
    Submitted,
}

impl AttemptState {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Checking => "checking",
            Self::Blocked { .. } => "blocked",
            Self::InProgress => "in_progress",
            Self::Submitting => "submitting",
            Self::Submitted => "submitted",
        }
    }
}

/// What started the move into `Submitting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitTrigger {
    Manual,
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationEvent {
    Back,
    Reload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationDecision {
    Allow,
    /// Stay on the assessment and swallow the navigation.
    Suppress,
    RedirectToLogin,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("the assessment is not in progress (currently {0})")]
    NotInProgress(&'static str),
    #[error("answers can only be submitted from the final page")]
    NotOnFinalPage,
    #[error("question {0} is not part of this assessment")]
    UnknownQuestion(QuestionId),
    #[error("'{option}' is not an option for question {question}")]
    UnknownOption { question: QuestionId, option: String },
}

/// A question as rendered on the current page, with the applicant's selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionSlot {
    pub question: PublicQuestion,
    pub selected: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageView {
    /// One-based page number.
    pub number: usize,
    pub total_pages: usize,
    pub answered: usize,
    pub total_questions: usize,
    pub slots: Vec<QuestionSlot>,
}

/// In-memory state of one attempt. Answers are only mutable while `InProgress`, and the score is
/// computed exactly once, on entry into `Submitting`.
#[derive(Debug)]
pub struct AssessmentSession {
    applicant_id: ApplicantId,
    bank: Arc<QuestionBank>,
    policy: ScoringPolicy,
    questions_per_page: usize,
    state: AttemptState,
    answers: Answers,
    page: usize,
    started_at: Option<DateTime<Utc>>,
    submitted_at: Option<DateTime<Utc>>,
    trigger: Option<SubmitTrigger>,
    result: Option<AttemptScore>,
}

impl AssessmentSession {
    pub fn new(
        applicant_id: ApplicantId,
        bank: Arc<QuestionBank>,
        policy: ScoringPolicy,
        questions_per_page: usize,
    ) -> Self {
        Self {
            applicant_id,
            bank,
            policy,
            questions_per_page: questions_per_page.max(1),
            state: AttemptState::Checking,
            answers: Answers::new(),
            page: 0,
            started_at: None,
            submitted_at: None,
            trigger: None,
            result: None,
        }
    }

    pub fn applicant_id(&self) -> ApplicantId {
        self.applicant_id
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    pub fn result(&self) -> Option<AttemptScore> {
        self.result
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.submitted_at
    }

    pub fn trigger(&self) -> Option<SubmitTrigger> {
        self.trigger
    }

    /// Leave `Checking` based on the guard's verdict. Later calls are ignored.
    pub fn resolve(&mut self, eligibility: Eligibility, now: DateTime<Utc>) -> AttemptState {
        if self.state == AttemptState::Checking {
            self.state = match eligibility {
                Eligibility::Eligible => {
                    self.started_at = Some(now);
                    AttemptState::InProgress
                }
                Eligibility::AlreadyCompleted { prior_score } => {
                    AttemptState::Blocked { prior_score }
                }
            };
        }
        self.state
    }

    pub fn select(&mut self, question: QuestionId, option: &str) -> Result<(), SessionError> {
        self.ensure_in_progress()?;
        let entry = self
            .bank
            .get(question)
            .ok_or(SessionError::UnknownQuestion(question))?;
        if !entry.has_option(option) {
            return Err(SessionError::UnknownOption {
                question,
                option: option.to_string(),
            });
        }
        self.answers.insert(question, option.to_string());
        Ok(())
    }

    pub fn page_count(&self) -> usize {
        self.bank.page_count(self.questions_per_page)
    }

    pub fn is_final_page(&self) -> bool {
        self.page + 1 >= self.page_count()
    }

    pub fn next_page(&mut self) -> Result<usize, SessionError> {
        self.ensure_in_progress()?;
        if !self.is_final_page() {
            self.page += 1;
        }
        Ok(self.page)
    }

    pub fn previous_page(&mut self) -> Result<usize, SessionError> {
        self.ensure_in_progress()?;
        self.page = self.page.saturating_sub(1);
        Ok(self.page)
    }

    pub fn page_view(&self) -> PageView {
        let slots = self
            .bank
            .page(self.page, self.questions_per_page)
            .iter()
            .map(|question| QuestionSlot {
                question: question.public_view(),
                selected: self.answers.get(&question.id).cloned(),
            })
            .collect();

        PageView {
            number: self.page + 1,
            total_pages: self.page_count(),
            answered: self.answers.len(),
            total_questions: self.bank.len(),
            slots,
        }
    }

    /// Move `InProgress -> Submitting` and grade the current answers. Any other state rejects the
    /// call, which is what keeps the timer and the submit button from both scoring.
    pub fn begin_submission(
        &mut self,
        trigger: SubmitTrigger,
        now: DateTime<Utc>,
    ) -> Result<AttemptScore, SessionError> {
        self.ensure_in_progress()?;
        if trigger == SubmitTrigger::Manual && !self.is_final_page() {
            return Err(SessionError::NotOnFinalPage);
        }

        let result = score_answers(&self.bank, &self.answers, self.policy);
        self.state = AttemptState::Submitting;
        self.trigger = Some(trigger);
        self.submitted_at = Some(now);
        self.result = Some(result);
        Ok(result)
    }

    /// `Submitting -> Submitted`, whether or not the server acknowledged the score.
    pub fn complete_submission(&mut self) -> AttemptState {
        if self.state == AttemptState::Submitting {
            self.state = AttemptState::Submitted;
        }
        self.state
    }

    /// `Submitting -> Blocked`: another session's score won the conditional write.
    pub fn reject_submission(&mut self, prior_score: Option<f64>) -> AttemptState {
        if self.state == AttemptState::Submitting {
            self.state = AttemptState::Blocked { prior_score };
        }
        self.state
    }

    pub fn navigate(&self, event: NavigationEvent) -> NavigationDecision {
        match (self.state, event) {
            (AttemptState::Blocked { .. } | AttemptState::Submitted, _) => {
                NavigationDecision::RedirectToLogin
            }
            (AttemptState::InProgress | AttemptState::Submitting, _) => NavigationDecision::Suppress,
            (AttemptState::Checking, _) => NavigationDecision::Allow,
        }
    }

    fn ensure_in_progress(&self) -> Result<(), SessionError> {
        if self.state == AttemptState::InProgress {
            Ok(())
        } else {
            Err(SessionError::NotInProgress(self.state.label()))
        }
    }
}
