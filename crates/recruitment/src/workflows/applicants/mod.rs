//! Applicant intake and hiring-stage tracking.
//!
//! The applicant record also carries the assessment score, which the assessment workflow
//! writes through [`ApplicantRepository::record_score`].

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    AlreadyScored, Applicant, ApplicantId, ApplicantRegistration, ApplicantView, PipelineStage,
    ScoreRecord, StageUpdate,
};
pub use repository::{ApplicantRepository, InMemoryApplicantRepository, RepositoryError};
pub use router::applicant_router;
pub use service::{ApplicantService, ApplicantServiceError, RegistrationError};
