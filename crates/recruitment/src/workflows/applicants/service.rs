use std::sync::Arc;

use tracing::info;

use super::domain::{Applicant, ApplicantId, ApplicantRegistration, StageUpdate};
use super::repository::{ApplicantRepository, RepositoryError};

/// Intake and stage management on top of the applicant repository.
pub struct ApplicantService<R> {
    repository: Arc<R>,
}

impl<R> ApplicantService<R>
where
    R: ApplicantRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Validate and store a new applicant.
    pub fn register(
        &self,
        registration: ApplicantRegistration,
    ) -> Result<Applicant, ApplicantServiceError> {
        validate_registration(&registration)?;
        let applicant = self.repository.insert(registration)?;
        info!(applicant_id = %applicant.id, "applicant registered");
        Ok(applicant)
    }

    pub fn get(&self, id: ApplicantId) -> Result<Applicant, ApplicantServiceError> {
        let applicant = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(applicant)
    }

    pub fn update_stage(
        &self,
        id: ApplicantId,
        update: StageUpdate,
    ) -> Result<Applicant, ApplicantServiceError> {
        let stage = update.stage;
        let applicant = self.repository.update_stage(id, update)?;
        info!(applicant_id = %id, stage = stage.label(), "applicant stage updated");
        Ok(applicant)
    }
}

fn validate_registration(registration: &ApplicantRegistration) -> Result<(), RegistrationError> {
    if registration.first_name.trim().is_empty() {
        return Err(RegistrationError::MissingField("first_name"));
    }
    if registration.last_name.trim().is_empty() {
        return Err(RegistrationError::MissingField("last_name"));
    }

    let email = registration.email.trim();
    if email.is_empty() {
        return Err(RegistrationError::MissingField("email"));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(RegistrationError::InvalidEmail(email.to_string())),
    }
}

/// Intake form problems reported back to the applicant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("'{0}' is not a valid e-mail address")]
    InvalidEmail(String),
}

/// Error raised by the applicant service.
#[derive(Debug, thiserror::Error)]
pub enum ApplicantServiceError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
