pub mod applicants;
pub mod assessment;
