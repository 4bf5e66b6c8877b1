pub mod submission;
pub mod template;

pub type SubmissionId = uuid::Uuid;
