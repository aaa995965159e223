use crate::ImporterId;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum PipelineError {
    StringError(String),
    // begin_editing() while a session is already editing
    AlreadyEditing,
    DuplicateImporter(ImporterId),
    // Failing to persist the imported-target record would cause silent
    // staleness on the next launch, so it fails the whole batch
    TargetStatePersist(Arc<std::io::Error>),
    IoError(Arc<std::io::Error>),
    JsonError(Arc<serde_json::Error>),
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            PipelineError::StringError(_) => None,
            PipelineError::AlreadyEditing => None,
            PipelineError::DuplicateImporter(_) => None,
            PipelineError::TargetStatePersist(ref e) => Some(&**e),
            PipelineError::IoError(ref e) => Some(&**e),
            PipelineError::JsonError(ref e) => Some(&**e),
        }
    }
}

impl core::fmt::Display for PipelineError {
    fn fmt(
        &self,
        fmt: &mut core::fmt::Formatter,
    ) -> core::fmt::Result {
        match *self {
            PipelineError::StringError(ref e) => e.fmt(fmt),
            PipelineError::AlreadyEditing => {
                "begin_editing() called while a session was already editing".fmt(fmt)
            }
            PipelineError::DuplicateImporter(ref id) => {
                write!(fmt, "an importer with id {:?} is already registered", id)
            }
            PipelineError::TargetStatePersist(ref e) => {
                write!(fmt, "failed to persist imported-target state: {}", e)
            }
            PipelineError::IoError(ref e) => e.fmt(fmt),
            PipelineError::JsonError(ref e) => e.fmt(fmt),
        }
    }
}

impl From<&str> for PipelineError {
    fn from(str: &str) -> Self {
        PipelineError::StringError(str.to_string())
    }
}

impl From<String> for PipelineError {
    fn from(string: String) -> Self {
        PipelineError::StringError(string)
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(error: std::io::Error) -> Self {
        PipelineError::IoError(Arc::new(error))
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(error: serde_json::Error) -> Self {
        PipelineError::JsonError(Arc::new(error))
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
