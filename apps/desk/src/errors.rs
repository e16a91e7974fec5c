use thiserror::Error;

use crate::api_client::ApiError;

pub const EXTRACTION_FALLBACK: &str = "Failed to extract text from resume";
pub const GENERATION_FALLBACK: &str = "Failed to generate cover letter";

/// Controller-level error type.
/// `Display` is the exact text written into the page's error regions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControllerError {
    #[error("Please upload a PDF or Word document")]
    UnsupportedFileType,

    #[error("Resume is too large to upload ({size} bytes, limit {limit} bytes)")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("A resume is already being processed")]
    UploadInProgress,

    #[error("{0}")]
    ExtractionFailed(String),

    #[error("Please upload a resume and enter a job description")]
    MissingInput,

    #[error("{0}")]
    GenerationFailed(String),
}

impl ControllerError {
    pub fn extraction(err: &ApiError) -> Self {
        ControllerError::ExtractionFailed(
            err.server_message()
                .unwrap_or(EXTRACTION_FALLBACK)
                .to_string(),
        )
    }

    pub fn generation(err: &ApiError) -> Self {
        ControllerError::GenerationFailed(
            err.server_message()
                .unwrap_or(GENERATION_FALLBACK)
                .to_string(),
        )
    }
}
