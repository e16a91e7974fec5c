//! Upload-and-generate controller: owns the extracted resume text and the page view.
//!
//! Each flow has a `begin_*` half that validates and updates the view before any
//! I/O, and a `finish_*` half that applies the outcome. The `page` event loop
//! runs the I/O in between as tasks; the `handle_*` / `generate_*` / `copy_*`
//! methods run both halves back to back for sequential callers.

pub mod render;
pub mod view;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::api_client::{ApiError, BackendApi};
use crate::clipboard::{Clipboard, ClipboardError};
use crate::errors::ControllerError;
use crate::models::api::GenerateCoverLetterRequest;
use crate::models::upload::UploadedFile;

use self::render::RenderedLetter;
use self::view::{
    CopyFeedback, FlowState, PageView, COPIED_LABEL, COPY_FAILED_LABEL, COPY_FEEDBACK_WINDOW,
    EXTRACTED_STATUS, EXTRACTING_STATUS, GENERATE_LABEL, GENERATING_LABEL,
};

pub struct UploadAndGenerateController {
    /// Session state. Empty until an extraction succeeds; a failed
    /// extraction leaves the previous value in place.
    extracted_resume_text: String,
    extraction_in_flight: bool,
    max_upload_bytes: u64,
    view: PageView,
}

impl UploadAndGenerateController {
    pub fn new(max_upload_bytes: u64) -> Self {
        Self {
            extracted_resume_text: String::new(),
            extraction_in_flight: false,
            max_upload_bytes,
            view: PageView::default(),
        }
    }

    pub fn view(&self) -> &PageView {
        &self.view
    }

    pub fn extracted_resume_text(&self) -> &str {
        &self.extracted_resume_text
    }

    pub fn is_generating(&self) -> bool {
        self.view.generate == FlowState::InProgress
    }

    // ── Upload → extract ────────────────────────────────────────────────────

    /// Validates the file and switches the view to "extracting".
    /// On `Err` the message is already on the page and nothing should be sent.
    pub fn begin_upload(&mut self, file: &UploadedFile) -> Result<(), ControllerError> {
        if self.extraction_in_flight {
            return Err(self.reject_upload(ControllerError::UploadInProgress));
        }

        if file.kind().is_none() {
            debug!("{} declared as {:?}", file.file_name, file.content_type);
            return Err(self.reject_upload(ControllerError::UnsupportedFileType));
        }

        if file.size() > self.max_upload_bytes {
            return Err(self.reject_upload(ControllerError::FileTooLarge {
                size: file.size(),
                limit: self.max_upload_bytes,
            }));
        }

        info!("Extracting text from {}", file.file_name);
        self.extraction_in_flight = true;
        self.view.upload = FlowState::InProgress;
        self.view.upload_status = EXTRACTING_STATUS.to_string();
        self.view.upload_error.clear();
        self.view.resume_preview = None;
        Ok(())
    }

    pub fn finish_upload(&mut self, result: Result<String, ApiError>) -> FlowState {
        self.extraction_in_flight = false;

        match result {
            Ok(text) => {
                info!("Resume text extracted ({} chars)", text.len());
                self.view.resume_preview = Some(text.clone());
                self.extracted_resume_text = text;
                self.view.upload = FlowState::Succeeded;
                self.view.upload_status = EXTRACTED_STATUS.to_string();
                self.view.upload_error.clear();
                self.update_generate_button_enablement();
            }
            Err(err) => {
                warn!("Resume extraction failed: {err}");
                self.view.upload = FlowState::Failed;
                self.view.upload_error = ControllerError::extraction(&err).to_string();
                self.view.upload_status.clear();
            }
        }

        self.view.upload
    }

    pub async fn handle_resume_upload(
        &mut self,
        api: &dyn BackendApi,
        file: UploadedFile,
    ) -> FlowState {
        if self.begin_upload(&file).is_err() {
            return self.view.upload;
        }
        let result = api.extract_text(&file).await;
        self.finish_upload(result)
    }

    fn reject_upload(&mut self, err: ControllerError) -> ControllerError {
        debug!("Upload rejected: {err:?}");
        self.view.upload_error = err.to_string();
        // An outstanding extraction keeps its status.
        if !self.extraction_in_flight {
            self.view.upload = FlowState::Failed;
            self.view.upload_status.clear();
        }
        err
    }

    // ── Input → generate ────────────────────────────────────────────────────

    pub fn set_job_description(&mut self, text: impl Into<String>) {
        self.view.job_description = text.into();
        self.update_generate_button_enablement();
    }

    pub fn update_generate_button_enablement(&mut self) {
        self.view.generate_button.enabled = self.has_required_input() && !self.is_generating();
    }

    fn has_required_input(&self) -> bool {
        !self.extracted_resume_text.is_empty() && !self.view.job_description.trim().is_empty()
    }

    /// Validates input and switches the view to "generating".
    /// Returns the request body to send.
    pub fn begin_generate(&mut self) -> Result<GenerateCoverLetterRequest, ControllerError> {
        if !self.has_required_input() {
            let err = ControllerError::MissingInput;
            self.view.generate = FlowState::Failed;
            self.view.generate_error = err.to_string();
            return Err(err);
        }

        info!("Generating cover letter");
        self.view.generate = FlowState::InProgress;
        self.view.generate_button.enabled = false;
        self.view.generate_button.label = GENERATING_LABEL.to_string();
        self.view.generate_error.clear();
        self.view.result = None;

        Ok(GenerateCoverLetterRequest {
            resume_text: self.extracted_resume_text.clone(),
            job_description: self.view.job_description.clone(),
        })
    }

    pub fn finish_generate(&mut self, result: Result<String, ApiError>) -> FlowState {
        match result {
            Ok(cover_letter) => {
                let letter = RenderedLetter::from_cover_letter(&cover_letter);
                info!(
                    "Cover letter generated ({} paragraphs)",
                    letter.paragraphs().len()
                );
                self.view.result = Some(letter);
                self.view.generate = FlowState::Succeeded;
            }
            Err(err) => {
                warn!("Cover letter generation failed: {err}");
                self.view.generate_error = ControllerError::generation(&err).to_string();
                self.view.result = None;
                self.view.generate = FlowState::Failed;
            }
        }

        self.view.generate_button.label = GENERATE_LABEL.to_string();
        self.update_generate_button_enablement();
        self.view.generate
    }

    pub async fn generate_cover_letter(&mut self, api: &dyn BackendApi) -> FlowState {
        let request = match self.begin_generate() {
            Ok(request) => request,
            Err(_) => return self.view.generate,
        };
        let result = api.generate_cover_letter(&request).await;
        self.finish_generate(result)
    }

    // ── Copy ────────────────────────────────────────────────────────────────

    /// Plain text of the visible result region, if there is one.
    pub fn copy_text(&self) -> Option<String> {
        self.view.result.as_ref().map(RenderedLetter::plain_text)
    }

    /// Shows copy feedback for the fixed window, success or not.
    pub fn finish_copy(&mut self, result: Result<(), ClipboardError>) {
        let label = match result {
            Ok(()) => {
                debug!("Cover letter copied to clipboard");
                COPIED_LABEL
            }
            Err(err) => {
                warn!("Clipboard write failed: {err}");
                COPY_FAILED_LABEL
            }
        };

        self.view.copy_feedback = Some(CopyFeedback {
            label,
            until: Instant::now() + COPY_FEEDBACK_WINDOW,
        });
    }

    /// Drops copy feedback whose window has closed at `now`, so a published
    /// view reads `Copy` again.
    pub fn clear_expired_copy_feedback(&mut self, now: Instant) {
        if self
            .view
            .copy_feedback
            .as_ref()
            .is_some_and(|feedback| now >= feedback.until)
        {
            self.view.copy_feedback = None;
        }
    }

    /// Returns `false` when there was nothing to copy.
    pub async fn copy_to_clipboard(&mut self, clipboard: &dyn Clipboard) -> bool {
        let Some(text) = self.copy_text() else {
            debug!("Copy requested with no cover letter shown");
            return false;
        };
        let result = clipboard.write_text(&text).await;
        self.finish_copy(result);
        true
    }
}
