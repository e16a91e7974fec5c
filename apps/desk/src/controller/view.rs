use std::fmt::Write as _;
use std::time::Duration;

use tokio::time::Instant;

use crate::controller::render::RenderedLetter;

pub const EXTRACTING_STATUS: &str = "Extracting text...";
pub const EXTRACTED_STATUS: &str = "Text extracted successfully!";
pub const GENERATE_LABEL: &str = "Generate Cover Letter";
pub const GENERATING_LABEL: &str = "Generating...";
pub const COPY_LABEL: &str = "Copy to Clipboard";
pub const COPIED_LABEL: &str = "Copied!";
pub const COPY_FAILED_LABEL: &str = "Copy failed";
/// How long copy feedback replaces the copy label.
pub const COPY_FEEDBACK_WINDOW: Duration = Duration::from_secs(2);

/// Progress of one of the two flows (upload→extract, input→generate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowState {
    #[default]
    Idle,
    InProgress,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateButton {
    pub enabled: bool,
    pub label: String,
}

impl Default for GenerateButton {
    fn default() -> Self {
        Self {
            enabled: false,
            label: GENERATE_LABEL.to_string(),
        }
    }
}

/// Temporary copy-control label, shown until `until`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyFeedback {
    pub label: &'static str,
    pub until: Instant,
}

/// Everything the page shows. Empty strings are empty regions;
/// `None` regions are hidden.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageView {
    pub upload: FlowState,
    pub upload_status: String,
    pub upload_error: String,
    pub resume_preview: Option<String>,

    pub job_description: String,

    pub generate: FlowState,
    pub generate_button: GenerateButton,
    pub generate_error: String,
    pub result: Option<RenderedLetter>,

    pub copy_feedback: Option<CopyFeedback>,
}

impl PageView {
    pub fn copy_button_label(&self) -> &'static str {
        self.copy_button_label_at(Instant::now())
    }

    pub fn copy_button_label_at(&self, now: Instant) -> &'static str {
        match &self.copy_feedback {
            Some(feedback) if now < feedback.until => feedback.label,
            _ => COPY_LABEL,
        }
    }

    /// Compact text rendering for the terminal front end.
    pub fn summary(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "[resume] {:?}", self.upload);
        if !self.upload_status.is_empty() {
            let _ = writeln!(out, "  status: {}", self.upload_status);
        }
        if !self.upload_error.is_empty() {
            let _ = writeln!(out, "  error: {}", self.upload_error);
        }
        if let Some(preview) = &self.resume_preview {
            let _ = writeln!(out, "  preview: {}", preview_line(preview));
        }

        let _ = writeln!(
            out,
            "[job description] {} chars",
            self.job_description.chars().count()
        );

        let _ = writeln!(
            out,
            "[{}] {}",
            self.generate_button.label,
            if self.generate_button.enabled {
                "enabled"
            } else {
                "disabled"
            }
        );
        if !self.generate_error.is_empty() {
            let _ = writeln!(out, "  error: {}", self.generate_error);
        }

        if let Some(letter) = &self.result {
            let _ = writeln!(out, "[cover letter]");
            for paragraph in letter.paragraphs() {
                let _ = writeln!(out, "{paragraph}\n");
            }
            let _ = writeln!(out, "[{}]", self.copy_button_label());
        }

        out
    }
}

fn preview_line(text: &str) -> String {
    const MAX: usize = 80;
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > MAX {
        format!("{}…", flat.chars().take(MAX).collect::<String>())
    } else {
        flat
    }
}
