use serde::{Deserialize, Serialize};

/// 200 body of `POST /api/extract-text`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractTextResponse {
    pub text: String,
}

/// Body of `POST /api/generate-cover-letter`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCoverLetterRequest {
    pub resume_text: String,
    pub job_description: String,
}

/// 200 body of `POST /api/generate-cover-letter`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateCoverLetterResponse {
    pub cover_letter: String,
}

/// Non-200 body shared by both endpoints. `error` may be absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_request_uses_camel_case() {
        let request = GenerateCoverLetterRequest {
            resume_text: "Rust engineer".into(),
            job_description: "Backend role".into(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["resumeText"], "Rust engineer");
        assert_eq!(json["jobDescription"], "Backend role");
    }

    #[test]
    fn test_generate_response_reads_cover_letter() {
        let body: GenerateCoverLetterResponse =
            serde_json::from_str(r#"{"coverLetter":"Dear Hiring Manager,"}"#).unwrap();
        assert_eq!(body.cover_letter, "Dear Hiring Manager,");
    }

    #[test]
    fn test_error_body_tolerates_missing_field() {
        let body: ErrorBody = serde_json::from_str("{}").unwrap();
        assert!(body.error.is_none());

        let body: ErrorBody = serde_json::from_str(r#"{"error":"No file part"}"#).unwrap();
        assert_eq!(body.error.as_deref(), Some("No file part"));
    }
}
