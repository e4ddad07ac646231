use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::app::UploadConfig;
use crate::utils::ClientError;

/// Files selected for one upload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadBatch {
    /// Scanned test pages, sent as repeated `test_files` parts
    pub test_files: Vec<PathBuf>,
    /// Model solution, sent as `solution_file`
    pub solution_file: Option<PathBuf>,
}

impl UploadBatch {
    pub fn new(test_files: Vec<PathBuf>, solution_file: Option<PathBuf>) -> Self {
        Self {
            test_files,
            solution_file,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.test_files.is_empty() && self.solution_file.is_none()
    }

    pub fn file_count(&self) -> usize {
        self.test_files.len() + usize::from(self.solution_file.is_some())
    }

    /// Check the selection before anything goes over the wire
    pub fn validate(&self, rules: &UploadConfig) -> Result<(), ClientError> {
        if self.is_empty() {
            return Err(ClientError::InvalidUpload("No files selected".to_string()));
        }
        for path in &self.test_files {
            check_file(path, &rules.test_extensions, "test")?;
        }
        if let Some(path) = &self.solution_file {
            check_file(path, &rules.solution_extensions, "solution")?;
        }
        Ok(())
    }
}

fn check_file(path: &Path, allowed: &[String], role: &str) -> Result<(), ClientError> {
    if !path.is_file() {
        return Err(ClientError::InvalidUpload(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if !allowed.iter().any(|a| a.eq_ignore_ascii_case(&extension)) {
        return Err(ClientError::InvalidUpload(format!(
            "Unsupported {} file type: {} (allowed: {})",
            role,
            path.display(),
            allowed.join(", ")
        )));
    }
    Ok(())
}

/// What a successful upload reports back
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReply {
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    status: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

/// Map an upload response to success or `UploadFailed`.
///
/// Success needs a 2xx status and `"status": "success"` in the body.
pub fn interpret_upload(status: u16, body: &str) -> Result<UploadReply, ClientError> {
    let parsed: Option<UploadResponse> = serde_json::from_str(body).ok();
    let ok_status = (200..300).contains(&status);

    match parsed {
        Some(response) if ok_status && response.status.as_deref() == Some("success") => {
            Ok(UploadReply {
                message: response.message,
            })
        }
        Some(response) => Err(ClientError::UploadFailed(
            response
                .message
                .or(response.error)
                .unwrap_or_else(|| format!("HTTP {}", status)),
        )),
        None if ok_status => Err(ClientError::UploadFailed(format!(
            "unexpected response (HTTP {})",
            status
        ))),
        None => Err(ClientError::UploadFailed(format!("HTTP {}", status))),
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    answer: Option<String>,
    error: Option<String>,
}

/// Map a `/chat` response to the answer or `ChatFailed`
pub fn interpret_chat(status: u16, body: &str) -> Result<String, ClientError> {
    let parsed: Option<ChatResponse> = serde_json::from_str(body).ok();

    match parsed {
        Some(ChatResponse {
            answer: Some(answer),
            ..
        }) if (200..300).contains(&status) => Ok(answer),
        Some(ChatResponse {
            error: Some(error), ..
        }) => Err(ClientError::ChatFailed(error)),
        _ => Err(ClientError::ChatFailed(format!("HTTP {}", status))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"data").unwrap();
        path
    }

    #[test]
    fn test_validate_accepts_allowed_files() {
        let dir = TempDir::new().unwrap();
        let batch = UploadBatch::new(
            vec![touch(&dir, "page1.png"), touch(&dir, "page2.PNG")],
            Some(touch(&dir, "solution.md")),
        );
        assert_eq!(batch.file_count(), 3);
        assert!(batch.validate(&UploadConfig::default()).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_selection() {
        let dir = TempDir::new().unwrap();
        let rules = UploadConfig::default();

        let empty = UploadBatch::default();
        assert!(matches!(
            empty.validate(&rules),
            Err(ClientError::InvalidUpload(_))
        ));

        let missing = UploadBatch::new(vec![dir.path().join("ghost.png")], None);
        let err = missing.validate(&rules).unwrap_err();
        assert!(err.to_string().contains("File not found"));

        let wrong_type = UploadBatch::new(vec![touch(&dir, "notes.txt")], None);
        let err = wrong_type.validate(&rules).unwrap_err();
        assert!(err.to_string().contains("Unsupported test file type"));

        let no_ext = UploadBatch::new(vec![], Some(touch(&dir, "solution")));
        assert!(no_ext.validate(&rules).is_err());
    }

    #[test]
    fn test_interpret_upload_success() {
        let reply =
            interpret_upload(200, r#"{"status":"success","message":"2 files processed"}"#)
                .unwrap();
        assert_eq!(reply.message.as_deref(), Some("2 files processed"));
    }

    #[test]
    fn test_interpret_upload_failures() {
        let err = interpret_upload(500, "<html>Internal Server Error</html>").unwrap_err();
        assert_eq!(err.user_message(), "HTTP 500");

        let err = interpret_upload(200, r#"{"status":"error","message":"No PNG found"}"#)
            .unwrap_err();
        assert_eq!(err.user_message(), "No PNG found");

        let err = interpret_upload(400, r#"{"error":"Session not found"}"#).unwrap_err();
        assert_eq!(err.user_message(), "Session not found");

        let err = interpret_upload(200, "not json").unwrap_err();
        assert!(matches!(err, ClientError::UploadFailed(_)));
    }

    #[test]
    fn test_interpret_chat() {
        assert_eq!(interpret_chat(200, r#"{"answer":"X is..."}"#).unwrap(), "X is...");

        let err = interpret_chat(500, r#"{"error":"Failed to get response from LLM."}"#)
            .unwrap_err();
        assert_eq!(err.user_message(), "Failed to get response from LLM.");

        let err = interpret_chat(502, "").unwrap_err();
        assert_eq!(err.user_message(), "HTTP 502");
    }
}
