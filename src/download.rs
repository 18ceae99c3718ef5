use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

/// A stored file streamed back as an attachment.
#[derive(Debug, Clone)]
pub struct FileDownload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FileDownload {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// `attachment; filename="..."` with quotes and control characters
    /// stripped from the name.
    pub fn disposition(&self) -> String {
        let safe: String = self
            .file_name
            .chars()
            .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
            .collect();
        let safe = if safe.trim().is_empty() {
            "download".to_string()
        } else {
            safe
        };
        format!("attachment; filename=\"{safe}\"")
    }
}

impl IntoResponse for FileDownload {
    fn into_response(self) -> Response {
        let content_type = HeaderValue::from_str(&self.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
        let disposition = HeaderValue::from_str(&self.disposition())
            .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
        let length = self.bytes.len();

        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, content_type),
                (header::CONTENT_DISPOSITION, disposition),
                (header::CONTENT_LENGTH, HeaderValue::from(length)),
            ],
            Body::from(self.bytes),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disposition_strips_quotes() {
        let file = FileDownload::new("my \"final\" essay.pdf", "application/pdf", vec![1]);
        assert_eq!(file.disposition(), "attachment; filename=\"my final essay.pdf\"");
    }

    #[test]
    fn test_response_headers() {
        let response = FileDownload::new("a.pdf", "application/pdf", b"%PDF".to_vec()).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "4");
    }
}
