use std::collections::HashMap;

use anyhow::anyhow;
use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
};

use schoolhub_core::AppError;
use schoolhub_core::file_storage::{DOC_MIME, DOCX_MIME, PDF_MIME};

/// A file part of a multipart request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Multipart body read fully into memory: text fields by name and file
/// parts by name. Parts with a file name are files, everything else is text.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    /// Trimmed text value, `None` when missing or blank.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// First present value among `names`, for fields clients send under
    /// more than one name.
    pub fn text_any(&self, names: &[&str]) -> Option<String> {
        names.iter().find_map(|name| self.text(name))
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name).filter(|f| !f.is_empty())
    }

    pub fn require_file(&mut self, name: &str, message: &str) -> Result<UploadedFile, AppError> {
        self.take_file(name)
            .ok_or_else(|| AppError::bad_request(anyhow!("{message}")))
    }

    /// Parses a JSON-encoded text field such as `parentDetails`.
    pub fn json<T: serde::de::DeserializeOwned>(&self, name: &str) -> Result<Option<T>, AppError> {
        match self.text(name) {
            None => Ok(None),
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|_| AppError::bad_request(anyhow!("{name} must be valid JSON"))),
        }
    }

    #[cfg(test)]
    pub fn from_parts(fields: &[(&str, &str)], files: Vec<(&str, UploadedFile)>) -> Self {
        Self {
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            files: files
                .into_iter()
                .map(|(k, f)| (k.to_string(), f))
                .collect(),
        }
    }
}

/// Content type sent by the client, falling back to one guessed from the
/// file extension.
pub fn resolve_content_type(declared: Option<&str>, file_name: &str) -> String {
    match declared {
        Some(ct) if !ct.is_empty() && ct != "application/octet-stream" => ct.to_string(),
        _ => {
            let extension = file_name
                .rsplit_once('.')
                .map(|(_, ext)| ext.to_ascii_lowercase())
                .unwrap_or_default();
            match extension.as_str() {
                "pdf" => PDF_MIME,
                "doc" => DOC_MIME,
                "docx" => DOCX_MIME,
                "png" => "image/png",
                "jpg" | "jpeg" => "image/jpeg",
                "webp" => "image/webp",
                "txt" => "text/plain",
                _ => "application/octet-stream",
            }
            .to_string()
        }
    }
}

impl<S> FromRequest<S> for MultipartForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|_| AppError::bad_request(anyhow!("Expected a multipart/form-data body")))?;

        let mut form = MultipartForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::new(e.status(), anyhow!(e.body_text())))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = resolve_content_type(field.content_type(), &file_name);
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::new(e.status(), anyhow!(e.body_text())))?;
                    form.files.insert(
                        name,
                        UploadedFile {
                            file_name,
                            content_type,
                            bytes,
                        },
                    );
                }
                None => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| AppError::new(e.status(), anyhow!(e.body_text())))?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_guess() {
        assert_eq!(resolve_content_type(None, "Algebra.PDF"), PDF_MIME);
        assert_eq!(
            resolve_content_type(Some("application/octet-stream"), "essay.docx"),
            DOCX_MIME
        );
        assert_eq!(resolve_content_type(Some("image/png"), "scan.pdf"), "image/png");
        assert_eq!(resolve_content_type(None, "README"), "application/octet-stream");
    }

    #[test]
    fn test_text_ignores_blank_values() {
        let form = MultipartForm::from_parts(&[("title", "  Fractions "), ("description", "  ")], vec![]);
        assert_eq!(form.text("title").as_deref(), Some("Fractions"));
        assert_eq!(form.text("description"), None);
        assert_eq!(form.text_any(&["class", "title"]).as_deref(), Some("Fractions"));
    }

    #[test]
    fn test_require_file() {
        let file = UploadedFile {
            file_name: "a.pdf".to_string(),
            content_type: PDF_MIME.to_string(),
            bytes: Bytes::from_static(b"%PDF"),
        };
        let mut form = MultipartForm::from_parts(&[], vec![("file", file)]);
        assert_eq!(form.require_file("file", "File is required").unwrap().len(), 4);
        let err = form.require_file("file", "File is required").unwrap_err();
        assert_eq!(err.status.as_u16(), 400);
    }
}
