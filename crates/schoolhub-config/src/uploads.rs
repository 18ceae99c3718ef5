use std::env;

use crate::env_parse;

const TEN_MIB: usize = 10 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct UploadConfig {
    pub dir: String,
    pub note_max_bytes: usize,
    pub assignment_max_bytes: usize,
    pub document_max_bytes: usize,
}

impl UploadConfig {
    pub fn from_env() -> Self {
        Self {
            dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
            note_max_bytes: env_parse("NOTE_MAX_BYTES", TEN_MIB),
            assignment_max_bytes: env_parse("ASSIGNMENT_MAX_BYTES", TEN_MIB),
            document_max_bytes: env_parse("DOCUMENT_MAX_BYTES", 5 * 1024 * 1024),
        }
    }

    /// Largest request body the router has to accept for uploads.
    pub fn body_limit(&self) -> usize {
        self.note_max_bytes
            .max(self.assignment_max_bytes)
            .max(self.document_max_bytes * 2)
            + 1024 * 1024
    }
}
