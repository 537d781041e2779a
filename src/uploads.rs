//! Storage of submission documents under the upload directory.
//!
//! Files are saved as `<uuid>.<ext>`; the client's file name only
//! contributes its extension.

use crate::errors::AppError;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

const CERTIFICATE_EXTENSIONS: &[&str] = &["pdf", "jpg", "jpeg", "png"];
const PROOF_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// The two documents attached to a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSlot {
    Certificate,
    Proof,
}

impl FileSlot {
    pub fn field_name(&self) -> &'static str {
        match self {
            FileSlot::Certificate => "certificate",
            FileSlot::Proof => "proof",
        }
    }

    pub fn from_field_name(name: &str) -> Option<Self> {
        match name {
            "certificate" => Some(FileSlot::Certificate),
            "proof" => Some(FileSlot::Proof),
            _ => None,
        }
    }

    fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            FileSlot::Certificate => CERTIFICATE_EXTENSIONS,
            FileSlot::Proof => PROOF_EXTENSIONS,
        }
    }

    /// Lower-cased extension of `file_name` if this slot accepts it.
    pub fn extension_for(&self, file_name: &str) -> Result<String, AppError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        if self.allowed_extensions().contains(&extension.as_str()) {
            Ok(extension)
        } else {
            Err(AppError::BadRequest(format!(
                "Invalid {} file type '{}'. Allowed: {}",
                self.field_name(),
                file_name,
                self.allowed_extensions().join(", ")
            )))
        }
    }
}

/// Upload directory plus the per-file size limit.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        UploadStore {
            dir: dir.into(),
            max_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn check_size(&self, slot: FileSlot, len: usize) -> Result<(), AppError> {
        if len == 0 {
            return Err(AppError::BadRequest(format!(
                "The {} file is empty",
                slot.field_name()
            )));
        }
        if len > self.max_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "The {} file exceeds the limit of {} bytes",
                slot.field_name(),
                self.max_bytes
            )));
        }
        Ok(())
    }

    /// Validates and writes one document, returning its stored name.
    pub async fn store(
        &self,
        slot: FileSlot,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<String, AppError> {
        let extension = slot.extension_for(file_name)?;
        self.check_size(slot, bytes.len())?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let stored_name = format!("{}.{}", Uuid::new_v4(), extension);
        tokio::fs::write(self.dir.join(&stored_name), bytes).await?;

        debug!(
            "Stored {} '{}' as {} ({} bytes)",
            slot.field_name(),
            file_name,
            stored_name,
            bytes.len()
        );
        Ok(stored_name)
    }

    /// Deletes stored files after a failed submission. Failures are only logged.
    pub async fn discard(&self, stored_names: &[String]) {
        for name in stored_names {
            if let Err(err) = tokio::fs::remove_file(self.dir.join(name)).await {
                warn!("Could not remove orphaned upload {}: {}", name, err);
            }
        }
    }

    /// Path of a previously stored file, `None` for names this store never issues.
    pub fn resolve(&self, stored_name: &str) -> Option<PathBuf> {
        is_valid_stored_name(stored_name).then(|| self.dir.join(stored_name))
    }
}

/// Whether `name` has the `<uuid>.<ext>` shape of a stored upload.
pub fn is_valid_stored_name(name: &str) -> bool {
    let Some((stem, extension)) = name.split_once('.') else {
        return false;
    };
    Uuid::parse_str(stem).is_ok() && CERTIFICATE_EXTENSIONS.contains(&extension)
}

pub fn content_type(stored_name: &str) -> &'static str {
    match stored_name.rsplit('.').next() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}
