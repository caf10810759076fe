//! Document intake for AI extraction.
//!
//! Loads uploads from the object store, checks their size and type, and
//! turns them into content blocks for the model.

use image::ImageFormat;

use crate::ai::ContentBlock;
use crate::error::ExtractError;
use crate::storage::ObjectStore;

/// Image formats accepted for upload.
pub const ALLOWED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Gif,
    ImageFormat::WebP,
];

/// Maximum size of a single upload (10MB).
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// An upload that passed validation.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: String,
    pub media_type: String,
    pub data: Vec<u8>,
}

impl Document {
    pub fn content_block(&self) -> ContentBlock {
        if self.media_type == PDF_MEDIA_TYPE {
            ContentBlock::pdf(&self.data)
        } else {
            ContentBlock::image(&self.media_type, &self.data)
        }
    }
}

/// Detect the media type of an upload from its leading bytes.
pub fn detect_media_type(data: &[u8]) -> Result<String, String> {
    if data.starts_with(b"%PDF-") {
        return Ok(PDF_MEDIA_TYPE.to_string());
    }

    let format = image::guess_format(data)
        .map_err(|_| "Could not detect file type. Upload a JPEG, PNG, GIF, WebP or PDF".to_string())?;

    if !ALLOWED_FORMATS.contains(&format) {
        return Err(format!(
            "Unsupported image format: {:?}. Allowed: JPEG, PNG, GIF, WebP, PDF",
            format
        ));
    }

    Ok(format.to_mime_type().to_string())
}

/// Validate raw upload bytes.
pub fn validate_document(path: &str, data: Vec<u8>) -> Result<Document, ExtractError> {
    if data.is_empty() {
        return Err(ExtractError::Document(format!("{path} is empty")));
    }
    if data.len() > MAX_FILE_SIZE {
        return Err(ExtractError::Document(format!(
            "{path} is too large: {} bytes (max {})",
            data.len(),
            MAX_FILE_SIZE
        )));
    }

    let media_type = detect_media_type(&data).map_err(ExtractError::Document)?;
    Ok(Document {
        path: path.to_string(),
        media_type,
        data,
    })
}

/// Load and validate every upload, in order.
pub async fn load_documents(
    store: &dyn ObjectStore,
    paths: &[String],
) -> Result<Vec<Document>, ExtractError> {
    if paths.is_empty() {
        return Err(ExtractError::InvalidInput(
            "at least one document is required".to_string(),
        ));
    }

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let data = store.get(path).await.map_err(|e| {
            tracing::warn!(path = %path, error = %e, "failed to read upload");
            ExtractError::Storage {
                path: path.clone(),
                reason: e.to_string(),
            }
        })?;
        let document = validate_document(path, data)?;
        tracing::debug!(path = %path, media_type = %document.media_type, "loaded upload");
        documents.push(document);
    }
    Ok(documents)
}
