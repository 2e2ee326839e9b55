//! Uploaded image payloads

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::error::AnalysisError;

const GENERIC_BINARY: &str = "application/octet-stream";

/// Image bytes plus what the client told us about them
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    /// Declared MIME type, if any
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            bytes,
        }
    }

    /// Decode a payload given either as bare base64 or as a `data:` URL.
    /// A MIME type embedded in the data URL wins over `content_type`.
    pub fn from_base64(
        file_name: impl Into<String>,
        content_type: Option<String>,
        data: &str,
    ) -> Result<Self, AnalysisError> {
        let (embedded_type, encoded) = match data.strip_prefix("data:") {
            Some(rest) => {
                let (header, payload) = rest.split_once(',').ok_or_else(|| {
                    AnalysisError::Validation("malformed data URL: missing ','".to_string())
                })?;
                let mime = header.trim_end_matches(";base64");
                let mime = (!mime.is_empty()).then(|| mime.to_string());
                (mime, payload)
            }
            None => (None, data),
        };

        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| AnalysisError::Validation(format!("invalid base64 image data: {}", e)))?;

        Ok(Self::new(file_name, embedded_type.or(content_type), bytes))
    }

    /// Effective MIME type: the declared one unless it is missing or generic,
    /// in which case the bytes are sniffed.
    pub fn mime_type(&self) -> Option<String> {
        match self.content_type.as_deref().map(str::trim) {
            Some(declared) if !declared.is_empty() && declared != GENERIC_BINARY => {
                Some(declared.to_ascii_lowercase())
            }
            _ => infer::get(&self.bytes).map(|kind| kind.mime_type().to_string()),
        }
    }

    /// Image check by MIME-type prefix
    pub fn validate(&self) -> Result<String, AnalysisError> {
        if self.bytes.is_empty() {
            return Err(AnalysisError::Validation("image file is empty".to_string()));
        }

        match self.mime_type() {
            Some(mime) if mime.starts_with("image/") => Ok(mime),
            Some(mime) => Err(AnalysisError::Validation(format!(
                "file is not an image (content type {})",
                mime
            ))),
            None => Err(AnalysisError::Validation(
                "file is not an image (unknown content type)".to_string(),
            )),
        }
    }

    /// File extension for storage, from the file name or else the MIME subtype
    pub fn extension(&self) -> String {
        let from_name = std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| ext.to_ascii_lowercase());

        from_name
            .or_else(|| {
                self.mime_type()
                    .and_then(|mime| mime.split('/').nth(1).map(|sub| sub.replace("jpeg", "jpg")))
                    .map(|sub| sub.split('+').next().unwrap_or("bin").to_string())
            })
            .unwrap_or_else(|| "bin".to_string())
    }

    /// `data:<mime>;base64,<payload>` form expected by the AI collaborator
    pub fn to_data_url(&self) -> String {
        let mime = self.mime_type().unwrap_or_else(|| GENERIC_BINARY.to_string());
        format!("data:{};base64,{}", mime, BASE64.encode(&self.bytes))
    }
}
