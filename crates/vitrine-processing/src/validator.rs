use serde::Serialize;
use vitrine_core::models::{content_types_for_extension, normalize_content_type};
use vitrine_core::{SourceFile, UploadError, UploadProfile, ValidationFailure};

/// Outcome of validating one file against a profile
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub passed: bool,
    pub reasons: Vec<ValidationFailure>,
}

impl ValidationReport {
    fn from_reasons(reasons: Vec<ValidationFailure>) -> Self {
        Self {
            passed: reasons.is_empty(),
            reasons,
        }
    }

    pub fn into_result(self) -> Result<(), UploadError> {
        if self.passed {
            Ok(())
        } else {
            Err(UploadError::Validation(self.reasons))
        }
    }
}

/// `image/jpg` is a common non-standard alias
fn canonical_mime(content_type: &str) -> String {
    let normalized = normalize_content_type(content_type);
    match normalized.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        _ => normalized,
    }
}

/// Upload file validator
///
/// Checks size, declared type, extension and magic bytes without decoding
/// any pixels. Every check runs so the user sees all problems at once.
pub struct UploadValidator;

impl UploadValidator {
    pub fn validate(file: &SourceFile, profile: &UploadProfile) -> ValidationReport {
        let checks = [
            Self::validate_file_size(file.size(), profile.max_size_bytes()),
            Self::validate_content_type(&file.content_type, profile.allowed_formats()),
            Self::validate_extension_content_type_match(&file.name, &file.content_type),
            Self::validate_signature(&file.data, &file.content_type),
        ];

        let reasons: Vec<ValidationFailure> = checks.into_iter().filter_map(Result::err).collect();

        if !reasons.is_empty() {
            tracing::debug!(
                file_name = %file.name,
                content_type = %file.content_type,
                size = file.size(),
                profile = %profile.id(),
                reasons = reasons.len(),
                "File failed validation"
            );
        }

        ValidationReport::from_reasons(reasons)
    }

    /// Validate file size
    pub fn validate_file_size(size: u64, max: u64) -> Result<(), ValidationFailure> {
        if size == 0 {
            return Err(ValidationFailure::EmptyFile);
        }

        if size > max {
            return Err(ValidationFailure::FileTooLarge { size, max });
        }

        Ok(())
    }

    /// Validate declared content type against the allowed set (case-insensitive)
    pub fn validate_content_type(
        content_type: &str,
        allowed: &[String],
    ) -> Result<(), ValidationFailure> {
        let declared = canonical_mime(content_type);

        if !allowed.iter().any(|ct| canonical_mime(ct) == declared) {
            return Err(ValidationFailure::UnsupportedFormat {
                content_type: content_type.to_string(),
                allowed: allowed.to_vec(),
            });
        }

        Ok(())
    }

    /// Validate that the declared content type agrees with the file extension
    pub fn validate_extension_content_type_match(
        filename: &str,
        content_type: &str,
    ) -> Result<(), ValidationFailure> {
        let Some(extension) = std::path::Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
        else {
            return Ok(());
        };

        let expected = content_types_for_extension(&extension);
        if expected.is_empty() {
            tracing::debug!(
                extension = %extension,
                content_type = %content_type,
                "Unknown extension, skipping content type cross-check"
            );
            return Ok(());
        }

        let declared = canonical_mime(content_type);
        if !expected.iter().any(|ct| canonical_mime(ct) == declared) {
            return Err(ValidationFailure::ExtensionMismatch {
                extension,
                content_type: content_type.to_string(),
            });
        }

        Ok(())
    }

    /// Validate that the file's magic bytes agree with the declared type.
    ///
    /// Unrecognised signatures pass; the decoder reports those.
    pub fn validate_signature(data: &[u8], content_type: &str) -> Result<(), ValidationFailure> {
        if data.is_empty() {
            return Ok(());
        }

        let Ok(format) = image::guess_format(data) else {
            return Ok(());
        };

        let detected = format.to_mime_type();
        let declared = canonical_mime(content_type);
        if canonical_mime(detected) != declared {
            return Err(ValidationFailure::SignatureMismatch {
                declared,
                detected: detected.to_string(),
            });
        }

        Ok(())
    }
}
