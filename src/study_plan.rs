//! Study plan upload handling.
//!
//! The study plan is sent to step 3 as a PDF. It is validated locally so a
//! wrong or oversized file never reaches the network.

use std::path::Path;

use tracing::debug;

use crate::error::ValidationError;

/// Maximum accepted study plan size (10 MB).
pub const MAX_STUDY_PLAN_BYTES: u64 = 10 * 1024 * 1024;

pub const PDF_MIME: &str = "application/pdf";

const PDF_MAGIC: &[u8] = b"%PDF-";

/// A study plan file picked by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudyPlanFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl StudyPlanFile {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Load a file from disk and validate it.
    ///
    /// Size is checked from metadata first so oversized files are never read.
    pub fn from_path(path: &Path) -> Result<Self, StudyPlanError> {
        let meta = std::fs::metadata(path)?;
        check_size(meta.len())?;

        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "study_plan.pdf".to_string());
        let mime_type = detect_mime(&file_name, &bytes).to_string();
        debug!(
            "Loaded study plan {} ({} bytes, {})",
            file_name,
            bytes.len(),
            mime_type
        );

        let file = Self {
            file_name,
            mime_type,
            bytes,
        };
        file.validate()?;
        Ok(file)
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// PDF MIME type and at most [`MAX_STUDY_PLAN_BYTES`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.mime_type != PDF_MIME {
            return Err(ValidationError::NotPdf(self.mime_type.clone()));
        }
        check_size(self.size())
    }
}

/// Errors loading a study plan from disk.
#[derive(Debug, thiserror::Error)]
pub enum StudyPlanError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("Cannot read study plan: {0}")]
    Io(#[from] std::io::Error),
}

fn check_size(size: u64) -> Result<(), ValidationError> {
    if size > MAX_STUDY_PLAN_BYTES {
        return Err(ValidationError::FileTooLarge {
            size,
            max: MAX_STUDY_PLAN_BYTES,
        });
    }
    Ok(())
}

/// Content sniffing first, extension second.
pub fn detect_mime(file_name: &str, bytes: &[u8]) -> &'static str {
    if bytes.starts_with(PDF_MAGIC) {
        return PDF_MIME;
    }
    let ext = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "txt" => "text/plain",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn pdf_bytes(len: usize) -> Vec<u8> {
        let mut bytes = b"%PDF-1.7\n".to_vec();
        bytes.resize(len.max(bytes.len()), b'0');
        bytes
    }

    #[test]
    fn test_detect_mime() {
        assert_eq!(detect_mime("plan.bin", b"%PDF-1.4"), PDF_MIME);
        assert_eq!(detect_mime("plan.txt", b"hello"), "text/plain");
        // A .pdf name with non-PDF content is not trusted
        assert_eq!(detect_mime("plan.pdf", b"hello"), "application/octet-stream");
    }

    #[test]
    fn test_validate_rejects_non_pdf() {
        let file = StudyPlanFile::new("plan.docx", "application/msword", vec![1, 2, 3]);
        assert_eq!(
            file.validate(),
            Err(ValidationError::NotPdf("application/msword".to_string()))
        );
    }

    #[test]
    fn test_validate_size_boundary() {
        let exact = StudyPlanFile::new("plan.pdf", PDF_MIME, pdf_bytes(MAX_STUDY_PLAN_BYTES as usize));
        assert!(exact.validate().is_ok());

        let over = StudyPlanFile::new(
            "plan.pdf",
            PDF_MIME,
            pdf_bytes(MAX_STUDY_PLAN_BYTES as usize + 1),
        );
        assert!(matches!(
            over.validate(),
            Err(ValidationError::FileTooLarge { .. })
        ));
    }

    #[test]
    fn test_from_path_loads_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("piano_studi.pdf");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(&pdf_bytes(2048)).unwrap();

        let plan = StudyPlanFile::from_path(&path).unwrap();
        assert_eq!(plan.file_name, "piano_studi.pdf");
        assert_eq!(plan.mime_type, PDF_MIME);
        assert_eq!(plan.size(), 2048);
    }

    #[test]
    fn test_from_path_rejects_12mb_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.pdf");
        let f = std::fs::File::create(&path).unwrap();
        f.set_len(12 * 1024 * 1024).unwrap();

        let err = StudyPlanFile::from_path(&path).unwrap_err();
        assert!(matches!(
            err,
            StudyPlanError::Invalid(ValidationError::FileTooLarge { .. })
        ));
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = StudyPlanFile::from_path(Path::new("/nonexistent/plan.pdf")).unwrap_err();
        assert!(matches!(err, StudyPlanError::Io(_)));
    }
}
