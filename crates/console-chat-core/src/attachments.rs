//! User file attachments
//!
//! Files ride along with a single user turn. Only their metadata is kept on the
//! user message once the turn is over.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};

/// Maximum number of files per message
pub const MAX_FILES: usize = 5;

/// Maximum size of a single file (10 MiB)
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// A file attached to a user turn
#[derive(Clone, PartialEq, Eq)]
pub struct FileAttachment {
    pub name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl std::fmt::Debug for FileAttachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileAttachment")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.data.len())
            .finish()
    }
}

/// Display metadata kept on the user message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
}

impl FileAttachment {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Read a file from disk, inferring the MIME type from its extension.
    ///
    /// The size limit is checked against file metadata before reading.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let size = tokio::fs::metadata(path).await?.len();
        if size > MAX_FILE_SIZE {
            return Err(ValidationError::FileTooLarge {
                name,
                size,
                max: MAX_FILE_SIZE,
            }
            .into());
        }

        let data = tokio::fs::read(path).await?;
        Ok(Self::new(name, mime_type_for(path), data))
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn meta(&self) -> FileMeta {
        FileMeta {
            name: self.name.clone(),
            size: self.size(),
            mime_type: self.mime_type.clone(),
        }
    }
}

/// Check the count and size limits for one submission
pub fn validate_files(files: &[FileAttachment]) -> std::result::Result<(), ValidationError> {
    if files.len() > MAX_FILES {
        return Err(ValidationError::TooManyFiles {
            count: files.len(),
            max: MAX_FILES,
        });
    }
    if let Some(file) = files.iter().find(|f| f.size() > MAX_FILE_SIZE) {
        return Err(ValidationError::FileTooLarge {
            name: file.name.clone(),
            size: file.size(),
            max: MAX_FILE_SIZE,
        });
    }
    Ok(())
}

fn mime_type_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first()
        .map(|m| m.essence_str().to_owned())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_of(size: usize) -> FileAttachment {
        FileAttachment::new("blob.bin", "application/octet-stream", vec![0u8; size])
    }

    #[test]
    fn test_six_files_rejected() {
        let files: Vec<_> = (0..6).map(|_| file_of(1)).collect();
        assert_eq!(
            validate_files(&files),
            Err(ValidationError::TooManyFiles { count: 6, max: 5 })
        );
    }

    #[test]
    fn test_eleven_mib_rejected() {
        let files = vec![file_of(11 * 1024 * 1024)];
        assert!(matches!(
            validate_files(&files),
            Err(ValidationError::FileTooLarge { .. })
        ));
    }

    #[test]
    fn test_five_files_of_nine_mib_accepted() {
        let files: Vec<_> = (0..5).map(|_| file_of(9 * 1024 * 1024)).collect();
        assert!(validate_files(&files).is_ok());
    }

    #[test]
    fn test_exactly_ten_mib_accepted() {
        assert!(validate_files(&[file_of(MAX_FILE_SIZE as usize)]).is_ok());
    }

    #[test]
    fn test_mime_type_inference() {
        assert_eq!(mime_type_for(Path::new("a/photo.JPG")), "image/jpeg");
        assert_eq!(mime_type_for(Path::new("schema.json")), "application/json");
        assert_eq!(mime_type_for(Path::new("diagram.svg")), "image/svg+xml");
        assert_eq!(mime_type_for(Path::new("clip.mp4")), "video/mp4");
        assert_eq!(mime_type_for(Path::new("noext")), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_from_path_reads_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("rows.csv");
        std::fs::write(&path, "id,name\n1,a\n").unwrap();

        let file = FileAttachment::from_path(&path).await.unwrap();
        assert_eq!(file.name, "rows.csv");
        assert_eq!(file.mime_type, "text/csv");
        assert_eq!(file.meta().size, 12);
    }
}
