use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::StorageError;
use crate::processor::text::truncate_chars;

static RE_UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}._-]+").unwrap());

const MAX_SAFE_NAME_CHARS: usize = 160;

/// Reduces an uploaded filename to letters, digits, `.`, `_` and `-`.
pub fn safe_filename(filename: &str) -> String {
    let name = if filename.is_empty() { "document" } else { filename };
    truncate_chars(&RE_UNSAFE_CHARS.replace_all(name, "_"), MAX_SAFE_NAME_CHARS)
}

/// Upload area on local disk: one directory per case file.
pub struct FileStorage {
    upload_dir: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(upload_dir: P) -> Self {
        Self {
            upload_dir: upload_dir.as_ref().to_path_buf(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Writes `content` to `<upload_dir>/<case_id>/<uuid>-<safe name>` and
    /// returns the path. The file is created exclusively; an existing file is
    /// never overwritten.
    pub fn store_upload(
        &self,
        case_id: &str,
        filename: &str,
        content: &[u8],
    ) -> Result<PathBuf, StorageError> {
        let dir_path = self.upload_dir.join(case_id);
        std::fs::create_dir_all(&dir_path).map_err(|e| StorageError::CreateDirectory {
            path: dir_path.clone(),
            source: e,
        })?;

        let path = dir_path.join(format!(
            "{}-{}",
            uuid::Uuid::new_v4(),
            safe_filename(filename)
        ));

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| StorageError::WriteFile {
                path: path.clone(),
                source: e,
            })?;
        file.write_all(content).map_err(|e| StorageError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        log::debug!("Stored upload {} ({} bytes)", path.display(), content.len());
        Ok(path)
    }
}
