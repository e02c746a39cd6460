use std::path::{Path, PathBuf};
use tokio::fs;

use super::acquire::DictionarySource;
use crate::cache::{cache_key, entry_name};
use crate::error::{Error, Result};

/// Name of the dictionary configuration file MeCab looks for
pub const DICRC: &str = "dicrc";

/// One extracted dictionary file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryFile {
    /// Path inside the archive
    pub name: String,
    pub data: Vec<u8>,
}

impl DictionaryFile {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// The complete set of files produced by one acquisition
#[derive(Debug, Clone)]
pub struct DictionaryFiles {
    pub source: DictionarySource,
    pub files: Vec<DictionaryFile>,
}

impl DictionaryFiles {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DictionaryFile> {
        self.files.iter()
    }

    pub fn total_size(&self) -> u64 {
        self.files.iter().map(DictionaryFile::size).sum()
    }

    /// Find the `dicrc` marker, wherever it sits in archive order.
    pub fn dicrc(&self) -> Option<&DictionaryFile> {
        self.files
            .iter()
            .find(|f| f.name.rsplit('/').next() == Some(DICRC))
    }

    /// Directory prefix of the `dicrc` marker inside the archive, e.g.
    /// `ipadic-2.7.0/` (empty when it sits at the root).
    pub fn base_dir(&self) -> Result<&str> {
        let dicrc = self.dicrc().ok_or(Error::MissingDicrc)?;
        Ok(&dicrc.name[..dicrc.name.len() - DICRC.len()])
    }

    /// Write every file below `root`, keeping archive paths.
    ///
    /// Returns the directory containing `dicrc`, i.e. the directory to hand
    /// to the tagger.
    pub async fn materialize(&self, root: &Path) -> Result<PathBuf> {
        let base = self.base_dir()?.to_string();

        for file in &self.files {
            // Same normalization as cache keys, so names cannot escape root
            let key = cache_key(&file.name)?;
            let output_path = root.join(entry_name(&key));

            if let Some(parent) = output_path.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::write(&output_path, &file.data).await?;
        }

        Ok(root.join(base.trim_end_matches('/')))
    }
}

impl<'a> IntoIterator for &'a DictionaryFiles {
    type Item = &'a DictionaryFile;
    type IntoIter = std::slice::Iter<'a, DictionaryFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}
