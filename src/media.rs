/// Media folder inventory.
///
/// Enumerates the files physically present under `word/media/` and answers
/// membership queries in the relationship-table path convention
/// (`media/<filename>`). The inventory never mutates the folder; imports
/// happen in the reconciliation engine after a repair decision.
use crate::alloc;
use crate::error::{FixError, Result};
use std::collections::BTreeSet;
use std::path::Path;

/// Snapshot of the media folder contents.
#[derive(Debug)]
pub struct MediaInventory {
    /// Bare filenames, sorted
    filenames: BTreeSet<String>,
}

impl MediaInventory {
    /// Scan the media directory. A missing directory yields an empty
    /// inventory; a package without images has no media folder at all.
    pub fn scan(media_dir: &Path) -> Result<Self> {
        let mut filenames = BTreeSet::new();

        if media_dir.is_dir() {
            for entry in std::fs::read_dir(media_dir)? {
                let entry = entry?;
                if entry.file_type()?.is_file() {
                    let name = entry.file_name();
                    let name = name.to_str().ok_or_else(|| FixError::Parse {
                        what: "media filename",
                        value: name.to_string_lossy().into_owned(),
                    })?;
                    filenames.insert(name.to_string());
                }
            }
        }

        Ok(Self { filenames })
    }

    /// Whether a bare filename is present.
    #[inline]
    pub fn contains(&self, filename: &str) -> bool {
        self.filenames.contains(filename)
    }

    /// Whether a relationship-convention target path ("media/<name>")
    /// resolves to a present file.
    pub fn contains_target(&self, target: &str) -> bool {
        match target.strip_prefix("media/") {
            Some(name) => self.filenames.contains(name),
            None => false,
        }
    }

    /// Bare filenames in sorted order.
    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.filenames.iter().map(|s| s.as_str())
    }

    /// Target paths in the relationship-table convention.
    pub fn targets(&self) -> impl Iterator<Item = String> + '_ {
        self.filenames.iter().map(|name| format!("media/{}", name))
    }

    /// Number of media files present.
    #[inline]
    pub fn len(&self) -> usize {
        self.filenames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.filenames.is_empty()
    }

    /// Maximum "image<N>" sequence number over the inventory, used to seed
    /// the media-name cursor. Fails on a filename outside the pattern.
    pub fn max_media_seq(&self) -> Result<u64> {
        alloc::max_media_seq(self.filenames.iter().map(|s| s.as_str()))
    }
}
