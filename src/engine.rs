/// The reconciliation engine.
///
/// One run loads the document body and the relationship table once, builds
/// the media inventory and the diagnostic report, then walks the staging
/// directory of candidate replacement images. Each candidate whose filename
/// matches one or more placeholder graphic references is repaired with one
/// transaction per reference: allocate a fresh relationship id and media
/// filename, copy the file in, register the relationship, patch the blip.
/// Once every reference is repaired, the mutated document and table are
/// persisted and only then is the candidate retired to the done directory,
/// so a rerun can never consume it twice and a retired candidate's repairs
/// are always on disk. A run with nothing to repair leaves the package
/// byte-for-byte unchanged.
use crate::alloc::{IdCursor, MediaName, RelId};
use crate::document;
use crate::error::{FixError, Result};
use crate::media::MediaInventory;
use crate::ns;
use crate::rels::{RelTable, Relationship};
use crate::report::Report;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Relationship id conventionally left unresolved by upstream tooling to
/// mark "image needs repair".
pub const DEFAULT_PLACEHOLDER: &str = "rId7";

/// Filesystem layout and tuning for one repair run.
#[derive(Debug, Clone)]
pub struct RepairConfig {
    /// Root of the unpacked package (the directory holding `word/`)
    pub package_root: PathBuf,

    /// Directory of candidate replacement images
    pub staging_dir: PathBuf,

    /// Destination for successfully imported candidates
    pub done_dir: PathBuf,

    /// Placeholder sentinel relationship id
    pub placeholder: String,
}

impl RepairConfig {
    /// Create a config with the default placeholder sentinel.
    pub fn new<P, Q, R>(package_root: P, staging_dir: Q, done_dir: R) -> Self
    where
        P: Into<PathBuf>,
        Q: Into<PathBuf>,
        R: Into<PathBuf>,
    {
        Self {
            package_root: package_root.into(),
            staging_dir: staging_dir.into(),
            done_dir: done_dir.into(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        }
    }

    /// Override the placeholder sentinel.
    pub fn with_placeholder<S: Into<String>>(mut self, placeholder: S) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    /// Path of the document body part.
    pub fn document_path(&self) -> PathBuf {
        self.package_root.join("word").join("document.xml")
    }

    /// Path of the relationship table part.
    pub fn rels_path(&self) -> PathBuf {
        self.package_root.join("word").join("_rels").join("document.xml.rels")
    }

    /// Path of the media folder.
    pub fn media_dir(&self) -> PathBuf {
        self.package_root.join("word").join("media")
    }
}

/// Outcome counters for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Blip references found in the body
    pub blips: usize,

    /// Graphic references (name + blip) found in the body
    pub graphics: usize,

    /// Candidate files seen in the staging directory
    pub candidates: usize,

    /// Candidates left in place because nothing referenced them
    pub skipped: usize,

    /// Individual repair transactions performed
    pub repairs: usize,
}

/// Orchestrates one reconciliation run over a package directory.
pub struct Reconciler {
    config: RepairConfig,
}

impl Reconciler {
    pub fn new(config: RepairConfig) -> Self {
        Self { config }
    }

    /// Build and return the diagnostic classification without mutating
    /// anything. This is the dry-run surface.
    pub fn classify(&self) -> Result<Report> {
        let doc_xml = fs::read(self.config.document_path())?;
        document::verify_namespaces(&doc_xml)?;
        let rels = RelTable::parse(&fs::read(self.config.rels_path())?)?;
        let inventory = MediaInventory::scan(&self.config.media_dir())?;
        Report::build(&doc_xml, &rels, &inventory)
    }

    /// Run reconciliation: classify, then repair every staged candidate
    /// that matches a placeholder reference.
    pub fn run(&self) -> Result<RunSummary> {
        let doc_path = self.config.document_path();
        let rels_path = self.config.rels_path();

        let mut doc_xml = fs::read(&doc_path)?;
        document::verify_namespaces(&doc_xml)?;
        let mut rels = RelTable::parse(&fs::read(&rels_path)?)?;
        let inventory = MediaInventory::scan(&self.config.media_dir())?;

        let report = Report::build(&doc_xml, &rels, &inventory)?;
        report.log();

        let graphics = document::graphic_refs(&doc_xml)?;
        info!(graphics = graphics.len(), "graphic references found");

        // Each cursor seeds from its own namespace and never cross-feeds.
        // The rel cursor also seeds past the sentinel: a fresh id equal to
        // the placeholder would keep matching the repair query.
        let placeholder_seq = RelId::parse(&self.config.placeholder)
            .map(|id| id.seq())
            .unwrap_or(0);
        let mut rel_cursor = IdCursor::seeded(rels.max_rel_seq()?.max(placeholder_seq));
        let mut media_cursor = IdCursor::seeded(inventory.max_media_seq()?);

        let mut summary = RunSummary {
            blips: report.embedded_ids.len(),
            graphics: graphics.len(),
            candidates: 0,
            skipped: 0,
            repairs: 0,
        };

        for candidate in self.staged_candidates()? {
            summary.candidates += 1;

            let name = candidate
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| FixError::Parse {
                    what: "candidate filename",
                    value: candidate.display().to_string(),
                })?
                .to_string();

            let matches =
                document::count_placeholder(&doc_xml, &name, &self.config.placeholder)?;
            if matches == 0 {
                debug!(candidate = %name, "no placeholder references; leaving in staging");
                summary.skipped += 1;
                continue;
            }

            info!(candidate = %name, matches, "repairing placeholder references");
            doc_xml = self.repair_candidate(
                doc_xml,
                &mut rels,
                &mut rel_cursor,
                &mut media_cursor,
                &candidate,
                &name,
                matches,
            )?;

            // Persist before retiring: once the candidate leaves staging
            // its repairs cannot be replayed, so they must already be on
            // disk. A run with nothing to repair never reaches this point
            // and stays a byte-for-byte no-op.
            fs::write(&doc_path, &doc_xml)?;
            fs::write(&rels_path, rels.to_xml())?;
            self.retire(&candidate, &name)?;
            summary.repairs += matches;
        }

        if summary.repairs > 0 {
            info!(repairs = summary.repairs, "document and relationship table persisted");
        }

        Ok(summary)
    }

    /// Candidate files in the staging directory, sorted by name so runs
    /// are deterministic. A missing staging directory means no candidates.
    fn staged_candidates(&self) -> Result<Vec<PathBuf>> {
        let mut candidates = Vec::new();

        if self.config.staging_dir.is_dir() {
            for entry in fs::read_dir(&self.config.staging_dir)? {
                let entry = entry?;
                if entry.file_type()?.is_file() {
                    candidates.push(entry.path());
                }
            }
        }

        candidates.sort();
        Ok(candidates)
    }

    /// Perform `matches` repair transactions for one candidate, returning
    /// the patched document bytes.
    ///
    /// Loop invariant: after each iteration the recomputed placeholder
    /// match count has decreased by exactly one, because the patch changed
    /// the matched blip's id. A violation means the document disagrees
    /// with the count the loop was planned from.
    #[allow(clippy::too_many_arguments)]
    fn repair_candidate(
        &self,
        mut doc_xml: Vec<u8>,
        rels: &mut RelTable,
        rel_cursor: &mut IdCursor,
        media_cursor: &mut IdCursor,
        candidate: &Path,
        name: &str,
        matches: usize,
    ) -> Result<Vec<u8>> {
        let ext = candidate
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .ok_or_else(|| FixError::Parse {
                what: "candidate extension",
                value: name.to_string(),
            })?;

        let media_dir = self.config.media_dir();
        fs::create_dir_all(&media_dir)?;

        for done in 0..matches {
            let rel_id = RelId::from_seq(rel_cursor.next());
            let media_name = MediaName::from_seq(media_cursor.next(), &ext);

            let target = media_dir.join(media_name.filename());
            debug!(from = %candidate.display(), to = %target.display(), "importing media file");
            import_media(candidate, &target)?;

            rels.append(Relationship::new(
                rel_id.as_str().to_string(),
                ns::IMAGE_RELTYPE.to_string(),
                format!("media/{}", media_name.filename()),
            ))?;

            doc_xml = document::patch_blip(
                &doc_xml,
                name,
                &self.config.placeholder,
                rel_id.as_str(),
            )
            .map_err(|err| match err {
                // The count promised another placeholder slot; the
                // document no longer has one.
                FixError::ElementNotFound(_) => FixError::Conflict(format!(
                    "match count for '{}' exceeds remaining placeholder references",
                    name
                )),
                other => other,
            })?;

            let remaining =
                document::count_placeholder(&doc_xml, name, &self.config.placeholder)?;
            let expected = matches - done - 1;
            if remaining != expected {
                return Err(FixError::Conflict(format!(
                    "after patching '{}', {} placeholder references remain (expected {})",
                    name, remaining, expected
                )));
            }

            info!(candidate = %name, rel_id = rel_id.as_str(), media = media_name.filename(), "repair applied");
        }

        Ok(doc_xml)
    }

    /// Move a fully repaired candidate out of staging, making a second
    /// import structurally impossible on rerun.
    fn retire(&self, candidate: &Path, name: &str) -> Result<()> {
        fs::create_dir_all(&self.config.done_dir)?;
        let done_path = self.config.done_dir.join(name);
        fs::rename(candidate, &done_path)?;
        info!(candidate = %name, "retired to done directory");
        Ok(())
    }
}

/// Copy a candidate into the media folder under its allocated name. The
/// target is created exclusively: a file already sitting there means the
/// allocator and the inventory disagree, and overwriting it would destroy
/// package content.
fn import_media(candidate: &Path, target: &Path) -> Result<()> {
    let mut dst = match fs::OpenOptions::new().write(true).create_new(true).open(target) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            return Err(FixError::Conflict(format!(
                "allocated media file '{}' already exists",
                target.display()
            )));
        }
        Err(err) => return Err(err.into()),
    };
    let mut src = fs::File::open(candidate)?;
    io::copy(&mut src, &mut dst)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_paths() {
        let config = RepairConfig::new("/pkg", "/staging", "/done");
        assert_eq!(config.document_path(), PathBuf::from("/pkg/word/document.xml"));
        assert_eq!(
            config.rels_path(),
            PathBuf::from("/pkg/word/_rels/document.xml.rels")
        );
        assert_eq!(config.media_dir(), PathBuf::from("/pkg/word/media"));
        assert_eq!(config.placeholder, DEFAULT_PLACEHOLDER);
    }

    #[test]
    fn test_placeholder_override() {
        let config = RepairConfig::new("/pkg", "/s", "/d").with_placeholder("rId99");
        assert_eq!(config.placeholder, "rId99");
    }

    #[test]
    fn test_import_media_copies_bytes() {
        let dir = tempfile::TempDir::new().unwrap();
        let src = dir.path().join("candidate.jpg");
        let target = dir.path().join("image4.jpg");
        fs::write(&src, b"pixels").unwrap();

        import_media(&src, &target).unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"pixels");
    }

    #[test]
    fn test_import_media_refuses_existing_target() {
        let dir = tempfile::TempDir::new().unwrap();
        let src = dir.path().join("candidate.jpg");
        let target = dir.path().join("image4.jpg");
        fs::write(&src, b"new").unwrap();
        fs::write(&target, b"old").unwrap();

        let err = import_media(&src, &target).unwrap_err();
        assert!(matches!(err, FixError::Conflict(_)));
        assert_eq!(fs::read(&target).unwrap(), b"old");
    }
}
