/// Reconciliation diagnostics.
///
/// Before repairing, the three data sources are cross-checked and the
/// mismatches classified: media files present but unreferenced (orphans),
/// relationship targets with no file behind them (missing media), blip
/// references whose id resolves to nothing (dangling), and relationship
/// entries carrying the NULL sentinel. The classifications are
/// informational; repair decisions are made per candidate in the engine.
use crate::document;
use crate::error::Result;
use crate::media::MediaInventory;
use crate::rels::RelTable;
use tracing::{info, warn};

/// Cross-source classification of a package's image state.
#[derive(Debug)]
pub struct Report {
    /// Every blip embed id in the body, in document order, duplicates kept
    pub embedded_ids: Vec<String>,

    /// Media files that are the target of some working relationship
    pub referenced_media: Vec<String>,

    /// Media files present on disk but not referenced by any relationship
    pub orphaned_media: Vec<String>,

    /// Non-XML relationship targets with no file behind them
    pub missing_media: Vec<String>,

    /// Distinct embed ids that resolve to no working relationship
    pub dangling_ids: Vec<String>,

    /// Relationship ids whose target is the NULL sentinel
    pub null_target_ids: Vec<String>,
}

impl Report {
    /// Build the classification from the three loaded sources.
    pub fn build(doc_xml: &[u8], rels: &RelTable, inventory: &MediaInventory) -> Result<Self> {
        let embedded_ids = document::blip_ids(doc_xml)?;

        let mut referenced_media = Vec::new();
        let mut orphaned_media = Vec::new();
        for target in inventory.targets() {
            if rels.contains_target(&target) {
                referenced_media.push(target);
            } else {
                orphaned_media.push(target);
            }
        }

        let missing_media: Vec<String> = rels
            .non_xml_targets()
            .into_iter()
            .filter(|target| !inventory.contains_target(target))
            .map(String::from)
            .collect();

        let mut dangling_ids: Vec<String> = Vec::new();
        for id in &embedded_ids {
            if !rels.contains_id(id) && !dangling_ids.iter().any(|d| d == id) {
                dangling_ids.push(id.clone());
            }
        }

        let null_target_ids = rels.null_target_ids().into_iter().map(String::from).collect();

        Ok(Self {
            embedded_ids,
            referenced_media,
            orphaned_media,
            missing_media,
            dangling_ids,
            null_target_ids,
        })
    }

    /// Count of embed ids that resolve to a working relationship.
    pub fn matched_id_count(&self) -> usize {
        self.embedded_ids.len() - self.dangling_id_count()
    }

    /// Count of embed ids (duplicates included) that resolve to nothing.
    pub fn dangling_id_count(&self) -> usize {
        self.embedded_ids
            .iter()
            .filter(|id| self.dangling_ids.iter().any(|d| d == *id))
            .count()
    }

    /// Emit the classification through tracing.
    pub fn log(&self) {
        info!(blips = self.embedded_ids.len(), "blip references found");
        info!(
            referenced = self.referenced_media.len(),
            orphaned = self.orphaned_media.len(),
            "media files classified"
        );
        for target in &self.orphaned_media {
            info!(%target, "orphaned media file (present, unreferenced)");
        }
        for target in &self.missing_media {
            warn!(%target, "missing media file (referenced, absent)");
        }
        info!(
            matched = self.matched_id_count(),
            dangling = self.dangling_id_count(),
            "embedded relation ids classified"
        );
        if !self.dangling_ids.is_empty() {
            warn!(ids = ?self.dangling_ids, "dangling embedded relation ids");
        }
        for id in &self.null_target_ids {
            warn!(%id, "relationship has a NULL target");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture(rels_xml: &[u8], media: &[&str], doc_xml: &[u8]) -> (RelTable, MediaInventory, Vec<u8>) {
        let dir = TempDir::new().unwrap();
        for name in media {
            std::fs::write(dir.path().join(name), b"stub").unwrap();
        }
        let inventory = MediaInventory::scan(dir.path()).unwrap();
        // The TempDir is consumed here; the inventory snapshot outlives it.
        drop(dir);
        (RelTable::parse(rels_xml).unwrap(), inventory, doc_xml.to_vec())
    }

    #[test]
    fn test_orphaned_media_classification() {
        // rId5 -> media/image3.png; folder holds image3.png and image9.png
        let (rels, inventory, doc) = fixture(
            br#"<Relationships><Relationship Id="rId5" Type="t" Target="media/image3.png"/></Relationships>"#,
            &["image3.png", "image9.png"],
            b"<w:document><w:body/></w:document>",
        );
        let report = Report::build(&doc, &rels, &inventory).unwrap();

        assert_eq!(report.orphaned_media, vec!["media/image9.png"]);
        assert_eq!(report.referenced_media, vec!["media/image3.png"]);
        assert!(report.missing_media.is_empty());
    }

    #[test]
    fn test_missing_media_skips_xml_parts() {
        let (rels, inventory, doc) = fixture(
            br#"<Relationships>
                <Relationship Id="rId1" Type="t" Target="styles.xml"/>
                <Relationship Id="rId2" Type="t" Target="media/image1.png"/>
            </Relationships>"#,
            &[],
            b"<w:document><w:body/></w:document>",
        );
        let report = Report::build(&doc, &rels, &inventory).unwrap();

        assert_eq!(report.missing_media, vec!["media/image1.png"]);
    }

    #[test]
    fn test_dangling_ids_are_distinct() {
        let doc = br#"<w:document><w:body>
            <a:blip r:embed="rId7"/>
            <a:blip r:embed="rId7"/>
            <a:blip r:embed="rId2"/>
        </w:body></w:document>"#;
        let (rels, inventory, doc) = fixture(
            br#"<Relationships><Relationship Id="rId2" Type="t" Target="media/image1.png"/></Relationships>"#,
            &["image1.png"],
            doc,
        );
        let report = Report::build(&doc, &rels, &inventory).unwrap();

        assert_eq!(report.dangling_ids, vec!["rId7"]);
        assert_eq!(report.dangling_id_count(), 2);
        assert_eq!(report.matched_id_count(), 1);
    }

    #[test]
    fn test_null_targets_reported_not_matched() {
        let doc = br#"<w:document><w:body><a:blip r:embed="rId6"/></w:body></w:document>"#;
        let (rels, inventory, doc) = fixture(
            br#"<Relationships><Relationship Id="rId6" Type="t" Target="NULL"/></Relationships>"#,
            &[],
            doc,
        );
        let report = Report::build(&doc, &rels, &inventory).unwrap();

        assert_eq!(report.null_target_ids, vec!["rId6"]);
        // A NULL-target entry never satisfies a blip reference
        assert_eq!(report.dangling_ids, vec!["rId6"]);
    }
}
