/// Relationship table for the document part.
///
/// This module parses `word/_rels/document.xml.rels` into an ordered table,
/// builds the working id → target map, and serializes the table back out
/// after repair. Entries whose target is the case-insensitive sentinel
/// "NULL" mark broken relationships left behind by upstream tooling; they
/// are kept in the table for round-tripping and reported, but never enter
/// the working map and are never used as repair or match candidates.
use crate::alloc;
use crate::error::{FixError, Result};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashMap;

/// A single relationship entry from the `.rels` part.
#[derive(Debug, Clone)]
pub struct Relationship {
    /// Relationship ID (e.g. "rId1")
    id: String,

    /// Relationship type URI
    reltype: String,

    /// Target reference, relative to the part's base (e.g. "media/image1.png")
    target: String,

    /// TargetMode attribute, present on external relationships (hyperlinks)
    target_mode: Option<String>,
}

impl Relationship {
    /// Create a new internal relationship.
    pub fn new(id: String, reltype: String, target: String) -> Self {
        Self { id, reltype, target, target_mode: None }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn reltype(&self) -> &str {
        &self.reltype
    }

    #[inline]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Whether the target is the "NULL" sentinel (any casing).
    #[inline]
    pub fn is_null_target(&self) -> bool {
        self.target.eq_ignore_ascii_case("NULL")
    }
}

/// Ordered relationship table with an id → target working map.
///
/// Document order is preserved so that serialization after a repair run
/// only appends new entries rather than reshuffling existing ones.
#[derive(Debug)]
pub struct RelTable {
    /// All entries in document order, sentinel entries included
    entries: Vec<Relationship>,

    /// Working map: id → index into `entries`, sentinel entries excluded
    index: HashMap<String, usize>,
}

impl RelTable {
    /// Parse a relationship table from `.rels` XML bytes.
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        let mut entries = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                    if e.local_name().as_ref() != b"Relationship" {
                        continue;
                    }

                    let mut id = None;
                    let mut reltype = None;
                    let mut target = None;
                    let mut target_mode = None;

                    for attr in e.attributes() {
                        let attr = attr?;
                        let value = attr.unescape_value()?.into_owned();
                        match attr.key.as_ref() {
                            b"Id" => id = Some(value),
                            b"Type" => reltype = Some(value),
                            b"Target" => target = Some(value),
                            b"TargetMode" => target_mode = Some(value),
                            _ => {},
                        }
                    }

                    entries.push(Relationship {
                        id: id.ok_or(FixError::MissingAttr("Id", "Relationship"))?,
                        reltype: reltype.ok_or(FixError::MissingAttr("Type", "Relationship"))?,
                        target: target.ok_or(FixError::MissingAttr("Target", "Relationship"))?,
                        target_mode,
                    });
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(FixError::Xml(e.to_string())),
                _ => {},
            }
        }

        Ok(Self::from_entries(entries))
    }

    fn from_entries(entries: Vec<Relationship>) -> Self {
        let mut index = HashMap::with_capacity(entries.len());
        for (i, rel) in entries.iter().enumerate() {
            if !rel.is_null_target() {
                index.insert(rel.id.clone(), i);
            }
        }
        Self { entries, index }
    }

    /// Look up the target for a relationship id. Sentinel entries are
    /// absent from this view.
    pub fn target(&self, id: &str) -> Option<&str> {
        self.index.get(id).map(|&i| self.entries[i].target.as_str())
    }

    /// Whether the working map contains the given id.
    #[inline]
    pub fn contains_id(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Whether any working entry points at the given target path.
    pub fn contains_target(&self, path: &str) -> bool {
        self.index.values().any(|&i| self.entries[i].target == path)
    }

    /// The distinct non-XML target paths of the working map, i.e. the
    /// targets that should have a physical media file behind them.
    pub fn non_xml_targets(&self) -> Vec<&str> {
        let mut targets: Vec<&str> = self
            .index
            .values()
            .map(|&i| self.entries[i].target.as_str())
            .filter(|t| !t.to_ascii_lowercase().ends_with(".xml"))
            .collect();
        targets.sort_unstable();
        targets.dedup();
        targets
    }

    /// Ids of entries carrying the "NULL" sentinel target.
    pub fn null_target_ids(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|r| r.is_null_target())
            .map(|r| r.id.as_str())
            .collect()
    }

    /// Maximum numeric suffix over all entry ids, sentinel entries
    /// included (their ids are still occupied). Fails on a non-"rId<N>" id.
    pub fn max_rel_seq(&self) -> Result<u64> {
        alloc::max_rel_seq(self.entries.iter().map(|r| r.id.as_str()))
    }

    /// Append a new relationship. The id must not collide with any
    /// existing entry; a collision signals an allocator bug.
    pub fn append(&mut self, rel: Relationship) -> Result<()> {
        if self.entries.iter().any(|r| r.id == rel.id) {
            return Err(FixError::Conflict(format!(
                "relationship id '{}' already exists in the table",
                rel.id
            )));
        }
        let is_null = rel.is_null_target();
        let id = rel.id.clone();
        self.entries.push(rel);
        if !is_null {
            self.index.insert(id, self.entries.len() - 1);
        }
        Ok(())
    }

    /// Iterate all entries in document order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.entries.iter()
    }

    /// Number of entries, sentinel entries included.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize the table to `.rels` XML, entries in document order with
    /// newly appended relationships last.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(256 + self.entries.len() * 128);

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push('\n');
        xml.push_str(&format!(
            r#"<Relationships xmlns="{}">"#,
            crate::ns::PACKAGE_RELATIONSHIPS
        ));
        xml.push('\n');

        for rel in &self.entries {
            let target_mode = match &rel.target_mode {
                Some(mode) => format!(r#" TargetMode="{}""#, escape_xml(mode)),
                None => String::new(),
            };
            xml.push_str(&format!(
                r#"  <Relationship Id="{}" Type="{}" Target="{}"{}/>"#,
                escape_xml(&rel.id),
                escape_xml(&rel.reltype),
                escape_xml(&rel.target),
                target_mode
            ));
            xml.push('\n');
        }

        xml.push_str("</Relationships>");
        xml
    }
}

/// Escape XML special characters.
#[inline]
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    const RELS: &[u8] = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
  <Relationship Id="rId5" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/image3.png"/>
  <Relationship Id="rId6" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="null"/>
</Relationships>"#;

    #[test]
    fn test_parse_builds_working_map() {
        let table = RelTable::parse(RELS).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.target("rId5"), Some("media/image3.png"));
        assert!(table.contains_id("rId1"));
    }

    #[test]
    fn test_null_targets_excluded_from_working_map() {
        let table = RelTable::parse(RELS).unwrap();
        assert!(!table.contains_id("rId6"));
        assert_eq!(table.target("rId6"), None);
        assert_eq!(table.null_target_ids(), vec!["rId6"]);
    }

    #[test]
    fn test_null_sentinel_is_case_insensitive() {
        let xml = br#"<Relationships><Relationship Id="rId2" Type="t" Target="NULL"/></Relationships>"#;
        let table = RelTable::parse(xml).unwrap();
        assert_eq!(table.null_target_ids(), vec!["rId2"]);
    }

    #[test]
    fn test_non_xml_targets() {
        let table = RelTable::parse(RELS).unwrap();
        assert_eq!(table.non_xml_targets(), vec!["media/image3.png"]);
    }

    #[test]
    fn test_contains_target() {
        let table = RelTable::parse(RELS).unwrap();
        assert!(table.contains_target("media/image3.png"));
        assert!(!table.contains_target("media/image9.png"));
    }

    #[test]
    fn test_max_rel_seq_includes_sentinel_ids() {
        let table = RelTable::parse(RELS).unwrap();
        assert_eq!(table.max_rel_seq().unwrap(), 6);
    }

    #[test]
    fn test_append_rejects_duplicate_id() {
        let mut table = RelTable::parse(RELS).unwrap();
        let dup = Relationship::new(
            "rId5".to_string(),
            crate::ns::IMAGE_RELTYPE.to_string(),
            "media/image10.png".to_string(),
        );
        assert!(matches!(table.append(dup), Err(FixError::Conflict(_))));
    }

    #[test]
    fn test_append_then_serialize_keeps_order() {
        let mut table = RelTable::parse(RELS).unwrap();
        table
            .append(Relationship::new(
                "rId7".to_string(),
                crate::ns::IMAGE_RELTYPE.to_string(),
                "media/image4.png".to_string(),
            ))
            .unwrap();

        let xml = table.to_xml();
        let rid5 = xml.find(r#"Id="rId5""#).unwrap();
        let rid7 = xml.find(r#"Id="rId7""#).unwrap();
        assert!(rid5 < rid7);
        assert!(xml.contains(r#"Target="media/image4.png""#));
    }

    #[test]
    fn test_target_mode_round_trips() {
        let xml = br#"<Relationships><Relationship Id="rId3" Type="t" Target="http://example.com" TargetMode="External"/></Relationships>"#;
        let table = RelTable::parse(xml).unwrap();
        assert!(table.to_xml().contains(r#"TargetMode="External""#));
    }

    #[test]
    fn test_missing_attribute_is_an_error() {
        let xml = br#"<Relationships><Relationship Id="rId1" Type="t"/></Relationships>"#;
        assert!(matches!(
            RelTable::parse(xml),
            Err(FixError::MissingAttr("Target", _))
        ));
    }
}
