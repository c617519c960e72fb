/// Identifier allocation for relationship ids and media filenames.
///
/// Both namespaces follow a `<prefix><N>` convention: relationship ids are
/// "rId1", "rId2", … and media files are "image1.png", "image2.jpeg", ….
/// Repair allocates fresh values strictly above the maximum already present
/// in the package, one cursor per namespace. The cursors advance
/// independently and are not kept numerically aligned.
use crate::error::{FixError, Result};

/// A relationship identifier of the form "rId<N>".
///
/// Ordered by the numeric suffix, not lexically ("rId10" > "rId9").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelId {
    value: String,
    seq: u64,
}

impl RelId {
    /// Parse a relationship id, failing if it does not match "rId<N>".
    pub fn parse(value: &str) -> Result<Self> {
        let digits = value
            .strip_prefix("rId")
            .ok_or_else(|| FixError::Parse { what: "relationship id", value: value.to_string() })?;
        let seq = atoi_simd::parse::<u64>(digits.as_bytes()).map_err(|_| FixError::Parse {
            what: "relationship id",
            value: value.to_string(),
        })?;
        Ok(Self { value: value.to_string(), seq })
    }

    /// Build a relationship id from its numeric suffix.
    pub fn from_seq(seq: u64) -> Self {
        Self { value: format!("rId{}", seq), seq }
    }

    /// The full id string, e.g. "rId12".
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// The numeric suffix.
    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// A media filename of the form "image<N>.<ext>".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaName {
    filename: String,
    seq: u64,
}

impl MediaName {
    /// Parse a media filename, failing if it does not match "image<N>.<ext>".
    pub fn parse(filename: &str) -> Result<Self> {
        let rest = filename
            .strip_prefix("image")
            .ok_or_else(|| FixError::Parse { what: "media filename", value: filename.to_string() })?;
        let dot = rest.find('.').ok_or_else(|| FixError::Parse {
            what: "media filename",
            value: filename.to_string(),
        })?;
        let seq = atoi_simd::parse::<u64>(rest[..dot].as_bytes()).map_err(|_| FixError::Parse {
            what: "media filename",
            value: filename.to_string(),
        })?;
        Ok(Self { filename: filename.to_string(), seq })
    }

    /// Build a media filename from a sequence number and an extension
    /// (extension without the leading dot, e.g. "png").
    pub fn from_seq(seq: u64, ext: &str) -> Self {
        Self { filename: format!("image{}.{}", seq, ext), seq }
    }

    /// The bare filename, e.g. "image13.png".
    #[inline]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// The sequence number parsed from the filename.
    #[inline]
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Monotone allocation cursor.
///
/// Seeded once per run from the maximum value observed in the package;
/// `next()` yields `m+1, m+2, …` and never revisits a previously issued
/// value.
#[derive(Debug)]
pub struct IdCursor {
    current: u64,
}

impl IdCursor {
    /// Create a cursor seeded at the given maximum. The first issued value
    /// is `max + 1`; seeding at 0 therefore starts allocation at 1.
    pub fn seeded(max: u64) -> Self {
        Self { current: max }
    }

    /// Issue the next value.
    pub fn next(&mut self) -> u64 {
        self.current += 1;
        self.current
    }

    /// The most recently issued value, or the seed if none was issued yet.
    #[inline]
    pub fn current(&self) -> u64 {
        self.current
    }
}

/// Find the maximum relationship-id suffix over existing ids.
///
/// Returns 0 for an empty iterator. Fails with a parse error on any id not
/// matching "rId<N>"; a well-formed package never triggers this.
pub fn max_rel_seq<'a, I: IntoIterator<Item = &'a str>>(ids: I) -> Result<u64> {
    let mut max = 0u64;
    for id in ids {
        let seq = RelId::parse(id)?.seq();
        if seq > max {
            max = seq;
        }
    }
    Ok(max)
}

/// Find the maximum media sequence number over existing filenames.
///
/// Returns 0 for an empty iterator; fails on any name not matching
/// "image<N>.<ext>".
pub fn max_media_seq<'a, I: IntoIterator<Item = &'a str>>(filenames: I) -> Result<u64> {
    let mut max = 0u64;
    for name in filenames {
        let seq = MediaName::parse(name)?.seq();
        if seq > max {
            max = seq;
        }
    }
    Ok(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rel_id_parse() {
        let id = RelId::parse("rId42").unwrap();
        assert_eq!(id.seq(), 42);
        assert_eq!(id.as_str(), "rId42");
    }

    #[test]
    fn test_rel_id_rejects_malformed() {
        assert!(RelId::parse("Id42").is_err());
        assert!(RelId::parse("rId").is_err());
        assert!(RelId::parse("rId4x").is_err());
    }

    #[test]
    fn test_media_name_parse() {
        let name = MediaName::parse("image13.png").unwrap();
        assert_eq!(name.seq(), 13);
        assert_eq!(name.filename(), "image13.png");
    }

    #[test]
    fn test_media_name_rejects_malformed() {
        assert!(MediaName::parse("photo1.png").is_err());
        assert!(MediaName::parse("image13").is_err());
    }

    #[test]
    fn test_media_name_from_seq() {
        assert_eq!(MediaName::from_seq(7, "jpeg").filename(), "image7.jpeg");
    }

    #[test]
    fn test_cursor_is_strictly_increasing() {
        let mut cursor = IdCursor::seeded(9);
        let mut issued = Vec::new();
        for _ in 0..100 {
            issued.push(cursor.next());
        }
        assert_eq!(issued[0], 10);
        for pair in issued.windows(2) {
            assert!(pair[1] > pair[0]);
        }
        assert!(issued.iter().all(|&v| v > 9));
    }

    #[test]
    fn test_cursors_advance_independently() {
        let mut rels = IdCursor::seeded(5);
        let media = IdCursor::seeded(2);
        rels.next();
        rels.next();
        assert_eq!(rels.current(), 7);
        assert_eq!(media.current(), 2);
    }

    #[test]
    fn test_max_rel_seq() {
        assert_eq!(max_rel_seq(["rId3", "rId10", "rId7"]).unwrap(), 10);
        assert_eq!(max_rel_seq([]).unwrap(), 0);
        assert!(max_rel_seq(["rId3", "bogus"]).is_err());
    }

    #[test]
    fn test_max_media_seq() {
        assert_eq!(max_media_seq(["image1.png", "image9.jpeg"]).unwrap(), 9);
        assert_eq!(max_media_seq([]).unwrap(), 0);
    }
}
