/// Graphic reference scanning and blip patching for the document body.
///
/// Images in WordprocessingML live inside `<a:graphic>` elements: the
/// display name sits on `<pic:cNvPr name="...">` and the image reference on
/// `<a:blip r:embed="rIdN"/>`. Both are scanned in a single streaming pass;
/// repair rewrites the `r:embed` attribute of one matching blip at a time
/// while copying every other event through untouched.
///
/// # Example XML structure
///
/// ```xml
/// <a:graphic>
///   <a:graphicData>
///     <pic:pic>
///       <pic:nvPicPr><pic:cNvPr id="1" name="photoA.jpg"/></pic:nvPicPr>
///       <pic:blipFill><a:blip r:embed="rId7"/></pic:blipFill>
///     </pic:pic>
///   </a:graphicData>
/// </a:graphic>
/// ```
use crate::error::{FixError, Result};
use crate::ns;
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use smallvec::SmallVec;

/// One graphic element that carries both a display name and an image blip.
///
/// `ordinal` is the zero-based position among all graphic elements in
/// document order, including graphics that were skipped for lacking a name
/// or a blip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphicRef {
    /// Position among all graphic elements in document order
    pub ordinal: usize,

    /// Relationship id the blip currently points at (e.g. "rId7")
    pub rel_id: String,

    /// Display name from pic:cNvPr (the filename the authoring tool used)
    pub display_name: String,
}

/// Extract the value of the `embed` attribute from a blip element, matching
/// `r:embed` under any prefix binding the way the relationships namespace
/// is conventionally declared.
fn embed_attr(e: &BytesStart) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        let key = attr.key.as_ref();
        if key == b"r:embed" || key.ends_with(b":embed") {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Extract the unqualified `name` attribute from a cNvPr element.
fn name_attr(e: &BytesStart) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == b"name" {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Scan the document body for graphic elements, emitting one `GraphicRef`
/// per graphic that carries both a display name and an image blip.
///
/// Graphics missing either attribute are silently skipped; not every
/// graphic element is a picture (charts and diagrams share the markup).
pub fn graphic_refs(xml: &[u8]) -> Result<SmallVec<[GraphicRef; 8]>> {
    let mut reader = Reader::from_reader(xml);
    let mut refs = SmallVec::new();

    let mut ordinal: usize = 0;
    let mut in_graphic = false;
    let mut display_name: Option<String> = None;
    let mut rel_id: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"graphic" => {
                    in_graphic = true;
                    display_name = None;
                    rel_id = None;
                },
                b"cNvPr" if in_graphic => {
                    if display_name.is_none() {
                        display_name = name_attr(&e)?;
                    }
                },
                b"blip" if in_graphic => {
                    if rel_id.is_none() {
                        rel_id = embed_attr(&e)?;
                    }
                },
                _ => {},
            },
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"graphic" && in_graphic {
                    if let (Some(name), Some(id)) = (display_name.take(), rel_id.take()) {
                        refs.push(GraphicRef { ordinal, rel_id: id, display_name: name });
                    }
                    in_graphic = false;
                    ordinal += 1;
                }
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(FixError::Xml(e.to_string())),
            _ => {},
        }
    }

    Ok(refs)
}

/// Check every namespace declaration that binds one of the repair prefixes
/// (`a`, `pic`, `pr`, `r`) against the fixed map. A document rebinding one
/// of them to a foreign URI would make the repair queries match the wrong
/// markup; that is a configuration error, not a repairable state.
pub fn verify_namespaces(xml: &[u8]) -> Result<()> {
    let mut reader = Reader::from_reader(xml);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                for attr in e.attributes() {
                    let attr = attr?;
                    if let Some(prefix) = attr.key.as_ref().strip_prefix(b"xmlns:") {
                        let prefix = std::str::from_utf8(prefix)?;
                        if let Ok(expected) = ns::uri(prefix) {
                            let declared = attr.unescape_value()?;
                            if declared.as_ref() != expected {
                                return Err(FixError::UnknownNamespace(declared.into_owned()));
                            }
                        }
                    }
                }
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(FixError::Xml(e.to_string())),
            _ => {},
        }
    }

    Ok(())
}

/// Extract every blip `r:embed` value across the whole body, independent of
/// whether the enclosing graphic also has a display name. Feeds the
/// dangling-reference report.
pub fn blip_ids(xml: &[u8]) -> Result<Vec<String>> {
    let mut reader = Reader::from_reader(xml);
    let mut ids = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"blip" {
                    if let Some(id) = embed_attr(&e)? {
                        ids.push(id);
                    }
                }
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(FixError::Xml(e.to_string())),
            _ => {},
        }
    }

    Ok(ids)
}

/// Count the graphic references whose display name and relationship id both
/// match. This is the number of document slots waiting for a given
/// replacement image; an integral count, derived by counting elements.
pub fn count_placeholder(xml: &[u8], display_name: &str, placeholder: &str) -> Result<usize> {
    Ok(graphic_refs(xml)?
        .iter()
        .filter(|g| g.display_name == display_name && g.rel_id == placeholder)
        .count())
}

/// Rewrite the `r:embed` attribute of the first blip whose enclosing
/// graphic matches `display_name` and whose embed equals `placeholder`,
/// pointing it at `new_id`. Every other event is copied through verbatim.
///
/// Patching changes the matched element's id attribute, so it no longer
/// matches the placeholder on a subsequent scan; repeating this call once
/// per counted slot consumes each slot exactly once.
pub fn patch_blip(
    xml: &[u8],
    display_name: &str,
    placeholder: &str,
    new_id: &str,
) -> Result<Vec<u8>> {
    let mut reader = Reader::from_reader(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 16));

    let mut in_graphic = false;
    let mut current_name: Option<String> = None;
    let mut patched = false;

    loop {
        let event = match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(event) => event,
            Err(e) => return Err(FixError::Xml(e.to_string())),
        };

        match &event {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"graphic" => {
                    in_graphic = true;
                    current_name = None;
                },
                b"cNvPr" if in_graphic => {
                    if current_name.is_none() {
                        current_name = name_attr(e)?;
                    }
                },
                b"blip" if in_graphic && !patched => {
                    let name_matches = current_name.as_deref() == Some(display_name);
                    if name_matches && embed_attr(e)?.as_deref() == Some(placeholder) {
                        let rewritten = rewrite_embed(e, new_id)?;
                        match &event {
                            Event::Empty(_) => writer.write_event(Event::Empty(rewritten))?,
                            _ => writer.write_event(Event::Start(rewritten))?,
                        }
                        patched = true;
                        continue;
                    }
                },
                _ => {},
            },
            Event::End(e) => {
                if e.local_name().as_ref() == b"graphic" {
                    in_graphic = false;
                    current_name = None;
                }
            },
            _ => {},
        }

        writer.write_event(event)?;
    }

    if !patched {
        return Err(FixError::ElementNotFound(format!(
            "no graphic named '{}' with blip embed '{}'",
            display_name, placeholder
        )));
    }

    Ok(writer.into_inner())
}

/// Rebuild a blip element with its embed attribute pointing at `new_id`,
/// preserving the original qualified attribute key and every other
/// attribute.
fn rewrite_embed(e: &BytesStart, new_id: &str) -> Result<BytesStart<'static>> {
    let qname = std::str::from_utf8(e.name().as_ref())?.to_string();
    let mut rewritten = BytesStart::new(qname);

    for attr in e.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
        if attr.key.as_ref() == b"r:embed" || attr.key.as_ref().ends_with(b":embed") {
            rewritten.push_attribute((key.as_str(), new_id));
        } else {
            let value = attr.unescape_value()?;
            rewritten.push_attribute((key.as_str(), value.as_ref()));
        }
    }

    Ok(rewritten)
}
