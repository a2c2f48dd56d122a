//! Anchor lookup and in-place table replacement in the main document part.

use quick_xml::events::Event;
use quick_xml::{Reader, Writer};

use crate::error::DocxError;
use crate::xml::{local_name, XmlElement};

/// Anchor strings a table carries: `w:tblCaption` then `w:tblDescription` values.
pub fn table_anchors(table: &XmlElement) -> Vec<&str> {
    let Some(pr) = table.child("tblPr") else {
        return Vec::new();
    };
    ["tblCaption", "tblDescription"]
        .iter()
        .filter_map(|local| pr.child(local).and_then(|el| el.attr("val")))
        .collect()
}

/// Whether `table` is anchored by `anchor` (trimmed, case-insensitive).
pub fn is_anchored(table: &XmlElement, anchor: &str) -> bool {
    let wanted = anchor.trim().to_lowercase();
    !wanted.is_empty()
        && table_anchors(table)
            .iter()
            .any(|value| value.trim().to_lowercase() == wanted)
}

type Rebuild<'a> = dyn FnMut(&XmlElement) -> XmlElement + 'a;

fn replace_in_table(table: &mut XmlElement, anchor: &str, rebuild: &mut Rebuild<'_>) -> bool {
    if is_anchored(table, anchor) {
        *table = rebuild(table);
        return true;
    }
    replace_in_children(table, anchor, rebuild)
}

fn replace_in_children(el: &mut XmlElement, anchor: &str, rebuild: &mut Rebuild<'_>) -> bool {
    for child in el.elements_mut() {
        let found = if child.local_name() == "tbl" {
            replace_in_table(child, anchor, rebuild)
        } else {
            replace_in_children(child, anchor, rebuild)
        };
        if found {
            return true;
        }
    }
    false
}

/// Stream `xml` through, replacing the first table anchored by `anchor` (nested tables
/// included) with `rebuild(table)`.
///
/// Returns `None` when no table carries the anchor.
pub fn replace_anchored_table<F>(
    xml: &[u8],
    anchor: &str,
    mut rebuild: F,
) -> Result<Option<Vec<u8>>, DocxError>
where
    F: FnMut(&XmlElement) -> XmlElement,
{
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));
    let mut buf = Vec::new();
    let mut replaced = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) if !replaced && local_name(e.name().as_ref()) == b"tbl" => {
                let mut table = XmlElement::read_rest(&mut reader, e)?;
                replaced = replace_in_table(&mut table, anchor, &mut rebuild);
                table.write_to(&mut writer)?;
            }
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
        buf.clear();
    }

    Ok(replaced.then(|| writer.into_inner()))
}

/// Every anchor string in the document, in document order.
pub fn document_anchors(xml: &[u8]) -> Result<Vec<String>, DocxError> {
    fn collect(el: &XmlElement, out: &mut Vec<String>) {
        if el.local_name() == "tbl" {
            out.extend(table_anchors(el).into_iter().map(str::to_string));
        }
        for child in el.elements() {
            collect(child, out);
        }
    }

    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut out = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) if local_name(e.name().as_ref()) == b"tbl" => {
                let table = XmlElement::read_rest(&mut reader, e)?;
                collect(&table, &mut out);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<w:document xmlns:w="urn:w"><w:body><w:p><w:r><w:t>Intro</w:t></w:r></w:p><w:tbl><w:tblPr><w:tblCaption w:val="OUTER"/></w:tblPr><w:tr><w:tc><w:tbl><w:tblPr><w:tblDescription w:val=" Inner "/></w:tblPr></w:tbl></w:tc></w:tr></w:tbl><w:tbl><w:tblPr><w:tblCaption w:val="LAST"/></w:tblPr></w:tbl></w:body></w:document>"#;

    fn marker(_: &XmlElement) -> XmlElement {
        XmlElement::new("w:tbl").with_child(XmlElement::new("w:replaced"))
    }

    #[test]
    fn lists_anchors_including_nested_tables() {
        let anchors = document_anchors(DOC.as_bytes()).unwrap();
        assert_eq!(anchors, vec!["OUTER", " Inner ", "LAST"]);
    }

    #[test]
    fn replaces_nested_table_by_description() {
        let out = replace_anchored_table(DOC.as_bytes(), "inner", marker)
            .unwrap()
            .unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains(r#"<w:tc><w:tbl><w:replaced/></w:tbl></w:tc>"#), "{out}");
        assert!(out.contains(r#"<w:tblCaption w:val="OUTER"/>"#));
        assert!(out.contains(r#"<w:tblCaption w:val="LAST"/>"#));
        assert!(out.starts_with(r#"<w:document xmlns:w="urn:w"><w:body><w:p><w:r><w:t>Intro</w:t>"#));
    }

    #[test]
    fn only_the_first_match_is_replaced() {
        let doc = DOC.replace("LAST", "outer");
        let mut calls = 0;
        let out = replace_anchored_table(doc.as_bytes(), "Outer", |t| {
            calls += 1;
            marker(t)
        })
        .unwrap()
        .unwrap();
        assert_eq!(calls, 1);
        assert!(String::from_utf8(out).unwrap().contains(r#"w:val="outer""#));
    }

    #[test]
    fn missing_anchor_returns_none() {
        assert_eq!(replace_anchored_table(DOC.as_bytes(), "NOPE", marker).unwrap(), None);
        assert_eq!(replace_anchored_table(DOC.as_bytes(), "  ", marker).unwrap(), None);
    }
}
