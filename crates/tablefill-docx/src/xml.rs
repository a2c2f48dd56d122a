//! Owned XML element tree for the markup the renderer rewrites.
//!
//! Only captured `w:tbl` subtrees are materialized; the rest of the document is streamed
//! through quick-xml untouched.

use std::io::{BufRead, Write};

use quick_xml::events::{BytesCData, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::DocxError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    /// Unescaped character data.
    Text(String),
    CData(String),
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    /// Qualified name as written (`w:tc`).
    pub name: String,
    /// Qualified attribute names with unescaped values, in document order.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|b| *b == b':')
        .map(|idx| &name[idx + 1..])
        .unwrap_or(name)
}

fn local_str(name: &str) -> &str {
    name.rsplit_once(':').map(|(_, local)| local).unwrap_or(name)
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.push(child);
        self
    }

    pub fn local_name(&self) -> &str {
        local_str(&self.name)
    }

    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    /// Attribute value by local name.
    pub fn attr(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| local_str(name) == local)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing any attribute with the same qualified name.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |el| el.local_name() == local)
    }

    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.elements().find(|el| el.local_name() == local)
    }

    pub fn push(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(XmlNode::Text(text.into()));
    }

    /// Drop every direct child element whose local name is listed.
    pub fn remove_children(&mut self, locals: &[&str]) {
        self.children.retain(|node| match node {
            XmlNode::Element(el) => !locals.contains(&el.local_name()),
            _ => true,
        });
    }

    /// Insert `child`, replacing a same-named child, at the position `order` (the schema's
    /// child sequence) calls for. Names missing from `order` are appended.
    pub fn upsert_ordered(&mut self, child: XmlElement, order: &[&str]) {
        let local = child.local_name().to_string();
        self.remove_children(&[local.as_str()]);
        let rank = order.iter().position(|name| *name == local);
        let at = rank
            .and_then(|rank| {
                self.children.iter().position(|node| match node {
                    XmlNode::Element(el) => order
                        .iter()
                        .position(|name| *name == el.local_name())
                        .is_some_and(|other| other > rank),
                    _ => false,
                })
            })
            .unwrap_or(self.children.len());
        self.children.insert(at, XmlNode::Element(child));
    }

    /// Concatenated character data of this element and its descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                XmlNode::Element(el) => el.collect_text(out),
                XmlNode::Text(text) | XmlNode::CData(text) => out.push_str(text),
                XmlNode::Comment(_) => {}
            }
        }
    }

    pub(crate) fn from_start(start: &BytesStart<'_>) -> Result<Self, DocxError> {
        let mut el = XmlElement::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
        for attr in start.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            el.attributes.push((key, value));
        }
        Ok(el)
    }

    /// Read the rest of an element whose start tag was just consumed from `reader`.
    pub(crate) fn read_rest<R: BufRead>(
        reader: &mut Reader<R>,
        start: &BytesStart<'_>,
    ) -> Result<Self, DocxError> {
        let mut stack = vec![XmlElement::from_start(start)?];
        let mut buf = Vec::new();
        loop {
            let top = stack.len() - 1;
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => stack.push(XmlElement::from_start(e)?),
                Event::Empty(ref e) => {
                    let el = XmlElement::from_start(e)?;
                    stack[top].push(el);
                }
                Event::End(_) => {
                    let done = stack.pop().ok_or_else(|| {
                        DocxError::Invalid("unbalanced end tag".to_string())
                    })?;
                    match stack.last_mut() {
                        Some(parent) => parent.push(done),
                        None => return Ok(done),
                    }
                }
                Event::Text(ref e) => {
                    let text = e.unescape()?.into_owned();
                    stack[top].children.push(XmlNode::Text(text));
                }
                Event::CData(ref e) => {
                    let text = String::from_utf8_lossy(e).into_owned();
                    stack[top].children.push(XmlNode::CData(text));
                }
                Event::Comment(ref e) => {
                    let text = String::from_utf8_lossy(e).into_owned();
                    stack[top].children.push(XmlNode::Comment(text));
                }
                Event::Eof => {
                    return Err(DocxError::Invalid(format!(
                        "unexpected end of document inside <{}>",
                        stack[0].name
                    )))
                }
                Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            }
            buf.clear();
        }
    }

    /// Parse the first element of an XML fragment.
    pub fn parse(xml: &[u8]) -> Result<Self, DocxError> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(false);
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => return XmlElement::read_rest(&mut reader, e),
                Event::Empty(ref e) => return XmlElement::from_start(e),
                Event::Eof => return Err(DocxError::Invalid("no root element".to_string())),
                _ => {}
            }
            buf.clear();
        }
    }

    pub fn write_to<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), DocxError> {
        let mut start = BytesStart::new(self.name.as_str());
        for (name, value) in &self.attributes {
            start.push_attribute((name.as_str(), value.as_str()));
        }
        if self.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }
        writer.write_event(Event::Start(start))?;
        for node in &self.children {
            match node {
                XmlNode::Element(el) => el.write_to(writer)?,
                XmlNode::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
                XmlNode::CData(text) => writer.write_event(Event::CData(BytesCData::new(text.as_str())))?,
                XmlNode::Comment(text) => {
                    writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))?
                }
            }
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DocxError> {
        let mut writer = Writer::new(Vec::new());
        self.write_to(&mut writer)?;
        Ok(writer.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_writes_back() {
        let xml = br#"<w:tc xmlns:w="urn:w"><w:tcPr><w:tcW w:w="100" w:type="dxa"/></w:tcPr><w:p><w:r><w:t xml:space="preserve">A &amp; B </w:t></w:r></w:p></w:tc>"#;
        let el = XmlElement::parse(xml).unwrap();
        assert_eq!(el.local_name(), "tc");
        assert_eq!(el.prefix(), Some("w"));
        assert_eq!(el.text(), "A & B ");
        assert_eq!(
            el.child("tcPr").and_then(|pr| pr.child("tcW")).and_then(|w| w.attr("w")),
            Some("100")
        );
        assert_eq!(el.to_bytes().unwrap(), xml.to_vec());
    }

    #[test]
    fn upsert_respects_sequence_order() {
        const ORDER: &[&str] = &["tcW", "vMerge", "shd", "vAlign"];
        let mut pr = XmlElement::new("w:tcPr")
            .with_child(XmlElement::new("w:tcW"))
            .with_child(XmlElement::new("w:vAlign"));
        pr.upsert_ordered(XmlElement::new("w:shd").with_attr("w:fill", "FF0000"), ORDER);
        pr.upsert_ordered(XmlElement::new("w:vMerge"), ORDER);
        pr.upsert_ordered(XmlElement::new("w:shd").with_attr("w:fill", "00FF00"), ORDER);
        let names: Vec<_> = pr.elements().map(XmlElement::local_name).collect();
        assert_eq!(names, vec!["tcW", "vMerge", "shd", "vAlign"]);
        assert_eq!(pr.child("shd").and_then(|s| s.attr("fill")), Some("00FF00"));
    }

    #[test]
    fn child_lookup_outlives_the_name() {
        let tbl = XmlElement::new("w:tbl")
            .with_child(XmlElement::new("w:tblPr").with_attr("w:id", "1"))
            .with_child(XmlElement::new("w:tr"))
            .with_child(XmlElement::new("w:tr"));
        let found = {
            let name = String::from("tblPr");
            tbl.child(&name)
        };
        assert_eq!(found.and_then(|pr| pr.attr("id")), Some("1"));
        assert_eq!(tbl.children_named("tr").count(), 2);
        assert!(tbl.child("tblGrid").is_none());
    }

    #[test]
    fn truncated_fragment_is_an_error() {
        assert!(XmlElement::parse(b"<w:tbl><w:tr>").is_err());
    }

    #[test]
    fn local_names() {
        assert_eq!(local_name(b"w:tbl"), b"tbl");
        assert_eq!(local_name(b"tbl"), b"tbl");
    }
}
