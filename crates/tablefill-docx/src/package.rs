//! In-memory DOCX (OPC zip) package.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};

use crate::error::DocxError;

/// Default maximum uncompressed size of a single part.
pub const DEFAULT_MAX_PART_BYTES: u64 = 256 * 1024 * 1024;
/// Default maximum total uncompressed size of all parts.
pub const DEFAULT_MAX_TOTAL_BYTES: u64 = 512 * 1024 * 1024;

pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
pub const DEFAULT_DOCUMENT_PART: &str = "word/document.xml";

const MAIN_DOCUMENT_CONTENT_TYPES: &[&str] = &[
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml",
    "application/vnd.ms-word.document.macroEnabled.main+xml",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.template.main+xml",
    "application/vnd.ms-word.template.macroEnabledTemplate.main+xml",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocxLimits {
    pub max_part_bytes: u64,
    pub max_total_bytes: u64,
}

impl Default for DocxLimits {
    fn default() -> Self {
        Self {
            max_part_bytes: DEFAULT_MAX_PART_BYTES,
            max_total_bytes: DEFAULT_MAX_TOTAL_BYTES,
        }
    }
}

/// Every part of a DOCX container, keyed by zip entry name. Parts the renderer does not touch
/// are written back byte-for-byte.
#[derive(Debug, Clone, Default)]
pub struct DocxPackage {
    parts: BTreeMap<String, Vec<u8>>,
}

impl DocxPackage {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocxError> {
        Self::from_bytes_limited(bytes, DocxLimits::default())
    }

    pub fn from_bytes_limited(bytes: &[u8], limits: DocxLimits) -> Result<Self, DocxError> {
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes))?;

        let mut parts = BTreeMap::new();
        let mut used: u64 = 0;
        for i in 0..zip.len() {
            let mut file = zip.by_index(i)?;
            if !file.is_file() {
                continue;
            }
            let name = file.name().to_string();

            let declared = file.size();
            if declared > limits.max_part_bytes {
                return Err(DocxError::PartTooLarge {
                    part: name,
                    size: declared,
                    max: limits.max_part_bytes,
                });
            }

            // Zip metadata can lie; never read more than the cap plus one byte.
            let mut buf = Vec::new();
            file.by_ref()
                .take(limits.max_part_bytes.saturating_add(1))
                .read_to_end(&mut buf)?;
            let observed = buf.len() as u64;
            if observed > limits.max_part_bytes {
                return Err(DocxError::PartTooLarge {
                    part: name,
                    size: observed,
                    max: limits.max_part_bytes,
                });
            }

            used = used.saturating_add(observed);
            if used > limits.max_total_bytes {
                return Err(DocxError::PackageTooLarge {
                    total: used,
                    max: limits.max_total_bytes,
                });
            }
            parts.insert(name, buf);
        }

        Ok(Self { parts })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DocxError> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    pub fn write_to<W: Write>(&self, mut w: W) -> Result<(), DocxError> {
        let cursor = Cursor::new(Vec::new());
        let mut zip = zip::ZipWriter::new(cursor);
        let options = zip::write::FileOptions::<()>::default()
            .compression_method(zip::CompressionMethod::Deflated);

        for (name, bytes) in &self.parts {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(bytes)?;
        }

        let cursor = zip.finish()?;
        w.write_all(&cursor.into_inner())?;
        Ok(())
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }

    /// Look up a part, tolerating a leading `/`, backslashes and ASCII case differences.
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.resolve_name(name)
            .and_then(|key| self.parts.get(key))
            .map(Vec::as_slice)
    }

    /// Replace (or add) a part. An existing entry with an equivalent name keeps its original
    /// spelling.
    pub fn set_part(&mut self, name: &str, bytes: Vec<u8>) {
        let key = self
            .resolve_name(name)
            .map(str::to_string)
            .unwrap_or_else(|| name.trim_start_matches('/').to_string());
        self.parts.insert(key, bytes);
    }

    fn resolve_name(&self, name: &str) -> Option<&str> {
        if let Some((key, _)) = self.parts.get_key_value(name) {
            return Some(key);
        }
        self.parts
            .keys()
            .find(|key| part_names_equivalent(key, name))
            .map(String::as_str)
    }

    /// Name of the main document part, as advertised by `[Content_Types].xml`.
    ///
    /// Falls back to `word/document.xml` when the content types part is missing or has no
    /// main-document override.
    pub fn main_document_part(&self) -> Result<String, DocxError> {
        if let Some(bytes) = self.part(CONTENT_TYPES_PART) {
            let text = std::str::from_utf8(bytes)?;
            let doc = roxmltree::Document::parse(text)?;
            let declared = doc
                .descendants()
                .filter(|n| n.is_element() && n.tag_name().name() == "Override")
                .find(|n| {
                    n.attribute("ContentType")
                        .is_some_and(|ct| MAIN_DOCUMENT_CONTENT_TYPES.contains(&ct.trim()))
                })
                .and_then(|n| n.attribute("PartName"));
            if let Some(part_name) = declared {
                if let Some(key) = self.resolve_name(part_name) {
                    return Ok(key.to_string());
                }
                log::warn!("content types declare main document `{part_name}` but the part is missing");
            }
        }
        self.resolve_name(DEFAULT_DOCUMENT_PART)
            .map(str::to_string)
            .ok_or_else(|| DocxError::MissingPart(DEFAULT_DOCUMENT_PART.to_string()))
    }
}

/// Zip entry names are compared after stripping a leading `/`, treating `\` as `/` and
/// ignoring ASCII case.
pub fn part_names_equivalent(a: &str, b: &str) -> bool {
    fn normalize(name: &str) -> impl Iterator<Item = u8> + '_ {
        name.trim_start_matches(['/', '\\'])
            .bytes()
            .map(|b| if b == b'\\' { b'/' } else { b.to_ascii_lowercase() })
    }
    normalize(a).eq(normalize(b))
}
