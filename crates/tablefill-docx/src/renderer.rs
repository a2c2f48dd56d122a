use tablefill_engine::{EvaluationResult, RenderOutcome, TableRenderer};
use tablefill_spec::TableDefinition;

use crate::document::replace_anchored_table;
use crate::error::DocxError;
use crate::package::DocxPackage;
use crate::table::{RenderOptions, TableBuilder};

/// Renders evaluated tables into the main document part of a DOCX package.
///
/// The document XML is rewritten in memory as tables are rendered; call
/// [`DocxTableRenderer::into_package`] to get the updated package back.
#[derive(Debug, Clone)]
pub struct DocxTableRenderer {
    package: DocxPackage,
    document_part: String,
    document: Vec<u8>,
    options: RenderOptions,
}

impl DocxTableRenderer {
    pub fn new(package: DocxPackage, options: RenderOptions) -> Result<Self, DocxError> {
        let document_part = package.main_document_part()?;
        let document = package
            .part(&document_part)
            .ok_or_else(|| DocxError::MissingPart(document_part.clone()))?
            .to_vec();
        Ok(Self {
            package,
            document_part,
            document,
            options,
        })
    }

    pub fn from_bytes(bytes: &[u8], options: RenderOptions) -> Result<Self, DocxError> {
        Self::new(DocxPackage::from_bytes(bytes)?, options)
    }

    pub fn document_part(&self) -> &str {
        &self.document_part
    }

    /// Current main document XML, including every table rendered so far.
    pub fn document_xml(&self) -> &[u8] {
        &self.document
    }

    pub fn into_package(mut self) -> DocxPackage {
        self.package.set_part(&self.document_part, self.document);
        self.package
    }

    pub fn to_bytes(self) -> Result<Vec<u8>, DocxError> {
        self.into_package().to_bytes()
    }
}

impl TableRenderer for DocxTableRenderer {
    type Error = DocxError;

    fn render_table(
        &mut self,
        table: &TableDefinition,
        result: &EvaluationResult,
    ) -> Result<RenderOutcome, DocxError> {
        if table.alt_text.trim().is_empty() {
            return Ok(RenderOutcome::AnchorNotFound);
        }
        let builder = TableBuilder::new(table, result, &self.options);
        let replaced =
            replace_anchored_table(&self.document, &table.alt_text, |template| builder.build(template))?;
        match replaced {
            Some(document) => {
                log::debug!(
                    "rendered table `{}` at anchor `{}`: {} row(s)",
                    table.id,
                    table.alt_text,
                    result.row_count()
                );
                self.document = document;
                Ok(RenderOutcome::Rendered)
            }
            None => Ok(RenderOutcome::AnchorNotFound),
        }
    }
}
