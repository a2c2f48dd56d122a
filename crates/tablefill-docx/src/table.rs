//! Rebuilds an anchored template table from an evaluation result.

use tablefill_engine::{compute_merge_flags, EvaluationResult, MergeFlag};
use tablefill_spec::{Color, HorizontalAlignment, TableDefinition, VerticalAlignment};

use crate::text::remove_duplicate_lines;
use crate::xml::XmlElement;

/// Letter page with one-inch margins.
pub const DEFAULT_TABLE_WIDTH_TWIPS: u32 = 9360;
pub const DEFAULT_FONT_SIZE_HALF_POINTS: u32 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Table width used when the template has no `w:tblGrid`.
    pub default_table_width_twips: u32,
    /// Font size used when a configured size is not positive.
    pub default_font_size_half_points: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            default_table_width_twips: DEFAULT_TABLE_WIDTH_TWIPS,
            default_font_size_half_points: DEFAULT_FONT_SIZE_HALF_POINTS,
        }
    }
}

// Child sequences from the WordprocessingML schema.
const TBL_PR_ORDER: &[&str] = &[
    "tblStyle", "tblpPr", "tblOverlap", "bidiVisual", "tblStyleRowBandSize",
    "tblStyleColBandSize", "tblW", "jc", "tblCellSpacing", "tblInd", "tblBorders", "shd",
    "tblLayout", "tblCellMar", "tblLook", "tblCaption", "tblDescription",
];
const TR_PR_ORDER: &[&str] = &[
    "cnfStyle", "divId", "gridBefore", "gridAfter", "wBefore", "wAfter", "cantSplit",
    "trHeight", "tblHeader", "tblCellSpacing", "jc", "hidden",
];
const TC_PR_ORDER: &[&str] = &[
    "cnfStyle", "tcW", "gridSpan", "hMerge", "vMerge", "tcBorders", "shd", "noWrap", "tcMar",
    "textDirection", "tcFitText", "vAlign", "hideMark",
];
const P_PR_ORDER: &[&str] = &[
    "pStyle", "keepNext", "keepLines", "pageBreakBefore", "framePr", "widowControl", "numPr",
    "suppressLineNumbers", "pBdr", "shd", "tabs", "suppressAutoHyphens", "kinsoku", "wordWrap",
    "overflowPunct", "topLinePunct", "autoSpaceDE", "autoSpaceDN", "bidi", "adjustRightInd",
    "snapToGrid", "spacing", "ind", "contextualSpacing", "mirrorIndents", "suppressOverlap",
    "jc", "textDirection", "textAlignment", "textboxTightWrap", "outlineLvl", "divId",
    "cnfStyle", "rPr", "sectPr", "pPrChange",
];
const R_PR_ORDER: &[&str] = &[
    "rStyle", "rFonts", "b", "bCs", "i", "iCs", "caps", "smallCaps", "strike", "dstrike",
    "outline", "shadow", "emboss", "imprint", "noProof", "snapToGrid", "vanish", "webHidden",
    "color", "spacing", "w", "kern", "position", "sz", "szCs", "highlight", "u", "effect",
    "bdr", "shd", "fitText", "vertAlign", "rtl", "cs", "em", "lang", "eastAsianLayout",
    "specVanish", "oMath",
];

const BORDER_EDGES: &[&str] = &["top", "left", "bottom", "right", "insideH", "insideV"];

/// Qualifies element and attribute names with the template table's prefix.
struct Names {
    prefix: String,
}

impl Names {
    fn of(template: &XmlElement) -> Self {
        Self {
            prefix: template.prefix().unwrap_or_default().to_string(),
        }
    }

    fn q(&self, local: &str) -> String {
        if self.prefix.is_empty() {
            local.to_string()
        } else {
            format!("{}:{local}", self.prefix)
        }
    }

    fn el(&self, local: &str) -> XmlElement {
        XmlElement::new(self.q(local))
    }

    /// `<w:{local} w:val="{value}"/>`
    fn val(&self, local: &str, value: &str) -> XmlElement {
        self.el(local).with_attr(self.q("val"), value)
    }
}

struct CellFormat<'a> {
    width_twips: u32,
    fill: Option<&'a Color>,
    text_color: Option<&'a Color>,
    /// `Some(true)` forces bold, `Some(false)` strips inherited bold.
    bold: Option<bool>,
    font_name: &'a str,
    half_points: u32,
    horizontal: HorizontalAlignment,
    vertical: VerticalAlignment,
    merge: MergeFlag,
}

pub(crate) struct TableBuilder<'a> {
    table: &'a TableDefinition,
    result: &'a EvaluationResult,
    options: &'a RenderOptions,
}

impl<'a> TableBuilder<'a> {
    pub(crate) fn new(
        table: &'a TableDefinition,
        result: &'a EvaluationResult,
        options: &'a RenderOptions,
    ) -> Self {
        Self {
            table,
            result,
            options,
        }
    }

    pub(crate) fn build(&self, template: &XmlElement) -> XmlElement {
        let ns = Names::of(template);
        let total = grid_total(template).unwrap_or(self.options.default_table_width_twips);

        let mut tbl = XmlElement::new(template.name.clone());
        tbl.attributes = template.attributes.clone();
        tbl.push(self.table_properties(template, &ns, total));

        let header_row = template.child("tr");
        let fallback_cell = ns.el("tc");
        let template_cells: Vec<&XmlElement> = header_row
            .map(|row| row.children_named("tc").collect())
            .unwrap_or_default();
        let template_cell = |column: usize| {
            template_cells
                .get(column)
                .or(template_cells.last())
                .copied()
                .unwrap_or(&fallback_cell)
        };

        if self.result.is_empty() {
            tbl.push(grid(&ns, &[total]));
            let mut row = ns.el("tr");
            row.push(self.data_row_properties(header_row, &ns));
            let format = CellFormat {
                width_twips: total,
                fill: None,
                text_color: None,
                bold: Some(false),
                font_name: &self.table.formatting.font_name,
                half_points: self.half_points(self.table.formatting.font_size),
                horizontal: self.table.formatting.horizontal_alignment,
                vertical: self.table.formatting.vertical_alignment,
                merge: MergeFlag::None,
            };
            row.push(self.cell(&ns, template_cell(0), &self.table.empty_message, &format));
            tbl.push(row);
            return tbl;
        }

        let widths = self.column_widths(total);
        tbl.push(grid(&ns, &widths));

        let formatting = &self.table.formatting;
        let mut header = ns.el("tr");
        header.push(self.header_row_properties(header_row, &ns));
        for (column, text) in self.result.headers.iter().enumerate() {
            let mut format = self.column_format(column, widths[column]);
            format.fill = formatting.header_fill.as_ref();
            format.text_color = formatting.header_text_color.as_ref();
            format.bold = formatting.bold_header.then_some(true);
            header.push(self.cell(&ns, template_cell(column), text, &format));
        }
        tbl.push(header);

        let flags = self.merge_flags();
        for (r, values) in self.result.rows.iter().enumerate() {
            let mut row = ns.el("tr");
            row.push(self.data_row_properties(header_row, &ns));
            for column in 0..self.result.column_count() {
                let style = self.result.cell_style(r, column);
                let mut format = self.column_format(column, widths[column]);
                let alternate = (r % 2 == 1)
                    .then_some(formatting.alternate_row_fill.as_ref())
                    .flatten();
                format.fill = style.fill.as_ref().or(alternate);
                format.text_color = style.text_color.as_ref();
                format.bold = Some(false);
                format.merge = flags
                    .get(column)
                    .and_then(|f| f.as_ref())
                    .and_then(|f| f.get(r).copied())
                    .unwrap_or(MergeFlag::None);
                let text = match format.merge {
                    MergeFlag::Continuation => String::new(),
                    _ => self.cell_text(values.get(column).map(String::as_str).unwrap_or_default()),
                };
                row.push(self.cell(&ns, template_cell(column), &text, &format));
            }
            tbl.push(row);
        }
        tbl
    }

    fn table_properties(&self, template: &XmlElement, ns: &Names, total: u32) -> XmlElement {
        let mut pr = template
            .child("tblPr")
            .cloned()
            .unwrap_or_else(|| ns.el("tblPr"));
        let fit = self.table.formatting.fit_to_window;

        let width = if fit {
            ns.el("tblW")
                .with_attr(ns.q("w"), "5000")
                .with_attr(ns.q("type"), "pct")
        } else {
            ns.el("tblW")
                .with_attr(ns.q("w"), total.to_string())
                .with_attr(ns.q("type"), "dxa")
        };
        pr.upsert_ordered(width, TBL_PR_ORDER);

        let mut borders = ns.el("tblBorders");
        for edge in BORDER_EDGES {
            borders.push(
                ns.val(edge, "single")
                    .with_attr(ns.q("sz"), "4")
                    .with_attr(ns.q("space"), "0")
                    .with_attr(ns.q("color"), "auto"),
            );
        }
        pr.upsert_ordered(borders, TBL_PR_ORDER);
        pr.upsert_ordered(
            ns.el("tblLayout")
                .with_attr(ns.q("type"), if fit { "autofit" } else { "fixed" }),
            TBL_PR_ORDER,
        );
        pr
    }

    fn header_row_properties(&self, template_row: Option<&XmlElement>, ns: &Names) -> XmlElement {
        let mut pr = row_properties(template_row, ns);
        if self.table.formatting.repeat_header {
            pr.upsert_ordered(ns.el("tblHeader"), TR_PR_ORDER);
        } else {
            pr.remove_children(&["tblHeader"]);
        }
        pr
    }

    fn data_row_properties(&self, template_row: Option<&XmlElement>, ns: &Names) -> XmlElement {
        let mut pr = row_properties(template_row, ns);
        pr.remove_children(&["tblHeader"]);
        if self.table.formatting.allow_row_break_across_pages {
            pr.remove_children(&["cantSplit"]);
        } else {
            pr.upsert_ordered(ns.el("cantSplit"), TR_PR_ORDER);
        }
        pr
    }

    /// Grid widths in twips from each column's share of `total`.
    fn column_widths(&self, total: u32) -> Vec<u32> {
        let count = self.result.column_count();
        let shares: Vec<f64> = (0..count)
            .map(|c| {
                self.table
                    .columns
                    .get(c)
                    .map(|col| col.width_percent)
                    .filter(|pct| pct.is_finite() && *pct > 0.0)
                    .unwrap_or(0.0)
            })
            .collect();
        let sum: f64 = shares.iter().sum();
        shares
            .iter()
            .map(|share| {
                let pct = if sum > 0.0 { *share } else { 100.0 / count as f64 };
                (total as f64 * pct / 100.0).round() as u32
            })
            .collect()
    }

    fn column_format(&self, column: usize, width_twips: u32) -> CellFormat<'a> {
        let formatting = &self.table.formatting;
        let def = self.table.columns.get(column);
        CellFormat {
            width_twips,
            fill: None,
            text_color: None,
            bold: None,
            font_name: def
                .and_then(|c| c.font_name.as_deref())
                .unwrap_or(&formatting.font_name),
            half_points: self.half_points(
                def.and_then(|c| c.font_size).unwrap_or(formatting.font_size),
            ),
            horizontal: def
                .and_then(|c| c.horizontal_alignment)
                .unwrap_or(formatting.horizontal_alignment),
            vertical: def
                .and_then(|c| c.vertical_alignment)
                .unwrap_or(formatting.vertical_alignment),
            merge: MergeFlag::None,
        }
    }

    fn half_points(&self, points: f64) -> u32 {
        if points.is_finite() && points > 0.0 {
            (points * 2.0).round() as u32
        } else {
            self.options.default_font_size_half_points
        }
    }

    fn merge_flags(&self) -> Vec<Option<Vec<MergeFlag>>> {
        (0..self.result.column_count())
            .map(|column| {
                self.result.merge_columns.contains(&column).then(|| {
                    compute_merge_flags(
                        &self.result.rows,
                        column,
                        &self.result.merge_break_columns,
                    )
                })
            })
            .collect()
    }

    fn cell_text(&self, value: &str) -> String {
        let formatting = &self.table.formatting;
        if formatting.remove_duplicate_lines_strict {
            remove_duplicate_lines(value, true)
        } else if formatting.remove_duplicate_lines {
            remove_duplicate_lines(value, false)
        } else {
            value.to_string()
        }
    }

    fn cell(&self, ns: &Names, template: &XmlElement, text: &str, format: &CellFormat<'_>) -> XmlElement {
        let mut tc = ns.el("tc");

        let mut tc_pr = template
            .child("tcPr")
            .cloned()
            .unwrap_or_else(|| ns.el("tcPr"));
        tc_pr.remove_children(&["gridSpan", "hMerge", "vMerge"]);
        tc_pr.upsert_ordered(
            ns.el("tcW")
                .with_attr(ns.q("w"), format.width_twips.to_string())
                .with_attr(ns.q("type"), "dxa"),
            TC_PR_ORDER,
        );
        match format.merge {
            MergeFlag::Restart => tc_pr.upsert_ordered(ns.val("vMerge", "restart"), TC_PR_ORDER),
            MergeFlag::Continuation => tc_pr.upsert_ordered(ns.el("vMerge"), TC_PR_ORDER),
            MergeFlag::None => {}
        }
        match format.fill {
            Some(fill) => tc_pr.upsert_ordered(
                ns.val("shd", "clear")
                    .with_attr(ns.q("color"), "auto")
                    .with_attr(ns.q("fill"), fill.hex()),
                TC_PR_ORDER,
            ),
            None => tc_pr.remove_children(&["shd"]),
        }
        tc_pr.upsert_ordered(ns.val("vAlign", format.vertical.as_ooxml()), TC_PR_ORDER);
        tc.push(tc_pr);

        let template_p = template.child("p");
        let mut p = ns.el("p");
        let mut p_pr = template_p
            .and_then(|p| p.child("pPr"))
            .cloned()
            .unwrap_or_else(|| ns.el("pPr"));
        p_pr.upsert_ordered(ns.val("jc", format.horizontal.as_ooxml()), P_PR_ORDER);
        p.push(p_pr);

        if !text.is_empty() {
            let mut r_pr = template_p
                .and_then(|p| p.child("r"))
                .and_then(|r| r.child("rPr"))
                .cloned()
                .unwrap_or_else(|| ns.el("rPr"));
            self.apply_run_format(&mut r_pr, ns, format);

            let mut run = ns.el("r");
            run.push(r_pr);
            for (i, line) in text.split('\n').enumerate() {
                if i > 0 {
                    run.push(ns.el("br"));
                }
                let line = line.strip_suffix('\r').unwrap_or(line);
                if !line.is_empty() {
                    let mut t = ns.el("t").with_attr("xml:space", "preserve");
                    t.push_text(line);
                    run.push(t);
                }
            }
            p.push(run);
        }
        tc.push(p);
        tc
    }

    fn apply_run_format(&self, r_pr: &mut XmlElement, ns: &Names, format: &CellFormat<'_>) {
        let font = format.font_name.trim();
        if !font.is_empty() {
            let mut fonts = ns.el("rFonts");
            for slot in ["ascii", "hAnsi", "eastAsia", "cs"] {
                fonts.set_attr(ns.q(slot), font);
            }
            r_pr.upsert_ordered(fonts, R_PR_ORDER);
        }
        match format.bold {
            Some(true) => {
                r_pr.upsert_ordered(ns.el("b"), R_PR_ORDER);
                r_pr.upsert_ordered(ns.el("bCs"), R_PR_ORDER);
            }
            Some(false) => r_pr.remove_children(&["b", "bCs"]),
            None => {}
        }
        if let Some(color) = format.text_color {
            r_pr.upsert_ordered(ns.val("color", color.hex()), R_PR_ORDER);
        }
        let size = format.half_points.to_string();
        r_pr.upsert_ordered(ns.val("sz", &size), R_PR_ORDER);
        r_pr.upsert_ordered(ns.val("szCs", &size), R_PR_ORDER);
    }
}

fn row_properties(template_row: Option<&XmlElement>, ns: &Names) -> XmlElement {
    template_row
        .and_then(|row| row.child("trPr"))
        .cloned()
        .unwrap_or_else(|| ns.el("trPr"))
}

fn grid(ns: &Names, widths: &[u32]) -> XmlElement {
    let mut grid = ns.el("tblGrid");
    for width in widths {
        grid.push(ns.el("gridCol").with_attr(ns.q("w"), width.to_string()));
    }
    grid
}

/// Sum of the template's `w:gridCol` widths, when it declares any.
fn grid_total(template: &XmlElement) -> Option<u32> {
    let total: u32 = template
        .child("tblGrid")?
        .children_named("gridCol")
        .filter_map(|col| col.attr("w"))
        .filter_map(|w| w.trim().parse::<f64>().ok())
        .map(|w| w.max(0.0).round() as u32)
        .sum();
    (total > 0).then_some(total)
}
