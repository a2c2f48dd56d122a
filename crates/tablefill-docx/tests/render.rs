use std::collections::BTreeMap;
use std::io::{Cursor, Write};

use pretty_assertions::assert_eq;
use tablefill_docx::{DocxPackage, DocxTableRenderer, RenderOptions};
use tablefill_engine::{
    populate, EvaluationResult, PopulateOptions, RenderOutcome, TableRenderer, TableStatus,
};
use tablefill_model::{ProjectContext, Snapshot};
use tablefill_spec::{load_spec, Color, ColumnDefinition, TableDefinition};
use zip::write::FileOptions;
use zip::ZipWriter;

const W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const STYLES: &[u8] = b"<w:styles xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><!-- untouched --></w:styles>";

fn template_table(anchor_element: &str, anchor: &str) -> String {
    format!(
        r#"<w:tbl><w:tblPr><w:tblStyle w:val="TableGrid"/><w:{anchor_element} w:val="{anchor}"/></w:tblPr><w:tblGrid><w:gridCol w:w="3000"/><w:gridCol w:w="7000"/></w:tblGrid><w:tr><w:trPr><w:trHeight w:val="300"/></w:trPr><w:tc><w:tcPr><w:tcW w:w="3000" w:type="dxa"/></w:tcPr><w:p><w:pPr><w:spacing w:after="0"/></w:pPr><w:r><w:rPr><w:i/></w:rPr><w:t>Header 1</w:t></w:r></w:p></w:tc><w:tc><w:tcPr><w:tcW w:w="7000" w:type="dxa"/></w:tcPr><w:p><w:r><w:t>Header 2</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#
    )
}

fn document(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{W}"><w:body><w:p><w:r><w:t>Report</w:t></w:r></w:p>{body}<w:sectPr/></w:body></w:document>"#
    )
}

fn build_docx(document_xml: &str) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::<()>::default().compression_method(zip::CompressionMethod::Deflated);
    let entries: [(&str, &[u8]); 3] = [
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("word/document.xml", document_xml.as_bytes()),
        ("word/styles.xml", STYLES),
    ];
    for (name, bytes) in entries {
        zip.start_file(name, options).unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn two_columns() -> TableDefinition {
    let mut bus = ColumnDefinition::property("Bus", "Id");
    bus.merge_vertically = true;
    bus.width_percent = 25.0;
    let mut notes = ColumnDefinition::property("Notes", "Notes");
    notes.width_percent = 75.0;
    TableDefinition::new("Buses", "BUS_TABLE", vec![bus, notes])
}

fn result(rows: &[[&str; 2]]) -> EvaluationResult {
    EvaluationResult {
        table_id: "Buses".into(),
        headers: vec!["Bus".into(), "Notes".into()],
        rows: rows
            .iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect(),
        merge_columns: vec![0],
        ..EvaluationResult::default()
    }
}

fn render(doc: &str, table: &TableDefinition, result: &EvaluationResult) -> (RenderOutcome, String) {
    let mut renderer =
        DocxTableRenderer::from_bytes(&build_docx(doc), RenderOptions::default()).unwrap();
    let outcome = renderer.render_table(table, result).unwrap();
    let xml = String::from_utf8(renderer.document_xml().to_vec()).unwrap();
    (outcome, xml)
}

fn w<'a, 'input>(node: roxmltree::Node<'a, 'input>, local: &str) -> Vec<roxmltree::Node<'a, 'input>> {
    node.children()
        .filter(|n| n.is_element() && n.tag_name().name() == local)
        .collect()
}

fn w1<'a, 'input>(node: roxmltree::Node<'a, 'input>, local: &str) -> Option<roxmltree::Node<'a, 'input>> {
    w(node, local).into_iter().next()
}

fn val(node: roxmltree::Node<'_, '_>, path: &[&str], attr: &str) -> Option<String> {
    let mut current = node;
    for local in path {
        current = w1(current, local)?;
    }
    current.attribute((W, attr)).map(str::to_string)
}

fn cell_text(tc: roxmltree::Node<'_, '_>) -> String {
    let mut out = String::new();
    for n in tc.descendants().filter(|n| n.is_element()) {
        match n.tag_name().name() {
            "t" => out.push_str(n.text().unwrap_or_default()),
            "br" => out.push('\n'),
            _ => {}
        }
    }
    out
}

fn tables<'a, 'input>(doc: &'a roxmltree::Document<'input>) -> Vec<roxmltree::Node<'a, 'input>> {
    doc.descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "tbl")
        .collect()
}

#[test]
fn rebuilds_anchored_table_with_rows_merges_and_styles() {
    let doc = document(&template_table("tblCaption", "BUS_TABLE"));
    let table = two_columns();
    let mut result = result(&[
        ["B1", "Main switchgear\nRelay R1"],
        ["B1", "Tie"],
        ["B2", "Feeder"],
    ]);
    result.cell_fills = vec![vec![None, None], vec![None, None], vec![None, Color::parse("FF0000")]];
    result.cell_text_colors = vec![vec![None, None], vec![None, Color::parse("blue")], vec![None, None]];

    let (outcome, xml) = render(&doc, &table, &result);
    assert_eq!(outcome, RenderOutcome::Rendered);

    let parsed = roxmltree::Document::parse(&xml).unwrap();
    let tbls = tables(&parsed);
    assert_eq!(tbls.len(), 1);
    let tbl = tbls[0];

    assert_eq!(val(tbl, &["tblPr", "tblCaption"], "val").as_deref(), Some("BUS_TABLE"));
    assert_eq!(val(tbl, &["tblPr", "tblStyle"], "val").as_deref(), Some("TableGrid"));
    assert_eq!(val(tbl, &["tblPr", "tblW"], "type").as_deref(), Some("pct"));
    assert_eq!(val(tbl, &["tblPr", "tblLayout"], "type").as_deref(), Some("autofit"));
    assert_eq!(val(tbl, &["tblPr", "tblBorders", "insideH"], "val").as_deref(), Some("single"));

    let grid: Vec<_> = w(w1(tbl, "tblGrid").unwrap(), "gridCol")
        .into_iter()
        .map(|c| c.attribute((W, "w")).unwrap().to_string())
        .collect();
    assert_eq!(grid, vec!["2500", "7500"]);

    let rows = w(tbl, "tr");
    assert_eq!(rows.len(), 4);

    // Header row.
    let header = rows[0];
    assert!(w1(w1(header, "trPr").unwrap(), "tblHeader").is_some());
    assert_eq!(val(header, &["trPr", "trHeight"], "val").as_deref(), Some("300"));
    let header_cells = w(header, "tc");
    assert_eq!(
        header_cells.iter().map(|c| cell_text(*c)).collect::<Vec<_>>(),
        vec!["Bus", "Notes"]
    );
    assert_eq!(val(header_cells[0], &["tcPr", "shd"], "fill").as_deref(), Some("D9D9D9"));
    assert_eq!(val(header_cells[0], &["tcPr", "tcW"], "w").as_deref(), Some("2500"));
    let run_pr = w1(w1(w1(header_cells[0], "p").unwrap(), "r").unwrap(), "rPr").unwrap();
    assert!(w1(run_pr, "b").is_some());
    assert!(w1(run_pr, "i").is_some(), "template run properties are inherited");
    assert_eq!(val(run_pr, &["rFonts"], "ascii").as_deref(), Some("Calibri"));
    assert_eq!(val(run_pr, &["sz"], "val").as_deref(), Some("18"));
    assert_eq!(val(header_cells[0], &["p", "pPr", "spacing"], "after").as_deref(), Some("0"));

    // Data rows.
    for row in &rows[1..] {
        let tr_pr = w1(*row, "trPr").unwrap();
        assert!(w1(tr_pr, "cantSplit").is_some());
        assert!(w1(tr_pr, "tblHeader").is_none());
    }
    let cells: Vec<Vec<_>> = rows[1..].iter().map(|r| w(*r, "tc")).collect();

    assert_eq!(cell_text(cells[0][0]), "B1");
    assert_eq!(val(cells[0][0], &["tcPr", "vMerge"], "val").as_deref(), Some("restart"));
    assert!(w1(w1(cells[1][0], "tcPr").unwrap(), "vMerge").is_some());
    assert_eq!(val(cells[1][0], &["tcPr", "vMerge"], "val").as_deref(), None);
    assert!(w1(w1(cells[2][0], "tcPr").unwrap(), "vMerge").is_none());

    assert_eq!(cell_text(cells[0][1]), "Main switchgear\nRelay R1");
    assert_eq!(
        w1(w1(cells[0][1], "p").unwrap(), "r")
            .map(|r| w(r, "br").len()),
        Some(1)
    );

    // Alternate shading on the second data row, explicit fill on the third.
    assert_eq!(val(cells[0][1], &["tcPr", "shd"], "fill").as_deref(), None);
    assert_eq!(val(cells[1][1], &["tcPr", "shd"], "fill").as_deref(), Some("F2F2F2"));
    assert_eq!(val(cells[2][1], &["tcPr", "shd"], "fill").as_deref(), Some("FF0000"));
    assert_eq!(val(cells[1][1], &["p", "r", "rPr", "color"], "val").as_deref(), Some("0070C0"));

    let data_run_pr = w1(w1(w1(cells[0][0], "p").unwrap(), "r").unwrap(), "rPr").unwrap();
    assert!(w1(data_run_pr, "b").is_none());
    assert_eq!(val(cells[0][0], &["tcPr", "vAlign"], "val").as_deref(), Some("center"));
    assert_eq!(val(cells[0][0], &["p", "pPr", "jc"], "val").as_deref(), Some("left"));

    assert!(xml.contains("<w:t>Report</w:t>"));
    assert!(xml.trim_end().ends_with("<w:sectPr/></w:body></w:document>"));
}

#[test]
fn column_overrides_beat_table_formatting() {
    let doc = document(&template_table("tblCaption", "BUS_TABLE"));
    let mut table = two_columns();
    table.formatting.fit_to_window = false;
    table.formatting.repeat_header = false;
    table.formatting.allow_row_break_across_pages = true;
    table.columns[1].font_name = Some("Consolas".into());
    table.columns[1].font_size = Some(7.5);
    table.columns[1].horizontal_alignment = Some(tablefill_spec::HorizontalAlignment::Justify);

    let (_, xml) = render(&doc, &table, &result(&[["B1", "x"]]));
    let parsed = roxmltree::Document::parse(&xml).unwrap();
    let tbl = tables(&parsed)[0];
    assert_eq!(val(tbl, &["tblPr", "tblW"], "w").as_deref(), Some("10000"));
    assert_eq!(val(tbl, &["tblPr", "tblLayout"], "type").as_deref(), Some("fixed"));

    let rows = w(tbl, "tr");
    assert!(w1(w1(rows[0], "trPr").unwrap(), "tblHeader").is_none());
    assert!(w1(w1(rows[1], "trPr").unwrap(), "cantSplit").is_none());

    let cells = w(rows[1], "tc");
    assert_eq!(val(cells[1], &["p", "r", "rPr", "rFonts"], "hAnsi").as_deref(), Some("Consolas"));
    assert_eq!(val(cells[1], &["p", "r", "rPr", "sz"], "val").as_deref(), Some("15"));
    assert_eq!(val(cells[1], &["p", "pPr", "jc"], "val").as_deref(), Some("both"));
    assert_eq!(val(cells[0], &["p", "r", "rPr", "rFonts"], "hAnsi").as_deref(), Some("Calibri"));
}

#[test]
fn empty_result_becomes_single_message_cell() {
    let doc = document(&template_table("tblDescription", "BUS_TABLE"));
    let mut table = two_columns();
    table.empty_message = "No buses in scope.".into();

    let (outcome, xml) = render(&doc, &table, &result(&[]));
    assert_eq!(outcome, RenderOutcome::Rendered);
    let parsed = roxmltree::Document::parse(&xml).unwrap();
    let tbl = tables(&parsed)[0];
    assert_eq!(val(tbl, &["tblPr", "tblDescription"], "val").as_deref(), Some("BUS_TABLE"));
    assert_eq!(w(w1(tbl, "tblGrid").unwrap(), "gridCol").len(), 1);
    let rows = w(tbl, "tr");
    assert_eq!(rows.len(), 1);
    let cells = w(rows[0], "tc");
    assert_eq!(cells.len(), 1);
    assert_eq!(cell_text(cells[0]), "No buses in scope.");
    assert_eq!(val(cells[0], &["tcPr", "tcW"], "w").as_deref(), Some("10000"));
}

#[test]
fn duplicate_lines_are_removed_when_enabled() {
    let doc = document(&template_table("tblCaption", "BUS_TABLE"));
    let mut table = two_columns();
    table.formatting.remove_duplicate_lines = true;

    let (_, xml) = render(&doc, &table, &result(&[["B1", "Relay R1\nrelay  r1\nFuse F2"]]));
    let parsed = roxmltree::Document::parse(&xml).unwrap();
    let rows = w(tables(&parsed)[0], "tr");
    assert_eq!(cell_text(w(rows[1], "tc")[1]), "Relay R1\nFuse F2");
}

#[test]
fn anchor_lookup_is_trimmed_case_insensitive_and_nested() {
    let nested = format!(
        "<w:tbl><w:tblPr><w:tblCaption w:val=\"Layout\"/></w:tblPr><w:tr><w:tc>{}<w:p/></w:tc></w:tr></w:tbl>",
        template_table("tblDescription", "  bus_table ")
    );
    let doc = document(&nested);
    let (outcome, xml) = render(&doc, &two_columns(), &result(&[["B1", "x"]]));
    assert_eq!(outcome, RenderOutcome::Rendered);

    let parsed = roxmltree::Document::parse(&xml).unwrap();
    let tbls = tables(&parsed);
    assert_eq!(tbls.len(), 2);
    assert_eq!(val(tbls[0], &["tblPr", "tblCaption"], "val").as_deref(), Some("Layout"));
    assert_eq!(w(tbls[1], "tr").len(), 2);
}

#[test]
fn missing_anchor_leaves_document_untouched() {
    let doc = document(&template_table("tblCaption", "OTHER"));
    let bytes = build_docx(&doc);
    let mut renderer = DocxTableRenderer::from_bytes(&bytes, RenderOptions::default()).unwrap();
    let outcome = renderer
        .render_table(&two_columns(), &result(&[["B1", "x"]]))
        .unwrap();
    assert_eq!(outcome, RenderOutcome::AnchorNotFound);
    assert_eq!(renderer.document_xml(), doc.as_bytes());
}

#[test]
fn populate_run_writes_a_valid_package() {
    let spec = load_spec(
        r#"[
          {"Id": "Buses", "AltText": "BUS_TABLE", "EmptyMessage": "None.",
           "Columns": [
             {"Header": "Bus", "Name": "Id", "MergeVertically": true, "WidthPercent": 40},
             {"Header": "kV", "Name": "Kv"}
           ]},
          {"Id": "Buses.Missing", "AltText": "NOT_IN_DOC",
           "Columns": [{"Header": "Bus", "Name": "Id"}]}
        ]"#,
    )
    .unwrap();
    let snapshot = Snapshot::from_json(
        serde_json::json!({"Buses": [{"Id": "B1", "Kv": 13.8}, {"Id": "B2", "Kv": 0.48}]}),
        &BTreeMap::new(),
    )
    .unwrap();
    let context = ProjectContext::new(snapshot);

    let doc = document(&template_table("tblCaption", "BUS_TABLE"));
    let mut renderer =
        DocxTableRenderer::from_bytes(&build_docx(&doc), RenderOptions::default()).unwrap();
    let summary = populate(&spec.tables, &context, &mut renderer, &PopulateOptions::default());

    assert_eq!(summary.table("Buses").unwrap().status, TableStatus::Ok);
    assert_eq!(summary.table("Buses").unwrap().rows, 2);
    assert_eq!(summary.table("Buses.Missing").unwrap().status, TableStatus::Skipped);

    let out = renderer.to_bytes().unwrap();
    let package = DocxPackage::from_bytes(&out).unwrap();
    assert_eq!(package.part("word/styles.xml"), Some(STYLES));
    let xml = std::str::from_utf8(package.part("word/document.xml").unwrap()).unwrap();
    let parsed = roxmltree::Document::parse(xml).unwrap();
    let rows = w(tables(&parsed)[0], "tr");
    assert_eq!(
        rows.iter()
            .map(|r| w(*r, "tc").into_iter().map(cell_text).collect::<Vec<_>>())
            .collect::<Vec<_>>(),
        vec![vec!["Bus", "kV"], vec!["B1", "13.8"], vec!["B2", "0.48"]]
    );
}
