use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use pretty_assertions::assert_eq;
use tablefill_cli::cli::{run_with_args, Args};
use tablefill_engine::TableStatus;

const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:tbl><w:tblPr><w:tblCaption w:val="BREAKERS"/></w:tblPr><w:tblGrid><w:gridCol w:w="5000"/></w:tblGrid><w:tr><w:tc><w:p><w:r><w:t>Tag</w:t></w:r></w:p></w:tc></w:tr></w:tbl></w:body></w:document>"#;

const SPEC: &str = r#"{
  "SpecVersion": "1",
  "Tables": [
    {"Id": "Breakers", "AltText": "BREAKERS",
     "Columns": [{"Header": "Tag", "Name": "Tag"}, {"Header": "Amps", "Name": "Amps"}]},
    {"Id": "Breakers.Appendix", "AltText": "APPENDIX",
     "Columns": [{"Header": "Tag", "Name": "Tag"}]}
  ]
}"#;

const DATA: &str = r#"{"New": {"Breakers": [{"Id": "1", "Tag": "CB-1", "Amps": 400}]}}"#;

fn template_bytes() -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::FileOptions::<()>::default()
        .compression_method(zip::CompressionMethod::Deflated);
    zip.start_file("word/document.xml", options).unwrap();
    zip.write_all(DOCUMENT.as_bytes()).unwrap();
    zip.finish().unwrap().into_inner()
}

struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    fn new(spec: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("spec.json"), spec).unwrap();
        std::fs::write(dir.path().join("data.json"), DATA).unwrap();
        std::fs::write(dir.path().join("template.docx"), template_bytes()).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn args(&self) -> Args {
        Args {
            spec: self.path("spec.json"),
            data: self.path("data.json"),
            template: self.path("template.docx"),
            output: self.path("out.docx"),
            strict: false,
            summary: Some(self.path("summary.json")),
            tables: Vec::new(),
            filter_samples: 0,
        }
    }
}

fn document_xml(docx: &Path) -> String {
    let bytes = std::fs::read(docx).unwrap();
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut file = archive.by_name("word/document.xml").unwrap();
    let mut xml = String::new();
    file.read_to_string(&mut xml).unwrap();
    xml
}

#[test]
fn populates_template_and_writes_summary() {
    let ws = Workspace::new(SPEC);
    let report = run_with_args(ws.args()).unwrap();

    assert!(!report.failed());
    assert_eq!(report.spec_version.as_deref(), Some("1"));
    assert_eq!(report.summary.table("Breakers").unwrap().status, TableStatus::Ok);
    assert_eq!(
        report.summary.table("Breakers.Appendix").unwrap().status,
        TableStatus::Skipped
    );

    let xml = document_xml(&ws.path("out.docx"));
    assert!(xml.contains(">CB-1<"), "{xml}");
    assert!(xml.contains(">400<"));

    let summary: serde_json::Value =
        serde_json::from_slice(&std::fs::read(ws.path("summary.json")).unwrap()).unwrap();
    assert_eq!(summary["spec_version"], "1");
    assert_eq!(summary["tables"][0]["id"], "Breakers");
    assert_eq!(summary["tables"][0]["status"], "ok");
    assert_eq!(summary["tables"][1]["status"], "skipped");
}

#[test]
fn table_selection_limits_the_run() {
    let ws = Workspace::new(SPEC);
    let mut args = ws.args();
    args.tables = vec!["breakers.appendix".into(), "Ghost".into()];
    let report = run_with_args(args).unwrap();
    assert_eq!(report.summary.tables.len(), 1);
    assert!(report
        .summary
        .warnings
        .iter()
        .any(|w| w.contains("`Ghost`")));
}

#[test]
fn strict_mode_rejects_invalid_spec() {
    let ws = Workspace::new(r#"[{"Id": "Breakers", "AltText": "BREAKERS", "columns": []}]"#);
    let mut args = ws.args();
    args.strict = true;
    let err = run_with_args(args).unwrap_err();
    assert!(format!("{err:#}").contains("load spec"), "{err:#}");
    assert!(!ws.path("out.docx").exists());
}

#[test]
fn binary_exits_non_zero_on_spec_errors() {
    let ws = Workspace::new(r#"[{"Id": "Breakers", "AltText": "BREAKERS", "columns": []}]"#);
    let output = Command::new(env!("CARGO_BIN_EXE_tablefill"))
        .arg("--spec")
        .arg(ws.path("spec.json"))
        .arg("--data")
        .arg(ws.path("data.json"))
        .arg("--template")
        .arg(ws.path("template.docx"))
        .arg("--output")
        .arg(ws.path("out.docx"))
        .env_remove("RUST_LOG")
        .output()
        .expect("spawn tablefill");
    assert!(!output.status.success());
    let stdout: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(!stdout["spec_errors"].as_array().unwrap().is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("PascalCase"));
}

#[test]
fn filter_samples_are_printed_to_stderr() {
    let ws = Workspace::new(
        r#"[{"Id": "Breakers", "AltText": "BREAKERS",
             "FilterSpecs": [{"PropertyPath": "Amps", "Operator": "gte", "Value": 500, "Numeric": true}],
             "Columns": [{"Header": "Tag", "Name": "Tag"}]}]"#,
    );
    std::fs::write(
        ws.path("data.json"),
        r#"{"New": {"Breakers": [{"Id": "1", "Tag": "CB-1", "Amps": 400},
                                 {"Id": "2", "Tag": "CB-2", "Amps": 800}]}}"#,
    )
    .unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_tablefill"))
        .arg("--spec")
        .arg(ws.path("spec.json"))
        .arg("--data")
        .arg(ws.path("data.json"))
        .arg("--template")
        .arg(ws.path("template.docx"))
        .arg("--output")
        .arg(ws.path("out.docx"))
        .arg("--filter-samples")
        .arg("5")
        .env_remove("RUST_LOG")
        .output()
        .expect("spawn tablefill");
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("record `1` failed filters"), "{stderr}");
    assert!(stderr.contains("record `2` passed filters"), "{stderr}");

    let xml = document_xml(&ws.path("out.docx"));
    assert!(xml.contains(">CB-2<"));
    assert!(!xml.contains(">CB-1<"));
}
