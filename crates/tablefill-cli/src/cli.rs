use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use serde::Serialize;
use tablefill_docx::{DocxTableRenderer, RenderOptions};
use tablefill_engine::{populate, EngineOptions, PopulateOptions, RunSummary};
use tablefill_model::ProjectContext;
use tablefill_spec::{LoadOptions, SpecLoader};

#[derive(Parser, Debug)]
#[command(about = "Populate the anchored tables of a DOCX template from a JSON table spec and dataset.")]
pub struct Args {
    /// Table specification (JSON).
    #[arg(long, value_name = "PATH")]
    pub spec: PathBuf,

    /// Dataset: `{"New": {...}, "Old": {...}, "Keys": {...}}`.
    #[arg(long, value_name = "PATH")]
    pub data: PathBuf,

    /// Template document.
    #[arg(long, value_name = "PATH")]
    pub template: PathBuf,

    /// Where to write the populated document.
    #[arg(long, value_name = "PATH")]
    pub output: PathBuf,

    /// Treat any spec error as fatal.
    #[arg(long)]
    pub strict: bool,

    /// Write the JSON run summary here instead of stdout.
    #[arg(long, value_name = "PATH")]
    pub summary: Option<PathBuf>,

    /// Only populate these table ids (repeatable).
    #[arg(long = "table", value_name = "ID")]
    pub tables: Vec<String>,

    /// Log this many filter pass/fail samples per table.
    #[arg(long, default_value_t = 0)]
    pub filter_samples: usize,
}

/// Everything the command reports: spec metadata plus the population run.
#[derive(Debug, Serialize)]
pub struct Report {
    pub spec_version: Option<String>,
    pub spec_warnings: Vec<String>,
    pub spec_errors: Vec<String>,
    #[serde(flatten)]
    pub summary: RunSummary,
}

impl Report {
    /// Whether the run should exit non-zero.
    pub fn failed(&self) -> bool {
        !self.spec_errors.is_empty() || self.summary.error_count() > 0
    }
}

pub fn run() -> Result<Report> {
    let args = Args::parse();
    init_logging(args.filter_samples)?;
    run_with_args(args)
}

/// Install the stderr logger. `RUST_LOG` sets the baseline (default `warn`); asking for filter
/// samples raises the engine to `debug` so they are printed.
pub fn init_logging(filter_samples: usize) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if filter_samples > 0 {
        builder.filter_module("tablefill_engine", LevelFilter::Debug);
    }
    builder.try_init().context("install logger")?;
    Ok(())
}

pub fn run_with_args(args: Args) -> Result<Report> {
    let spec_text = read_text(&args.spec, "spec")?;
    let loader = SpecLoader::new(LoadOptions {
        strict: args.strict,
    });
    let spec = loader
        .load(&spec_text)
        .with_context(|| format!("load spec {}", args.spec.display()))?;

    let data_text = read_text(&args.data, "dataset")?;
    let context = ProjectContext::from_json_str(&data_text)
        .with_context(|| format!("parse dataset {}", args.data.display()))?;

    let template = std::fs::read(&args.template)
        .with_context(|| format!("read template {}", args.template.display()))?;
    let mut renderer = DocxTableRenderer::from_bytes(&template, RenderOptions::default())
        .with_context(|| format!("open template {}", args.template.display()))?;

    let options = PopulateOptions {
        engine: EngineOptions {
            filter_sample_log: args.filter_samples,
            ..EngineOptions::default()
        },
        only: args.tables.clone(),
    };
    let summary = populate(&spec.tables, &context, &mut renderer, &options);

    let bytes = renderer
        .to_bytes()
        .with_context(|| format!("serialize {}", args.output.display()))?;
    std::fs::write(&args.output, bytes)
        .with_context(|| format!("write output {}", args.output.display()))?;

    let report = Report {
        spec_version: spec.version,
        spec_warnings: spec.warnings,
        spec_errors: spec.errors,
        summary,
    };
    write_report(&report, args.summary.as_deref())?;
    Ok(report)
}

fn read_text(path: &Path, what: &str) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("read {what} {}", path.display()))
}

fn write_report(report: &Report, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            let json = serde_json::to_vec_pretty(report)?;
            std::fs::write(path, json)
                .with_context(|| format!("write summary {}", path.display()))?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            serde_json::to_writer_pretty(&mut handle, report)?;
            handle.write_all(b"\n")?;
        }
    }
    Ok(())
}
