use anyhow::Result;

fn main() -> Result<()> {
    let report = tablefill_cli::cli::run()?;
    if report.failed() {
        std::process::exit(1);
    }
    Ok(())
}
