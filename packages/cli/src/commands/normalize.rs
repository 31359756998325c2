use super::{read_input, write_output};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use folio_schema::{parse_with_report, serialize};
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug)]
pub struct NormalizeArgs {
    /// Input HTML file
    pub input: PathBuf,

    /// Write the canonical HTML here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn normalize(args: NormalizeArgs, _cwd: &str) -> Result<()> {
    let source = read_input(&args.input)?;
    let (doc, report) = parse_with_report(&source);

    if !report.dropped.is_empty() {
        eprintln!(
            "{} dropped unsupported markup: {}",
            "warning:".yellow().bold(),
            report.dropped.join(", ")
        );
    }

    let html = serialize(&doc);
    info!(
        input = %args.input.display(),
        blocks = doc.blocks().len(),
        repaired = report.repaired,
        "normalized"
    );
    write_output(args.output.as_deref(), &html)?;

    if let Some(output) = &args.output {
        eprintln!("{} {}", "✓".green(), output.display());
    }
    Ok(())
}
