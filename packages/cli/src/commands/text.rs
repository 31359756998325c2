use super::{read_input, write_output};
use anyhow::Result;
use clap::Args;
use folio_schema::{parse, BLOCK_SEPARATOR};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct TextArgs {
    /// Input HTML file
    pub input: PathBuf,

    /// Separator placed between blocks
    #[arg(short, long, default_value = BLOCK_SEPARATOR)]
    pub separator: String,

    /// Write the text here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn text(args: TextArgs, _cwd: &str) -> Result<()> {
    let source = read_input(&args.input)?;
    let doc = parse(&source);
    write_output(args.output.as_deref(), &doc.plain_text(&args.separator))
}
