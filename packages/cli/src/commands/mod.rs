pub mod apply;
pub mod check;
pub mod normalize;
pub mod schema;
pub mod text;

pub use apply::{apply, ApplyArgs};
pub use check::{check, CheckArgs};
pub use normalize::{normalize, NormalizeArgs};
pub use schema::{schema, SchemaArgs};
pub use text::{text, TextArgs};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Input path does not exist: {0}")]
    MissingInput(PathBuf),

    #[error("{0} file(s) failed the check")]
    CheckFailed(usize),

    #[error("Script rejected as a whole ({commands}): {reason}")]
    ChainRejected { commands: String, reason: String },

    #[error("Command {index} ({command}) rejected: {reason}")]
    ScriptRejected {
        index: usize,
        command: String,
        reason: String,
    },
}

pub(crate) fn read_input(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(CliError::MissingInput(path.to_path_buf()).into());
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Write to `output`, or stdout when none is given
pub(crate) fn write_output(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            println!("{content}");
            Ok(())
        }
    }
}
