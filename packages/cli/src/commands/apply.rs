use super::{read_input, write_output, CliError};
use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use folio_editor::{Chain, Command, EditorSession};
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Input HTML file
    pub input: PathBuf,

    /// JSON array of commands, e.g. `[{"command": "selectAll"}, {"command": "toggleMark", "mark": "bold"}]`
    pub script: PathBuf,

    /// Write the resulting HTML here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Run each command as its own step instead of one atomic chain
    #[arg(long)]
    pub steps: bool,
}

pub fn apply(args: ApplyArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let source = read_input(&args.input)?;
    let script = read_input(&args.script)?;
    let commands: Vec<Command> = serde_json::from_str(&script)
        .with_context(|| format!("Invalid command script {}", args.script.display()))?;

    let mut session = EditorSession::create(config.editor, &source);
    let result = run_script(&mut session, commands, args.steps);
    let html = session.html();
    let revision = session.revision();
    session.destroy();
    result?;

    info!(revision, "script applied");
    write_output(args.output.as_deref(), &html)?;
    if let Some(output) = &args.output {
        eprintln!("{} {} (revision {})", "✓".green(), output.display(), revision);
    }
    Ok(())
}

/// Run commands against a session. As one chain, the first rejection
/// rejects everything; in steps, earlier steps stay applied.
pub fn run_script(session: &mut EditorSession, commands: Vec<Command>, steps: bool) -> Result<()> {
    if !steps {
        let chain = Chain::from(commands);
        session
            .dispatch(&chain)
            .map_err(|reason| CliError::ChainRejected {
                commands: chain.describe(),
                reason: reason.to_string(),
            })?;
        return Ok(());
    }

    for (index, command) in commands.into_iter().enumerate() {
        let name = command.name();
        session
            .apply(command)
            .map_err(|reason| CliError::ScriptRejected {
                index,
                command: name.to_string(),
                reason: reason.to_string(),
            })?;
    }
    Ok(())
}
