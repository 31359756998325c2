mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    apply, check, normalize, schema, text, ApplyArgs, CheckArgs, NormalizeArgs, SchemaArgs,
    TextArgs,
};
use tracing_subscriber::EnvFilter;

/// folio CLI - canonical rich-text HTML tooling
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rewrite an HTML file as canonical HTML
    Normalize(NormalizeArgs),

    /// Check HTML files against the schema
    Check(CheckArgs),

    /// Extract plain text
    Text(TextArgs),

    /// Print the schema manifest
    Schema(SchemaArgs),

    /// Run a JSON command script against an HTML file
    Apply(ApplyArgs),
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cwd = std::env::current_dir()
        .map(|dir| dir.display().to_string())
        .unwrap_or_else(|_| ".".to_string());

    let result = match cli.command {
        Command::Normalize(args) => normalize(args, &cwd),
        Command::Check(args) => check(args, &cwd),
        Command::Text(args) => text(args, &cwd),
        Command::Schema(args) => schema(args, &cwd),
        Command::Apply(args) => apply(args, &cwd),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
