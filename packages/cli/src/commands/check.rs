use super::{read_input, CliError};
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use folio_schema::{parse, parse_with_report, serialize, validate};
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Input HTML file or directory to check
    pub input: PathBuf,

    /// List files that passed too
    #[arg(short, long)]
    pub all: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

/// How a file maps onto the schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Status {
    /// Already canonical HTML
    Canonical,
    /// Loses nothing, but normalizing would rewrite the markup
    NotCanonical,
    /// Content was dropped or the structure had to be repaired
    Lossy,
    /// Canonical output does not survive a second round trip
    Unstable,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub path: PathBuf,
    pub status: Status,
    pub dropped: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileReport {
    fn failed(&self) -> bool {
        matches!(self.status, Status::Lossy | Status::Unstable)
    }
}

pub fn check(args: CheckArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;

    let files = if args.input.is_file() {
        vec![args.input.clone()]
    } else if args.input.is_dir() {
        find_html_files(&args.input, &config)
    } else {
        return Err(CliError::MissingInput(args.input.clone()).into());
    };

    let mut reports = Vec::new();
    for file in &files {
        reports.push(check_file(file)?);
    }

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        print_reports(&reports, args.all);
    }

    let failed = reports.iter().filter(|r| r.failed()).count();
    if failed > 0 {
        return Err(CliError::CheckFailed(failed).into());
    }
    Ok(())
}

pub fn check_file(path: &Path) -> Result<FileReport> {
    let source = read_input(path)?;
    Ok(check_source(path, &source))
}

pub fn check_source(path: &Path, source: &str) -> FileReport {
    let (doc, report) = parse_with_report(source);
    let canonical = serialize(&doc);

    let mut error = validate(&doc).err().map(|e| e.to_string());
    let reparsed = parse(&canonical);
    if error.is_none() && (reparsed != doc || serialize(&reparsed) != canonical) {
        error = Some("canonical output changed on re-parse".to_string());
    }

    let status = if error.is_some() {
        Status::Unstable
    } else if !report.is_clean() {
        Status::Lossy
    } else if canonical != source.trim() {
        Status::NotCanonical
    } else {
        Status::Canonical
    };

    FileReport {
        path: path.to_path_buf(),
        status,
        dropped: report.dropped,
        error,
    }
}

fn print_reports(reports: &[FileReport], all: bool) {
    for report in reports {
        let label = match report.status {
            Status::Canonical => {
                if !all {
                    continue;
                }
                "ok".green().bold()
            }
            Status::NotCanonical => "rewrite".yellow().bold(),
            Status::Lossy => "lossy".red().bold(),
            Status::Unstable => "unstable".red().bold(),
        };
        println!("  {} {}", label, report.path.display());
        if !report.dropped.is_empty() {
            println!("    {} {}", "dropped:".dimmed(), report.dropped.join(", "));
        }
        if let Some(error) = &report.error {
            println!("    {}", error.dimmed());
        }
    }

    let failed = reports.iter().filter(|r| r.failed()).count();
    println!();
    println!(
        "✨ {} {} file(s) checked",
        if failed > 0 {
            "Done".red().bold()
        } else {
            "Done".green().bold()
        },
        reports.len()
    );
    if failed == 0 {
        println!("   {} No issues found!", "✓".green());
    }
}

fn find_html_files(dir: &Path, config: &Config) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|path| path.is_file() && config.matches_extension(path))
        .collect();
    files.sort();
    files
}
