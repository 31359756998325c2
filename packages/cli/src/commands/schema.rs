use anyhow::Result;
use clap::Args;
use colored::Colorize;
use folio_schema::Schema;

#[derive(Args, Debug)]
pub struct SchemaArgs {
    /// Print the raw JSON manifest
    #[arg(long)]
    pub json: bool,
}

pub fn schema(args: SchemaArgs, _cwd: &str) -> Result<()> {
    let manifest = Schema::manifest();

    if args.json {
        println!("{}", serde_json::to_string_pretty(manifest)?);
        return Ok(());
    }

    println!("{}", "Nodes".bold());
    for node in manifest.nodes {
        let attrs: Vec<String> = node
            .attrs
            .iter()
            .map(|a| {
                if a.required {
                    format!("{}*", a.name)
                } else {
                    a.name.to_string()
                }
            })
            .collect();
        println!(
            "  {:<16} {:<28} {}",
            node.kind.name().green(),
            node.content.dimmed(),
            attrs.join(", ")
        );
    }

    println!();
    println!("{}", "Marks".bold());
    for mark in manifest.marks {
        println!("  {:<16} <{}>", mark.mark.name().green(), mark.tags.join("|"));
    }
    Ok(())
}
