use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;

use nocomment::format::infer_extension;
use nocomment::{convert, list_comments, Comment, OutputFormat, PackageHost, Settings, SheetScope};

#[derive(Parser)]
#[command(name = "nocomment")]
#[command(about = "Remove every comment from a Word or Excel document")]
#[command(version)]
struct Cli {
    /// Source document: a path, file:// URL or http(s):// URL
    #[arg(required_unless_present = "init_config")]
    file_url: Option<String>,

    /// Document type (doc, docx, xls, xlsx); inferred from FILE_URL when omitted
    #[arg(short, long)]
    ext: Option<String>,

    /// Directory that receives output.<ext>
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Which sheets of a workbook to clean
    #[arg(long, value_enum)]
    scope: Option<SheetScope>,

    /// List the comments that would be removed without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Report format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Settings file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the default settings file and exit
    #[arg(long)]
    init_config: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let cli = Cli::parse();

    if cli.init_config {
        return match Settings::init_default()? {
            Some(path) => {
                println!("Wrote default settings to {}", path.display());
                Ok(())
            }
            None => bail!("no user config directory on this platform"),
        };
    }

    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    if let Some(output_dir) = cli.output_dir {
        settings.output_dir = output_dir;
    }
    if let Some(scope) = cli.scope {
        settings.sheet_scope = scope;
    }

    let file_url = cli.file_url.context("FILE_URL is required")?;
    let ext = match cli.ext {
        Some(ext) => ext,
        None => infer_extension(&file_url).with_context(|| {
            format!("cannot tell the document type of {file_url}; pass --ext")
        })?,
    };

    let mut host = PackageHost::from_settings(&settings);

    if cli.dry_run {
        let comments = list_comments(&mut host, &file_url, &ext)
            .with_context(|| format!("failed to read comments from {file_url}"))?;
        match cli.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&comments)?),
            OutputFormat::Text => print_comments(&file_url, &comments),
        }
        return Ok(());
    }

    let report = convert(&mut host, &file_url, &ext)
        .with_context(|| format!("failed to strip comments from {file_url}"))?;
    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            println!(
                "Removed {} comment(s) from {}",
                report.removed.len(),
                report.source
            );
            println!("Wrote {}", report.output.display());
        }
    }

    Ok(())
}

fn print_comments(file_url: &str, comments: &[Comment]) {
    println!("{} comment(s) in {file_url}", comments.len());
    for comment in comments {
        let author = comment.author.as_deref().unwrap_or("unknown");
        let first_line = comment.text.lines().next().unwrap_or("");
        println!("  [{}] {author}: {first_line}", comment.id);
    }
}
