use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::process;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use txt2epub::BookBuilder;

#[derive(Parser)]
#[command(name = "txt2epub")]
#[command(about = "CLI utility to turn a manifest of plain-text chapters into an EPUB book")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an EPUB from a manifest of a book (toml file)
    Build {
        /// Manifest of the book
        manifest: PathBuf,

        /// Use a flat table of contents instead of grouping sections under chapters
        #[arg(short = 'n', long = "no-gen-toc")]
        no_gen_toc: bool,

        /// Output directory used to save the book
        #[arg(short = 'o', long = "outDir", default_value = ".")]
        out_dir: PathBuf,
    },
    /// Print the chapter outline parsed from a manifest without building anything
    Outline {
        /// Manifest of the book
        manifest: PathBuf,
    },
}

async fn build(manifest: PathBuf, out_dir: PathBuf, gen_toc: bool) -> Result<()> {
    let builder = BookBuilder::new(manifest, out_dir, gen_toc);
    let path = builder.run().await?;
    info!("save at {}", path.display().to_string().green());
    Ok(())
}

async fn outline(manifest: PathBuf) -> Result<()> {
    let builder = BookBuilder::new(manifest, ".", true);
    let (manifest, chapters) = builder.outline().await?;

    println!("{} ({})", manifest.title.bold(), manifest.id.dimmed());
    for chapter in &chapters {
        let indent = "  ".repeat(chapter.level().saturating_sub(1));
        println!(
            "{}{} {}",
            indent,
            chapter.title.blue(),
            format!("[{} lines]", chapter.lines().len()).dimmed()
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("txt2epub=info"));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let args = Args::parse();

    let result = match args.command {
        Commands::Build { manifest, no_gen_toc, out_dir } => build(manifest, out_dir, !no_gen_toc).await,
        Commands::Outline { manifest } => outline(manifest).await,
    };

    if let Err(e) = result {
        error!("{}", format!("Error: {:#}", e).red());
        process::exit(1);
    }
}
