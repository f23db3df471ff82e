use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use covagg::cli::{cmd_report, cmd_summary, Style};

/// covagg — LCOV-like coverage report parsing with file, directory, and
/// repository rollups.
#[derive(Parser)]
#[command(name = "covagg", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print aggregated coverage for every file and directory, plus the
    /// repository total.
    Report {
        /// Path to the coverage report file. Reads stdin if omitted.
        file: Option<PathBuf>,

        /// Output style.
        #[arg(long, value_enum, default_value = "text")]
        style: Style,
    },

    /// Print only the repository-level rollup.
    Summary {
        /// Path to the coverage report file. Reads stdin if omitted.
        file: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Report { file, style } => {
            let input = read_input(file.as_deref())?;
            print!("{}", cmd_report(&input, &style)?);
        }
        Commands::Summary { file } => {
            let input = read_input(file.as_deref())?;
            print!("{}", cmd_summary(&input)?);
        }
    }

    Ok(())
}

fn read_input(file: Option<&std::path::Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read report from stdin")?;
            Ok(buf)
        }
    }
}
