//! mkamb - Compile a tree of Markdown documents into an AMB hypertext book
//!
//! Usage:
//!   mkamb book/root.md book.amb
//!   mkamb book/root.md book.amb --title "User Guide" --codepage cp852

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use mkamb::{build_amb, BuildOptions, DEFAULT_CODEPAGE};

#[derive(Parser)]
#[command(name = "mkamb")]
#[command(about = "Compile a tree of Markdown documents into an AMB hypertext book")]
struct Args {
    /// Root Markdown file
    input: PathBuf,

    /// Output archive path
    output: PathBuf,

    /// Book title, stored in the optional TITLE entry
    #[arg(long)]
    title: Option<String>,

    /// Codepage for AMA encoding (e.g. 437, 852, kam, maz)
    #[arg(long, default_value = DEFAULT_CODEPAGE)]
    codepage: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let options = BuildOptions {
        title: args.title.as_deref(),
        codepage: &args.codepage,
    };

    let report = match build_amb(&args.input, &options) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("mkamb: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("mkamb: failed to create '{}': {}", parent.display(), e);
                return ExitCode::FAILURE;
            }
        }
    }

    if let Err(e) = std::fs::write(&args.output, &report.archive) {
        eprintln!("mkamb: failed to write '{}': {}", args.output.display(), e);
        return ExitCode::FAILURE;
    }

    println!("{}", args.output.display());
    ExitCode::SUCCESS
}
