use clap::Parser;
use std::path::PathBuf;

use dashtext_core::{run, DashTextSettings, FileOutcome, Mode};

#[derive(Debug, Parser)]
#[command(name = "dashtext", version, about = "Mega Man Legends MSG dialog text tool")]
struct Args {
    /// Decode the given .MSG file (or every .MSG under a directory) into
    /// editable NAME.MSG.txt artifacts.
    #[arg(
        short = 'e',
        long,
        value_name = "PATH",
        conflicts_with = "insert",
        required_unless_present = "insert"
    )]
    extract: Option<PathBuf>,

    /// Rebuild the given .MSG file (or every .MSG under a directory) from
    /// its edited NAME.MSG.txt artifact.
    #[arg(short = 'i', long, value_name = "PATH")]
    insert: Option<PathBuf>,

    /// Also write a dashtext_report.json next to the processed files.
    #[arg(long, default_value_t = false)]
    debug: bool,
}

fn main() {
    let args = Args::parse();

    let settings = if let Some(target) = args.extract {
        DashTextSettings {
            mode: Mode::Extract,
            target,
            debug: args.debug,
        }
    } else {
        DashTextSettings {
            mode: Mode::Insert,
            // Safe: clap enforces that one of --extract/--insert is
            // present, and the extract case returned above.
            target: args.insert.expect("insert is required unless --extract is used"),
            debug: args.debug,
        }
    };

    match run(settings) {
        Ok(report) => {
            for file in &report.files {
                match &file.outcome {
                    FileOutcome::Extracted(s) => println!(
                        "{} -> {} ({} blocks)",
                        file.path.display(),
                        s.text_path.display(),
                        s.blocks
                    ),
                    FileOutcome::Inserted(s) => println!(
                        "{} rebuilt ({} blocks, {} payload bytes, {} padding)",
                        file.path.display(),
                        s.blocks,
                        s.payload_bytes,
                        s.padding_bytes
                    ),
                    FileOutcome::SkippedMissingText { text_path } => println!(
                        "{} skipped ({} not found)",
                        file.path.display(),
                        text_path.display()
                    ),
                }
            }
            println!("{} file(s) processed", report.files.len());
        }
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}
