use autodub::segment::{find_large_gaps, find_large_segments, load_records, render_report};
use clap::error::ErrorKind;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

const USAGE: &str = "Usage: find-gaps <json_file> [gap_threshold] [segment_threshold]";

/// Report silent gaps and overly long segments in a segment-list JSON file.
#[derive(Parser)]
#[command(name = "find-gaps", version)]
struct Cli {
    /// JSON array of segments with id, start_time, end_time and text
    json_file: Option<PathBuf>,

    /// Minimum gap between consecutive segments, in seconds
    #[arg(default_value_t = 30.0)]
    gap_threshold: f64,

    /// Minimum segment duration to report, in seconds
    #[arg(default_value_t = 30.0)]
    segment_threshold: f64,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("{}", USAGE);
            return ExitCode::FAILURE;
        }
    };

    let Some(json_file) = cli.json_file else {
        eprintln!("{}", USAGE);
        return ExitCode::FAILURE;
    };

    if !json_file.exists() {
        eprintln!("Error: File '{}' not found.", json_file.display());
        return ExitCode::FAILURE;
    }

    let records = match load_records(&json_file) {
        Ok(records) => records,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let gaps = find_large_gaps(&records, cli.gap_threshold);
    let large_segments = find_large_segments(&records, cli.segment_threshold);
    print!(
        "{}",
        render_report(&gaps, cli.gap_threshold, &large_segments, cli.segment_threshold)
    );

    ExitCode::SUCCESS
}
