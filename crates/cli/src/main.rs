//! CLI tool for converting documents to Markdown.

use anyhow::{bail, Context, Result};
use clap::Parser;
use docmd::{convert_file, file_type_info, validate_file_size, ConversionResult, DiskFile, SourceFile};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Convert txt, pdf, Word, Excel, CSV, HTML, RTF and PowerPoint files to Markdown.
#[derive(Parser, Debug)]
#[command(name = "docmd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input file(s)
    #[arg(required_unless_present = "list_formats")]
    input: Vec<PathBuf>,

    /// Output directory (default: same as input file)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print Markdown to stdout instead of writing .md files
    #[arg(short, long)]
    print: bool,

    /// Print the full conversion results as JSON
    #[arg(short, long)]
    json: bool,

    /// Largest accepted input, in megabytes
    #[arg(short, long, default_value = "10")]
    max_size: u64,

    /// List the supported formats and exit
    #[arg(long)]
    list_formats: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    if args.list_formats {
        for info in file_type_info() {
            println!(
                "{:<5} {:<24} {:?}/{:?}  {}",
                info.extension, info.name, info.status, info.quality, info.mime_type
            );
        }
        return Ok(());
    }

    let mut results = Vec::new();
    let mut failed = 0;

    for input_path in &args.input {
        log::info!("Processing: {}", input_path.display());

        match process_file(input_path, &args) {
            Ok(result) => {
                if let Some(error) = result.error() {
                    eprintln!("Error converting {}: {}", input_path.display(), error);
                    failed += 1;
                } else {
                    for warning in result.warnings() {
                        eprintln!("Warning ({}): {}", input_path.display(), warning);
                    }
                    emit_markdown(input_path, &result, &args)?;
                }
                results.push(result);
            }
            Err(e) => {
                eprintln!("Error processing {}: {:#}", input_path.display(), e);
                failed += 1;
            }
        }
    }

    if args.json {
        let json = serde_json::to_string_pretty(&results).context("Failed to serialize results")?;
        println!("{}", json);
    }

    if failed > 0 {
        bail!("{} of {} file(s) failed", failed, args.input.len());
    }
    Ok(())
}

/// Convert a single file after checking its size.
fn process_file(input_path: &Path, args: &Args) -> Result<ConversionResult> {
    let file = DiskFile::open(input_path)
        .with_context(|| format!("Failed to open {}", input_path.display()))?;

    if !validate_file_size(file.size(), args.max_size) {
        bail!(
            "file is {:.2} MB, larger than the {} MB limit",
            file.size() as f64 / (1024.0 * 1024.0),
            args.max_size
        );
    }

    let result = convert_file(&file).with_context(|| format!("Cannot convert {}", file.name()))?;
    log::debug!("{}: success = {}", file.name(), result.is_success());
    Ok(result)
}

/// Print or write the Markdown of a successful result.
fn emit_markdown(input_path: &Path, result: &ConversionResult, args: &Args) -> Result<()> {
    let Some(markdown) = result.markdown() else {
        return Ok(());
    };

    if args.print {
        println!("{}", markdown);
    } else if !args.json {
        let output_path = get_output_path(input_path, args.output.as_deref())?;
        write_output(&output_path, markdown)?;
        log::info!("Written to: {}", output_path.display());
    }
    Ok(())
}

/// Determine the output path for a processed file.
fn get_output_path(input_path: &Path, output_dir: Option<&Path>) -> Result<PathBuf> {
    let stem = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");

    let output_filename = format!("{}.md", stem);

    let output_path = match output_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
            dir.join(output_filename)
        }
        None => match input_path.parent() {
            Some(parent) => parent.join(output_filename),
            None => PathBuf::from(output_filename),
        },
    };

    Ok(output_path)
}

/// Write output to a file.
fn write_output(path: &Path, content: &str) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;

    writeln!(file, "{}", content).with_context(|| format!("Failed to write to {}", path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_next_to_input() {
        let path = get_output_path(Path::new("docs/report.docx"), None).unwrap();
        assert_eq!(path, PathBuf::from("docs/report.md"));
    }

    #[test]
    fn test_output_path_without_parent() {
        let path = get_output_path(Path::new("notes.txt"), None).unwrap();
        assert_eq!(path, PathBuf::from("notes.md"));
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["docmd", "a.csv"]).unwrap();
        assert_eq!(args.max_size, 10);
        assert!(!args.print && !args.json && !args.verbose);
        assert!(Args::try_parse_from(["docmd"]).is_err());
        assert!(Args::try_parse_from(["docmd", "--list-formats"]).is_ok());
    }
}
