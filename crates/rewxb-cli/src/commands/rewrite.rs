//! Rewrite command implementation
//!
//! Resamples every eligible entry of a bank into a new bank file.

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use rewxb_bank::{rewrite_file, LinearTranscoder, RewriteOptions};

use super::reporting;

/// Run the rewrite command
///
/// # Arguments
/// * `input` - Source wave bank
/// * `output` - Destination path; must not be the input
/// * `options` - Target rate and conversion flags
/// * `percentage` - Print progress as one integer percentage per line
/// * `json_output` - Print the rewrite report as JSON
pub fn run(
    input: &Path,
    output: &Path,
    options: RewriteOptions,
    percentage: bool,
    json_output: bool,
) -> Result<ExitCode> {
    if same_file(input, output) {
        bail!("input and output must be different files");
    }

    if !percentage && !json_output {
        println!(
            "{} {} -> {} at {} Hz",
            "Rewriting:".cyan().bold(),
            input.display(),
            output.display(),
            options.target_rate
        );
    }

    let progress = |index: usize, count: usize| {
        if percentage {
            println!("{}", index * 100 / count.max(1));
            let _ = std::io::stdout().flush();
        }
    };
    let report = rewrite_file(
        input,
        output,
        &options,
        &mut LinearTranscoder::new(),
        progress,
    )
    .with_context(|| format!("failed to rewrite {}", input.display()))?;

    if percentage {
        println!("100");
    }
    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !percentage {
        reporting::print_rewrite(&report);
    }
    reporting::print_warnings(&report.warnings);
    Ok(ExitCode::SUCCESS)
}

/// Paths naming the same file, even through different spellings.
fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_path_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bank.xwb");
        std::fs::write(&path, b"WBND").unwrap();

        let err = run(&path, &path, RewriteOptions::new(22050), false, false).unwrap_err();
        assert!(err.to_string().contains("different files"));
        assert_eq!(super::super::exit_status(&err), 1);
    }

    #[test]
    fn same_file_sees_through_relative_spelling() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bank.xwb");
        std::fs::write(&path, b"WBND").unwrap();
        let dotted = dir.path().join(".").join("bank.xwb");

        assert!(same_file(&path, &dotted));
        assert!(!same_file(&path, &dir.path().join("other.xwb")));
    }

    #[test]
    fn missing_input_maps_to_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(
            &dir.path().join("missing.xwb"),
            &dir.path().join("out.xwb"),
            RewriteOptions::new(22050),
            true,
            false,
        )
        .unwrap_err();
        assert_eq!(super::super::exit_status(&err), 255);
    }
}
