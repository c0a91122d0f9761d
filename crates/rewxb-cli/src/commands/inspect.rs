//! Inspect command implementation
//!
//! Decodes a bank and prints its layout, entries and warnings without
//! writing anything.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use rewxb_bank::inspect_file;

use super::reporting;

/// Run the inspect command
///
/// # Arguments
/// * `input` - Path to the wave bank
/// * `json_output` - Print the report as JSON instead of text
pub fn run(input: &Path, json_output: bool) -> Result<ExitCode> {
    let report =
        inspect_file(input).with_context(|| format!("failed to read {}", input.display()))?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(ExitCode::SUCCESS);
    }

    reporting::print_bank(&report);
    reporting::print_warnings(&report.warnings);
    for entry in &report.entries {
        reporting::print_warnings(&entry.warnings);
    }
    Ok(ExitCode::SUCCESS)
}
