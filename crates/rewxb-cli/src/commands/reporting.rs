//! Human-readable console output shared by the commands.

use colored::Colorize;
use rewxb_bank::{BankReport, BankWarning, EntryAction, EntryReport, RewriteReport};

/// Print each warning with a colored prefix.
pub(super) fn print_warnings(warnings: &[BankWarning]) {
    for warning in warnings {
        eprintln!("{} {}", "warning:".yellow().bold(), warning);
    }
}

fn entry_label(index: usize, name: Option<&str>) -> String {
    match name {
        Some(name) if !name.is_empty() => format!("#{} {}", index, name),
        _ => format!("#{}", index),
    }
}

pub(super) fn print_bank(report: &BankReport) {
    println!(
        "{} {}",
        "Bank:".cyan().bold(),
        if report.bank_name.is_empty() {
            "(unnamed)"
        } else {
            report.bank_name.as_str()
        }
    );
    println!(
        "  {} {} (tool {})",
        "header version".dimmed(),
        report.header_version,
        report.tool_version
    );
    println!("  {} {}", "flags".dimmed(), report.flag_names.join(", "));
    println!(
        "  {} {} ({} bytes each), names {} bytes each",
        "entries".dimmed(),
        report.entry_count,
        report.entry_metadata_element_size,
        report.entry_name_element_size
    );
    println!("  {} {}", "alignment".dimmed(), report.alignment);
    if let Some(format) = &report.compact_format {
        println!(
            "  {} {} {} ch {} Hz",
            "compact format".dimmed(),
            format.name,
            format.channels,
            format.sample_rate
        );
    }

    println!("\n{}", "Segments:".cyan().bold());
    for segment in &report.segments {
        println!(
            "  {:<16} offset {:>10}  length {:>10}",
            segment.segment.name(),
            segment.offset,
            segment.length
        );
    }

    println!("\n{}", "Entries:".cyan().bold());
    for entry in &report.entries {
        print_entry(entry);
    }
    println!(
        "\n{} {} bytes of wave data",
        "Total:".cyan().bold(),
        report.wave_bytes
    );
}

fn print_entry(entry: &EntryReport) {
    let format = &entry.format;
    println!(
        "  {}  {} {}-bit {} ch {} Hz, {} bytes at {}, {:.3} s",
        entry_label(entry.index, entry.name.as_deref()).bold(),
        format.name,
        format.bits_per_sample,
        format.channels,
        format.sample_rate,
        entry.play_region.length,
        entry.play_region.offset,
        entry.seconds
    );
    match entry.duration {
        Some(duration) if duration != entry.estimated_duration => println!(
            "      {} {} samples (estimated {})",
            "duration".dimmed(),
            duration,
            entry.estimated_duration
        ),
        Some(duration) => println!("      {} {} samples", "duration".dimmed(), duration),
        None => println!(
            "      {} ~{} samples",
            "duration".dimmed(),
            entry.estimated_duration
        ),
    }
    if !entry.flag_names.is_empty() {
        println!("      {} {}", "flags".dimmed(), entry.flag_names.join(", "));
    }
    if let Some(looped) = entry.loop_region {
        println!(
            "      {} {}+{}",
            "loop".dimmed(),
            looped.start_sample,
            looped.total_samples
        );
    }
    if let Some(table) = &entry.seek_table {
        println!("      {} {} points", "seek table".dimmed(), table.len());
    }
}

pub(super) fn print_rewrite(report: &RewriteReport) {
    if report.copied_verbatim {
        println!("{} bank has no entries, copied unchanged", "Done:".green().bold());
        return;
    }

    for outcome in &report.entries {
        let label = entry_label(outcome.index, outcome.name.as_deref());
        match outcome.action {
            EntryAction::Converted => println!(
                "  {} {} {} {} Hz {} ch -> {} {} Hz {} ch, {} -> {} bytes",
                "~".cyan(),
                label,
                outcome.old_format,
                outcome.old_rate,
                outcome.old_channels,
                outcome.new_format,
                outcome.new_rate,
                outcome.new_channels,
                outcome.old_region.length,
                outcome.new_region.length
            ),
            EntryAction::PassedThrough => println!(
                "  {} {} {} {} Hz, {} bytes unchanged",
                "=".dimmed(),
                label,
                outcome.old_format,
                outcome.old_rate,
                outcome.old_region.length
            ),
        }
    }

    println!(
        "{} {} of {} entries converted, wave data {} -> {} bytes",
        "Done:".green().bold(),
        report.converted(),
        report.entries.len(),
        report.original_wave_bytes,
        report.new_wave_bytes
    );
}
