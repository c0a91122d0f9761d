//! Read-only bank inspection.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use tracing::info;

use crate::bank::WaveBank;
use crate::entry::EntryTable;
use crate::error::BankError;
use crate::layout::Segment;
use crate::miniformat::FormatTag;
use crate::report::{BankReport, CompactReport, EntryReport, FormatReport, SegmentReport};

/// Decode a bank from `reader` and describe it.
pub fn inspect<R: Read + Seek>(reader: &mut R) -> Result<BankReport, BankError> {
    let bank = WaveBank::read(reader)?;
    Ok(inspect_bank(&bank))
}

/// Decode the bank at `path` and describe it.
pub fn inspect_file(path: &Path) -> Result<BankReport, BankError> {
    let file = File::open(path).map_err(BankError::Read)?;
    let report = inspect(&mut BufReader::new(file))?;
    info!(
        path = %path.display(),
        entries = report.entry_count,
        warnings = report.warning_count(),
        "inspected wave bank"
    );
    Ok(report)
}

/// Describe an already decoded bank.
pub fn inspect_bank(bank: &WaveBank) -> BankReport {
    let mut entries = Vec::with_capacity(bank.entry_count());
    let mut wave_bytes = 0u64;
    let mut has_xma = false;

    for index in 0..bank.entry_count() {
        let info = bank.entry_info(index);
        wave_bytes += info.region.length as u64;
        has_xma |= info.format.tag() == FormatTag::Xma;

        let (flags, flag_names, compact) = match &bank.entries {
            EntryTable::Standard(list) => (list[index].flags(), list[index].flag_names(), None),
            EntryTable::Compact(list) => (
                0,
                Vec::new(),
                Some(CompactReport {
                    offset_units: list[index].offset_units(),
                    length_deviation: list[index].length_deviation(),
                }),
            ),
        };

        let duration = bank.entries.stored_duration(index);
        let shown = duration.unwrap_or(info.estimated_duration);
        let rate = info.format.sample_rate();
        let seconds = if rate > 0 {
            shown as f64 / rate as f64
        } else {
            0.0
        };

        entries.push(EntryReport {
            index,
            name: bank.entry_name(index).map(str::to_owned),
            flags,
            flag_names,
            duration,
            estimated_duration: info.estimated_duration,
            seconds,
            play_region: info.region,
            loop_region: bank.entries.loop_region(index),
            compact,
            format: FormatReport::from(info.format),
            seek_table: info.seek_table.map(|table| table[1..].to_vec()),
            warnings: info.warnings,
        });
    }

    let mut warnings = bank.warnings.clone();
    warnings.extend(bank.summary_warnings(has_xma, wave_bytes));

    let data = &bank.data;
    BankReport {
        header_version: bank.header.header_version,
        tool_version: bank.header.version,
        segments: Segment::ALL
            .iter()
            .map(|&segment| {
                let region = bank.header.segment(segment);
                SegmentReport {
                    segment,
                    offset: region.offset,
                    length: region.length,
                }
            })
            .collect(),
        flags: data.flags,
        flag_names: data.flag_names(),
        bank_name: data.bank_name(),
        entry_count: data.entry_count,
        entry_metadata_element_size: data.entry_metadata_element_size,
        entry_name_element_size: data.entry_name_element_size,
        alignment: data.alignment,
        build_time: data.build_time,
        compact_format: data.is_compact().then(|| FormatReport::from(data.compact_format)),
        entries,
        wave_bytes,
        warnings,
    }
}
