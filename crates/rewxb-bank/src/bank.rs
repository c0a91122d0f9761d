//! Whole-bank decoding and validation.

use std::io::{Read, Seek, SeekFrom};

use tracing::debug;

use crate::duration::estimate_duration;
use crate::entry::{EntryTable, ResolvedRegion};
use crate::error::{BankError, BankWarning};
use crate::layout::{
    fixed_string, BankData, BankHeader, Region, Segment, WAVEBANK_ALIGNMENT_DVD,
    WAVEBANK_ALIGNMENT_MIN, WAVEBANK_DVD_SECTOR_SIZE, WAVEBANK_ENTRYNAME_LENGTH,
    WAVEBANK_MAX_COMPACT_DATA_SEGMENT_SIZE, XMA_ALIGNMENT,
};
use crate::miniformat::{FormatTag, MiniFormat};
use crate::seek::SeekTables;

/// A decoded wave bank: everything except the wave data itself.
#[derive(Debug, Clone)]
pub struct WaveBank {
    pub header: BankHeader,
    pub data: BankData,
    pub entries: EntryTable,
    /// Entry names, when the names segment is present and consistent.
    pub names: Option<Vec<String>>,
    /// Parsed seek table segment, when present and well formed.
    pub seek_tables: Option<SeekTables>,
    /// Bank-level anomalies found while decoding.
    pub warnings: Vec<BankWarning>,
}

/// Per-entry view used by inspection and rewriting.
#[derive(Debug, Clone)]
pub struct EntryInfo<'a> {
    pub index: usize,
    pub format: MiniFormat,
    /// Play region relative to the wave data segment.
    pub region: Region,
    pub seek_table: Option<&'a [u32]>,
    pub estimated_duration: u32,
    pub warnings: Vec<BankWarning>,
}

/// Push `warning` onto `warnings`, logging it.
pub(crate) fn record(warnings: &mut Vec<BankWarning>, warning: BankWarning) {
    debug!("{}", warning);
    warnings.push(warning);
}

impl WaveBank {
    /// Decode and validate a bank.
    ///
    /// Structural problems are fatal; everything a best-effort rewrite can
    /// live with ends up in [`WaveBank::warnings`] or in the per-entry
    /// warnings of [`WaveBank::entry_info`].
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self, BankError> {
        reader.seek(SeekFrom::Start(0)).map_err(BankError::Read)?;
        let header = BankHeader::read(reader)?;
        header.check_payload_last()?;

        let bank_region = header.segment(Segment::BankData);
        reader
            .seek(SeekFrom::Start(bank_region.offset as u64))
            .map_err(BankError::Read)?;
        let data = BankData::read(reader)?;
        debug!(
            flags = data.flags,
            entries = data.entry_count,
            alignment = data.alignment,
            "read bank data"
        );

        let compact = data.is_compact();
        let element_size = EntryTable::element_size(compact);
        if data.entry_metadata_element_size != element_size {
            return Err(BankError::SizeMismatch {
                what: "entry metadata element",
                expected: element_size as u64,
                actual: data.entry_metadata_element_size as u64,
            });
        }

        let mut warnings = Vec::new();
        if compact && !data.is_streaming() {
            record(&mut warnings, BankWarning::CompactNotStreaming);
        }
        if !(WAVEBANK_ALIGNMENT_MIN..=WAVEBANK_ALIGNMENT_DVD).contains(&data.alignment) {
            record(
                &mut warnings,
                BankWarning::AlignmentOutOfRange {
                    alignment: data.alignment,
                },
            );
        }
        if data.is_streaming() && data.alignment < WAVEBANK_DVD_SECTOR_SIZE {
            record(
                &mut warnings,
                BankWarning::StreamingUnderaligned {
                    alignment: data.alignment,
                },
            );
        }

        if data.entry_count == 0 {
            let entries = if compact {
                EntryTable::Compact(Vec::new())
            } else {
                EntryTable::Standard(Vec::new())
            };
            return Ok(Self {
                header,
                data,
                entries,
                names: None,
                seek_tables: None,
                warnings,
            });
        }

        let metadata = header.segment(Segment::EntryMetadata);
        let expected = data.entry_count as u64 * element_size as u64;
        if metadata.length as u64 != expected {
            return Err(BankError::SizeMismatch {
                what: "entry metadata",
                expected,
                actual: metadata.length as u64,
            });
        }

        let names = read_entry_names(reader, &header, &data, &mut warnings)?;

        let seek_region = header.segment(Segment::SeekTables);
        let seek_tables = if seek_region.length > 0 {
            let raw = read_segment(reader, seek_region, "seek tables")?;
            match SeekTables::parse(&raw, data.entry_count) {
                Ok(tables) => Some(tables),
                Err(warning) => {
                    record(&mut warnings, warning);
                    None
                }
            }
        } else {
            None
        };

        let raw = read_segment(reader, metadata, "entry metadata")?;
        let entries = EntryTable::decode(&raw, data.entry_count, compact)?;

        let payload_length = header.segment(Segment::EntryWaveData).length;
        let max = WAVEBANK_MAX_COMPACT_DATA_SEGMENT_SIZE as u64 * data.alignment as u64;
        if compact && payload_length as u64 > max {
            return Err(BankError::CompactPayloadTooLarge {
                length: payload_length,
                max,
            });
        }

        Ok(Self {
            header,
            data,
            entries,
            names,
            seek_tables,
            warnings,
        })
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_compact(&self) -> bool {
        self.entries.is_compact()
    }

    pub fn payload_region(&self) -> Region {
        self.header.segment(Segment::EntryWaveData)
    }

    pub fn entry_name(&self, index: usize) -> Option<&str> {
        self.names.as_ref()?.get(index).map(String::as_str)
    }

    pub fn entry_format(&self, index: usize) -> MiniFormat {
        self.entries.format(index, self.data.compact_format)
    }

    /// Resolve entry `index` and run the per-entry checks.
    pub fn entry_info(&self, index: usize) -> EntryInfo<'_> {
        let format = self.entry_format(index);
        let ResolvedRegion {
            region,
            mut warnings,
        } = self
            .entries
            .resolve_region(index, self.payload_region().length, self.data.alignment);
        for warning in &warnings {
            debug!("{}", warning);
        }

        let seek_table = match &self.seek_tables {
            Some(tables) => match tables.entry_table(index) {
                Ok(table) => table,
                Err(warning) => {
                    record(&mut warnings, warning);
                    None
                }
            },
            None => None,
        };

        let tag = format.tag();
        if tag == FormatTag::Xma && region.offset % XMA_ALIGNMENT != 0 {
            record(
                &mut warnings,
                BankWarning::MisalignedXma {
                    entry: index,
                    offset: region.offset,
                },
            );
        }
        if tag.needs_seek_table() && seek_table.is_none() {
            record(
                &mut warnings,
                BankWarning::MissingSeekTable {
                    entry: index,
                    format: tag.name(),
                },
            );
        }

        EntryInfo {
            index,
            format,
            region,
            seek_table,
            estimated_duration: estimate_duration(region.length, format, seek_table),
            warnings,
        }
    }

    /// Checks that need every entry: XMA segment placement and total wave size.
    pub fn summary_warnings(&self, has_xma: bool, wave_bytes: u64) -> Vec<BankWarning> {
        let mut warnings = Vec::new();
        let payload = self.payload_region();
        if has_xma && payload.offset % XMA_ALIGNMENT != 0 {
            record(
                &mut warnings,
                BankWarning::XmaSegmentMisaligned {
                    offset: payload.offset,
                },
            );
        }
        if wave_bytes > payload.length as u64 {
            record(
                &mut warnings,
                BankWarning::WaveBytesExceedSegment {
                    total: wave_bytes,
                    payload_length: payload.length,
                },
            );
        }
        warnings
    }
}

fn read_segment<R: Read + Seek>(
    reader: &mut R,
    region: Region,
    what: &'static str,
) -> Result<Vec<u8>, BankError> {
    reader
        .seek(SeekFrom::Start(region.offset as u64))
        .map_err(BankError::Read)?;
    let mut buf = vec![0u8; region.length as usize];
    reader
        .read_exact(&mut buf)
        .map_err(BankError::read(what, region.length as usize))?;
    Ok(buf)
}

fn read_entry_names<R: Read + Seek>(
    reader: &mut R,
    header: &BankHeader,
    data: &BankData,
    warnings: &mut Vec<BankWarning>,
) -> Result<Option<Vec<String>>, BankError> {
    let region = header.segment(Segment::EntryNames);
    if region.length == 0 {
        return Ok(None);
    }

    let element_size = data.entry_name_element_size;
    if region.length as u64 != element_size as u64 * data.entry_count as u64 {
        record(
            warnings,
            BankWarning::EntryNamesMismatch {
                entry_count: data.entry_count,
                length: region.length,
                element_size,
            },
        );
        return Ok(None);
    }

    let raw = read_segment(reader, region, "entry names")?;
    let names = raw
        .chunks_exact(element_size as usize)
        .map(|name| fixed_string(&name[..name.len().min(WAVEBANK_ENTRYNAME_LENGTH)]))
        .collect();
    Ok(Some(names))
}
