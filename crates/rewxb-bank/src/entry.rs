//! Entry metadata records and the entry table.
//!
//! A bank stores either standard records (24 bytes, full per-entry metadata)
//! or compact records (4 bytes, quantized offset plus a length deviation and
//! the bank-wide format). The variant is picked once per bank by
//! [`WAVEBANK_FLAGS_COMPACT`](crate::layout::WAVEBANK_FLAGS_COMPACT).

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;

use crate::error::{BankError, BankWarning};
use crate::layout::Region;
use crate::miniformat::MiniFormat;

/// Size of a standard entry record.
pub const STANDARD_ENTRY_SIZE: u32 = 24;
/// Size of a compact entry record.
pub const COMPACT_ENTRY_SIZE: u32 = 4;

/// Entry flag: read ahead when streaming.
pub const WAVEBANKENTRY_FLAGS_READAHEAD: u32 = 0x1;
/// Entry flag: keep loop data cached.
pub const WAVEBANKENTRY_FLAGS_LOOPCACHE: u32 = 0x2;
/// Entry flag: drop data after the loop end.
pub const WAVEBANKENTRY_FLAGS_REMOVELOOPTAIL: u32 = 0x4;
/// Entry flag: play without looping.
pub const WAVEBANKENTRY_FLAGS_IGNORELOOP: u32 = 0x8;

/// Loop boundaries are kept on multiples of this many samples.
pub const LOOP_GRANULARITY: u32 = 32;

const DURATION_MASK: u32 = 0x0FFF_FFFF;
const COMPACT_OFFSET_MASK: u32 = 0x001F_FFFF;
const COMPACT_DEVIATION_SHIFT: u32 = 21;
const COMPACT_DEVIATION_MASK: u32 = 0x7FF;

/// Loop region in samples. A zero total means no loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SampleRegion {
    pub start_sample: u32,
    pub total_samples: u32,
}

/// Standard (non-compact) entry record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardEntry {
    /// 4-bit flags in the low bits, 28-bit duration above.
    pub flags_and_duration: u32,
    pub format: MiniFormat,
    /// Region within the wave data segment.
    pub play_region: Region,
    pub loop_region: SampleRegion,
}

impl StandardEntry {
    pub fn new(
        flags: u32,
        duration: u32,
        format: MiniFormat,
        play_region: Region,
        loop_region: SampleRegion,
    ) -> Self {
        let mut entry = Self {
            flags_and_duration: flags & 0xF,
            format,
            play_region,
            loop_region,
        };
        entry.set_duration(duration);
        entry
    }

    pub fn flags(&self) -> u32 {
        self.flags_and_duration & 0xF
    }

    /// Duration in samples, independent of channel count and encoding.
    pub fn duration(&self) -> u32 {
        self.flags_and_duration >> 4
    }

    /// Store a duration, clamped to the 28-bit field.
    pub fn set_duration(&mut self, duration: u32) {
        self.flags_and_duration = self.flags() | (duration.min(DURATION_MASK) << 4);
    }

    pub fn flag_names(&self) -> Vec<&'static str> {
        let flags = self.flags();
        [
            (WAVEBANKENTRY_FLAGS_READAHEAD, "read_ahead"),
            (WAVEBANKENTRY_FLAGS_LOOPCACHE, "loop_cache"),
            (WAVEBANKENTRY_FLAGS_REMOVELOOPTAIL, "remove_loop_tail"),
            (WAVEBANKENTRY_FLAGS_IGNORELOOP, "ignore_loop"),
        ]
        .into_iter()
        .filter(|(bit, _)| flags & bit != 0)
        .map(|(_, name)| name)
        .collect()
    }

    fn read(cursor: &mut Cursor<&[u8]>) -> std::io::Result<Self> {
        Ok(Self {
            flags_and_duration: cursor.read_u32::<LittleEndian>()?,
            format: MiniFormat::from_raw(cursor.read_u32::<LittleEndian>()?),
            play_region: Region::read(cursor)?,
            loop_region: SampleRegion {
                start_sample: cursor.read_u32::<LittleEndian>()?,
                total_samples: cursor.read_u32::<LittleEndian>()?,
            },
        })
    }

    fn write(&self, out: &mut Vec<u8>) -> std::io::Result<()> {
        out.write_u32::<LittleEndian>(self.flags_and_duration)?;
        out.write_u32::<LittleEndian>(self.format.raw())?;
        self.play_region.write(out)?;
        out.write_u32::<LittleEndian>(self.loop_region.start_sample)?;
        out.write_u32::<LittleEndian>(self.loop_region.total_samples)
    }

    /// Apply a transcoded payload to this record.
    ///
    /// Loop points are rescaled by `new_rate / old_rate` on a 32-sample grid
    /// and the loop length is clamped to the new duration.
    pub fn rewritten(
        &self,
        new_offset: u32,
        new_length: u32,
        new_duration: u32,
        new_format: MiniFormat,
    ) -> Self {
        let mut entry = *self;
        entry.play_region = Region::new(new_offset, new_length);
        entry.set_duration(new_duration);
        entry.format = new_format;

        let old_rate = self.format.sample_rate() as u64;
        let new_rate = new_format.sample_rate() as u64;
        if entry.loop_region.total_samples > 0 && old_rate > 0 {
            let rescale = |samples: u32| -> u32 {
                let blocks = (samples / LOOP_GRANULARITY) as u64;
                let scaled = blocks * new_rate / old_rate * LOOP_GRANULARITY as u64;
                u32::try_from(scaled).unwrap_or(u32::MAX / LOOP_GRANULARITY * LOOP_GRANULARITY)
            };
            entry.loop_region.start_sample = rescale(entry.loop_region.start_sample);
            entry.loop_region.total_samples =
                rescale(entry.loop_region.total_samples).min(new_duration);
        }
        entry
    }
}

/// Compact entry record: 21-bit offset in alignment units, 11-bit length deviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactEntry(u32);

impl CompactEntry {
    pub fn new(offset_units: u32, length_deviation: u32) -> Self {
        Self(
            (offset_units & COMPACT_OFFSET_MASK)
                | ((length_deviation & COMPACT_DEVIATION_MASK) << COMPACT_DEVIATION_SHIFT),
        )
    }

    pub const fn from_raw(value: u32) -> Self {
        Self(value)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub fn offset_units(self) -> u32 {
        self.0 & COMPACT_OFFSET_MASK
    }

    /// Bytes of padding between the end of this wave and the next offset.
    pub fn length_deviation(self) -> u32 {
        (self.0 >> COMPACT_DEVIATION_SHIFT) & COMPACT_DEVIATION_MASK
    }

    pub fn with_offset_units(self, units: u32) -> Self {
        Self::new(units, self.length_deviation())
    }

    pub fn with_length_deviation(self, deviation: u32) -> Self {
        Self::new(self.offset_units(), deviation)
    }
}

/// How an entry's record changes after its payload was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryUpdate {
    /// Payload copied unchanged to a new byte offset.
    Relocate { offset: u32 },
    /// Payload replaced by transcoded audio.
    Transcode {
        offset: u32,
        length: u32,
        duration: u32,
        format: MiniFormat,
    },
}

/// A play region resolved from an entry, with any range or alignment issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRegion {
    pub region: Region,
    pub warnings: Vec<BankWarning>,
}

/// Decoded entry metadata segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryTable {
    Standard(Vec<StandardEntry>),
    Compact(Vec<CompactEntry>),
}

impl EntryTable {
    /// Record size of the variant selected by `compact`.
    pub fn element_size(compact: bool) -> u32 {
        if compact {
            COMPACT_ENTRY_SIZE
        } else {
            STANDARD_ENTRY_SIZE
        }
    }

    /// Decode `count` records from the entry metadata segment.
    pub fn decode(data: &[u8], count: u32, compact: bool) -> Result<Self, BankError> {
        let expected = count as u64 * Self::element_size(compact) as u64;
        if data.len() as u64 != expected {
            return Err(BankError::SizeMismatch {
                what: "entry metadata",
                expected,
                actual: data.len() as u64,
            });
        }

        let mut cursor = Cursor::new(data);
        if compact {
            let mut entries = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let raw = cursor.read_u32::<LittleEndian>().map_err(BankError::Read)?;
                entries.push(CompactEntry::from_raw(raw));
            }
            Ok(EntryTable::Compact(entries))
        } else {
            let mut entries = Vec::with_capacity(count as usize);
            for _ in 0..count {
                entries.push(StandardEntry::read(&mut cursor).map_err(BankError::Read)?);
            }
            Ok(EntryTable::Standard(entries))
        }
    }

    /// Serialize the table back into the entry metadata layout.
    pub fn encode(&self) -> Vec<u8> {
        let size = Self::element_size(self.is_compact()) as usize;
        let mut out = Vec::with_capacity(self.len() * size);
        match self {
            EntryTable::Standard(entries) => {
                for entry in entries {
                    let _ = entry.write(&mut out);
                }
            }
            EntryTable::Compact(entries) => {
                for entry in entries {
                    let _ = out.write_u32::<LittleEndian>(entry.raw());
                }
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        match self {
            EntryTable::Standard(entries) => entries.len(),
            EntryTable::Compact(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_compact(&self) -> bool {
        matches!(self, EntryTable::Compact(_))
    }

    /// Format of entry `index`; compact entries share `compact_format`.
    pub fn format(&self, index: usize, compact_format: MiniFormat) -> MiniFormat {
        match self {
            EntryTable::Standard(entries) => entries[index].format,
            EntryTable::Compact(_) => compact_format,
        }
    }

    /// Stored duration; compact entries have none.
    pub fn stored_duration(&self, index: usize) -> Option<u32> {
        match self {
            EntryTable::Standard(entries) => Some(entries[index].duration()),
            EntryTable::Compact(_) => None,
        }
    }

    /// Loop region, if the entry has one.
    pub fn loop_region(&self, index: usize) -> Option<SampleRegion> {
        match self {
            EntryTable::Standard(entries) => {
                Some(entries[index].loop_region).filter(|r| r.total_samples > 0)
            }
            EntryTable::Compact(_) => None,
        }
    }

    /// Length deviation of entry `index`; standard entries have none.
    pub fn length_deviation(&self, index: usize) -> Option<u32> {
        match self {
            EntryTable::Standard(_) => None,
            EntryTable::Compact(entries) => Some(entries[index].length_deviation()),
        }
    }

    /// Set the gap after compact entry `index`. Standard entries are unchanged.
    pub fn set_length_deviation(&mut self, index: usize, deviation: u32) {
        if let EntryTable::Compact(entries) = self {
            entries[index] = entries[index].with_length_deviation(deviation);
        }
    }

    /// Resolve entry `index` to a byte region within the wave data segment.
    ///
    /// Compact lengths are derived from the next entry's offset, or from
    /// `payload_length` for the last entry. Anomalies are reported alongside
    /// the as-decoded region rather than failing.
    pub fn resolve_region(
        &self,
        index: usize,
        payload_length: u32,
        alignment: u32,
    ) -> ResolvedRegion {
        let region = match self {
            EntryTable::Standard(entries) => entries[index].play_region,
            EntryTable::Compact(entries) => {
                let entry = entries[index];
                let offset = entry.offset_units() as u64 * alignment as u64;
                let end = match entries.get(index + 1) {
                    Some(next) => next.offset_units() as u64 * alignment as u64,
                    None => payload_length as u64,
                };
                let length = end
                    .saturating_sub(offset)
                    .saturating_sub(entry.length_deviation() as u64);
                Region::new(offset as u32, length as u32)
            }
        };

        let mut warnings = Vec::new();
        if region.length == 0 {
            warnings.push(BankWarning::ZeroLength { entry: index });
        }
        if region.offset > payload_length || region.end() > payload_length as u64 {
            warnings.push(BankWarning::RegionOutOfRange {
                entry: index,
                offset: region.offset,
                length: region.length,
                payload_length,
            });
        }
        if alignment != 0 && region.offset % alignment != 0 {
            warnings.push(BankWarning::MisalignedOffset {
                entry: index,
                offset: region.offset,
                alignment,
            });
        }

        ResolvedRegion { region, warnings }
    }

    /// Update entry `index` after its payload was written.
    ///
    /// Compact entries only ever relocate; their offset is stored in
    /// `alignment` units.
    pub fn rewrite_entry(&mut self, index: usize, update: EntryUpdate, alignment: u32) {
        match (self, update) {
            (EntryTable::Standard(entries), EntryUpdate::Relocate { offset }) => {
                entries[index].play_region.offset = offset;
            }
            (
                EntryTable::Standard(entries),
                EntryUpdate::Transcode {
                    offset,
                    length,
                    duration,
                    format,
                },
            ) => {
                entries[index] = entries[index].rewritten(offset, length, duration, format);
            }
            (EntryTable::Compact(entries), EntryUpdate::Relocate { offset })
            | (EntryTable::Compact(entries), EntryUpdate::Transcode { offset, .. }) => {
                let units = if alignment == 0 { offset } else { offset / alignment };
                entries[index] = entries[index].with_offset_units(units);
            }
        }
    }
}
