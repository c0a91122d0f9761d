//! Synthetic wave bank builder shared by the integration tests.

#![allow(dead_code)]

use rewxb_bank::entry::{CompactEntry, EntryTable, SampleRegion, StandardEntry};
use rewxb_bank::layout::{
    BankData, BankHeader, Region, BANK_DATA_SIZE, HEADER_SIZE, WAVEBANK_ENTRYNAME_LENGTH,
    WAVEBANK_FLAGS_COMPACT, WAVEBANK_FLAGS_ENTRYNAMES, WAVEBANK_FLAGS_SEEKTABLES,
    WAVEBANK_HEADER_VERSION, WAVEBANK_SIGNATURE, WAVEBANK_TYPE_STREAMING,
};
use rewxb_bank::{BitDepth, MiniFormat};

pub struct TestEntry {
    pub flags: u32,
    pub duration: u32,
    pub format: MiniFormat,
    pub payload: Vec<u8>,
    pub loop_region: SampleRegion,
    /// Zero bytes written after the payload before alignment padding.
    pub gap: u32,
}

/// Builds a bank laid out the way XACT writes them: header, bank data,
/// entry metadata, seek tables, names, then aligned wave data.
pub struct BankBuilder {
    alignment: u32,
    entries: Vec<TestEntry>,
    names: Option<Vec<String>>,
    compact_format: Option<MiniFormat>,
    seek_tables: Vec<u8>,
    streaming: bool,
    pad_tail: bool,
}

impl BankBuilder {
    pub fn new(alignment: u32) -> Self {
        Self {
            alignment,
            entries: Vec::new(),
            names: None,
            compact_format: None,
            seek_tables: Vec::new(),
            streaming: false,
            pad_tail: true,
        }
    }

    pub fn entry(mut self, format: MiniFormat, payload: Vec<u8>, duration: u32) -> Self {
        self.entries.push(TestEntry {
            flags: 0,
            duration,
            format,
            payload,
            loop_region: SampleRegion::default(),
            gap: 0,
        });
        self
    }

    /// Add a PCM entry whose duration matches its payload.
    pub fn pcm_entry(self, format: MiniFormat, payload: Vec<u8>) -> Self {
        let frame = format.block_align().max(1);
        let duration = payload.len() as u32 / frame;
        self.entry(format, payload, duration)
    }

    /// Set the loop region and flags of the last entry.
    pub fn looped(mut self, start_sample: u32, total_samples: u32, flags: u32) -> Self {
        if let Some(entry) = self.entries.last_mut() {
            entry.loop_region = SampleRegion {
                start_sample,
                total_samples,
            };
            entry.flags = flags;
        }
        self
    }

    /// Leave `bytes` of slack after the last entry's payload.
    pub fn gap(mut self, bytes: u32) -> Self {
        if let Some(entry) = self.entries.last_mut() {
            entry.gap = bytes;
        }
        self
    }

    /// End the wave data right after the last payload, without alignment padding.
    pub fn unpadded_tail(mut self) -> Self {
        self.pad_tail = false;
        self
    }

    pub fn names(mut self, names: &[&str]) -> Self {
        self.names = Some(names.iter().map(|n| n.to_string()).collect());
        self
    }

    pub fn compact(mut self, format: MiniFormat) -> Self {
        self.compact_format = Some(format);
        self
    }

    pub fn streaming(mut self) -> Self {
        self.streaming = true;
        self
    }

    /// Raw seek table segment, offsets included.
    pub fn seek_tables(mut self, words: &[u32]) -> Self {
        self.seek_tables = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        self
    }

    pub fn build(self) -> Vec<u8> {
        let alignment = self.alignment.max(1);
        let compact = self.compact_format.is_some();

        let mut wave = Vec::new();
        let mut regions = Vec::new();
        for (i, entry) in self.entries.iter().enumerate() {
            regions.push(Region::new(wave.len() as u32, entry.payload.len() as u32));
            wave.extend_from_slice(&entry.payload);
            wave.resize(wave.len() + entry.gap as usize, 0);
            let last = i + 1 == self.entries.len();
            while (self.pad_tail || !last) && wave.len() as u32 % alignment != 0 {
                wave.push(0);
            }
        }

        let table = if compact {
            let compact_entries = regions
                .iter()
                .enumerate()
                .map(|(i, region)| {
                    let end = regions
                        .get(i + 1)
                        .map_or(wave.len() as u32, |next| next.offset);
                    CompactEntry::new(region.offset / alignment, end - region.end() as u32)
                })
                .collect();
            EntryTable::Compact(compact_entries)
        } else {
            let standard_entries = self
                .entries
                .iter()
                .zip(&regions)
                .map(|(entry, &region)| {
                    StandardEntry::new(
                        entry.flags,
                        entry.duration,
                        entry.format,
                        region,
                        entry.loop_region,
                    )
                })
                .collect();
            EntryTable::Standard(standard_entries)
        };
        let metadata = table.encode();

        let mut names = Vec::new();
        if let Some(list) = &self.names {
            for name in list {
                let mut fixed = [0u8; WAVEBANK_ENTRYNAME_LENGTH];
                let len = name.len().min(WAVEBANK_ENTRYNAME_LENGTH);
                fixed[..len].copy_from_slice(&name.as_bytes()[..len]);
                names.extend_from_slice(&fixed);
            }
        }

        let bank_offset = HEADER_SIZE as u32;
        let meta_offset = bank_offset + BANK_DATA_SIZE as u32;
        let seek_offset = meta_offset + metadata.len() as u32;
        let names_offset = seek_offset + self.seek_tables.len() as u32;
        let names_end = names_offset + names.len() as u32;
        let wave_offset = names_end.div_ceil(alignment) * alignment;

        let mut flags = 0;
        if self.streaming {
            flags |= WAVEBANK_TYPE_STREAMING;
        }
        if self.names.is_some() {
            flags |= WAVEBANK_FLAGS_ENTRYNAMES;
        }
        if compact {
            flags |= WAVEBANK_FLAGS_COMPACT;
        }
        if !self.seek_tables.is_empty() {
            flags |= WAVEBANK_FLAGS_SEEKTABLES;
        }

        let mut data = BankData {
            flags,
            entry_count: self.entries.len() as u32,
            name: [0; 64],
            entry_metadata_element_size: EntryTable::element_size(compact),
            entry_name_element_size: if self.names.is_some() {
                WAVEBANK_ENTRYNAME_LENGTH as u32
            } else {
                0
            },
            alignment: self.alignment,
            compact_format: self.compact_format.unwrap_or_default(),
            build_time: 0x01d9_0000,
        };
        data.set_bank_name("Test Bank");

        let header = BankHeader {
            signature: *WAVEBANK_SIGNATURE,
            version: 44,
            header_version: WAVEBANK_HEADER_VERSION,
            segments: [
                Region::new(bank_offset, BANK_DATA_SIZE as u32),
                Region::new(meta_offset, metadata.len() as u32),
                Region::new(seek_offset, self.seek_tables.len() as u32),
                Region::new(names_offset, names.len() as u32),
                Region::new(wave_offset, wave.len() as u32),
            ],
        };

        let mut file = header.to_bytes();
        file.extend(data.to_bytes());
        file.extend(metadata);
        file.extend(self.seek_tables);
        file.extend(names);
        file.resize(wave_offset as usize, 0);
        file.extend(wave);
        file
    }
}

pub fn pcm16(channels: u32, rate: u32) -> MiniFormat {
    MiniFormat::pcm(channels, rate, BitDepth::Bits16)
}

/// Little-endian bytes of a sine sweep, `frames` long, on every channel.
pub fn sine_payload(frames: usize, channels: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(frames * channels * 2);
    for i in 0..frames {
        let value = ((i as f64 * 0.05).sin() * 12000.0) as i16;
        for _ in 0..channels {
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
    out
}

pub fn sine_samples(frames: usize) -> Vec<i16> {
    (0..frames)
        .map(|i| ((i as f64 * 0.05).sin() * 12000.0) as i16)
        .collect()
}
