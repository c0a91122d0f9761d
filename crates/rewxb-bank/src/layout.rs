//! Wave bank header structures and constants.
//!
//! All records are packed (no padding between fields) and little-endian.

use std::fmt;
use std::io::{self, Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;

use crate::error::BankError;
use crate::miniformat::MiniFormat;

/// Wave bank signature (`'DNBW'` as a little-endian u32).
pub const WAVEBANK_SIGNATURE: &[u8; 4] = b"WBND";

/// Header version written by XACT 3.
pub const WAVEBANK_HEADER_VERSION: u32 = 43;

/// Fixed bank name length.
pub const WAVEBANK_BANKNAME_LENGTH: usize = 64;

/// Maximum entry name length shown for display.
pub const WAVEBANK_ENTRYNAME_LENGTH: usize = 64;

/// Largest offset addressable by a compact entry, in alignment units.
pub const WAVEBANK_MAX_COMPACT_DATA_SEGMENT_SIZE: u32 = 0x001F_FFFF;

/// Size of the file header: signature, two versions and five regions.
pub const HEADER_SIZE: usize = 12 + SEGMENT_COUNT * 8;

/// Size of the bank data record.
pub const BANK_DATA_SIZE: usize = 8 + WAVEBANK_BANKNAME_LENGTH + 20;

/// Number of segments described by the header.
pub const SEGMENT_COUNT: usize = 5;

/// Bank type bit: streaming bank.
pub const WAVEBANK_TYPE_STREAMING: u32 = 0x0000_0001;
/// Bank flag: entry names segment present.
pub const WAVEBANK_FLAGS_ENTRYNAMES: u32 = 0x0001_0000;
/// Bank flag: compact entry records.
pub const WAVEBANK_FLAGS_COMPACT: u32 = 0x0002_0000;
/// Bank flag: sync disabled.
pub const WAVEBANK_FLAGS_SYNC_DISABLED: u32 = 0x0004_0000;
/// Bank flag: seek tables present.
pub const WAVEBANK_FLAGS_SEEKTABLES: u32 = 0x0008_0000;

/// DVD sector size.
pub const WAVEBANK_DVD_SECTOR_SIZE: u32 = 2048;
/// Smallest alignment XACT produces.
pub const WAVEBANK_ALIGNMENT_MIN: u32 = 4;
/// Largest alignment XACT produces.
pub const WAVEBANK_ALIGNMENT_DVD: u32 = WAVEBANK_DVD_SECTOR_SIZE;

/// Required XMA2 payload boundary.
pub const XMA_ALIGNMENT: u32 = 2048;

/// Segment index within the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    BankData = 0,
    EntryMetadata = 1,
    SeekTables = 2,
    EntryNames = 3,
    EntryWaveData = 4,
}

impl Segment {
    /// All segments in header order.
    pub const ALL: [Segment; SEGMENT_COUNT] = [
        Segment::BankData,
        Segment::EntryMetadata,
        Segment::SeekTables,
        Segment::EntryNames,
        Segment::EntryWaveData,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Segment::BankData => "BankData",
            Segment::EntryMetadata => "EntryMetadata",
            Segment::SeekTables => "SeekTables",
            Segment::EntryNames => "EntryNames",
            Segment::EntryWaveData => "EntryWaveData",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Byte range within the file (or within the wave data segment).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Region {
    pub offset: u32,
    pub length: u32,
}

impl Region {
    pub fn new(offset: u32, length: u32) -> Self {
        Self { offset, length }
    }

    /// One past the last byte, computed without overflow.
    pub fn end(&self) -> u64 {
        self.offset as u64 + self.length as u64
    }

    pub(crate) fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self {
            offset: reader.read_u32::<LittleEndian>()?,
            length: reader.read_u32::<LittleEndian>()?,
        })
    }

    pub(crate) fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.offset)?;
        writer.write_u32::<LittleEndian>(self.length)
    }
}

/// Wave bank file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankHeader {
    pub signature: [u8; 4],
    /// Tool version.
    pub version: u32,
    /// File format version.
    pub header_version: u32,
    pub segments: [Region; SEGMENT_COUNT],
}

impl BankHeader {
    /// Read and check the header from the start of `reader`.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, BankError> {
        let mut buf = [0u8; HEADER_SIZE];
        reader
            .read_exact(&mut buf)
            .map_err(BankError::read("valid wavebank", HEADER_SIZE))?;
        Self::parse(&buf)
    }

    /// Decode a header from its fixed byte layout.
    pub fn parse(data: &[u8]) -> Result<Self, BankError> {
        if data.len() < HEADER_SIZE {
            return Err(BankError::Truncated {
                what: "valid wavebank",
                need: HEADER_SIZE,
            });
        }

        let mut signature = [0u8; 4];
        signature.copy_from_slice(&data[0..4]);
        if &signature != WAVEBANK_SIGNATURE {
            return Err(BankError::InvalidSignature { found: signature });
        }

        let mut cursor = Cursor::new(&data[4..HEADER_SIZE]);
        let version = cursor.read_u32::<LittleEndian>().map_err(BankError::Read)?;
        let header_version = cursor.read_u32::<LittleEndian>().map_err(BankError::Read)?;
        let mut segments = [Region::default(); SEGMENT_COUNT];
        for segment in segments.iter_mut() {
            *segment = Region::read(&mut cursor).map_err(BankError::Read)?;
        }

        Ok(Self {
            signature,
            version,
            header_version,
            segments,
        })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.signature)?;
        writer.write_u32::<LittleEndian>(self.version)?;
        writer.write_u32::<LittleEndian>(self.header_version)?;
        for segment in &self.segments {
            segment.write(writer)?;
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_SIZE);
        // Writing into a Vec cannot fail.
        let _ = self.write(&mut buf);
        buf
    }

    pub fn segment(&self, segment: Segment) -> Region {
        self.segments[segment as usize]
    }

    pub fn segment_mut(&mut self, segment: Segment) -> &mut Region {
        &mut self.segments[segment as usize]
    }

    /// The wave data segment must start at or after every other segment.
    pub fn check_payload_last(&self) -> Result<(), BankError> {
        let payload_offset = self.segment(Segment::EntryWaveData).offset;
        for segment in Segment::ALL {
            let offset = self.segment(segment).offset;
            if offset > payload_offset {
                return Err(BankError::PayloadNotLast {
                    segment,
                    offset,
                    payload_offset,
                });
            }
        }
        Ok(())
    }
}

/// Bank-wide metadata record (the `BankData` segment).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankData {
    pub flags: u32,
    pub entry_count: u32,
    pub name: [u8; WAVEBANK_BANKNAME_LENGTH],
    pub entry_metadata_element_size: u32,
    pub entry_name_element_size: u32,
    pub alignment: u32,
    /// Shared format for every entry of a compact bank.
    pub compact_format: MiniFormat,
    pub build_time: u32,
}

impl BankData {
    pub fn read<R: Read>(reader: &mut R) -> Result<Self, BankError> {
        let mut buf = [0u8; BANK_DATA_SIZE];
        reader
            .read_exact(&mut buf)
            .map_err(BankError::read("bank data", BANK_DATA_SIZE))?;
        Self::parse(&buf)
    }

    pub fn parse(data: &[u8]) -> Result<Self, BankError> {
        if data.len() < BANK_DATA_SIZE {
            return Err(BankError::Truncated {
                what: "bank data",
                need: BANK_DATA_SIZE,
            });
        }

        let mut cursor = Cursor::new(data);
        let flags = cursor.read_u32::<LittleEndian>().map_err(BankError::Read)?;
        let entry_count = cursor.read_u32::<LittleEndian>().map_err(BankError::Read)?;
        let mut name = [0u8; WAVEBANK_BANKNAME_LENGTH];
        cursor.read_exact(&mut name).map_err(BankError::Read)?;
        let mut words = [0u32; 5];
        for word in words.iter_mut() {
            *word = cursor.read_u32::<LittleEndian>().map_err(BankError::Read)?;
        }

        Ok(Self {
            flags,
            entry_count,
            name,
            entry_metadata_element_size: words[0],
            entry_name_element_size: words[1],
            alignment: words[2],
            compact_format: MiniFormat::from_raw(words[3]),
            build_time: words[4],
        })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.flags)?;
        writer.write_u32::<LittleEndian>(self.entry_count)?;
        writer.write_all(&self.name)?;
        writer.write_u32::<LittleEndian>(self.entry_metadata_element_size)?;
        writer.write_u32::<LittleEndian>(self.entry_name_element_size)?;
        writer.write_u32::<LittleEndian>(self.alignment)?;
        writer.write_u32::<LittleEndian>(self.compact_format.raw())?;
        writer.write_u32::<LittleEndian>(self.build_time)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(BANK_DATA_SIZE);
        let _ = self.write(&mut buf);
        buf
    }

    /// Bank name up to the first NUL.
    pub fn bank_name(&self) -> String {
        fixed_string(&self.name)
    }

    /// Store `name`, truncated and zero-padded to the fixed width.
    pub fn set_bank_name(&mut self, name: &str) {
        self.name = [0; WAVEBANK_BANKNAME_LENGTH];
        let bytes = name.as_bytes();
        let len = bytes.len().min(WAVEBANK_BANKNAME_LENGTH);
        self.name[..len].copy_from_slice(&bytes[..len]);
    }

    pub fn is_streaming(&self) -> bool {
        self.flags & WAVEBANK_TYPE_STREAMING != 0
    }

    pub fn is_compact(&self) -> bool {
        self.flags & WAVEBANK_FLAGS_COMPACT != 0
    }

    pub fn has_entry_names(&self) -> bool {
        self.flags & WAVEBANK_FLAGS_ENTRYNAMES != 0
    }

    pub fn has_seek_tables(&self) -> bool {
        self.flags & WAVEBANK_FLAGS_SEEKTABLES != 0
    }

    pub fn sync_disabled(&self) -> bool {
        self.flags & WAVEBANK_FLAGS_SYNC_DISABLED != 0
    }

    /// Names of the set bank flags, streaming type first.
    pub fn flag_names(&self) -> Vec<&'static str> {
        let mut names = vec![if self.is_streaming() {
            "streaming"
        } else {
            "in_memory"
        }];
        if self.has_entry_names() {
            names.push("entry_names");
        }
        if self.is_compact() {
            names.push("compact");
        }
        if self.sync_disabled() {
            names.push("sync_disabled");
        }
        if self.has_seek_tables() {
            names.push("seek_tables");
        }
        names
    }
}

/// Decode a zero-padded fixed-width string.
pub(crate) fn fixed_string(data: &[u8]) -> String {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> BankHeader {
        BankHeader {
            signature: *WAVEBANK_SIGNATURE,
            version: 44,
            header_version: WAVEBANK_HEADER_VERSION,
            segments: [
                Region::new(52, 96),
                Region::new(148, 24),
                Region::new(172, 0),
                Region::new(172, 0),
                Region::new(2048, 8000),
            ],
        }
    }

    #[test]
    fn test_header_write() {
        let bytes = sample_header().to_bytes();
        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(&bytes[0..4], b"WBND");
        assert_eq!(u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]), 43);
        // Wave data region is the last 8 bytes
        assert_eq!(&bytes[44..48], &2048u32.to_le_bytes());
        assert_eq!(&bytes[48..52], &8000u32.to_le_bytes());
    }

    #[test]
    fn header_parse_round_trips() {
        let header = sample_header();
        let parsed = BankHeader::parse(&header.to_bytes()).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn header_rejects_bad_signature() {
        let mut bytes = sample_header().to_bytes();
        bytes[0..4].copy_from_slice(b"RIFF");
        match BankHeader::parse(&bytes) {
            Err(BankError::InvalidSignature { found }) => assert_eq!(&found, b"RIFF"),
            other => panic!("expected InvalidSignature, got {:?}", other),
        }
    }

    #[test]
    fn header_read_reports_truncation() {
        let bytes = sample_header().to_bytes();
        let err = BankHeader::read(&mut &bytes[..20]).unwrap_err();
        assert!(matches!(err, BankError::Truncated { .. }));
    }

    #[test]
    fn payload_must_be_last() {
        let mut header = sample_header();
        assert!(header.check_payload_last().is_ok());

        header.segment_mut(Segment::EntryNames).offset = 4096;
        match header.check_payload_last() {
            Err(BankError::PayloadNotLast { segment, .. }) => {
                assert_eq!(segment, Segment::EntryNames)
            }
            other => panic!("expected PayloadNotLast, got {:?}", other),
        }
    }

    #[test]
    fn bank_data_round_trips() {
        let mut data = BankData {
            flags: WAVEBANK_TYPE_STREAMING | WAVEBANK_FLAGS_COMPACT,
            entry_count: 3,
            name: [0; WAVEBANK_BANKNAME_LENGTH],
            entry_metadata_element_size: 4,
            entry_name_element_size: 64,
            alignment: 2048,
            compact_format: MiniFormat::from_raw(0x8056_2205),
            build_time: 0x1234_5678,
        };
        data.set_bank_name("Music");

        let bytes = data.to_bytes();
        assert_eq!(bytes.len(), BANK_DATA_SIZE);

        let parsed = BankData::parse(&bytes).unwrap();
        assert_eq!(parsed, data);
        assert_eq!(parsed.bank_name(), "Music");
        assert!(parsed.is_streaming());
        assert!(parsed.is_compact());
        assert!(!parsed.has_seek_tables());
        assert_eq!(parsed.flag_names(), vec!["streaming", "compact"]);
    }

    #[test]
    fn bank_name_is_truncated_to_fixed_width() {
        let mut data = BankData::parse(&[0u8; BANK_DATA_SIZE]).unwrap();
        data.set_bank_name(&"x".repeat(100));
        assert_eq!(data.bank_name().len(), WAVEBANK_BANKNAME_LENGTH);
    }
}
