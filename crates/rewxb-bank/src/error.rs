//! Error and warning types for wave bank processing.
//!
//! Fatal problems are returned as [`BankError`] and abort the run. Anomalies
//! that a best-effort rewrite can live with are collected as [`BankWarning`]
//! values in the run's report.

use std::fmt;
use std::io;

use serde::Serialize;
use thiserror::Error;

use crate::layout::Segment;

/// Process exit code for usage and validation failures.
pub const EXIT_VALIDATION: i32 = 1;
/// Process exit code for I/O failures on the input file.
pub const EXIT_INPUT_IO: i32 = -1;
/// Process exit code for I/O failures on the output file.
pub const EXIT_OUTPUT_IO: i32 = -2;
/// Process exit code for transform and unsupported-layout failures.
pub const EXIT_TRANSFORM: i32 = -3;
/// Process exit code when a transform yields no audio bytes.
pub const EXIT_EMPTY_OUTPUT: i32 = -5;

/// Fatal wave bank error.
#[derive(Debug, Error)]
pub enum BankError {
    /// The 4-byte signature is not `WBND`.
    #[error("file is not a wave bank: signature {found:02X?}")]
    InvalidSignature { found: [u8; 4] },

    /// A fixed-size structure could not be read completely.
    #[error("file too small for {what}: need {need} bytes")]
    Truncated { what: &'static str, need: usize },

    /// The wave data segment is not the last segment in the file.
    #[error(
        "only wave banks whose wave data is the last segment are supported \
         ({segment} at {offset} lies past wave data at {payload_offset})"
    )]
    PayloadNotLast {
        segment: Segment,
        offset: u32,
        payload_offset: u32,
    },

    /// A declared size disagrees with the actual one.
    #[error("{what} size mismatch: expected {expected} bytes, found {actual}")]
    SizeMismatch {
        what: &'static str,
        expected: u64,
        actual: u64,
    },

    /// Compact banks can only address `0x1FFFFF` alignment units.
    #[error("data segment of {length} bytes is too large for a compact wave bank (max {max})")]
    CompactPayloadTooLarge { length: u32, max: u64 },

    /// Rewritten wave data no longer fits the 32-bit segment length.
    #[error("rewritten wave data of {length} bytes exceeds the 32-bit segment limit")]
    PayloadTooLarge { length: u64 },

    /// Requested sample rate cannot be stored or is below the usable minimum.
    #[error("target rate {rate} Hz is outside {min}..={max} Hz")]
    InvalidRate { rate: u32, min: u32, max: u32 },

    /// Seek-table banks (xWMA/XMA2) cannot be rewritten.
    #[error("wave banks with seek tables are not supported")]
    UnsupportedSeekTables,

    /// The audio transform failed for an entry.
    #[error("entry {index}: {source}")]
    Transform {
        index: usize,
        #[source]
        source: TranscodeError,
    },

    /// The audio transform produced an empty buffer.
    #[error("entry {index}: transform produced an empty buffer")]
    EmptyOutput { index: usize },

    /// Reading the input failed.
    #[error("read error: {0}")]
    Read(#[source] io::Error),

    /// Writing the output failed.
    #[error("write error: {0}")]
    Write(#[source] io::Error),
}

impl BankError {
    /// Process exit code for this error category.
    pub fn exit_code(&self) -> i32 {
        match self {
            BankError::InvalidSignature { .. } | BankError::Truncated { .. } => EXIT_INPUT_IO,
            BankError::Read(_) => EXIT_INPUT_IO,
            BankError::Write(_) => EXIT_OUTPUT_IO,
            BankError::SizeMismatch { .. }
            | BankError::CompactPayloadTooLarge { .. }
            | BankError::PayloadTooLarge { .. }
            | BankError::InvalidRate { .. } => EXIT_VALIDATION,
            BankError::PayloadNotLast { .. }
            | BankError::UnsupportedSeekTables
            | BankError::Transform { .. } => EXIT_TRANSFORM,
            BankError::EmptyOutput { .. } => EXIT_EMPTY_OUTPUT,
        }
    }

    /// Maps an input read failure, turning early EOF into `Truncated`.
    pub(crate) fn read(what: &'static str, need: usize) -> impl FnOnce(io::Error) -> BankError {
        move |err| {
            if err.kind() == io::ErrorKind::UnexpectedEof {
                BankError::Truncated { what, need }
            } else {
                BankError::Read(err)
            }
        }
    }
}

/// Failure reported by an audio transcoder.
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// The input RIFF header is malformed.
    #[error("malformed input WAV: {0}")]
    MalformedInput(String),

    /// The transcoder returned a RIFF buffer with an unexpected header.
    #[error("converted WAV doesn't have the expected header: {0}")]
    MalformedResult(String),

    /// The input encoding cannot be handled.
    #[error("unsupported input encoding: format tag {0}")]
    UnsupportedEncoding(u16),

    /// A request parameter is out of range.
    #[error("invalid transcode parameter: {0}")]
    InvalidParameter(String),

    /// PCM decoding through hound failed.
    #[error("WAV decode error: {0}")]
    Wav(#[from] hound::Error),
}

/// Non-fatal anomaly found while decoding or rewriting a bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BankWarning {
    /// Entry has a zero-length play region.
    ZeroLength { entry: usize },
    /// Entry play region lies outside the wave data segment.
    RegionOutOfRange {
        entry: usize,
        offset: u32,
        length: u32,
        payload_length: u32,
    },
    /// Entry offset is not a multiple of the bank alignment.
    MisalignedOffset {
        entry: usize,
        offset: u32,
        alignment: u32,
    },
    /// xWMA or XMA2 entry without a seek table.
    MissingSeekTable { entry: usize, format: &'static str },
    /// XMA2 payload not on a 2K boundary.
    MisalignedXma { entry: usize, offset: u32 },
    /// Seek table offset points outside the seek table segment.
    InvalidSeekTableOffset { entry: usize, offset: u32 },
    /// Seek table for an entry overruns the seek table segment.
    SeekTableOverrun { entry: usize, count: u32 },
    /// Seek table segment shorter than its per-entry offset table.
    SeekTablesTooSmall { length: u32, minimum: u64 },
    /// Seek table segment is not a whole number of words.
    SeekTablesUnaligned { length: u32 },
    /// Entry names segment size disagrees with count * element size.
    EntryNamesMismatch {
        entry_count: u32,
        length: u32,
        element_size: u32,
    },
    /// Compact banks are expected to be streaming banks.
    CompactNotStreaming,
    /// Alignment outside the range XACT expects.
    AlignmentOutOfRange { alignment: u32 },
    /// Streaming banks should be aligned to the DVD sector size.
    StreamingUnderaligned { alignment: u32 },
    /// Banks holding XMA2 data should place wave data on a 2K boundary.
    XmaSegmentMisaligned { offset: u32 },
    /// The summed entry lengths exceed the wave data segment.
    WaveBytesExceedSegment { total: u64, payload_length: u32 },
}

impl BankWarning {
    /// Entry index this warning belongs to, if any.
    pub fn entry(&self) -> Option<usize> {
        match self {
            BankWarning::ZeroLength { entry }
            | BankWarning::RegionOutOfRange { entry, .. }
            | BankWarning::MisalignedOffset { entry, .. }
            | BankWarning::MissingSeekTable { entry, .. }
            | BankWarning::MisalignedXma { entry, .. }
            | BankWarning::InvalidSeekTableOffset { entry, .. }
            | BankWarning::SeekTableOverrun { entry, .. } => Some(*entry),
            _ => None,
        }
    }
}

impl fmt::Display for BankWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BankWarning::ZeroLength { entry } => write!(f, "entry {} length is 0", entry),
            BankWarning::RegionOutOfRange {
                entry,
                offset,
                length,
                payload_length,
            } => write!(
                f,
                "entry {} has an invalid wave data region {}+{} (segment length {})",
                entry, offset, length, payload_length
            ),
            BankWarning::MisalignedOffset {
                entry,
                offset,
                alignment,
            } => write!(
                f,
                "entry {} offset {} doesn't match alignment {}",
                entry, offset, alignment
            ),
            BankWarning::MissingSeekTable { entry, format } => {
                write!(f, "missing seek table entry for {} wave {}", format, entry)
            }
            BankWarning::MisalignedXma { entry, offset } => write!(
                f,
                "entry {} XMA2 data at {} needs to be aligned to a 2K boundary",
                entry, offset
            ),
            BankWarning::InvalidSeekTableOffset { entry, offset } => {
                write!(f, "entry {} has an invalid seek table offset {}", entry, offset)
            }
            BankWarning::SeekTableOverrun { entry, count } => write!(
                f,
                "entry {} has too many seek table entries ({}) for the seek tables segment",
                entry, count
            ),
            BankWarning::SeekTablesTooSmall { length, minimum } => write!(
                f,
                "seek table is too small, needs at least {} bytes; only {} bytes",
                minimum, length
            ),
            BankWarning::SeekTablesUnaligned { length } => write!(
                f,
                "seek table should be a multiple of 4 in size ({} bytes)",
                length
            ),
            BankWarning::EntryNamesMismatch {
                entry_count,
                length,
                element_size,
            } => write!(
                f,
                "mismatch in entries {} and entry names size {} (element size {})",
                entry_count, length, element_size
            ),
            BankWarning::CompactNotStreaming => {
                write!(f, "XACT only supports streaming with compact wave banks")
            }
            BankWarning::AlignmentOutOfRange { alignment } => write!(
                f,
                "XACT expects alignment to be in the range 4...2048 (found {})",
                alignment
            ),
            BankWarning::StreamingUnderaligned { alignment } => write!(
                f,
                "XACT expects streaming buffers to be aligned to DVD sector size (found {})",
                alignment
            ),
            BankWarning::XmaSegmentMisaligned { offset } => write!(
                f,
                "wave banks containing XMA2 data should have the wave segment offset \
                 aligned to a 2K boundary (found {})",
                offset
            ),
            BankWarning::WaveBytesExceedSegment {
                total,
                payload_length,
            } => write!(
                f,
                "invalid wave data region: entries total {} bytes, segment holds {}",
                total, payload_length
            ),
        }
    }
}
