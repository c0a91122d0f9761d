//! XACT Wave Bank Library
//!
//! This crate reads XACT wave banks (`.xwb`), validates their layout and
//! rewrites them with every eligible entry resampled to a new rate.
//!
//! # Overview
//!
//! A wave bank is laid out as a fixed header, five segments and a final
//! wave data segment holding every entry's payload:
//!
//! - **Bank data** - flags, entry count, bank name, alignment
//! - **Entry metadata** - one descriptor per entry (standard or compact)
//! - **Seek tables** - per-entry packet tables for xWMA and XMA2
//! - **Entry names** - optional fixed-width names
//! - **Wave data** - entry payloads, each padded to the bank alignment
//!
//! # Rewriting
//!
//! PCM and MS-ADPCM entries are wrapped in a RIFF/WAVE header and handed to a
//! [`Transcoder`]. Compact, xWMA and XMA2 entries are copied unchanged. The
//! entry table and header are patched once the new payload layout is known.
//!
//! # Example
//!
//! ```ignore
//! use rewxb_bank::{rewrite_file, LinearTranscoder, RewriteOptions};
//!
//! let options = RewriteOptions::new(22050).with_force_mono(true);
//! let report = rewrite_file(
//!     "music.xwb".as_ref(),
//!     "music_small.xwb".as_ref(),
//!     &options,
//!     &mut LinearTranscoder::new(),
//!     |_, _| {},
//! )?;
//! println!("{} entries converted", report.converted());
//! ```
//!
//! # Crate Structure
//!
//! - [`layout`] - Header, segment and bank data records
//! - [`entry`] - Standard and compact entry descriptors
//! - [`miniformat`] - Packed wave format descriptor
//! - [`seek`] - Seek table segment
//! - [`bank`] - Decoded, validated bank
//! - [`inspect`] - Read-only reports
//! - [`rewrite`] - Payload rewriting
//! - [`riff`] - Synthesized RIFF/WAVE headers
//! - [`transcode`] / [`adpcm`] - Built-in resampler and MS-ADPCM codec

pub mod adpcm;
pub mod bank;
pub mod duration;
pub mod entry;
pub mod error;
pub mod inspect;
pub mod layout;
pub mod miniformat;
pub mod options;
pub mod report;
pub mod rewrite;
pub mod riff;
pub mod seek;
pub mod transcode;

// Re-export main types at crate root
pub use bank::{EntryInfo, WaveBank};
pub use duration::estimate_duration;
pub use error::{BankError, BankWarning, TranscodeError};
pub use inspect::{inspect, inspect_bank, inspect_file};
pub use miniformat::{BitDepth, FormatTag, MiniFormat};
pub use options::RewriteOptions;
pub use report::{BankReport, EntryAction, EntryOutcome, EntryReport, RewriteReport};
pub use rewrite::{rewrite, rewrite_bank, rewrite_file};
pub use transcode::{LinearTranscoder, TargetEncoding, TranscodeRequest, Transcoder};
