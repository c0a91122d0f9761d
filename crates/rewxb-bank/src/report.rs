//! Serializable summaries of inspection and rewrite runs.

use serde::Serialize;

use crate::entry::SampleRegion;
use crate::error::BankWarning;
use crate::layout::{Region, Segment};
use crate::miniformat::{FormatTag, MiniFormat};
use crate::options::RewriteOptions;

/// Decoded format fields for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FormatReport {
    pub raw: MiniFormat,
    pub tag: FormatTag,
    pub name: &'static str,
    pub channels: u32,
    pub bits_per_sample: u32,
    pub sample_rate: u32,
    pub block_align: u32,
    pub avg_bytes_per_sec: u32,
}

impl From<MiniFormat> for FormatReport {
    fn from(format: MiniFormat) -> Self {
        Self {
            raw: format,
            tag: format.tag(),
            name: format.tag().name(),
            channels: format.channels(),
            bits_per_sample: format.bits_per_sample(),
            sample_rate: format.sample_rate(),
            block_align: format.block_align(),
            avg_bytes_per_sec: format.avg_bytes_per_sec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SegmentReport {
    pub segment: Segment,
    pub offset: u32,
    pub length: u32,
}

/// Raw fields of a compact entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompactReport {
    pub offset_units: u32,
    pub length_deviation: u32,
}

/// One entry as decoded from the bank.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryReport {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub flags: u32,
    pub flag_names: Vec<&'static str>,
    /// Stored duration; compact entries have none.
    pub duration: Option<u32>,
    pub estimated_duration: u32,
    /// Stored duration (or the estimate for compact entries) in seconds.
    pub seconds: f64,
    pub play_region: Region,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loop_region: Option<SampleRegion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compact: Option<CompactReport>,
    pub format: FormatReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seek_table: Option<Vec<u32>>,
    pub warnings: Vec<BankWarning>,
}

/// Full read-only description of a bank.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BankReport {
    pub header_version: u32,
    pub tool_version: u32,
    pub segments: Vec<SegmentReport>,
    pub flags: u32,
    pub flag_names: Vec<&'static str>,
    pub bank_name: String,
    pub entry_count: u32,
    pub entry_metadata_element_size: u32,
    pub entry_name_element_size: u32,
    pub alignment: u32,
    pub build_time: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compact_format: Option<FormatReport>,
    pub entries: Vec<EntryReport>,
    /// Sum of all entry lengths.
    pub wave_bytes: u64,
    /// Bank-level warnings. Entry warnings live on each entry.
    pub warnings: Vec<BankWarning>,
}

impl BankReport {
    /// Number of warnings across the bank and its entries.
    pub fn warning_count(&self) -> usize {
        self.warnings.len() + self.entries.iter().map(|e| e.warnings.len()).sum::<usize>()
    }
}

/// What the rewriter did with an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryAction {
    PassedThrough,
    Converted,
}

/// Before and after values for one rewritten entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryOutcome {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub action: EntryAction,
    pub old_region: Region,
    pub new_region: Region,
    pub old_duration: u32,
    pub new_duration: u32,
    pub old_format: FormatTag,
    pub new_format: FormatTag,
    pub old_rate: u32,
    pub new_rate: u32,
    pub old_channels: u32,
    pub new_channels: u32,
}

/// Summary of a rewrite run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewriteReport {
    pub options: RewriteOptions,
    pub entries: Vec<EntryOutcome>,
    /// Sum of the original entry lengths.
    pub original_wave_bytes: u64,
    /// New wave data segment length, padding included.
    pub new_wave_bytes: u64,
    /// Size of the finished output file.
    pub output_length: u64,
    /// The input had no entries and was copied unchanged.
    pub copied_verbatim: bool,
    pub warnings: Vec<BankWarning>,
}

impl RewriteReport {
    pub fn converted(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.action == EntryAction::Converted)
            .count()
    }
}
