//! Seek table segment parsing.
//!
//! The segment starts with one u32 byte offset per entry (`0xFFFFFFFF` for
//! entries without a table), relative to the end of that offset table. Each
//! per-entry table is a u32 count followed by that many u32 seek values.

use crate::error::BankWarning;

/// Marker for an entry without a seek table.
pub const NO_SEEK_TABLE: u32 = u32::MAX;

/// Decoded seek table segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeekTables {
    words: Vec<u32>,
    entry_count: u32,
}

impl SeekTables {
    /// Parse the raw segment. A malformed segment is reported and dropped.
    pub fn parse(data: &[u8], entry_count: u32) -> Result<Self, BankWarning> {
        let length = data.len() as u32;
        let minimum = entry_count as u64 * 4;
        if (data.len() as u64) < minimum {
            return Err(BankWarning::SeekTablesTooSmall { length, minimum });
        }
        if data.len() % 4 != 0 {
            return Err(BankWarning::SeekTablesUnaligned { length });
        }

        let words = data
            .chunks_exact(4)
            .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
            .collect();
        Ok(Self { words, entry_count })
    }

    /// Segment length in bytes.
    pub fn byte_len(&self) -> usize {
        self.words.len() * 4
    }

    /// Seek table of entry `index`, starting at its count word.
    ///
    /// Returns `Ok(None)` when the entry has no table.
    pub fn entry_table(&self, index: usize) -> Result<Option<&[u32]>, BankWarning> {
        let offset = match self.words.get(index) {
            Some(&NO_SEEK_TABLE) | None => return Ok(None),
            Some(&offset) => offset,
        };

        let base = self.entry_count as u64 * 4;
        let start = base + offset as u64;
        if start >= self.byte_len() as u64 || start % 4 != 0 {
            return Err(BankWarning::InvalidSeekTableOffset {
                entry: index,
                offset,
            });
        }

        let first = (start / 4) as usize;
        let count = self.words[first];
        let end = first as u64 + 1 + count as u64;
        if end > self.words.len() as u64 {
            return Err(BankWarning::SeekTableOverrun {
                entry: index,
                count,
            });
        }
        Ok(Some(&self.words[first..end as usize]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    #[test]
    fn resolves_per_entry_tables() {
        // Two entries: entry 0 at offset 0, entry 1 has no table
        let data = segment(&[0, NO_SEEK_TABLE, 2, 100, 200]);
        let tables = SeekTables::parse(&data, 2).unwrap();
        assert_eq!(tables.entry_table(0).unwrap(), Some(&[2, 100, 200][..]));
        assert_eq!(tables.entry_table(1).unwrap(), None);
    }

    #[test]
    fn rejects_short_and_unaligned_segments() {
        assert_eq!(
            SeekTables::parse(&[0u8; 4], 2),
            Err(BankWarning::SeekTablesTooSmall {
                length: 4,
                minimum: 8
            })
        );
        assert_eq!(
            SeekTables::parse(&[0u8; 10], 2),
            Err(BankWarning::SeekTablesUnaligned { length: 10 })
        );
    }

    #[test]
    fn reports_bad_offsets_and_overruns() {
        let data = segment(&[64, 4, 9, 1]);
        let tables = SeekTables::parse(&data, 2).unwrap();
        assert_eq!(
            tables.entry_table(0),
            Err(BankWarning::InvalidSeekTableOffset {
                entry: 0,
                offset: 64
            })
        );
        assert_eq!(
            tables.entry_table(1),
            Err(BankWarning::SeekTableOverrun { entry: 1, count: 1 })
        );
    }
}
