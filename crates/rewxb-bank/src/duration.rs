//! Playable duration estimates derived from payload size and format.

use crate::miniformat::{FormatTag, MiniFormat};

/// Estimate the duration in samples of `length` payload bytes.
///
/// `seek_table` is the entry's own seek table: its first word is the number
/// of seek points N, followed by N values. xWMA and XMA2 durations come from
/// the last seek value and are 0 when no table is available.
pub fn estimate_duration(length: u32, format: MiniFormat, seek_table: Option<&[u32]>) -> u32 {
    let channels = format.channels();
    match format.tag() {
        FormatTag::Adpcm => {
            let block_align = format.block_align();
            if block_align == 0 {
                return 0;
            }
            let mut duration = (length / block_align) * format.adpcm_samples_per_block();
            let partial = length % block_align;
            // A partial block shorter than the per-channel headers decodes nothing.
            if partial != 0 && partial >= 7 * channels {
                duration += (partial * 2 / channels).saturating_sub(12);
            }
            duration
        }
        FormatTag::Wma => match last_seek_value(seek_table) {
            Some(value) if channels > 0 => value / (2 * channels),
            _ => 0,
        },
        FormatTag::Xma => last_seek_value(seek_table).unwrap_or(0),
        FormatTag::Pcm => {
            let bits = format.bits_per_sample() * channels;
            if bits == 0 {
                return 0;
            }
            (length as u64 * 8 / bits as u64) as u32
        }
    }
}

fn last_seek_value(seek_table: Option<&[u32]>) -> Option<u32> {
    let table = seek_table?;
    let count = *table.first()? as usize;
    if count == 0 {
        return None;
    }
    table.get(count).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::miniformat::BitDepth;

    #[test]
    fn adpcm_whole_block() {
        let fmt = MiniFormat::adpcm(1, 22050, 0);
        assert_eq!(estimate_duration(22, fmt, None), 32);
        assert_eq!(estimate_duration(22 * 10, fmt, None), 320);
    }

    #[test]
    fn adpcm_short_remainder_adds_nothing() {
        let fmt = MiniFormat::adpcm(1, 22050, 0);
        // Remainder 6 < 7 * channels
        assert_eq!(estimate_duration(22 + 6, fmt, None), 32);
    }

    #[test]
    fn adpcm_partial_block_bonus() {
        let fmt = MiniFormat::adpcm(2, 44100, 48);
        // block_align 140; remainder 40 -> 40 * 2 / 2 - 12 = 28
        assert_eq!(estimate_duration(140 * 3 + 40, fmt, None), 128 * 3 + 28);
    }

    #[test]
    fn pcm_duration() {
        let fmt = MiniFormat::pcm(2, 44100, BitDepth::Bits16);
        assert_eq!(estimate_duration(44100 * 4, fmt, None), 44100);

        let fmt8 = MiniFormat::pcm(1, 8000, BitDepth::Bits8);
        assert_eq!(estimate_duration(8000, fmt8, None), 8000);
    }

    #[test]
    fn wma_uses_last_seek_value() {
        let fmt = MiniFormat::new(FormatTag::Wma, 2, 44100, 0, BitDepth::Bits16);
        let table = [3, 4096, 8192, 16384];
        assert_eq!(estimate_duration(1000, fmt, Some(&table)), 16384 / 4);
        assert_eq!(estimate_duration(1000, fmt, None), 0);
        assert_eq!(estimate_duration(1000, fmt, Some(&[0])), 0);
    }

    #[test]
    fn xma_returns_samples_directly() {
        let fmt = MiniFormat::new(FormatTag::Xma, 1, 48000, 0, BitDepth::Bits16);
        let table = [2, 512, 96000];
        assert_eq!(estimate_duration(4096, fmt, Some(&table)), 96000);
        assert_eq!(estimate_duration(4096, fmt, None), 0);
    }

    #[test]
    fn truncated_seek_table_yields_zero() {
        let fmt = MiniFormat::new(FormatTag::Xma, 1, 48000, 0, BitDepth::Bits16);
        assert_eq!(estimate_duration(4096, fmt, Some(&[5, 1, 2])), 0);
    }
}
