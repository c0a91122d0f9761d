//! Packed per-entry audio format descriptor (`MINIWAVEFORMAT`).
//!
//! The descriptor is a single little-endian u32 with the fields laid out
//! from the least significant bit:
//!
//! | bits  | field                                   |
//! |-------|-----------------------------------------|
//! | 0-1   | format tag (PCM, XMA, ADPCM, WMA)       |
//! | 2-4   | channel count                           |
//! | 5-22  | sample rate                             |
//! | 23-30 | block align code (meaning depends on tag) |
//! | 31    | PCM bit depth (0 = 8-bit, 1 = 16-bit)   |

use std::fmt;

use serde::Serialize;

/// Offset between the stored ADPCM block align code and the per-channel block size.
pub const ADPCM_BLOCKALIGN_CONVERSION_OFFSET: u32 = 22;

/// MS-ADPCM coefficient pairs, fixed for every XACT ADPCM wave.
pub static ADPCM_COEFFICIENTS: [(i16, i16); 7] = [
    (256, 0),
    (512, -256),
    (0, 0),
    (192, 64),
    (240, 0),
    (460, -208),
    (392, -232),
];

/// Known xWMA block sizes, indexed by the low five bits of the code.
pub static WMA_BLOCK_ALIGN: [u32; 17] = [
    929, 1487, 1280, 2230, 8917, 8192, 4459, 5945, 2304, 1536, 1485, 1008, 2731, 4096, 6827, 5462,
    1280,
];

/// Known xWMA byte rates, indexed by the high three bits of the code.
pub static WMA_AVG_BYTES_PER_SEC: [u32; 7] = [12000, 24000, 4000, 6000, 8000, 20000, 2500];

const TAG_MASK: u32 = 0x3;
const CHANNELS_SHIFT: u32 = 2;
const CHANNELS_MASK: u32 = 0x7;
const RATE_SHIFT: u32 = 5;
const RATE_MASK: u32 = 0x3_FFFF;
const BLOCK_ALIGN_SHIFT: u32 = 23;
const BLOCK_ALIGN_MASK: u32 = 0xFF;
const BIT_DEPTH_SHIFT: u32 = 31;

/// Format tag stored in the two low bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatTag {
    Pcm = 0,
    Xma = 1,
    Adpcm = 2,
    Wma = 3,
}

impl FormatTag {
    fn from_bits(bits: u32) -> Self {
        match bits & TAG_MASK {
            0 => FormatTag::Pcm,
            1 => FormatTag::Xma,
            2 => FormatTag::Adpcm,
            _ => FormatTag::Wma,
        }
    }

    /// Display name used in reports.
    pub fn name(self) -> &'static str {
        match self {
            FormatTag::Pcm => "PCM",
            FormatTag::Xma => "XMA",
            FormatTag::Adpcm => "MS ADPCM",
            FormatTag::Wma => "xWMA",
        }
    }

    /// Seek-table formats are parsed and reported but never transcoded.
    pub fn needs_seek_table(self) -> bool {
        matches!(self, FormatTag::Xma | FormatTag::Wma)
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// PCM bit depth selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitDepth {
    Bits8 = 0,
    Bits16 = 1,
}

/// Packed mini wave format. Fields are reached through mask/shift accessors only.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MiniFormat(u32);

impl MiniFormat {
    pub const fn from_raw(value: u32) -> Self {
        Self(value)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Build a descriptor from its fields. Out-of-range values are masked.
    pub fn new(
        tag: FormatTag,
        channels: u32,
        sample_rate: u32,
        block_align: u32,
        depth: BitDepth,
    ) -> Self {
        Self(0)
            .with_tag(tag)
            .with_channels(channels)
            .with_sample_rate(sample_rate)
            .with_block_align_code(block_align)
            .with_bit_depth(depth)
    }

    /// PCM descriptor with a block align derived from channels and depth.
    pub fn pcm(channels: u32, sample_rate: u32, depth: BitDepth) -> Self {
        let bytes = match depth {
            BitDepth::Bits8 => 1,
            BitDepth::Bits16 => 2,
        };
        Self::new(FormatTag::Pcm, channels, sample_rate, bytes * channels, depth)
    }

    /// MS-ADPCM descriptor from the per-channel block align code.
    pub fn adpcm(channels: u32, sample_rate: u32, block_align_code: u32) -> Self {
        Self::new(FormatTag::Adpcm, channels, sample_rate, block_align_code, BitDepth::Bits8)
    }

    pub fn tag(self) -> FormatTag {
        FormatTag::from_bits(self.0)
    }

    pub fn channels(self) -> u32 {
        (self.0 >> CHANNELS_SHIFT) & CHANNELS_MASK
    }

    pub fn sample_rate(self) -> u32 {
        (self.0 >> RATE_SHIFT) & RATE_MASK
    }

    /// Raw 8-bit block align code; see [`MiniFormat::block_align`] for bytes.
    pub fn block_align_code(self) -> u32 {
        (self.0 >> BLOCK_ALIGN_SHIFT) & BLOCK_ALIGN_MASK
    }

    pub fn bit_depth(self) -> BitDepth {
        if (self.0 >> BIT_DEPTH_SHIFT) & 1 == 1 {
            BitDepth::Bits16
        } else {
            BitDepth::Bits8
        }
    }

    pub fn with_tag(self, tag: FormatTag) -> Self {
        Self((self.0 & !TAG_MASK) | tag as u32)
    }

    pub fn with_channels(self, channels: u32) -> Self {
        self.with_field(CHANNELS_SHIFT, CHANNELS_MASK, channels)
    }

    pub fn with_sample_rate(self, rate: u32) -> Self {
        self.with_field(RATE_SHIFT, RATE_MASK, rate)
    }

    pub fn with_block_align_code(self, code: u32) -> Self {
        self.with_field(BLOCK_ALIGN_SHIFT, BLOCK_ALIGN_MASK, code)
    }

    pub fn with_bit_depth(self, depth: BitDepth) -> Self {
        self.with_field(BIT_DEPTH_SHIFT, 1, depth as u32)
    }

    fn with_field(self, shift: u32, mask: u32, value: u32) -> Self {
        Self((self.0 & !(mask << shift)) | ((value & mask) << shift))
    }

    pub fn bits_per_sample(self) -> u32 {
        match self.tag() {
            FormatTag::Xma | FormatTag::Wma => 16,
            FormatTag::Adpcm => 4,
            FormatTag::Pcm => match self.bit_depth() {
                BitDepth::Bits16 => 16,
                BitDepth::Bits8 => 8,
            },
        }
    }

    /// Bytes per audio block for this format.
    pub fn block_align(self) -> u32 {
        let code = self.block_align_code();
        match self.tag() {
            FormatTag::Pcm => code,
            FormatTag::Xma => self.channels() * 16 / 8,
            FormatTag::Adpcm => (code + ADPCM_BLOCKALIGN_CONVERSION_OFFSET) * self.channels(),
            FormatTag::Wma => WMA_BLOCK_ALIGN
                .get((code & 0x1F) as usize)
                .copied()
                .unwrap_or(0),
        }
    }

    pub fn avg_bytes_per_sec(self) -> u32 {
        let rate = self.sample_rate();
        match self.tag() {
            FormatTag::Pcm => rate * self.block_align_code(),
            FormatTag::Xma => rate * self.block_align(),
            FormatTag::Adpcm => {
                let samples_per_block = self.adpcm_samples_per_block();
                if samples_per_block == 0 {
                    return 0;
                }
                (self.block_align() as u64 * rate as u64 / samples_per_block as u64) as u32
            }
            FormatTag::Wma => WMA_AVG_BYTES_PER_SEC
                .get((self.block_align_code() >> 5) as usize)
                .copied()
                .unwrap_or(0),
        }
    }

    /// Samples decoded from one full MS-ADPCM block.
    pub fn adpcm_samples_per_block(self) -> u32 {
        let channels = self.channels();
        if channels == 0 {
            return 0;
        }
        let block_align = (self.block_align_code() + ADPCM_BLOCKALIGN_CONVERSION_OFFSET) * channels;
        (block_align * 2 / channels).saturating_sub(12)
    }
}

impl fmt::Debug for MiniFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiniFormat")
            .field("raw", &format_args!("{:#010X}", self.0))
            .field("tag", &self.tag())
            .field("channels", &self.channels())
            .field("sample_rate", &self.sample_rate())
            .field("block_align_code", &self.block_align_code())
            .field("bit_depth", &self.bit_depth())
            .finish()
    }
}

impl Serialize for MiniFormat {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_pack_into_documented_bits() {
        let fmt = MiniFormat::new(FormatTag::Adpcm, 2, 44100, 0x80, BitDepth::Bits16);
        assert_eq!(fmt.raw() & 0x3, 2);
        assert_eq!((fmt.raw() >> 2) & 0x7, 2);
        assert_eq!((fmt.raw() >> 5) & 0x3FFFF, 44100);
        assert_eq!((fmt.raw() >> 23) & 0xFF, 0x80);
        assert_eq!(fmt.raw() >> 31, 1);

        assert_eq!(fmt.tag(), FormatTag::Adpcm);
        assert_eq!(fmt.channels(), 2);
        assert_eq!(fmt.sample_rate(), 44100);
        assert_eq!(fmt.block_align_code(), 0x80);
        assert_eq!(fmt.bit_depth(), BitDepth::Bits16);
    }

    #[test]
    fn setters_leave_other_fields_alone() {
        let fmt = MiniFormat::pcm(2, 44100, BitDepth::Bits16);
        let changed = fmt.with_sample_rate(22050).with_channels(1);
        assert_eq!(changed.sample_rate(), 22050);
        assert_eq!(changed.channels(), 1);
        assert_eq!(changed.block_align_code(), 4);
        assert_eq!(changed.tag(), FormatTag::Pcm);
        assert_eq!(changed.bit_depth(), BitDepth::Bits16);
    }

    #[test]
    fn pcm_values() {
        let fmt = MiniFormat::pcm(2, 22050, BitDepth::Bits16);
        assert_eq!(fmt.bits_per_sample(), 16);
        assert_eq!(fmt.block_align(), 4);
        assert_eq!(fmt.avg_bytes_per_sec(), 88200);

        let fmt8 = MiniFormat::pcm(1, 8000, BitDepth::Bits8);
        assert_eq!(fmt8.bits_per_sample(), 8);
        assert_eq!(fmt8.block_align(), 1);
        assert_eq!(fmt8.avg_bytes_per_sec(), 8000);
    }

    #[test]
    fn adpcm_values() {
        let mono = MiniFormat::adpcm(1, 22050, 0);
        assert_eq!(mono.block_align(), 22);
        assert_eq!(mono.adpcm_samples_per_block(), 32);
        assert_eq!(mono.bits_per_sample(), 4);

        let stereo = MiniFormat::adpcm(2, 44100, 48);
        assert_eq!(stereo.block_align(), 140);
        assert_eq!(stereo.adpcm_samples_per_block(), 128);
        assert_eq!(stereo.avg_bytes_per_sec(), 140 * 44100 / 128);
    }

    #[test]
    fn xma_values() {
        let fmt = MiniFormat::new(FormatTag::Xma, 2, 48000, 0, BitDepth::Bits16);
        assert_eq!(fmt.bits_per_sample(), 16);
        assert_eq!(fmt.block_align(), 4);
        assert_eq!(fmt.avg_bytes_per_sec(), 192000);
    }

    #[test]
    fn wma_tables() {
        let fmt = MiniFormat::new(FormatTag::Wma, 2, 44100, (1 << 5) | 4, BitDepth::Bits16);
        assert_eq!(fmt.block_align(), 8917);
        assert_eq!(fmt.avg_bytes_per_sec(), 24000);

        let last = MiniFormat::new(FormatTag::Wma, 2, 44100, (6 << 5) | 16, BitDepth::Bits16);
        assert_eq!(last.block_align(), 1280);
        assert_eq!(last.avg_bytes_per_sec(), 2500);

        let out_of_range =
            MiniFormat::new(FormatTag::Wma, 2, 44100, (7 << 5) | 17, BitDepth::Bits16);
        assert_eq!(out_of_range.block_align(), 0);
        assert_eq!(out_of_range.avg_bytes_per_sec(), 0);
    }

    #[test]
    fn zero_channels_do_not_divide_by_zero() {
        let fmt = MiniFormat::adpcm(0, 22050, 10);
        assert_eq!(fmt.adpcm_samples_per_block(), 0);
        assert_eq!(fmt.avg_bytes_per_sec(), 0);
    }
}
