//! RIFF/WAVE headers exchanged with the transcoder.
//!
//! Two fixed layouts are produced and accepted:
//! - PCM: 44 bytes (`RIFF`, 16-byte `fmt `, `data`).
//! - MS-ADPCM: 90 bytes (`RIFF`, 50-byte `fmt ` with a 32-byte extension
//!   carrying the 7 coefficient pairs, 4-byte `fact`, `data`).

use std::io::{self, Cursor, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::miniformat::{FormatTag, MiniFormat, ADPCM_COEFFICIENTS};

/// `wFormatTag` for integer PCM.
pub const WAVE_FORMAT_PCM: u16 = 1;
/// `wFormatTag` for Microsoft ADPCM.
pub const WAVE_FORMAT_ADPCM: u16 = 2;

/// Size of the synthesized PCM header.
pub const PCM_HEADER_SIZE: usize = 44;
/// Size of the synthesized MS-ADPCM header.
pub const ADPCM_HEADER_SIZE: usize = 90;

/// Size of the MS-ADPCM `fmt ` extension.
pub const ADPCM_EXTRA_SIZE: u16 = 32;
const PCM_FMT_SIZE: u32 = 16;
const ADPCM_FMT_SIZE: u32 = 16 + 2 + ADPCM_EXTRA_SIZE as u32;

/// Parsed fields of a synthesized WAV header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub audio_format: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub avg_bytes_per_sec: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    /// MS-ADPCM only.
    pub samples_per_block: Option<u16>,
    /// Declared `data` chunk size.
    pub data_size: u32,
    /// Bytes before the sample data.
    pub header_len: usize,
}

impl WavHeader {
    /// Parse one of the two fixed header layouts.
    pub fn parse(data: &[u8]) -> Result<Self, String> {
        let mut cursor = Cursor::new(data);
        let short = |_: io::Error| format!("header truncated ({} bytes)", data.len());

        expect_tag(&mut cursor, b"RIFF").map_err(|e| format!("not a WAV file: {}", e))?;
        cursor.read_u32::<LittleEndian>().map_err(short)?;
        expect_tag(&mut cursor, b"WAVE")?;
        expect_tag(&mut cursor, b"fmt ")?;

        let fmt_size = cursor.read_u32::<LittleEndian>().map_err(short)?;
        let audio_format = cursor.read_u16::<LittleEndian>().map_err(short)?;
        let channels = cursor.read_u16::<LittleEndian>().map_err(short)?;
        let sample_rate = cursor.read_u32::<LittleEndian>().map_err(short)?;
        let avg_bytes_per_sec = cursor.read_u32::<LittleEndian>().map_err(short)?;
        let block_align = cursor.read_u16::<LittleEndian>().map_err(short)?;
        let bits_per_sample = cursor.read_u16::<LittleEndian>().map_err(short)?;

        let samples_per_block = match audio_format {
            WAVE_FORMAT_PCM => {
                if fmt_size != PCM_FMT_SIZE {
                    return Err(format!("fmt size 0x{:x} != 0x10", fmt_size));
                }
                None
            }
            WAVE_FORMAT_ADPCM => {
                let extra = cursor.read_u16::<LittleEndian>().map_err(short)?;
                if fmt_size != ADPCM_FMT_SIZE || extra != ADPCM_EXTRA_SIZE {
                    return Err(format!(
                        "ADPCM fmt size {} with extension {} (expected {} and {})",
                        fmt_size, extra, ADPCM_FMT_SIZE, ADPCM_EXTRA_SIZE
                    ));
                }
                let samples_per_block = cursor.read_u16::<LittleEndian>().map_err(short)?;
                let num_coef = cursor.read_u16::<LittleEndian>().map_err(short)?;
                if num_coef as usize != ADPCM_COEFFICIENTS.len() {
                    return Err(format!("{} ADPCM coefficients (expected 7)", num_coef));
                }
                let mut coefficients = [0u8; 28];
                cursor.read_exact(&mut coefficients).map_err(short)?;

                expect_tag(&mut cursor, b"fact")?;
                let fact_size = cursor.read_u32::<LittleEndian>().map_err(short)?;
                if fact_size != 4 {
                    return Err(format!("fact chunk size {} (expected 4)", fact_size));
                }
                cursor.read_u32::<LittleEndian>().map_err(short)?;
                Some(samples_per_block)
            }
            other => return Err(format!("unsupported format tag {}", other)),
        };

        expect_tag(&mut cursor, b"data")?;
        let data_size = cursor.read_u32::<LittleEndian>().map_err(short)?;

        Ok(Self {
            audio_format,
            channels,
            sample_rate,
            avg_bytes_per_sec,
            block_align,
            bits_per_sample,
            samples_per_block,
            data_size,
            header_len: cursor.position() as usize,
        })
    }
}

fn expect_tag(cursor: &mut Cursor<&[u8]>, tag: &[u8; 4]) -> Result<(), String> {
    let mut found = [0u8; 4];
    cursor
        .read_exact(&mut found)
        .map_err(|_| format!("missing '{}' chunk", String::from_utf8_lossy(tag)))?;
    if &found != tag {
        return Err(format!(
            "expected '{}', found '{}'",
            String::from_utf8_lossy(tag),
            String::from_utf8_lossy(&found)
        ));
    }
    Ok(())
}

/// Write the 44-byte PCM header for `data_len` bytes of `format` audio.
pub fn write_pcm_header<W: Write>(
    writer: &mut W,
    format: MiniFormat,
    data_len: u32,
) -> io::Result<()> {
    writer.write_all(b"RIFF")?;
    writer.write_u32::<LittleEndian>(data_len.wrapping_add(PCM_HEADER_SIZE as u32 - 8))?;
    writer.write_all(b"WAVE")?;

    writer.write_all(b"fmt ")?;
    writer.write_u32::<LittleEndian>(PCM_FMT_SIZE)?;
    writer.write_u16::<LittleEndian>(WAVE_FORMAT_PCM)?;
    writer.write_u16::<LittleEndian>(format.channels() as u16)?;
    writer.write_u32::<LittleEndian>(format.sample_rate())?;
    writer.write_u32::<LittleEndian>(format.avg_bytes_per_sec())?;
    writer.write_u16::<LittleEndian>(format.block_align() as u16)?;
    writer.write_u16::<LittleEndian>(format.bits_per_sample() as u16)?;

    writer.write_all(b"data")?;
    writer.write_u32::<LittleEndian>(data_len)
}

/// Write the 90-byte MS-ADPCM header for `data_len` bytes of `format` audio.
pub fn write_adpcm_header<W: Write>(
    writer: &mut W,
    format: MiniFormat,
    data_len: u32,
) -> io::Result<()> {
    let channels = format.channels();
    let block_align = format.block_align();
    let bits = format.bits_per_sample();
    let frame_bits = block_align.saturating_sub(7 * channels) * 8;

    writer.write_all(b"RIFF")?;
    writer.write_u32::<LittleEndian>(data_len.wrapping_add(ADPCM_HEADER_SIZE as u32 - 8))?;
    writer.write_all(b"WAVE")?;

    writer.write_all(b"fmt ")?;
    writer.write_u32::<LittleEndian>(ADPCM_FMT_SIZE)?;
    writer.write_u16::<LittleEndian>(WAVE_FORMAT_ADPCM)?;
    writer.write_u16::<LittleEndian>(channels as u16)?;
    writer.write_u32::<LittleEndian>(format.sample_rate())?;
    writer.write_u32::<LittleEndian>(format.avg_bytes_per_sec())?;
    writer.write_u16::<LittleEndian>(block_align as u16)?;
    writer.write_u16::<LittleEndian>(bits as u16)?;

    // fmt extension
    writer.write_u16::<LittleEndian>(ADPCM_EXTRA_SIZE)?;
    let samples_per_block = if channels > 0 {
        frame_bits / (bits * channels) + 2
    } else {
        0
    };
    writer.write_u16::<LittleEndian>(samples_per_block as u16)?;
    writer.write_u16::<LittleEndian>(ADPCM_COEFFICIENTS.len() as u16)?;
    for &(coef1, coef2) in ADPCM_COEFFICIENTS.iter() {
        writer.write_i16::<LittleEndian>(coef1)?;
        writer.write_i16::<LittleEndian>(coef2)?;
    }

    writer.write_all(b"fact")?;
    writer.write_u32::<LittleEndian>(4)?;
    let fact_samples = if block_align > 0 && channels > 0 {
        (frame_bits / bits) * (data_len / block_align) / channels
    } else {
        0
    };
    writer.write_u32::<LittleEndian>(fact_samples)?;

    writer.write_all(b"data")?;
    writer.write_u32::<LittleEndian>(data_len)
}

/// Wrap a PCM or MS-ADPCM payload in its synthesized header.
///
/// Returns `None` for xWMA and XMA, which are never handed to a transcoder.
pub fn wrap_payload(format: MiniFormat, payload: &[u8]) -> Option<Vec<u8>> {
    let data_len = payload.len() as u32;
    let mut wav = Vec::with_capacity(ADPCM_HEADER_SIZE + payload.len());
    let written = match format.tag() {
        FormatTag::Pcm => write_pcm_header(&mut wav, format, data_len),
        FormatTag::Adpcm => write_adpcm_header(&mut wav, format, data_len),
        FormatTag::Wma | FormatTag::Xma => return None,
    };
    written.ok()?;
    wav.extend_from_slice(payload);
    Some(wav)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::miniformat::BitDepth;

    #[test]
    fn pcm_header_layout() {
        let format = MiniFormat::pcm(2, 44100, BitDepth::Bits16);
        let mut buf = Vec::new();
        write_pcm_header(&mut buf, format, 1000).unwrap();
        assert_eq!(buf.len(), PCM_HEADER_SIZE);
        assert_eq!(&buf[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]), 1036);
        assert_eq!(&buf[36..40], b"data");

        let header = WavHeader::parse(&buf).unwrap();
        assert_eq!(header.audio_format, WAVE_FORMAT_PCM);
        assert_eq!(header.channels, 2);
        assert_eq!(header.sample_rate, 44100);
        assert_eq!(header.avg_bytes_per_sec, 176400);
        assert_eq!(header.block_align, 4);
        assert_eq!(header.bits_per_sample, 16);
        assert_eq!(header.data_size, 1000);
        assert_eq!(header.header_len, PCM_HEADER_SIZE);
    }

    #[test]
    fn adpcm_header_layout() {
        let format = MiniFormat::adpcm(1, 22050, 48);
        let block_align = format.block_align();
        assert_eq!(block_align, 70);

        let mut buf = Vec::new();
        write_adpcm_header(&mut buf, format, block_align * 4).unwrap();
        assert_eq!(buf.len(), ADPCM_HEADER_SIZE);
        assert_eq!(u32::from_le_bytes([buf[16], buf[17], buf[18], buf[19]]), 50);
        // First coefficient pair {256, 0}, second {512, -256}
        assert_eq!(&buf[42..46], &0x0000_0100u32.to_le_bytes());
        assert_eq!(&buf[46..50], &0xFF00_0200u32.to_le_bytes());
        assert_eq!(&buf[66..70], &0xFF18_0188u32.to_le_bytes());
        assert_eq!(&buf[70..74], b"fact");

        let header = WavHeader::parse(&buf).unwrap();
        assert_eq!(header.audio_format, WAVE_FORMAT_ADPCM);
        assert_eq!(header.bits_per_sample, 4);
        // (70 - 7) * 8 / 4 + 2
        assert_eq!(header.samples_per_block, Some(128));
        assert_eq!(header.header_len, ADPCM_HEADER_SIZE);

        let fact = u32::from_le_bytes([buf[78], buf[79], buf[80], buf[81]]);
        assert_eq!(fact, 126 * 4);
    }

    #[test]
    fn parse_rejects_unexpected_layouts() {
        assert!(WavHeader::parse(b"RIFX").is_err());

        let format = MiniFormat::pcm(1, 8000, BitDepth::Bits8);
        let mut buf = Vec::new();
        write_pcm_header(&mut buf, format, 0).unwrap();
        buf[16] = 18;
        let err = WavHeader::parse(&buf).unwrap_err();
        assert!(err.contains("0x12"), "{}", err);
    }

    #[test]
    fn wrap_payload_skips_seekable_formats() {
        let wma = MiniFormat::new(FormatTag::Wma, 2, 44100, 0, BitDepth::Bits16);
        assert!(wrap_payload(wma, &[1, 2, 3]).is_none());

        let pcm = MiniFormat::pcm(1, 8000, BitDepth::Bits8);
        let wav = wrap_payload(pcm, &[1, 2, 3]).unwrap();
        assert_eq!(wav.len(), PCM_HEADER_SIZE + 3);
        assert_eq!(&wav[PCM_HEADER_SIZE..], &[1, 2, 3]);
    }
}
