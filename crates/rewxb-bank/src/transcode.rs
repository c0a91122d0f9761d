//! Audio transcoding collaborator.
//!
//! The rewriter hands each converted entry to a [`Transcoder`] as a
//! synthesized RIFF/WAVE buffer and expects a RIFF/WAVE buffer back in one
//! of the two layouts described in [`crate::riff`].

use std::io::Cursor;

use tracing::debug;

use crate::adpcm;
use crate::error::TranscodeError;
use crate::miniformat::{BitDepth, MiniFormat, ADPCM_BLOCKALIGN_CONVERSION_OFFSET};
use crate::riff::{wrap_payload, WavHeader, WAVE_FORMAT_ADPCM, WAVE_FORMAT_PCM};

/// Encoding the transcoder should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetEncoding {
    /// Same encoding as the input (PCM stays PCM at its bit depth, ADPCM stays ADPCM).
    Preserve,
    /// 16-bit PCM.
    Pcm16,
}

/// One conversion job.
#[derive(Debug, Clone, Copy)]
pub struct TranscodeRequest<'a> {
    /// Input RIFF/WAVE bytes.
    pub wav: &'a [u8],
    /// Sample rate to convert to.
    pub target_rate: u32,
    /// Collapse all channels to one.
    pub mono: bool,
    pub encoding: TargetEncoding,
}

/// Converts a RIFF/WAVE buffer to another rate, channel count or encoding.
pub trait Transcoder {
    fn transcode(&mut self, request: &TranscodeRequest<'_>) -> Result<Vec<u8>, TranscodeError>;
}

/// Built-in transcoder: channel averaging and linear interpolation.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearTranscoder;

impl LinearTranscoder {
    pub fn new() -> Self {
        Self
    }
}

impl Transcoder for LinearTranscoder {
    fn transcode(&mut self, request: &TranscodeRequest<'_>) -> Result<Vec<u8>, TranscodeError> {
        if request.target_rate == 0 {
            return Err(TranscodeError::InvalidParameter("target rate is 0".to_string()));
        }

        let header = WavHeader::parse(request.wav).map_err(TranscodeError::MalformedInput)?;
        let channels = header.channels as usize;
        if channels == 0 {
            return Err(TranscodeError::MalformedInput("zero channels".to_string()));
        }

        let samples = match header.audio_format {
            WAVE_FORMAT_PCM => read_pcm(request.wav)?,
            WAVE_FORMAT_ADPCM => {
                let end = request.wav.len().min(header.header_len + header.data_size as usize);
                let data = &request.wav[header.header_len..end];
                adpcm::decode(data, channels, header.block_align as usize)?
            }
            other => return Err(TranscodeError::UnsupportedEncoding(other)),
        };

        let (samples, channels) = if request.mono && channels > 1 {
            (downmix_to_mono(&samples, channels), 1)
        } else {
            (samples, channels)
        };
        let resampled =
            resample_linear(&samples, channels, header.sample_rate, request.target_rate);
        debug!(
            from_rate = header.sample_rate,
            to_rate = request.target_rate,
            channels,
            frames = resampled.len() / channels,
            "resampled"
        );

        let (format, data) = match (header.audio_format, request.encoding) {
            (WAVE_FORMAT_ADPCM, TargetEncoding::Preserve) => {
                let code = (header.block_align / header.channels) as u32;
                let code = code.checked_sub(ADPCM_BLOCKALIGN_CONVERSION_OFFSET).ok_or_else(|| {
                    TranscodeError::MalformedInput(format!(
                        "ADPCM block align {} too small",
                        header.block_align
                    ))
                })?;
                let format = MiniFormat::adpcm(channels as u32, request.target_rate, code);
                let data = adpcm::encode(&resampled, channels, format.block_align() as usize)?;
                (format, data)
            }
            (WAVE_FORMAT_PCM, TargetEncoding::Preserve) if header.bits_per_sample == 8 => {
                let format = MiniFormat::pcm(channels as u32, request.target_rate, BitDepth::Bits8);
                (format, to_pcm8(&resampled))
            }
            _ => {
                let format =
                    MiniFormat::pcm(channels as u32, request.target_rate, BitDepth::Bits16);
                (format, to_pcm16(&resampled))
            }
        };

        wrap_payload(format, &data)
            .ok_or_else(|| TranscodeError::UnsupportedEncoding(format.tag() as u16))
    }
}

/// Read 8- or 16-bit PCM through hound, widening to 16 bits.
fn read_pcm(wav: &[u8]) -> Result<Vec<i16>, TranscodeError> {
    let mut reader = hound::WavReader::new(Cursor::new(wav))?;
    let spec = reader.spec();
    if spec.sample_format != hound::SampleFormat::Int {
        return Err(TranscodeError::MalformedInput(format!(
            "only integer PCM is supported, got {:?}",
            spec.sample_format
        )));
    }

    match spec.bits_per_sample {
        8 => reader
            .samples::<i8>()
            .map(|s| s.map(|v| (v as i16) << 8).map_err(TranscodeError::from))
            .collect(),
        16 => reader
            .samples::<i16>()
            .map(|s| s.map_err(TranscodeError::from))
            .collect(),
        bits => Err(TranscodeError::MalformedInput(format!(
            "unsupported PCM bit depth {}",
            bits
        ))),
    }
}

/// Average interleaved frames down to one channel.
pub fn downmix_to_mono(samples: &[i16], channels: usize) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

/// Resample interleaved frames using linear interpolation.
pub fn resample_linear(
    samples: &[i16],
    channels: usize,
    from_rate: u32,
    to_rate: u32,
) -> Vec<i16> {
    if samples.is_empty() || channels == 0 || from_rate == to_rate || to_rate == 0 {
        return samples.to_vec();
    }

    let num_src_frames = samples.len() / channels;
    let ratio = from_rate as f64 / to_rate as f64;
    let num_dst_frames = (num_src_frames as f64 / ratio).ceil() as usize;
    let mut output = Vec::with_capacity(num_dst_frames * channels);

    for i in 0..num_dst_frames {
        let src_pos = i as f64 * ratio;
        let src_idx = src_pos.floor() as usize;
        let frac = src_pos - src_idx as f64;

        for ch in 0..channels {
            let sample = if src_idx + 1 < num_src_frames {
                let s0 = samples[src_idx * channels + ch] as f64;
                let s1 = samples[(src_idx + 1) * channels + ch] as f64;
                s0 + (s1 - s0) * frac
            } else {
                samples[src_idx.min(num_src_frames - 1) * channels + ch] as f64
            };
            output.push(sample.round().clamp(-32768.0, 32767.0) as i16);
        }
    }

    output
}

fn to_pcm16(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// 8-bit WAV samples are unsigned.
fn to_pcm8(samples: &[i16]) -> Vec<u8> {
    samples.iter().map(|&s| ((s >> 8) + 128) as u8).collect()
}
