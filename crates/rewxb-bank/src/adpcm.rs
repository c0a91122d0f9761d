//! Microsoft ADPCM block codec.
//!
//! A block starts with a per-channel header (predictor indices, then
//! deltas, then the second and first history samples) followed by 4-bit
//! codes interleaved across channels, high nibble first.

use crate::error::TranscodeError;
use crate::miniformat::ADPCM_COEFFICIENTS;

static ADAPTATION_TABLE: [i32; 16] = [
    230, 230, 230, 230, 307, 409, 512, 614, 768, 614, 512, 409, 307, 230, 230, 230,
];

const MIN_DELTA: i32 = 16;
const MAX_DELTA: i32 = i32::MAX / 768;

/// Bytes of block header per channel.
pub const BLOCK_HEADER_PER_CHANNEL: usize = 7;

/// Sample frames decoded from one full block.
pub fn samples_per_block(block_align: usize, channels: usize) -> usize {
    let header = BLOCK_HEADER_PER_CHANNEL * channels;
    if channels == 0 || block_align < header {
        return 0;
    }
    (block_align - header) * 2 / channels + 2
}

#[derive(Debug, Clone, Copy)]
struct ChannelState {
    coef1: i32,
    coef2: i32,
    delta: i32,
    sample1: i32,
    sample2: i32,
}

impl ChannelState {
    fn predict(&self) -> i32 {
        (self.sample1 * self.coef1 + self.sample2 * self.coef2) / 256
    }

    fn expand(&mut self, nibble: u8) -> i16 {
        let code = (((nibble & 0x0F) << 4) as i8 >> 4) as i32;
        let sample = (self.predict() + code * self.delta).clamp(i16::MIN as i32, i16::MAX as i32);
        self.sample2 = self.sample1;
        self.sample1 = sample;
        self.delta = (ADAPTATION_TABLE[(nibble & 0x0F) as usize] * self.delta / 256)
            .clamp(MIN_DELTA, MAX_DELTA);
        sample as i16
    }

    /// Quantize `sample`, advance the state and return the code with its squared error.
    fn compress(&mut self, sample: i16) -> (u8, u64) {
        let diff = sample as i32 - self.predict();
        let bias = self.delta / 2;
        let code = if diff >= 0 {
            (diff + bias) / self.delta
        } else {
            (diff - bias) / self.delta
        };
        let nibble = (code.clamp(-8, 7) & 0x0F) as u8;
        let decoded = self.expand(nibble) as i64;
        let error = (decoded - sample as i64).unsigned_abs();
        (nibble, error * error)
    }
}

fn read_i16(block: &[u8], at: usize) -> i32 {
    i16::from_le_bytes([block[at], block[at + 1]]) as i32
}

/// Decode MS-ADPCM blocks into interleaved 16-bit samples.
///
/// A trailing block shorter than its header is ignored.
pub fn decode(
    data: &[u8],
    channels: usize,
    block_align: usize,
) -> Result<Vec<i16>, TranscodeError> {
    let header = BLOCK_HEADER_PER_CHANNEL * channels;
    if channels == 0 || block_align <= header {
        return Err(TranscodeError::InvalidParameter(format!(
            "ADPCM block align {} for {} channels",
            block_align, channels
        )));
    }

    let frames = data.len() / block_align * samples_per_block(block_align, channels);
    let mut samples = Vec::with_capacity(frames * channels);
    for block in data.chunks(block_align) {
        if block.len() < header {
            break;
        }
        decode_block(block, channels, &mut samples)?;
    }
    Ok(samples)
}

fn decode_block(block: &[u8], channels: usize, out: &mut Vec<i16>) -> Result<(), TranscodeError> {
    let mut states = Vec::with_capacity(channels);
    for ch in 0..channels {
        let predictor = block[ch] as usize;
        let &(coef1, coef2) = ADPCM_COEFFICIENTS.get(predictor).ok_or_else(|| {
            TranscodeError::MalformedInput(format!("ADPCM predictor index {}", predictor))
        })?;
        states.push(ChannelState {
            coef1: coef1 as i32,
            coef2: coef2 as i32,
            delta: read_i16(block, channels + 2 * ch),
            sample1: read_i16(block, 3 * channels + 2 * ch),
            sample2: read_i16(block, 5 * channels + 2 * ch),
        });
    }

    out.extend(states.iter().map(|s| s.sample2 as i16));
    out.extend(states.iter().map(|s| s.sample1 as i16));

    let body = &block[BLOCK_HEADER_PER_CHANNEL * channels..];
    let codes = (body.len() * 2) / channels * channels;
    for n in 0..codes {
        let byte = body[n / 2];
        let nibble = if n % 2 == 0 { byte >> 4 } else { byte & 0x0F };
        out.push(states[n % channels].expand(nibble));
    }
    Ok(())
}

/// Encode interleaved 16-bit samples into MS-ADPCM blocks of `block_align` bytes.
///
/// Full blocks are padded to `block_align`; a final partial block is kept
/// short so its decoded length matches the input.
pub fn encode(
    samples: &[i16],
    channels: usize,
    block_align: usize,
) -> Result<Vec<u8>, TranscodeError> {
    let per_block = samples_per_block(block_align, channels);
    if per_block <= 2 {
        return Err(TranscodeError::InvalidParameter(format!(
            "ADPCM block align {} for {} channels",
            block_align, channels
        )));
    }

    let frames = samples.len() / channels;
    let mut out = Vec::with_capacity(frames.div_ceil(per_block) * block_align);
    let mut start = 0;
    while start < frames {
        let count = per_block.min(frames - start);
        let block = &samples[start * channels..(start + count) * channels];
        let begin = out.len();
        encode_block(block, channels, &mut out);
        if count == per_block {
            out.resize(begin + block_align, 0);
        }
        start += count;
    }
    Ok(out)
}

fn encode_block(block: &[i16], channels: usize, out: &mut Vec<u8>) {
    let frames = block.len() / channels;
    // Blocks always carry two history frames; a lone frame is repeated.
    let frame = |i: usize, ch: usize| block[i.min(frames - 1) * channels + ch];

    let mut states: Vec<(usize, ChannelState)> = (0..channels)
        .map(|ch| best_predictor(frames, |i| frame(i, ch)))
        .collect();

    out.extend(states.iter().map(|(index, _)| *index as u8));
    for (_, state) in &states {
        out.extend_from_slice(&(state.delta as i16).to_le_bytes());
    }
    for (_, state) in &states {
        out.extend_from_slice(&(state.sample1 as i16).to_le_bytes());
    }
    for (_, state) in &states {
        out.extend_from_slice(&(state.sample2 as i16).to_le_bytes());
    }

    let mut pending: Option<u8> = None;
    for i in 2..frames {
        for (ch, (_, state)) in states.iter_mut().enumerate() {
            let (nibble, _) = state.compress(frame(i, ch));
            match pending.take() {
                Some(high) => out.push((high << 4) | nibble),
                None => pending = Some(nibble),
            }
        }
    }
    if let Some(high) = pending {
        out.push(high << 4);
    }
}

/// Pick the coefficient pair with the lowest squared error over the block.
fn best_predictor(frames: usize, sample: impl Fn(usize) -> i16) -> (usize, ChannelState) {
    let trial = |index: usize| {
        let (coef1, coef2) = ADPCM_COEFFICIENTS[index];
        let mut state = ChannelState {
            coef1: coef1 as i32,
            coef2: coef2 as i32,
            delta: MIN_DELTA,
            sample1: sample(1) as i32,
            sample2: sample(0) as i32,
        };
        if frames > 2 {
            let residual = (sample(2) as i32 - state.predict()).abs();
            state.delta = (residual / 4).clamp(MIN_DELTA, i16::MAX as i32);
        }
        let initial = state;

        let mut error = 0u64;
        for i in 2..frames {
            error = error.saturating_add(state.compress(sample(i)).1);
        }
        (error, initial)
    };

    let (mut best_error, mut best_state) = trial(0);
    let mut best_index = 0;
    for index in 1..ADPCM_COEFFICIENTS.len() {
        let (error, state) = trial(index);
        if error < best_error {
            best_error = error;
            best_state = state;
            best_index = index;
        }
    }
    (best_index, best_state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_per_block_matches_format_math() {
        assert_eq!(samples_per_block(22, 1), 32);
        assert_eq!(samples_per_block(140, 2), 128);
        assert_eq!(samples_per_block(10, 2), 0);
    }

    #[test]
    fn decodes_hand_built_block() {
        // predictor 0, delta 16, sample1 100, sample2 50, codes 1 then 0
        let block = [0u8, 16, 0, 100, 0, 50, 0, 0x10];
        let samples = decode(&block, 1, block.len()).unwrap();
        assert_eq!(samples, vec![50, 100, 116, 116]);
    }

    #[test]
    fn rejects_bad_predictor() {
        let block = [9u8, 16, 0, 0, 0, 0, 0, 0];
        let err = decode(&block, 1, block.len()).unwrap_err();
        assert!(matches!(err, TranscodeError::MalformedInput(_)));
    }

    #[test]
    fn encoded_sine_tracks_the_input() {
        let input: Vec<i16> = (0..500)
            .map(|i| ((i as f64 * 0.05).sin() * 12000.0) as i16)
            .collect();
        let block_align = 70;
        let encoded = encode(&input, 1, block_align).unwrap();
        // Three full blocks of 128 frames, then 116 frames in a 64-byte tail
        assert_eq!(encoded.len(), 3 * block_align + 7 + 57);

        let decoded = decode(&encoded, 1, block_align).unwrap();
        assert_eq!(decoded.len(), input.len());
        let worst = input
            .iter()
            .zip(&decoded)
            .map(|(a, b)| (*a as i32 - *b as i32).abs())
            .max()
            .unwrap();
        assert!(worst < 1500, "max error {}", worst);
    }

    #[test]
    fn stereo_blocks_keep_channels_apart() {
        let input: Vec<i16> = (0..256).flat_map(|i| [i as i16 * 10, -(i as i16) * 10]).collect();
        let encoded = encode(&input, 2, 140).unwrap();
        assert_eq!(encoded.len(), 2 * 140);

        let decoded = decode(&encoded, 2, 140).unwrap();
        assert_eq!(decoded.len(), input.len());
        assert_eq!(&decoded[..4], &input[..4]);
        assert!(decoded.chunks(2).skip(2).all(|f| f[0] >= 0 && f[1] <= 0));
    }
}
