//! Bank rewriting: copy the headers, convert or relocate every entry, then
//! patch the entry table and header to match the new wave data.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::bank::{EntryInfo, WaveBank};
use crate::duration::estimate_duration;
use crate::entry::EntryUpdate;
use crate::error::{BankError, TranscodeError};
use crate::layout::{Region, Segment};
use crate::miniformat::{BitDepth, FormatTag, MiniFormat, ADPCM_BLOCKALIGN_CONVERSION_OFFSET};
use crate::options::RewriteOptions;
use crate::report::{EntryAction, EntryOutcome, RewriteReport};
use crate::riff::{wrap_payload, WavHeader, WAVE_FORMAT_ADPCM, WAVE_FORMAT_PCM};
use crate::transcode::{TargetEncoding, TranscodeRequest, Transcoder};

/// Rewrite the bank read from `input` into `output`.
///
/// `progress` is called with `(index, count)` before each entry. The output
/// may be longer than [`RewriteReport::output_length`] if it already held
/// data; [`rewrite_file`] truncates it.
pub fn rewrite<R, W, T>(
    input: &mut R,
    output: &mut W,
    options: &RewriteOptions,
    transcoder: &mut T,
    progress: impl FnMut(usize, usize),
) -> Result<RewriteReport, BankError>
where
    R: Read + Seek,
    W: Write + Seek,
    T: Transcoder + ?Sized,
{
    options.validate()?;
    let bank = WaveBank::read(input)?;
    rewrite_bank(&bank, input, output, options, transcoder, progress)
}

/// Rewrite the bank at `input_path` into `output_path`.
///
/// The input is fully validated before the output file is opened.
pub fn rewrite_file<T: Transcoder + ?Sized>(
    input_path: &Path,
    output_path: &Path,
    options: &RewriteOptions,
    transcoder: &mut T,
    progress: impl FnMut(usize, usize),
) -> Result<RewriteReport, BankError> {
    options.validate()?;
    let mut input = BufReader::new(File::open(input_path).map_err(BankError::Read)?);
    let bank = WaveBank::read(&mut input)?;

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(output_path)
        .map_err(BankError::Write)?;
    let mut output = BufWriter::new(file);
    let report = rewrite_bank(&bank, &mut input, &mut output, options, transcoder, progress)?;

    let file = output
        .into_inner()
        .map_err(|err| BankError::Write(err.into_error()))?;
    file.set_len(report.output_length).map_err(BankError::Write)?;
    info!(
        input = %input_path.display(),
        output = %output_path.display(),
        bytes = report.output_length,
        "wrote wave bank"
    );
    Ok(report)
}

/// Rewrite an already decoded bank. `input` must be the stream `bank` was read from.
pub fn rewrite_bank<R, W, T>(
    bank: &WaveBank,
    input: &mut R,
    output: &mut W,
    options: &RewriteOptions,
    transcoder: &mut T,
    mut progress: impl FnMut(usize, usize),
) -> Result<RewriteReport, BankError>
where
    R: Read + Seek,
    W: Write + Seek,
    T: Transcoder + ?Sized,
{
    let mut report = RewriteReport {
        options: *options,
        entries: Vec::with_capacity(bank.entry_count()),
        original_wave_bytes: 0,
        new_wave_bytes: 0,
        output_length: 0,
        copied_verbatim: false,
        warnings: bank.warnings.clone(),
    };

    if bank.is_empty() {
        info!("empty wave bank, copying input unchanged");
        input.seek(SeekFrom::Start(0)).map_err(BankError::Read)?;
        let mut all = Vec::new();
        input.read_to_end(&mut all).map_err(BankError::Read)?;
        output.seek(SeekFrom::Start(0)).map_err(BankError::Write)?;
        output.write_all(&all).map_err(BankError::Write)?;
        output.flush().map_err(BankError::Write)?;
        report.output_length = all.len() as u64;
        report.copied_verbatim = true;
        return Ok(report);
    }

    if bank.header.segment(Segment::SeekTables).length > 0 {
        return Err(BankError::UnsupportedSeekTables);
    }

    let payload = bank.payload_region();
    let alignment = bank.data.alignment;
    info!(
        entries = bank.entry_count(),
        rate = options.target_rate,
        force_pcm = options.force_pcm,
        mono = options.force_mono,
        "rewriting wave bank"
    );

    // Everything before the wave data is copied as-is; the entry table and
    // header are patched once the new layout is known.
    let mut prefix = vec![0u8; payload.offset as usize];
    input.seek(SeekFrom::Start(0)).map_err(BankError::Read)?;
    input
        .read_exact(&mut prefix)
        .map_err(BankError::read("bank headers", prefix.len()))?;
    output.seek(SeekFrom::Start(0)).map_err(BankError::Write)?;
    output.write_all(&prefix).map_err(BankError::Write)?;
    drop(prefix);

    let mut entries = bank.entries.clone();
    let mut cursor: u64 = 0;
    let mut has_xma = false;
    let count = bank.entry_count();

    for index in 0..count {
        progress(index, count);

        let info = bank.entry_info(index);
        report.warnings.extend(info.warnings.iter().cloned());
        report.original_wave_bytes += info.region.length as u64;
        has_xma |= info.format.tag() == FormatTag::Xma;

        let mut raw = vec![0u8; info.region.length as usize];
        input
            .seek(SeekFrom::Start(payload.offset as u64 + info.region.offset as u64))
            .map_err(BankError::Read)?;
        input
            .read_exact(&mut raw)
            .map_err(BankError::read("entry wave data", raw.len()))?;

        let offset =
            u32::try_from(cursor).map_err(|_| BankError::PayloadTooLarge { length: cursor })?;
        let old_duration = bank
            .entries
            .stored_duration(index)
            .unwrap_or(info.estimated_duration);

        let outcome = if needs_conversion(bank, &info, options) {
            let converted = convert_entry(bank, &info, &raw, options, transcoder)?;
            output.write_all(converted.data()).map_err(BankError::Write)?;
            let length = converted.data().len() as u32;
            entries.rewrite_entry(
                index,
                EntryUpdate::Transcode {
                    offset,
                    length,
                    duration: converted.duration,
                    format: converted.format,
                },
                alignment,
            );
            debug!(
                entry = index,
                from = %format_args!("{}+{}", info.region.offset, info.region.length),
                to = %format_args!("{}+{}", offset, length),
                rate = converted.format.sample_rate(),
                duration = converted.duration,
                "converted entry"
            );
            EntryOutcome {
                index,
                name: bank.entry_name(index).map(str::to_owned),
                action: EntryAction::Converted,
                old_region: info.region,
                new_region: Region::new(offset, length),
                old_duration,
                new_duration: converted.duration,
                old_format: info.format.tag(),
                new_format: converted.format.tag(),
                old_rate: info.format.sample_rate(),
                new_rate: converted.format.sample_rate(),
                old_channels: info.format.channels(),
                new_channels: converted.format.channels(),
            }
        } else {
            output.write_all(&raw).map_err(BankError::Write)?;
            entries.rewrite_entry(index, EntryUpdate::Relocate { offset }, alignment);
            debug!(entry = index, offset, length = raw.len(), "passed through entry");
            EntryOutcome {
                index,
                name: bank.entry_name(index).map(str::to_owned),
                action: EntryAction::PassedThrough,
                old_region: info.region,
                new_region: Region::new(offset, info.region.length),
                old_duration,
                new_duration: old_duration,
                old_format: info.format.tag(),
                new_format: info.format.tag(),
                old_rate: info.format.sample_rate(),
                new_rate: info.format.sample_rate(),
                old_channels: info.format.channels(),
                new_channels: info.format.channels(),
            }
        };

        cursor += outcome.new_region.length as u64;
        // Compact lengths are derived from the gap to the next offset, so the
        // stored deviation is written back as the gap itself.
        let padding = match entries.length_deviation(index) {
            Some(deviation) => {
                let mut gap = deviation;
                if index + 1 < count {
                    gap += padding_for(cursor + deviation as u64, alignment);
                    entries.set_length_deviation(index, gap);
                }
                gap
            }
            None => padding_for(cursor, alignment),
        };
        if padding > 0 {
            output
                .write_all(&vec![0u8; padding as usize])
                .map_err(BankError::Write)?;
            cursor += padding as u64;
        }
        report.entries.push(outcome);
    }

    let summary = bank.summary_warnings(has_xma, report.original_wave_bytes);
    report.warnings.extend(summary);

    let new_length =
        u32::try_from(cursor).map_err(|_| BankError::PayloadTooLarge { length: cursor })?;
    let mut header = bank.header.clone();
    header.segment_mut(Segment::EntryWaveData).length = new_length;

    let metadata = bank.header.segment(Segment::EntryMetadata);
    output
        .seek(SeekFrom::Start(metadata.offset as u64))
        .map_err(BankError::Write)?;
    output.write_all(&entries.encode()).map_err(BankError::Write)?;
    output.seek(SeekFrom::Start(0)).map_err(BankError::Write)?;
    header.write(output).map_err(BankError::Write)?;

    report.new_wave_bytes = cursor;
    report.output_length = payload.offset as u64 + cursor;
    output
        .seek(SeekFrom::Start(report.output_length))
        .map_err(BankError::Write)?;
    output.flush().map_err(BankError::Write)?;

    info!(
        converted = report.converted(),
        original_bytes = report.original_wave_bytes,
        new_bytes = report.new_wave_bytes,
        "rewrote wave data"
    );
    Ok(report)
}

/// Compact, xWMA and XMA entries are never converted; PCM entries already
/// at the target rate and channel count have nothing to convert.
fn needs_conversion(bank: &WaveBank, info: &EntryInfo<'_>, options: &RewriteOptions) -> bool {
    if bank.is_compact() {
        return false;
    }
    let collapse = options.force_mono && info.format.channels() > 1;
    match info.format.tag() {
        FormatTag::Adpcm => true,
        FormatTag::Pcm => info.format.sample_rate() != options.target_rate || collapse,
        FormatTag::Xma | FormatTag::Wma => false,
    }
}

fn padding_for(position: u64, alignment: u32) -> u32 {
    let alignment = alignment as u64;
    if alignment == 0 || position % alignment == 0 {
        0
    } else {
        (alignment - position % alignment) as u32
    }
}

/// Rate to request from the transcoder for `duration` samples at `source_rate`.
///
/// The duration is scaled first and the rate derived back from it, so the
/// request matches a whole number of output samples.
pub fn requested_rate(duration: u32, source_rate: u32, target_rate: u32) -> u32 {
    if duration == 0 || source_rate == 0 {
        return target_rate;
    }
    let new_duration = duration as u64 * target_rate as u64 / source_rate as u64;
    let rate = (new_duration * source_rate as u64 / duration as u64) as u32;
    if rate == 0 {
        target_rate
    } else {
        rate
    }
}

/// A transcoder result with its decoded header values.
struct Converted {
    wav: Vec<u8>,
    data_start: usize,
    format: MiniFormat,
    duration: u32,
}

impl Converted {
    fn data(&self) -> &[u8] {
        &self.wav[self.data_start..]
    }
}

fn convert_entry<T: Transcoder + ?Sized>(
    bank: &WaveBank,
    info: &EntryInfo<'_>,
    raw: &[u8],
    options: &RewriteOptions,
    transcoder: &mut T,
) -> Result<Converted, BankError> {
    let index = info.index;
    let transform = |source: TranscodeError| BankError::Transform { index, source };
    let source = info.format;
    let adpcm_in = source.tag() == FormatTag::Adpcm;
    let adpcm_out = adpcm_in && !options.force_pcm;

    let wav = wrap_payload(source, raw)
        .ok_or_else(|| transform(TranscodeError::UnsupportedEncoding(source.tag() as u16)))?;
    let duration = bank
        .entries
        .stored_duration(index)
        .unwrap_or(info.estimated_duration);
    let request = TranscodeRequest {
        wav: &wav,
        target_rate: requested_rate(duration, source.sample_rate(), options.target_rate),
        mono: options.force_mono && source.channels() > 1,
        encoding: if adpcm_in && options.force_pcm {
            TargetEncoding::Pcm16
        } else {
            TargetEncoding::Preserve
        },
    };
    debug!(
        entry = index,
        from_rate = source.sample_rate(),
        to_rate = request.target_rate,
        mono = request.mono,
        "transcoding entry"
    );
    let result = transcoder.transcode(&request).map_err(transform)?;

    let (format, data_start, duration) = read_result(&result, adpcm_out).map_err(transform)?;
    if data_start >= result.len() {
        return Err(BankError::EmptyOutput { index });
    }
    Ok(Converted {
        wav: result,
        data_start,
        format,
        duration,
    })
}

/// Check a transcoder result and derive the entry's new format and duration.
///
/// Returns the format, the offset of the sample data and the duration.
fn read_result(result: &[u8], adpcm: bool) -> Result<(MiniFormat, usize, u32), TranscodeError> {
    let header = WavHeader::parse(result).map_err(TranscodeError::MalformedResult)?;
    let expected = if adpcm {
        WAVE_FORMAT_ADPCM
    } else {
        WAVE_FORMAT_PCM
    };
    if header.audio_format != expected {
        return Err(TranscodeError::MalformedResult(format!(
            "format tag {} (expected {})",
            header.audio_format, expected
        )));
    }
    let channels = header.channels as u32;
    if channels == 0 {
        return Err(TranscodeError::MalformedResult("zero channels".to_string()));
    }
    let length = u32::try_from(result.len().saturating_sub(header.header_len)).map_err(|_| {
        TranscodeError::MalformedResult(format!("{} bytes of sample data", result.len()))
    })?;

    let (format, duration) = if adpcm {
        let code = (header.block_align as u32 / channels)
            .checked_sub(ADPCM_BLOCKALIGN_CONVERSION_OFFSET)
            .ok_or_else(|| {
                TranscodeError::MalformedResult(format!("block align {}", header.block_align))
            })?;
        let format = MiniFormat::adpcm(channels, header.sample_rate, code);
        (format, estimate_duration(length, format, None))
    } else {
        let depth = match header.bits_per_sample {
            8 => BitDepth::Bits8,
            16 => BitDepth::Bits16,
            bits => {
                return Err(TranscodeError::MalformedResult(format!(
                    "{}-bit PCM",
                    bits
                )))
            }
        };
        let format = MiniFormat::new(
            FormatTag::Pcm,
            channels,
            header.sample_rate,
            header.block_align as u32,
            depth,
        );
        let bits = channels as u64 * header.bits_per_sample as u64;
        (format, (length as u64 * 8 / bits) as u32)
    };
    Ok((format, header.header_len, duration))
}
