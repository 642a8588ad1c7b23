//! EDF+ Time-stamped Annotation List (TAL) decoding.
//!
//! An annotation signal carries, per record, a run of TALs followed by NUL
//! padding:
//!
//! ```text
//! +onset[\x15duration]\x14text\x14[text\x14...]\x00
//! ```
//!
//! The first TAL of a record whose text list is empty is the time-keeping TAL
//! and gives the record's start relative to the recording.

use crate::error::{EdfError, Result};
use crate::types::{Annotation, DataRecord};
use crate::utils::{parse_edf_time, time_to_seconds};

const TAL_DURATION_SEPARATOR: u8 = 0x15;
const TAL_TEXT_SEPARATOR: u8 = 0x14;
const TAL_TERMINATOR: u8 = 0x00;

/// What decoded TAL onsets are relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnsetReference {
    /// Absolute onset is the record's nominal start plus the TAL onset.
    #[default]
    DataRecord,
    /// TAL onsets are already relative to the recording start.
    RecordingStart,
}

/// One decoded TAL, onset and duration in seconds as written.
#[derive(Debug, Clone, PartialEq)]
pub struct Tal {
    pub onset: f64,
    pub duration: Option<f64>,
    pub texts: Vec<String>,
}

/// Annotations found in one record's annotation signal.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordAnnotations {
    /// Onset of the time-keeping TAL, if the record has one.
    pub time_keeping: Option<f64>,
    pub annotations: Vec<Annotation>,
}

/// Splits one annotation block into TALs.
///
/// On failure returns the byte position inside `block` and a reason.
pub fn parse_tal_block(block: &[u8]) -> std::result::Result<Vec<Tal>, (usize, String)> {
    let mut tals = Vec::new();
    let mut pos = 0;

    while pos < block.len() {
        // TAL 之后的 NUL 为填充
        if block[pos] == TAL_TERMINATOR {
            break;
        }
        let end = block[pos..]
            .iter()
            .position(|&b| b == TAL_TERMINATOR)
            .map(|i| pos + i)
            .ok_or_else(|| (pos, "missing TAL terminator".to_string()))?;

        let tal = parse_tal(&block[pos..end]).map_err(|(at, reason)| (pos + at, reason))?;
        tals.push(tal);
        pos = end + 1;
    }

    Ok(tals)
}

fn parse_tal(tal: &[u8]) -> std::result::Result<Tal, (usize, String)> {
    if !matches!(tal.first(), Some(b'+') | Some(b'-')) {
        return Err((0, "onset must start with '+' or '-'".to_string()));
    }

    let text_start = tal
        .iter()
        .position(|&b| b == TAL_TEXT_SEPARATOR)
        .ok_or_else(|| (0, "missing annotation separator".to_string()))?;
    let timing = &tal[..text_start];

    let mut timing_parts = timing.split(|&b| b == TAL_DURATION_SEPARATOR);
    let onset_raw = timing_parts.next().unwrap_or_default();
    let duration_raw = timing_parts.next();
    if timing_parts.next().is_some() {
        return Err((0, "more than one duration separator".to_string()));
    }

    let onset = std::str::from_utf8(onset_raw)
        .ok()
        .and_then(parse_edf_time)
        .map(time_to_seconds)
        .ok_or_else(|| (0, format!("unparseable onset {:?}", String::from_utf8_lossy(onset_raw))))?;

    let duration = match duration_raw {
        None | Some(&[]) => None,
        Some(raw) => {
            let duration_at = onset_raw.len() + 1;
            // 持续时间没有符号
            if matches!(raw.first(), Some(b'+') | Some(b'-')) {
                return Err((duration_at, "duration must not be signed".to_string()));
            }
            let seconds = std::str::from_utf8(raw)
                .ok()
                .and_then(parse_edf_time)
                .map(time_to_seconds)
                .ok_or_else(|| {
                    (duration_at, format!("unparseable duration {:?}", String::from_utf8_lossy(raw)))
                })?;
            Some(seconds)
        }
    };

    let body = &tal[text_start + 1..];
    let mut texts = Vec::new();
    if let Some((&last, items)) = body.split_last() {
        if last != TAL_TEXT_SEPARATOR {
            return Err((tal.len(), "annotation text not terminated".to_string()));
        }
        let mut at = text_start + 1;
        for item in items.split(|&b| b == TAL_TEXT_SEPARATOR) {
            let text = std::str::from_utf8(item)
                .map_err(|_| (at, "annotation text is not valid UTF-8".to_string()))?;
            if !text.is_empty() {
                texts.push(text.to_string());
            }
            at += item.len() + 1;
        }
    }

    Ok(Tal { onset, duration, texts })
}

/// Decodes the annotation signal `signal` of one record.
///
/// `signal_offset` is the absolute file offset of the signal's block and is
/// only used for error reporting. Any structural fault rejects the whole
/// record's TALs with `MalformedAnnotation`.
pub fn decode_record_annotations(
    record: &DataRecord,
    signal: usize,
    signal_offset: u64,
    reference: OnsetReference,
) -> Result<RecordAnnotations> {
    let block = record
        .signal_bytes(signal)
        .ok_or(EdfError::InvalidSignalIndex(signal))?;

    let tals = parse_tal_block(&block).map_err(|(pos, reason)| EdfError::MalformedAnnotation {
        record: record.index,
        signal,
        offset: signal_offset + pos as u64,
        reason,
    })?;

    let base = match reference {
        OnsetReference::DataRecord => record.nominal_start,
        OnsetReference::RecordingStart => 0.0,
    };

    let mut decoded = RecordAnnotations::default();
    for (i, tal) in tals.into_iter().enumerate() {
        if tal.texts.is_empty() {
            if i == 0 {
                decoded.time_keeping = Some(tal.onset);
            }
            continue;
        }
        decoded.annotations.push(Annotation {
            onset: base + tal.onset,
            duration: tal.duration,
            texts: tal.texts,
            record: record.index,
        });
    }

    Ok(decoded)
}

/// Sorts annotations by onset, keeping file order for equal onsets.
pub fn sort_by_onset(annotations: &mut [Annotation]) {
    annotations.sort_by(|a, b| a.onset.total_cmp(&b.onset));
}
