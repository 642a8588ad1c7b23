//! Data record layout and decoding.
//!
//! Every record holds, in descriptor order, `samples_per_record[i]` 16-bit
//! little-endian samples for each signal. The per-signal byte offsets are
//! computed once in [`RecordLayout`] and shared by the record and annotation
//! decoders.

use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::ops::Range;

use crate::error::{EdfError, Result};
use crate::types::{DataRecord, SignalDescriptor};
use crate::EDF_SAMPLE_SIZE;

/// Byte offset table of one data record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    /// 每个信号在数据记录中的字节偏移
    offsets: Vec<usize>,
    samples_per_record: Vec<usize>,
    record_size: usize,
}

impl RecordLayout {
    pub fn new(signals: &[SignalDescriptor]) -> Self {
        let mut offsets = Vec::with_capacity(signals.len());
        let mut samples_per_record = Vec::with_capacity(signals.len());
        let mut offset = 0;
        for signal in signals {
            offsets.push(offset);
            samples_per_record.push(signal.samples_per_record);
            offset += signal.samples_per_record * EDF_SAMPLE_SIZE;
        }
        RecordLayout { offsets, samples_per_record, record_size: offset }
    }

    /// Total bytes in one record.
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    pub fn signal_count(&self) -> usize {
        self.offsets.len()
    }

    /// Byte range of one signal inside a record.
    pub fn signal_range(&self, signal: usize) -> Option<Range<usize>> {
        let start = *self.offsets.get(signal)?;
        Some(start..start + self.samples_per_record[signal] * EDF_SAMPLE_SIZE)
    }

    /// Absolute file offset of record `index`.
    pub fn record_offset(&self, header_bytes: usize, index: usize) -> u64 {
        header_bytes as u64 + index as u64 * self.record_size as u64
    }

    /// Splits one record's bytes into per-signal digital samples.
    ///
    /// `file_offset` is only used for error reporting.
    pub fn decode(&self, index: usize, bytes: &[u8], record_duration: f64, file_offset: u64) -> Result<DataRecord> {
        if bytes.len() != self.record_size {
            return Err(EdfError::TruncatedFile {
                offset: file_offset,
                expected: self.record_size,
                available: bytes.len(),
            });
        }

        let samples = (0..self.signal_count())
            .map(|signal| {
                let range = self.signal_range(signal).unwrap_or(0..0);
                bytes[range]
                    .chunks_exact(EDF_SAMPLE_SIZE)
                    .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
                    .collect()
            })
            .collect();

        Ok(DataRecord {
            index,
            nominal_start: index as f64 * record_duration,
            time_offset: None,
            samples,
        })
    }
}

/// Number of records to read and an optional trailing-bytes diagnostic.
///
/// With a declared count of `-1` the count is inferred from the bytes after
/// the header; a partial record at the end yields `TruncatedFile`.
pub fn resolve_record_count(
    declared: i64,
    data_bytes: u64,
    layout: &RecordLayout,
    header_bytes: usize,
) -> Result<(usize, Option<EdfError>)> {
    if declared >= 0 {
        return Ok((declared as usize, None));
    }

    let record_size = layout.record_size() as u64;
    if record_size == 0 {
        // 所有信号的样本数都为 0，无法推断记录数
        return Err(EdfError::MalformedHeaderField {
            field: "samples_per_record",
            offset: header_bytes as u64,
            value: "0".to_string(),
        });
    }

    let count = data_bytes / record_size;
    let remainder = data_bytes % record_size;
    let trailing = (remainder != 0).then(|| EdfError::TruncatedFile {
        offset: layout.record_offset(header_bytes, count as usize),
        expected: record_size as usize,
        available: remainder as usize,
    });
    Ok((count as usize, trailing))
}

/// Reads until `buf` is full or the source is exhausted.
pub(crate) fn read_full<R: Read>(source: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Reads and decodes record `index` at its absolute offset.
pub fn read_record_at<R: Read + Seek>(
    source: &mut R,
    layout: &RecordLayout,
    header_bytes: usize,
    record_duration: f64,
    index: usize,
) -> Result<DataRecord> {
    let offset = layout.record_offset(header_bytes, index);
    source.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; layout.record_size()];
    let read = read_full(source, &mut buf)?;
    buf.truncate(read);
    layout.decode(index, &buf, record_duration, offset)
}

/// Forward-only iterator over the data records of one source.
///
/// Stops after the first error, since a short read means every later record
/// is missing too.
pub struct Records<'a, R> {
    source: &'a mut R,
    layout: &'a RecordLayout,
    header_bytes: usize,
    record_duration: f64,
    next: usize,
    count: usize,
    failed: bool,
}

impl<'a, R: Read + Seek> Records<'a, R> {
    pub fn new(
        source: &'a mut R,
        layout: &'a RecordLayout,
        header_bytes: usize,
        record_duration: f64,
        count: usize,
    ) -> Self {
        Records {
            source,
            layout,
            header_bytes,
            record_duration,
            next: 0,
            count,
            failed: false,
        }
    }
}

impl<'a, R: Read + Seek> Iterator for Records<'a, R> {
    type Item = Result<DataRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.next >= self.count {
            return None;
        }
        let index = self.next;
        self.next += 1;

        let result = read_record_at(&mut *self.source, self.layout, self.header_bytes, self.record_duration, index);
        match &result {
            Ok(_) => log::trace!("decoded data record {}", index),
            Err(_) => self.failed = true,
        }
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            return (0, Some(0));
        }
        (0, Some(self.count - self.next))
    }
}
