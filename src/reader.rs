use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::annotation::{decode_record_annotations, sort_by_onset, OnsetReference, RecordAnnotations};
use crate::error::{EdfError, Result};
use crate::header::{parse_main_header, parse_signal_table, signal_table_size};
use crate::record::{read_full, read_record_at, resolve_record_count, RecordLayout, Records};
use crate::types::{DataRecord, Dataset, RecordingHeader, SignalDescriptor};
use crate::{EDF_HEADER_SIZE, EDF_MAX_SIGNALS};

/// Knobs for one read.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOptions {
    /// Decode EDF+ annotation signals into [`Dataset::annotations`].
    pub decode_annotations: bool,
    /// What TAL onsets are added to.
    pub onset_reference: OnsetReference,
    /// Upper bound on the declared signal count.
    pub max_signals: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            decode_annotations: true,
            onset_reference: OnsetReference::default(),
            max_signals: EDF_MAX_SIGNALS,
        }
    }
}

/// EDF/EDF+ reader over any seekable byte source.
///
/// Opening parses the main header and the signal table; any failure there
/// aborts. Data records are then read either lazily with
/// [`records`](EdfReader::records), one at a time with
/// [`read_record`](EdfReader::read_record), or all at once with
/// [`read_dataset`](EdfReader::read_dataset).
///
/// # Examples
///
/// ```rust
/// use std::io::Cursor;
/// use edfread::EdfReader;
///
/// # let bytes = edfread::doctest_utils::simple_recording_bytes();
/// let mut reader = EdfReader::from_reader(Cursor::new(bytes))?;
/// println!("Signals: {}", reader.header().signals.len());
///
/// for record in reader.records() {
///     let record = record?;
///     println!("record {} starts at {:.1}s", record.index, record.nominal_start);
/// }
/// # Ok::<(), edfread::EdfError>(())
/// ```
///
/// Reading everything, including EDF+ annotations:
///
/// ```rust
/// use std::io::Cursor;
/// use edfread::EdfReader;
///
/// # let bytes = edfread::doctest_utils::annotated_recording_bytes();
/// let dataset = EdfReader::from_reader(Cursor::new(bytes))?.read_dataset()?;
///
/// for annotation in &dataset.annotations {
///     println!("{:.2}s: {}", annotation.onset, annotation.description());
/// }
/// for problem in &dataset.diagnostics {
///     eprintln!("skipped: {}", problem);
/// }
/// let eeg = dataset.physical_samples(0)?;
/// println!("{} samples", eeg.len());
/// # Ok::<(), edfread::EdfError>(())
/// ```
pub struct EdfReader<R> {
    source: R,
    header: RecordingHeader,
    layout: RecordLayout,
    record_count: usize,
    /// Partial record at the end of a file with an unknown record count.
    trailing: Option<EdfError>,
    options: ReadOptions,
}

impl EdfReader<BufReader<File>> {
    /// Opens an EDF/EDF+ file and parses its headers.
    ///
    /// # Errors
    ///
    /// * `EdfError::FileNotFound` - the file cannot be opened
    /// * `EdfError::UnsupportedVersion` - the version field is not `0`
    /// * `EdfError::MalformedHeaderField` - a header field does not parse
    /// * `EdfError::SignalCountMismatch` - the signal table size is inconsistent
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, ReadOptions::default())
    }

    pub fn open_with_options<P: AsRef<Path>>(path: P, options: ReadOptions) -> Result<Self> {
        let file = File::open(&path)
            .map_err(|e| EdfError::FileNotFound(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::with_options(BufReader::new(file), options)
    }
}

impl<R: Read + Seek> EdfReader<R> {
    pub fn from_reader(source: R) -> Result<Self> {
        Self::with_options(source, ReadOptions::default())
    }

    pub fn with_options(mut source: R, options: ReadOptions) -> Result<Self> {
        // 读取主头部（256字节）
        source.seek(SeekFrom::Start(0))?;
        let mut main_header = vec![0u8; EDF_HEADER_SIZE];
        let read = read_full(&mut source, &mut main_header)?;
        main_header.truncate(read);
        let mut header = parse_main_header(&main_header, options.max_signals)?;

        // 读取信号头部信息
        let table_size = signal_table_size(&header)?;
        let mut signal_table = vec![0u8; table_size];
        let read = read_full(&mut source, &mut signal_table)?;
        signal_table.truncate(read);
        header.signals = parse_signal_table(&signal_table, header.num_signals)?;

        let layout = RecordLayout::new(&header.signals);
        let file_size = source.seek(SeekFrom::End(0))?;
        let data_bytes = file_size.saturating_sub(header.header_bytes as u64);
        let (record_count, trailing) =
            resolve_record_count(header.num_data_records, data_bytes, &layout, header.header_bytes)?;

        log::debug!(
            "EDF layout: record_size={}, records={}, data_bytes={}",
            layout.record_size(),
            record_count,
            data_bytes
        );

        Ok(EdfReader {
            source,
            header,
            layout,
            record_count,
            trailing,
            options,
        })
    }

    pub fn header(&self) -> &RecordingHeader {
        &self.header
    }

    pub fn signals(&self) -> &[SignalDescriptor] {
        &self.header.signals
    }

    pub fn layout(&self) -> &RecordLayout {
        &self.layout
    }

    /// Records the reader will attempt, declared or inferred from the file size.
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Lazily reads every record in file order.
    ///
    /// Calling it again restarts from record 0.
    pub fn records(&mut self) -> Records<'_, R> {
        Records::new(
            &mut self.source,
            &self.layout,
            self.header.header_bytes,
            self.header.record_duration,
            self.record_count,
        )
    }

    /// Reads one record by index, filling its time-keeping offset for EDF+.
    ///
    /// A malformed annotation block only leaves `time_offset` unset and is
    /// logged; use [`decode_annotations`](EdfReader::decode_annotations) to
    /// get the error itself.
    pub fn read_record(&mut self, index: usize) -> Result<DataRecord> {
        if index >= self.record_count {
            return Err(EdfError::InvalidRecordIndex(index));
        }
        let mut record = read_record_at(
            &mut self.source,
            &self.layout,
            self.header.header_bytes,
            self.header.record_duration,
            index,
        )?;
        if self.options.decode_annotations {
            match self.decode_annotations(&record) {
                Ok(decoded) => record.time_offset = decoded.time_keeping,
                Err(e) => log::warn!("{}", e),
            }
        }
        Ok(record)
    }

    /// Decodes the TALs of every annotation signal in `record`.
    pub fn decode_annotations(&self, record: &DataRecord) -> Result<RecordAnnotations> {
        decode_annotations(&self.header, &self.layout, &self.options, record)
    }

    /// Reads all records and assembles the dataset.
    ///
    /// Record-stage failures end up in [`Dataset::diagnostics`]; a truncated
    /// record stops the read but keeps every record before it.
    pub fn read_dataset(self) -> Result<Dataset> {
        let EdfReader {
            mut source,
            header,
            layout,
            record_count,
            trailing,
            options,
        } = self;

        let mut diagnostics = Vec::new();
        for index in header.data_signals() {
            if let Err(e) = header.signals[index].scale() {
                diagnostics.push(e);
            }
        }

        let decode = options.decode_annotations && !header.annotation_signals().is_empty();
        let mut records = Vec::new();
        let mut annotations = Vec::new();

        let iter = Records::new(&mut source, &layout, header.header_bytes, header.record_duration, record_count);
        for result in iter {
            let mut record = match result {
                Ok(record) => record,
                Err(e) => {
                    diagnostics.push(e);
                    continue;
                }
            };
            if decode {
                match decode_annotations(&header, &layout, &options, &record) {
                    Ok(decoded) => {
                        record.time_offset = decoded.time_keeping;
                        annotations.extend(decoded.annotations);
                    }
                    Err(e) => diagnostics.push(e),
                }
            }
            records.push(record);
        }

        diagnostics.extend(trailing);
        sort_by_onset(&mut annotations);

        for problem in &diagnostics {
            log::warn!("{}", problem);
        }
        log::debug!(
            "EDF dataset assembled: {} records, {} annotations, {} diagnostics",
            records.len(),
            annotations.len(),
            diagnostics.len()
        );

        Ok(Dataset {
            header,
            records,
            annotations,
            diagnostics,
        })
    }
}

fn decode_annotations(
    header: &RecordingHeader,
    layout: &RecordLayout,
    options: &ReadOptions,
    record: &DataRecord,
) -> Result<RecordAnnotations> {
    let mut merged = RecordAnnotations::default();
    let record_offset = layout.record_offset(header.header_bytes, record.index);
    for signal in header.annotation_signals() {
        let start = layout.signal_range(signal).map(|r| r.start).unwrap_or(0);
        let decoded =
            decode_record_annotations(record, signal, record_offset + start as u64, options.onset_reference)?;
        if merged.time_keeping.is_none() {
            merged.time_keeping = decoded.time_keeping;
        }
        merged.annotations.extend(decoded.annotations);
    }
    Ok(merged)
}

/// Reads a whole file with default options.
pub fn read<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    EdfReader::open(path)?.read_dataset()
}

/// Reads a whole byte source with default options.
pub fn read_from<R: Read + Seek>(source: R) -> Result<Dataset> {
    EdfReader::from_reader(source)?.read_dataset()
}
