use chrono::{NaiveDate, NaiveTime};

use crate::error::{EdfError, Result};
use crate::EDF_ANNOTATION_LABEL;

/// Variant of the format, taken from the reserved field of the main header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Plain EDF, no annotation signals.
    Edf,
    /// EDF+ with contiguous data records (`EDF+C`).
    EdfPlusContinuous,
    /// EDF+ with possible gaps between data records (`EDF+D`).
    EdfPlusDiscontinuous,
}

impl FileType {
    pub fn from_reserved(reserved: &str) -> Self {
        if reserved.starts_with("EDF+C") {
            FileType::EdfPlusContinuous
        } else if reserved.starts_with("EDF+D") {
            FileType::EdfPlusDiscontinuous
        } else {
            FileType::Edf
        }
    }

    pub fn is_edf_plus(&self) -> bool {
        !matches!(self, FileType::Edf)
    }
}

/// EDF+ patient identification subfields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PatientInfo {
    pub code: String,
    pub sex: String,
    pub birthdate: String,
    pub name: String,
    pub additional: String,
}

/// EDF+ recording identification subfields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordingInfo {
    pub start_date: String,
    pub admin_code: String,
    pub technician: String,
    pub equipment: String,
    pub additional: String,
}

/// One signal's entry in the signal header table.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalDescriptor {
    pub label: String,
    pub transducer: String,
    pub physical_dimension: String,
    pub physical_min: f64,
    pub physical_max: f64,
    pub digital_min: i32,
    pub digital_max: i32,
    pub prefilter: String,
    pub samples_per_record: usize,
    pub reserved: String,
}

impl SignalDescriptor {
    /// Whether this signal carries EDF+ annotations rather than samples.
    ///
    /// Only meaningful for EDF+ files; in plain EDF the label is ordinary text.
    pub fn is_annotation(&self) -> bool {
        self.label == EDF_ANNOTATION_LABEL
    }

    /// Samples per second, given the record duration in seconds.
    pub fn sample_frequency(&self, record_duration: f64) -> f64 {
        self.samples_per_record as f64 / record_duration
    }

    /// Linear digital-to-physical mapping of this signal.
    ///
    /// Fails with `DegenerateScale` when either range collapses.
    pub fn scale(&self) -> Result<PhysicalScale> {
        PhysicalScale::new(self)
    }

    /// 将数字值转换为物理值
    pub fn to_physical(&self, digital_value: i32) -> Result<f64> {
        Ok(self.scale()?.to_physical(digital_value))
    }
}

/// Precomputed calibration of one signal.
///
/// ```rust
/// use edfread::SignalDescriptor;
///
/// let signal = SignalDescriptor {
///     label: "EEG Fp1".to_string(),
///     transducer: String::new(),
///     physical_dimension: "uV".to_string(),
///     physical_min: -200.0,
///     physical_max: 200.0,
///     digital_min: -2048,
///     digital_max: 2047,
///     prefilter: String::new(),
///     samples_per_record: 4,
///     reserved: String::new(),
/// };
///
/// let scale = signal.scale()?;
/// assert_eq!(scale.to_physical(-2048), -200.0);
/// assert_eq!(scale.to_physical(2047), 200.0);
/// # Ok::<(), edfread::EdfError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalScale {
    physical_min: f64,
    physical_max: f64,
    digital_min: i32,
    digital_span: f64,
}

impl PhysicalScale {
    pub fn new(signal: &SignalDescriptor) -> Result<Self> {
        if signal.digital_max <= signal.digital_min || signal.physical_max <= signal.physical_min {
            return Err(EdfError::DegenerateScale {
                label: signal.label.clone(),
                digital_min: signal.digital_min,
                digital_max: signal.digital_max,
                physical_min: signal.physical_min,
                physical_max: signal.physical_max,
            });
        }
        Ok(PhysicalScale {
            physical_min: signal.physical_min,
            physical_max: signal.physical_max,
            digital_min: signal.digital_min,
            digital_span: (signal.digital_max as i64 - signal.digital_min as i64) as f64,
        })
    }

    /// Units per digital step.
    pub fn gain(&self) -> f64 {
        (self.physical_max - self.physical_min) / self.digital_span
    }

    /// `physicalMin + (d - digitalMin) * (physicalMax - physicalMin) / (digitalMax - digitalMin)`,
    /// evaluated as an interpolation so that both range ends map exactly.
    pub fn to_physical(&self, digital_value: i32) -> f64 {
        let t = (digital_value as i64 - self.digital_min as i64) as f64 / self.digital_span;
        self.physical_min * (1.0 - t) + self.physical_max * t
    }
}

/// Decoded main header plus the signal table.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingHeader {
    pub version: String,
    pub patient: String,
    pub recording: String,
    /// Raw `dd.mm.yy` text.
    pub start_date_text: String,
    /// Raw `hh.mm.ss` text.
    pub start_time_text: String,
    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
    pub header_bytes: usize,
    pub reserved: String,
    /// `-1` when the writer did not know the length.
    pub num_data_records: i64,
    /// Seconds.
    pub record_duration: f64,
    pub num_signals: usize,
    pub file_type: FileType,
    pub patient_info: Option<PatientInfo>,
    pub recording_info: Option<RecordingInfo>,
    pub signals: Vec<SignalDescriptor>,
}

impl RecordingHeader {
    /// Indices of the signals that carry TALs (EDF+ only).
    pub fn annotation_signals(&self) -> Vec<usize> {
        if !self.file_type.is_edf_plus() {
            return Vec::new();
        }
        self.signals
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_annotation())
            .map(|(i, _)| i)
            .collect()
    }

    /// Indices of the signals that carry samples.
    pub fn data_signals(&self) -> Vec<usize> {
        let annotations = self.annotation_signals();
        (0..self.signals.len()).filter(|i| !annotations.contains(i)).collect()
    }

    /// Total duration for `num_records` records.
    pub fn recording_duration(&self, num_records: usize) -> RecordingDuration {
        RecordingDuration::from_seconds(self.record_duration * num_records as f64)
    }
}

/// One fixed-duration slice of every signal.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRecord {
    pub index: usize,
    /// Nominal start, `index * record_duration` seconds.
    pub nominal_start: f64,
    /// Start relative to the recording from the time-keeping TAL, if any.
    pub time_offset: Option<f64>,
    /// Digital samples per signal, in descriptor order.
    pub samples: Vec<Vec<i16>>,
}

impl DataRecord {
    /// Raw little-endian bytes of one signal's block.
    pub fn signal_bytes(&self, signal: usize) -> Option<Vec<u8>> {
        self.samples
            .get(signal)
            .map(|samples| samples.iter().flat_map(|s| s.to_le_bytes()).collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Seconds from the recording start.
    pub onset: f64,
    /// Seconds, if the TAL carried one.
    pub duration: Option<f64>,
    pub texts: Vec<String>,
    /// Record the TAL was found in.
    pub record: usize,
}

impl Annotation {
    /// All texts joined by `"; "`.
    pub fn description(&self) -> String {
        self.texts.join("; ")
    }
}

/// Hours / minutes / seconds split of a duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordingDuration {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: f64,
}

impl RecordingDuration {
    pub fn from_seconds(total: f64) -> Self {
        let total = total.max(0.0);
        let whole_minutes = (total / 60.0).floor();
        let seconds = total - whole_minutes * 60.0;
        let whole_minutes = whole_minutes as u64;
        RecordingDuration {
            hours: whole_minutes / 60,
            minutes: whole_minutes % 60,
            seconds,
        }
    }

    pub fn as_seconds(&self) -> f64 {
        (self.hours * 3600 + self.minutes * 60) as f64 + self.seconds
    }
}

/// Everything decoded from one file.
#[derive(Debug)]
pub struct Dataset {
    pub header: RecordingHeader,
    pub records: Vec<DataRecord>,
    /// Sorted by onset.
    pub annotations: Vec<Annotation>,
    /// Record-stage failures that did not abort the read.
    pub diagnostics: Vec<EdfError>,
}

impl Dataset {
    pub fn signals(&self) -> &[SignalDescriptor] {
        &self.header.signals
    }

    pub fn duration(&self) -> RecordingDuration {
        self.header.recording_duration(self.records.len())
    }

    /// Digital samples of one signal concatenated across records.
    pub fn digital_samples(&self, signal: usize) -> Result<Vec<i16>> {
        let descriptor = self
            .header
            .signals
            .get(signal)
            .ok_or(EdfError::InvalidSignalIndex(signal))?;
        let mut out = Vec::with_capacity(descriptor.samples_per_record * self.records.len());
        for record in &self.records {
            out.extend_from_slice(&record.samples[signal]);
        }
        Ok(out)
    }

    /// Physical samples of one signal, converted on demand.
    pub fn physical_samples(&self, signal: usize) -> Result<Vec<f64>> {
        let scale = self
            .header
            .signals
            .get(signal)
            .ok_or(EdfError::InvalidSignalIndex(signal))?
            .scale()?;
        Ok(self
            .digital_samples(signal)?
            .into_iter()
            .map(|d| scale.to_physical(d as i32))
            .collect())
    }

    /// Annotations whose onset falls in `[start, end)` seconds.
    pub fn annotations_between(&self, start: f64, end: f64) -> impl Iterator<Item = &Annotation> {
        self.annotations
            .iter()
            .filter(move |a| a.onset >= start && a.onset < end)
    }
}
