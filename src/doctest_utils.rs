// Internal utilities for documentation tests
// Builds EDF/EDF+ byte images in memory so doctests and tests need no fixtures on disk.

use std::collections::HashMap;
use std::path::Path;

use crate::{Result, EDF_ANNOTATION_LABEL, EDF_HEADER_SIZE, EDF_SIGNAL_HEADER_SIZE};

/// Signal header values for [`EdfBuilder`].
#[derive(Debug, Clone)]
pub struct SignalSpec {
    pub label: String,
    pub transducer: String,
    pub physical_dimension: String,
    pub physical_min: f64,
    pub physical_max: f64,
    pub digital_min: i32,
    pub digital_max: i32,
    pub prefilter: String,
    pub samples_per_record: usize,
}

impl SignalSpec {
    pub fn new(label: &str, samples_per_record: usize, digital: (i32, i32), physical: (f64, f64)) -> Self {
        SignalSpec {
            label: label.to_string(),
            transducer: "AgAgCl electrode".to_string(),
            physical_dimension: "uV".to_string(),
            physical_min: physical.0,
            physical_max: physical.1,
            digital_min: digital.0,
            digital_max: digital.1,
            prefilter: "HP:0.1Hz LP:70Hz".to_string(),
            samples_per_record,
        }
    }

    /// An `EDF Annotations` signal with room for `samples_per_record * 2` TAL bytes.
    pub fn annotations(samples_per_record: usize) -> Self {
        SignalSpec {
            label: EDF_ANNOTATION_LABEL.to_string(),
            transducer: String::new(),
            physical_dimension: String::new(),
            physical_min: -1.0,
            physical_max: 1.0,
            digital_min: -32768,
            digital_max: 32767,
            prefilter: String::new(),
            samples_per_record,
        }
    }

    fn is_annotation(&self) -> bool {
        self.label == EDF_ANNOTATION_LABEL
    }
}

/// In-memory EDF/EDF+ image builder.
#[derive(Debug, Clone)]
pub struct EdfBuilder {
    reserved: String,
    patient: String,
    recording: String,
    start_date: String,
    start_time: String,
    record_duration: String,
    records: usize,
    unknown_record_count: bool,
    signals: Vec<SignalSpec>,
    tals: HashMap<usize, Vec<u8>>,
    samples: HashMap<(usize, usize), Vec<i16>>,
}

impl Default for EdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EdfBuilder {
    pub fn new() -> Self {
        EdfBuilder {
            reserved: String::new(),
            patient: "X X X X".to_string(),
            recording: "Startdate X X X X".to_string(),
            start_date: "02.03.24".to_string(),
            start_time: "10.30.00".to_string(),
            record_duration: "1".to_string(),
            records: 1,
            unknown_record_count: false,
            signals: Vec::new(),
            tals: HashMap::new(),
            samples: HashMap::new(),
        }
    }

    pub fn edf_plus(mut self) -> Self {
        self.reserved = "EDF+C".to_string();
        self
    }

    pub fn edf_plus_discontinuous(mut self) -> Self {
        self.reserved = "EDF+D".to_string();
        self
    }

    pub fn patient(mut self, patient: &str) -> Self {
        self.patient = patient.to_string();
        self
    }

    pub fn recording(mut self, recording: &str) -> Self {
        self.recording = recording.to_string();
        self
    }

    pub fn start(mut self, date: &str, time: &str) -> Self {
        self.start_date = date.to_string();
        self.start_time = time.to_string();
        self
    }

    /// Record duration as written into the header, e.g. `"0.5"`.
    pub fn record_duration(mut self, seconds: &str) -> Self {
        self.record_duration = seconds.to_string();
        self
    }

    pub fn records(mut self, count: usize) -> Self {
        self.records = count;
        self
    }

    /// Writes `-1` as the record count.
    pub fn unknown_record_count(mut self) -> Self {
        self.unknown_record_count = true;
        self
    }

    pub fn signal(mut self, spec: SignalSpec) -> Self {
        self.signals.push(spec);
        self
    }

    /// Raw annotation block for `record`, replacing the default time-keeping TAL.
    pub fn tal(mut self, record: usize, bytes: &[u8]) -> Self {
        self.tals.insert(record, bytes.to_vec());
        self
    }

    /// Explicit digital samples for one signal in one record.
    pub fn samples(mut self, signal: usize, record: usize, values: Vec<i16>) -> Self {
        self.samples.insert((signal, record), values);
        self
    }

    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }

    /// Bytes of one record.
    pub fn record_size(&self) -> usize {
        self.signals.iter().map(|s| s.samples_per_record * 2).sum()
    }

    /// Deterministic sample written when no explicit samples were given.
    pub fn pattern_sample(&self, signal: usize, record: usize, index: usize) -> i16 {
        let spec = &self.signals[signal];
        let span = (spec.digital_max as i64 - spec.digital_min as i64 + 1).max(1);
        let step = (record as i64 * 101 + index as i64 * 37 + signal as i64 * 17) % span;
        (spec.digital_min as i64 + step).clamp(i16::MIN as i64, i16::MAX as i64) as i16
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let n = self.signals.len();
        let header_bytes = EDF_HEADER_SIZE + n * EDF_SIGNAL_HEADER_SIZE;
        let record_count = if self.unknown_record_count {
            "-1".to_string()
        } else {
            self.records.to_string()
        };

        put_field(&mut out, "0", 8);
        put_field(&mut out, &self.patient, 80);
        put_field(&mut out, &self.recording, 80);
        put_field(&mut out, &self.start_date, 8);
        put_field(&mut out, &self.start_time, 8);
        put_field(&mut out, &header_bytes.to_string(), 8);
        put_field(&mut out, &self.reserved, 44);
        put_field(&mut out, &record_count, 8);
        put_field(&mut out, &self.record_duration, 8);
        put_field(&mut out, &n.to_string(), 4);

        // 按列写入信号头部
        let columns: [(usize, fn(&SignalSpec) -> String); 10] = [
            (16, |s: &SignalSpec| s.label.clone()),
            (80, |s: &SignalSpec| s.transducer.clone()),
            (8, |s: &SignalSpec| s.physical_dimension.clone()),
            (8, |s: &SignalSpec| s.physical_min.to_string()),
            (8, |s: &SignalSpec| s.physical_max.to_string()),
            (8, |s: &SignalSpec| s.digital_min.to_string()),
            (8, |s: &SignalSpec| s.digital_max.to_string()),
            (80, |s: &SignalSpec| s.prefilter.clone()),
            (8, |s: &SignalSpec| s.samples_per_record.to_string()),
            (32, |_: &SignalSpec| String::new()),
        ];
        for (width, value) in columns {
            for spec in &self.signals {
                put_field(&mut out, &value(spec), width);
            }
        }

        let edf_plus = self.reserved.starts_with("EDF+");
        let duration: f64 = self.record_duration.trim().parse().unwrap_or(1.0);
        for record in 0..self.records {
            for (signal, spec) in self.signals.iter().enumerate() {
                let size = spec.samples_per_record * 2;
                if edf_plus && spec.is_annotation() {
                    let mut block = self
                        .tals
                        .get(&record)
                        .cloned()
                        .unwrap_or_else(|| format!("+{}\x14\x14\x00", record as f64 * duration).into_bytes());
                    block.resize(size, 0);
                    out.extend_from_slice(&block);
                } else if let Some(values) = self.samples.get(&(signal, record)) {
                    let mut block: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
                    block.resize(size, 0);
                    out.extend_from_slice(&block);
                } else {
                    for index in 0..spec.samples_per_record {
                        out.extend_from_slice(&self.pattern_sample(signal, record, index).to_le_bytes());
                    }
                }
            }
        }

        out
    }
}

fn put_field(out: &mut Vec<u8>, text: &str, width: usize) {
    let mut field: Vec<u8> = text.bytes().take(width).collect();
    field.resize(width, b' ');
    out.extend_from_slice(&field);
}

/// A one-signal EDF file with two records.
pub fn simple_recording_bytes() -> Vec<u8> {
    EdfBuilder::new()
        .patient("DOC001 M 01-JAN-1990 Test_Patient")
        .signal(SignalSpec::new("EEG Fp1", 256, (-32768, 32767), (-200.0, 200.0)))
        .records(2)
        .build()
}

/// An EDF+ file with one EEG signal, an annotation signal and two events.
pub fn annotated_recording_bytes() -> Vec<u8> {
    EdfBuilder::new()
        .edf_plus()
        .patient("DOC002 F 15-MAR-1985 Multi_Channel_Test")
        .recording("Startdate 02-MAR-2024 ADM01 Tech EEG-32")
        .signal(SignalSpec::new("EEG C3", 256, (-32768, 32767), (-200.0, 200.0)))
        .signal(SignalSpec::annotations(30))
        .records(3)
        .tal(0, b"+0\x14\x14\x00+0.5\x1510\x14Eyes closed\x14\x00")
        .tal(2, b"+2\x14\x14\x00+0.25\x14Artifact\x14\x00")
        .build()
}

/// Writes [`simple_recording_bytes`] to `path`.
pub fn create_simple_test_file<P: AsRef<Path>>(path: P) -> Result<()> {
    std::fs::write(path, simple_recording_bytes())?;
    Ok(())
}
