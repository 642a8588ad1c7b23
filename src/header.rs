//! Main header (first 256 bytes) and columnar signal header table.

use chrono::{NaiveDate, NaiveTime};

use crate::error::{EdfError, Result};
use crate::types::{FileType, PatientInfo, RecordingHeader, RecordingInfo, SignalDescriptor};
use crate::utils::{parse_float_field, parse_int_field, FieldCursor};
use crate::{EDF_HEADER_SIZE, EDF_SIGNAL_HEADER_SIZE};

/// Expected content of the version field.
pub const EDF_VERSION: &str = "0";

/// Field widths of the signal header table, in on-disk column order.
pub const SIGNAL_FIELDS: [(&str, usize); 10] = [
    ("label", 16),
    ("transducer", 80),
    ("physical_dimension", 8),
    ("physical_min", 8),
    ("physical_max", 8),
    ("digital_min", 8),
    ("digital_max", 8),
    ("prefilter", 80),
    ("samples_per_record", 8),
    ("reserved", 32),
];

/// Decodes the 256-byte main header.
///
/// The returned header has an empty `signals` list; fill it with
/// [`parse_signal_table`].
pub fn parse_main_header(buf: &[u8], max_signals: usize) -> Result<RecordingHeader> {
    if buf.len() < EDF_HEADER_SIZE {
        return Err(EdfError::TruncatedFile {
            offset: 0,
            expected: EDF_HEADER_SIZE,
            available: buf.len(),
        });
    }

    // 版本字段必须为 "0"（BDF 等格式在此被拒绝）
    let version_raw = &buf[0..8];
    let version = String::from_utf8_lossy(version_raw).trim().to_string();
    if version != EDF_VERSION {
        return Err(EdfError::UnsupportedVersion(version));
    }

    let mut cursor = FieldCursor::new(&buf[..EDF_HEADER_SIZE], 0);
    cursor.text(8, "version")?;
    let patient = cursor.text(80, "patient")?;
    let recording = cursor.text(80, "recording")?;

    let date_offset = cursor.offset();
    let start_date_text = cursor.text(8, "start_date")?;
    let time_offset = cursor.offset();
    let start_time_text = cursor.text(8, "start_time")?;
    let start_date = parse_start_date(&start_date_text, date_offset)?;
    let start_time = parse_start_time(&start_time_text, time_offset)?;

    let header_bytes_offset = cursor.offset();
    let header_bytes = cursor.int(8, "header_bytes")?;
    let header_bytes = usize::try_from(header_bytes).map_err(|_| {
        EdfError::malformed_field("header_bytes", header_bytes_offset, header_bytes.to_string().as_bytes())
    })?;

    let reserved = cursor.text(44, "reserved")?;

    let records_offset = cursor.offset();
    let num_data_records = cursor.int(8, "num_data_records")?;
    if num_data_records < -1 {
        return Err(EdfError::malformed_field(
            "num_data_records",
            records_offset,
            num_data_records.to_string().as_bytes(),
        ));
    }

    let duration_offset = cursor.offset();
    let record_duration = cursor.float(8, "record_duration")?;
    if record_duration < 0.0 {
        return Err(EdfError::malformed_field(
            "record_duration",
            duration_offset,
            record_duration.to_string().as_bytes(),
        ));
    }

    let signals_offset = cursor.offset();
    let num_signals = cursor.int(4, "num_signals")?;
    if num_signals < 1 || num_signals as u64 > max_signals as u64 {
        return Err(EdfError::malformed_field(
            "num_signals",
            signals_offset,
            num_signals.to_string().as_bytes(),
        ));
    }

    let file_type = FileType::from_reserved(&reserved);
    let (patient_info, recording_info) = if file_type.is_edf_plus() {
        (Some(parse_patient_info(&patient)), Some(parse_recording_info(&recording)))
    } else {
        (None, None)
    };

    let header = RecordingHeader {
        version,
        patient,
        recording,
        start_date_text,
        start_time_text,
        start_date,
        start_time,
        header_bytes,
        reserved,
        num_data_records,
        record_duration,
        num_signals: num_signals as usize,
        file_type,
        patient_info,
        recording_info,
        signals: Vec::new(),
    };

    log::debug!(
        "EDF header parsed: type={:?}, num_data_records={}, record_duration={}, num_signals={}",
        header.file_type,
        header.num_data_records,
        header.record_duration,
        header.num_signals
    );

    Ok(header)
}

/// Size of the signal table implied by the main header.
///
/// Fails with `SignalCountMismatch` when the declared header byte count is not
/// `256 + 256 * num_signals`.
pub fn signal_table_size(header: &RecordingHeader) -> Result<usize> {
    let expected = header.num_signals * EDF_SIGNAL_HEADER_SIZE;
    let declared = header.header_bytes.saturating_sub(EDF_HEADER_SIZE);
    if header.header_bytes < EDF_HEADER_SIZE || declared != expected {
        return Err(EdfError::SignalCountMismatch { expected, actual: declared });
    }
    Ok(expected)
}

/// Decodes the signal header table starting at file offset 256.
///
/// Each field type is stored as its own column of `num_signals` entries, so
/// the table is read column by column and then transposed into rows.
pub fn parse_signal_table(buf: &[u8], num_signals: usize) -> Result<Vec<SignalDescriptor>> {
    let expected = num_signals * EDF_SIGNAL_HEADER_SIZE;
    if buf.len() != expected {
        return Err(EdfError::SignalCountMismatch { expected, actual: buf.len() });
    }

    // 第一遍：按列读取
    let mut cursor = FieldCursor::new(buf, EDF_HEADER_SIZE as u64);
    let mut columns: Vec<Vec<(String, u64)>> = Vec::with_capacity(SIGNAL_FIELDS.len());
    for (field, width) in SIGNAL_FIELDS {
        let mut column = Vec::with_capacity(num_signals);
        for _ in 0..num_signals {
            let offset = cursor.offset();
            column.push((cursor.text(width, field)?, offset));
        }
        columns.push(column);
    }
    if cursor.consumed() != expected {
        return Err(EdfError::SignalCountMismatch { expected, actual: cursor.consumed() });
    }

    // 第二遍：转置为每个信号一行
    let mut signals = Vec::with_capacity(num_signals);
    for i in 0..num_signals {
        let cell = |column: usize| &columns[column][i];

        let (text, offset) = cell(3);
        let physical_min = parse_float_field(text, "physical_min", *offset)?;
        let (text, offset) = cell(4);
        let physical_max = parse_float_field(text, "physical_max", *offset)?;
        let (text, offset) = cell(5);
        let digital_min = parse_i32_cell(text, "digital_min", *offset)?;
        let (text, offset) = cell(6);
        let digital_max = parse_i32_cell(text, "digital_max", *offset)?;
        let (text, offset) = cell(8);
        let samples_per_record = usize::try_from(parse_int_field(text, "samples_per_record", *offset)?)
            .map_err(|_| EdfError::malformed_field("samples_per_record", *offset, text.as_bytes()))?;

        signals.push(SignalDescriptor {
            label: cell(0).0.clone(),
            transducer: cell(1).0.clone(),
            physical_dimension: cell(2).0.clone(),
            physical_min,
            physical_max,
            digital_min,
            digital_max,
            prefilter: cell(7).0.clone(),
            samples_per_record,
            reserved: cell(9).0.clone(),
        });
    }

    log::debug!(
        "EDF signal table parsed: {:?}",
        signals.iter().map(|s| s.label.as_str()).collect::<Vec<_>>()
    );

    Ok(signals)
}

fn parse_i32_cell(text: &str, field: &'static str, offset: u64) -> Result<i32> {
    i32::try_from(parse_int_field(text, field, offset)?)
        .map_err(|_| EdfError::malformed_field(field, offset, text.as_bytes()))
}

/// 解析日期 "dd.mm.yy"，1985 年为分界年
fn parse_start_date(text: &str, offset: u64) -> Result<NaiveDate> {
    let malformed = || EdfError::malformed_field("start_date", offset, text.as_bytes());
    let parts = split_dotted(text).ok_or_else(malformed)?;
    let year = if parts[2] >= 85 { 1900 + parts[2] } else { 2000 + parts[2] };
    NaiveDate::from_ymd_opt(year as i32, parts[1], parts[0]).ok_or_else(malformed)
}

/// 解析时间 "hh.mm.ss"
fn parse_start_time(text: &str, offset: u64) -> Result<NaiveTime> {
    let malformed = || EdfError::malformed_field("start_time", offset, text.as_bytes());
    let parts = split_dotted(text).ok_or_else(malformed)?;
    NaiveTime::from_hms_opt(parts[0], parts[1], parts[2]).ok_or_else(malformed)
}

fn split_dotted(text: &str) -> Option<[u32; 3]> {
    let mut parts = text.split('.');
    let mut out = [0u32; 3];
    for slot in out.iter_mut() {
        let part = parts.next()?;
        if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *slot = part.parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(out)
}

/// EDF+ 患者字段格式: "patientcode sex birthdate patientname additional_info"
fn parse_patient_info(field: &str) -> PatientInfo {
    let parts: Vec<&str> = field.split_whitespace().collect();
    let part = |i: usize| parts.get(i).copied().unwrap_or_default().to_string();
    PatientInfo {
        code: part(0),
        sex: part(1),
        birthdate: part(2),
        name: part(3),
        additional: parts.get(4..).map(|s| s.join(" ")).unwrap_or_default(),
    }
}

/// EDF+ 记录字段格式: "Startdate dd-MMM-yyyy admincode technician equipment additional_info"
fn parse_recording_info(field: &str) -> RecordingInfo {
    let parts: Vec<&str> = field.split_whitespace().collect();
    let part = |i: usize| parts.get(i).copied().unwrap_or_default().to_string();
    RecordingInfo {
        start_date: part(1),
        admin_code: part(2),
        technician: part(3),
        equipment: part(4),
        additional: parts.get(5..).map(|s| s.join(" ")).unwrap_or_default(),
    }
}
