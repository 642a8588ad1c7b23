use edfread::doctest_utils::{EdfBuilder, SignalSpec};
use edfread::{EdfError, EdfReader, FileType};
use std::io::{Cursor, Write};

// 创建测试信号的辅助函数
fn eeg_signal() -> SignalSpec {
    SignalSpec::new("EEG Fp1", 4, (-2048, 2047), (-200.0, 200.0))
}

fn ecg_signal() -> SignalSpec {
    let mut signal = SignalSpec::new("ECG Lead II", 2, (-32768, 32767), (-5.0, 5.0));
    signal.physical_dimension = "mV".to_string();
    signal
}

fn mixed_rate_builder(records: usize) -> EdfBuilder {
    EdfBuilder::new()
        .signal(eeg_signal())
        .signal(ecg_signal())
        .signal(SignalSpec::new("Resp", 1, (0, 1000), (0.0, 10.0)))
        .records(records)
}

#[test]
fn test_header_byte_count_matches_signal_count() {
    for signals in 1..=5 {
        let mut builder = EdfBuilder::new().records(2);
        for i in 0..signals {
            builder = builder.signal(SignalSpec::new(&format!("CH{}", i), 3, (-100, 100), (-1.0, 1.0)));
        }
        let reader = EdfReader::from_reader(Cursor::new(builder.build())).unwrap();
        let header = reader.header();
        assert_eq!(header.header_bytes, 256 + 256 * header.num_signals);
        assert_eq!(header.signals.len(), signals);
    }
}

#[test]
fn test_basic_read() {
    let builder = mixed_rate_builder(5);
    let dataset = edfread::read_from(Cursor::new(builder.build())).unwrap();

    assert_eq!(dataset.header.file_type, FileType::Edf);
    assert_eq!(dataset.signals().len(), 3);
    assert_eq!(dataset.signals()[1].label, "ECG Lead II");
    assert_eq!(dataset.signals()[1].physical_dimension, "mV");
    assert_eq!(dataset.records.len(), 5);
    assert!(dataset.diagnostics.is_empty());
    assert!(dataset.annotations.is_empty());

    // 每个记录中每个信号的样本数
    for record in &dataset.records {
        assert_eq!(record.samples[0].len(), 4);
        assert_eq!(record.samples[1].len(), 2);
        assert_eq!(record.samples[2].len(), 1);
    }

    let eeg = dataset.digital_samples(0).unwrap();
    assert_eq!(eeg.len(), 20);
    for record in 0..5 {
        for i in 0..4 {
            assert_eq!(eeg[record * 4 + i], builder.pattern_sample(0, record, i));
        }
    }
    assert_eq!(dataset.digital_samples(2).unwrap().len(), 5);
    assert!(matches!(dataset.digital_samples(3), Err(EdfError::InvalidSignalIndex(3))));
}

#[test]
fn test_physical_conversion() {
    let bytes = EdfBuilder::new()
        .signal(eeg_signal())
        .samples(0, 0, vec![-2048, 2047, 0, 1000])
        .build();
    let dataset = edfread::read_from(Cursor::new(bytes)).unwrap();
    let physical = dataset.physical_samples(0).unwrap();

    assert_eq!(physical[0], -200.0);
    assert_eq!(physical[1], 200.0);
    for (i, d) in [0i32, 1000].iter().enumerate() {
        let expected = -200.0 + (*d as f64 + 2048.0) * 400.0 / 4095.0;
        assert!((physical[i + 2] - expected).abs() < 1e-9);
    }
}

#[test]
fn test_boundaries_convert_exactly_for_every_signal() {
    let dataset = edfread::read_from(Cursor::new(mixed_rate_builder(1).build())).unwrap();
    for signal in dataset.signals() {
        let scale = signal.scale().unwrap();
        assert_eq!(scale.to_physical(signal.digital_min), signal.physical_min);
        assert_eq!(scale.to_physical(signal.digital_max), signal.physical_max);
    }
}

#[test]
fn test_reading_twice_is_identical() {
    let bytes = EdfBuilder::new()
        .edf_plus()
        .signal(eeg_signal())
        .signal(SignalSpec::annotations(16))
        .records(6)
        .tal(4, b"+4\x14\x14\x00+0.1\x14Twice\x14\x00")
        .build();

    let first = edfread::read_from(Cursor::new(bytes.clone())).unwrap();
    let second = edfread::read_from(Cursor::new(bytes)).unwrap();

    assert_eq!(first.header, second.header);
    assert_eq!(first.records, second.records);
    assert_eq!(first.annotations, second.annotations);
    assert_eq!(first.diagnostics.len(), second.diagnostics.len());
    for (a, b) in first.physical_samples(0).unwrap().iter().zip(second.physical_samples(0).unwrap()) {
        assert_eq!(a.to_bits(), b.to_bits());
    }
}

#[test]
fn test_unknown_record_count_is_inferred() {
    let builder = mixed_rate_builder(7).unknown_record_count();
    let bytes = builder.build();
    let record_size = builder.record_size();
    let header_bytes = 256 + 256 * 3;
    assert_eq!(record_size, 14);

    let reader = EdfReader::from_reader(Cursor::new(bytes.clone())).unwrap();
    assert_eq!(reader.header().num_data_records, -1);
    assert_eq!(reader.record_count(), (bytes.len() - header_bytes) / record_size);

    let dataset = reader.read_dataset().unwrap();
    assert_eq!(dataset.records.len(), 7);
    assert!(dataset.diagnostics.is_empty());
}

#[test]
fn test_unknown_record_count_with_trailing_bytes() {
    let mut bytes = mixed_rate_builder(3).unknown_record_count().build();
    let trailing_at = bytes.len() as u64;
    bytes.extend_from_slice(&[1, 2, 3]);

    let dataset = edfread::read_from(Cursor::new(bytes)).unwrap();
    assert_eq!(dataset.records.len(), 3);
    assert_eq!(dataset.diagnostics.len(), 1);
    match &dataset.diagnostics[0] {
        EdfError::TruncatedFile { offset, expected, available } => {
            assert_eq!(*offset, trailing_at);
            assert_eq!(*expected, 14);
            assert_eq!(*available, 3);
        }
        other => panic!("unexpected diagnostic: {:?}", other),
    }
}

#[test]
fn test_truncated_file_keeps_complete_records() {
    let mut bytes = mixed_rate_builder(4).build();
    // 删除最后一个记录的一部分
    bytes.truncate(bytes.len() - 5);

    let dataset = edfread::read_from(Cursor::new(bytes)).unwrap();
    assert_eq!(dataset.records.len(), 3);
    assert_eq!(dataset.diagnostics.len(), 1);
    assert!(matches!(
        dataset.diagnostics[0],
        EdfError::TruncatedFile { expected: 14, available: 9, .. }
    ));
}

#[test]
fn test_header_stage_errors_abort() {
    let bytes = mixed_rate_builder(1).build();

    assert!(matches!(
        EdfReader::from_reader(Cursor::new(bytes[..200].to_vec())),
        Err(EdfError::TruncatedFile { .. })
    ));
    assert!(matches!(
        EdfReader::from_reader(Cursor::new(bytes[..600].to_vec())),
        Err(EdfError::SignalCountMismatch { expected: 768, actual: 344 })
    ));

    let mut wrong_version = bytes.clone();
    wrong_version[0] = b'1';
    assert!(matches!(
        edfread::read_from(Cursor::new(wrong_version)),
        Err(EdfError::UnsupportedVersion(v)) if v == "1"
    ));

    let mut wrong_size = bytes.clone();
    wrong_size[184..192].copy_from_slice(b"512     ");
    assert!(matches!(
        edfread::read_from(Cursor::new(wrong_size)),
        Err(EdfError::SignalCountMismatch { .. })
    ));

    let mut bad_samples = bytes;
    // samples_per_record 列的第一个单元
    let offset = 256 + 3 * 216;
    bad_samples[offset..offset + 8].copy_from_slice(b"four    ");
    match edfread::read_from(Cursor::new(bad_samples)) {
        Err(EdfError::MalformedHeaderField { field, offset: at, value }) => {
            assert_eq!(field, "samples_per_record");
            assert_eq!(at, offset as u64);
            assert_eq!(value, "four");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_open_from_path() {
    let bytes = mixed_rate_builder(2).build();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&bytes).unwrap();
    file.flush().unwrap();

    let dataset = edfread::read(file.path()).unwrap();
    assert_eq!(dataset.records.len(), 2);

    let mut reader = EdfReader::open(file.path()).unwrap();
    assert_eq!(reader.read_record(1).unwrap(), dataset.records[1]);
}

#[test]
fn test_missing_file() {
    assert!(matches!(
        EdfReader::open("does_not_exist_6f1c.edf"),
        Err(EdfError::FileNotFound(_))
    ));
}

#[test]
fn test_duration_and_frequency() {
    let builder = mixed_rate_builder(150).record_duration("0.5");
    let dataset = edfread::read_from(Cursor::new(builder.build())).unwrap();

    assert_eq!(dataset.header.record_duration, 0.5);
    let duration = dataset.duration();
    assert_eq!(duration.hours, 0);
    assert_eq!(duration.minutes, 1);
    assert!((duration.seconds - 15.0).abs() < 1e-9);
    assert_eq!(dataset.signals()[0].sample_frequency(dataset.header.record_duration), 8.0);
    assert_eq!(dataset.records[3].nominal_start, 1.5);
}
