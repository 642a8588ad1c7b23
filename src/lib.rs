//! # EDF/EDF+ Decoder for Rust
//!
//! A pure Rust library for reading European Data Format (EDF) and EDF+
//! recordings: the fixed-width ASCII headers, the multiplexed 16-bit data
//! records, and the EDF+ Time-stamped Annotation Lists.
//!
//! ## Quick Start
//!
//! ### Reading a file
//!
//! ```rust
//! use edfread::{EdfReader, Result};
//! # use std::fs;
//!
//! fn main() -> Result<()> {
//!     # edfread::doctest_utils::create_simple_test_file("test_data.edf")?;
//!     let dataset = edfread::read("test_data.edf")?;
//!
//!     println!("Number of signals: {}", dataset.signals().len());
//!     println!("Records: {}", dataset.records.len());
//!
//!     let duration = dataset.duration();
//!     println!("Duration: {}h {}m {:.1}s", duration.hours, duration.minutes, duration.seconds);
//!
//!     // Physical values are converted on demand
//!     let samples = dataset.physical_samples(0)?;
//!     println!("Read {} samples", samples.len());
//!
//!     // The lower-level reader gives lazy or random access to records
//!     let mut reader = EdfReader::open("test_data.edf")?;
//!     let last = reader.read_record(reader.record_count() - 1)?;
//!     println!("Last record starts at {:.1}s", last.nominal_start);
//!
//!     # fs::remove_file("test_data.edf").ok();
//!     Ok(())
//! }
//! ```
//!
//! ### EDF+ annotations
//!
//! Signals labelled `EDF Annotations` in an EDF+ file are decoded into
//! [`Annotation`] values, sorted by onset. A malformed TAL only drops that
//! record's annotations and is reported in [`Dataset::diagnostics`]:
//!
//! ```rust
//! use std::io::Cursor;
//!
//! # let bytes = edfread::doctest_utils::annotated_recording_bytes();
//! let dataset = edfread::read_from(Cursor::new(bytes))?;
//! for annotation in &dataset.annotations {
//!     println!("{:>8.3}s {:?} {}", annotation.onset, annotation.duration, annotation.description());
//! }
//! assert!(dataset.diagnostics.is_empty());
//! # Ok::<(), edfread::EdfError>(())
//! ```
//!
//! ## Physical vs Digital Values
//!
//! Samples are stored as 16-bit integers. Each signal maps them linearly
//! from `[digital_min, digital_max]` onto `[physical_min, physical_max]`;
//! a collapsed range is reported as `EdfError::DegenerateScale` instead of
//! dividing by zero.

pub mod annotation;
pub mod error;
pub mod header;
pub mod reader;
pub mod record;
pub mod types;
pub mod utils;

#[doc(hidden)]
pub mod doctest_utils; // For internal doctest support

// Re-export main types for convenience
pub use annotation::OnsetReference;
pub use error::{EdfError, Result};
pub use reader::{read, read_from, EdfReader, ReadOptions};
pub use record::{RecordLayout, Records};
pub use types::{
    Annotation, DataRecord, Dataset, FileType, PatientInfo, PhysicalScale, RecordingDuration, RecordingHeader,
    RecordingInfo, SignalDescriptor,
};

// Important constants
pub const EDF_TIME_DIMENSION: i64 = 10_000_000; // 100 nanoseconds unit
pub const EDF_MAX_SIGNALS: usize = 4096;
pub const EDF_HEADER_SIZE: usize = 256;
pub const EDF_SIGNAL_HEADER_SIZE: usize = 256;
/// Bytes per stored sample.
pub const EDF_SAMPLE_SIZE: usize = 2;
pub const EDF_ANNOTATION_LABEL: &str = "EDF Annotations";

/// Library version
///
/// ```rust
/// let version = edfread::version();
/// assert!(version.contains('.'));
/// ```
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
