//! Peaksimple control file (`*.CON`) parsing, editing, and validation.
//!
//! Control files are line-oriented `<KEY>=value` text the instrument software
//! loads before a run, e.g. `<CHANNEL 1 TIME>=300000` (times are in
//! milliseconds). This crate reads them into an order-preserving document,
//! exposes typed accessors for the per-channel settings automated runs
//! rewrite, and serializes untouched lines back byte for byte.

pub mod document;
pub mod error;
pub mod keys;
pub mod plan;

pub use document::{ControlFile, PostrunFlag, CHANNEL_COUNT};
pub use error::{CtlFileError, Result};
pub use plan::{AcquisitionPlan, Detector};
