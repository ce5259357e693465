//! Index-decoding core: matches a sequencing read's sample barcode against
//! a table of expected indexes, rewrites its read group so downstream
//! tools can split the run by sample, detects index (tag) hopping on
//! dual-indexed runs, and reports per-barcode match statistics.
//!
//! `main` is a thin CLI shell around [`driver::run`]; everything else
//! lives in its own module, one per component of the decode pipeline.

pub mod barcode_table;
pub mod config;
pub mod driver;
pub mod error;
pub mod header;
pub mod hop;
pub mod masker;
pub mod match_engine;
pub mod metrics;
pub mod record_io;
pub mod report;
pub mod seq;
