//! Spreadsheet import pipeline: raw tabular rows to normalized contact rows.
//!
//! # Responsibility
//! - Read delimited files with a header row.
//! - Resolve heterogeneous column labels onto canonical contact fields.
//!
//! # Invariants
//! - A malformed file aborts the whole read; no partial rows escape.
//! - Rows without a name or phone never become `ImportRow`s.

pub mod normalizer;
