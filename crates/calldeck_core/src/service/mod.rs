//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository and suggestion calls into use-case level APIs.
//! - Classify collaborator failures into input, validation, persistence and
//!   advisory errors at each operation boundary.

pub mod calling_service;
pub mod import_service;
pub mod ledger_service;
