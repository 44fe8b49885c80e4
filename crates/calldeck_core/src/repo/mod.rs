//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the read/write contracts the core needs from storage.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes validate requests before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod contact_repo;
pub mod interaction_repo;
