//! Outline store abstraction and persistence.
//!
//! # Responsibility
//! - Define the capability contract the synchronization engine relies on.
//! - Isolate structured-text file I/O from navigation logic.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`SectionNotFound`) in addition
//!   to I/O errors.

pub mod outline_repo;
