//! Outline notes model.
//!
//! # Responsibility
//! - Define the Section tree shared by every synchronization component.
//! - Own parsing and rendering of the structured-text notes document.
//!
//! # Invariants
//! - Sections are addressed by `SectionId`, never by position.
//! - Page properties are read through `Section::page`, never parsed ad hoc.

pub mod outline;
pub mod section;
