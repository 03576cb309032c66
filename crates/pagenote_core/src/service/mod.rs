//! Synchronization use-case services.
//!
//! # Responsibility
//! - Turn viewer page changes and note commands into outline lookups,
//!   Section creation, sorting and view switches.
//! - Keep hosts (CLI, editors) decoupled from outline storage details.

pub mod factory;
pub mod locator;
pub mod navigator;
pub mod scope;
pub mod session;
pub mod sort;
