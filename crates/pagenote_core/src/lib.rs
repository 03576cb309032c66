//! Core synchronization engine for page notes.
//! Pairs a paged source document with a structured outline of notes and
//! keeps the two in step.

pub mod config;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod viewer;

pub use config::{ConfigError, ConfigResult, LoggingConfig, NoterConfig};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status, LogTarget};
pub use model::outline::{LineEnding, Outline};
pub use model::section::{DrawerLine, PageValue, Property, Section, SectionId};
pub use repo::outline_repo::{
    OrgOutlineRepository, OutlineRepoError, OutlineRepoResult, OutlineRepository,
};
pub use service::factory::{create_section, note_heading, HeadingStyle, InsertPolicy, LinkPathStyle};
pub use service::locator::{find_section_by_page, locate_section};
pub use service::navigator::{
    Direction, Focus, NavResult, NavState, Navigator, NavigatorError, SharedNavigator, UserMessage,
};
pub use service::scope::{Mode, Scope, ScopeError};
pub use service::session::{Session, SessionError, SessionResult};
pub use service::sort::{sort_notes, SortOrder};
pub use viewer::{DocumentViewer, SourceDocument};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
