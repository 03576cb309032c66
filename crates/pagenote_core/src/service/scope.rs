//! Scope resolution for page lookups, creation and sorting.
//!
//! # Responsibility
//! - Map the session mode onto the outline range every search is confined to.
//! - Derive the page property key used inside that range.
//!
//! # Invariants
//! - Scope is recomputed per operation and never cached across documents.
//! - Multi-document lookups never leave their Root-Section's subtree.

use crate::config::NoterConfig;
use crate::model::section::SectionId;
use crate::repo::outline_repo::OutlineRepository;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Note-taking configuration, fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// The whole notes file annotates one source document.
    SingleDocument,
    /// The notes file holds one Root-Section per source document, identified
    /// by `document_key`.
    MultiDocument { document_key: String },
}

impl Mode {
    /// Property key recording the annotated page in this mode.
    pub fn page_property_key(&self, config: &NoterConfig) -> String {
        match self {
            Self::SingleDocument => config.page_property.clone(),
            Self::MultiDocument { document_key } => {
                format!("{document_key}{}", config.page_property_suffix)
            }
        }
    }

    pub fn document_key(&self) -> Option<&str> {
        match self {
            Self::SingleDocument => None,
            Self::MultiDocument { document_key } => Some(document_key.as_str()),
        }
    }

    /// Resolves the search boundary for this mode.
    ///
    /// # Errors
    /// - `ScopeNotFound` when no Root-Section carries the document key.
    pub fn resolve_scope<R: OutlineRepository + ?Sized>(
        &self,
        repo: &R,
        config: &NoterConfig,
    ) -> Result<Scope, ScopeError> {
        match self {
            Self::SingleDocument => Ok(Scope::Document),
            Self::MultiDocument { document_key } => repo
                .find_by_property(None, &config.document_id_property, document_key)
                .map(Scope::Subtree)
                .ok_or_else(|| ScopeError::ScopeNotFound {
                    document_key: document_key.clone(),
                }),
        }
    }
}

/// Contiguous outline range a search or sort is confined to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The entire notes document.
    Document,
    /// One Root-Section and all of its descendants.
    Subtree(SectionId),
}

impl Scope {
    /// Section the scope hangs from; `None` for the whole document.
    pub fn anchor(&self) -> Option<SectionId> {
        match self {
            Self::Document => None,
            Self::Subtree(id) => Some(*id),
        }
    }
}

/// Scope resolution failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    /// No Root-Section matches the active document key.
    ScopeNotFound { document_key: String },
}

impl Display for ScopeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ScopeNotFound { document_key } => write!(
                f,
                "no notes heading is linked to document `{document_key}`"
            ),
        }
    }
}

impl Error for ScopeError {}

#[cfg(test)]
mod tests {
    use super::{Mode, Scope, ScopeError};
    use crate::config::NoterConfig;
    use crate::repo::outline_repo::{OrgOutlineRepository, OutlineRepository};

    const MULTI: &str = "* Paper A\n:PROPERTIES:\n:CUSTOM_ID: smith2020\n:END:\n* Paper B\n:PROPERTIES:\n:CUSTOM_ID: jones2021\n:END:\n";

    #[test]
    fn single_document_scope_is_whole_file() {
        let repo = OrgOutlineRepository::from_text(MULTI);
        let scope = Mode::SingleDocument
            .resolve_scope(&repo, &NoterConfig::default())
            .unwrap();
        assert_eq!(scope, Scope::Document);
        assert_eq!(scope.anchor(), None);
    }

    #[test]
    fn multi_document_scope_is_matching_root_section() {
        let repo = OrgOutlineRepository::from_text(MULTI);
        let mode = Mode::MultiDocument {
            document_key: "jones2021".to_string(),
        };
        let scope = mode.resolve_scope(&repo, &NoterConfig::default()).unwrap();
        assert_eq!(scope, Scope::Subtree(repo.outline().sections[1].id));
    }

    #[test]
    fn multi_document_scope_reports_unknown_key() {
        let repo = OrgOutlineRepository::from_text(MULTI);
        let mode = Mode::MultiDocument {
            document_key: "missing".to_string(),
        };
        let err = mode
            .resolve_scope(&repo, &NoterConfig::default())
            .unwrap_err();
        assert_eq!(
            err,
            ScopeError::ScopeNotFound {
                document_key: "missing".to_string()
            }
        );
    }

    #[test]
    fn page_property_key_depends_on_mode() {
        let config = NoterConfig::default();
        assert_eq!(Mode::SingleDocument.page_property_key(&config), "NOTER_PAGE");
        let mode = Mode::MultiDocument {
            document_key: "smith2020".to_string(),
        };
        assert_eq!(mode.page_property_key(&config), "smith2020-page");
        assert_eq!(mode.document_key(), Some("smith2020"));
    }
}
