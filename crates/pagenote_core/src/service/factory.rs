//! Section creation for pages without notes.
//!
//! # Responsibility
//! - Build the heading, page property and body of a new page note.
//! - Place it under the Scope anchor per the insertion policy.
//! - Narrow the notes view to the new Section.
//!
//! # Invariants
//! - The new Section is fully built before the outline is touched.
//! - No uniqueness check: callers look the page up first.

use crate::config::NoterConfig;
use crate::model::section::{page_value_string, Section, SectionId};
use crate::repo::outline_repo::{OutlineRepoError, OutlineRepoResult, OutlineRepository};
use crate::service::scope::Scope;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Empty lines below a fresh Section's drawer to start typing in.
const NEW_SECTION_BLANK_LINES: usize = 2;

/// Placement of a new Section among its siblings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertPolicy {
    /// Last child of the anchor.
    #[default]
    Append,
    /// Before the first sibling with a greater page number.
    PageOrder,
}

/// How the source path is spelled inside heading links.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkPathStyle {
    #[default]
    Absolute,
    /// Relative to the notes file directory when the source lives below it.
    Relative,
}

/// Heading template of new Sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadingStyle {
    /// `Notes for page <page>`.
    PlainText,
    /// `Notes for page [[<target>::<page>][<page>]]`.
    ExternalLink { target: String },
}

impl HeadingStyle {
    /// Picks the heading template for a session over `source`.
    pub fn from_config(config: &NoterConfig, source: &Path, notes_dir: Option<&Path>) -> Self {
        if !config.use_external_link {
            return Self::PlainText;
        }
        let absolute = absolute_path(source);
        let target = match (config.link_paths, notes_dir) {
            (LinkPathStyle::Relative, Some(dir)) => absolute
                .strip_prefix(absolute_path(dir))
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| absolute.clone()),
            _ => absolute.clone(),
        };
        Self::ExternalLink {
            target: target.display().to_string(),
        }
    }
}

/// Heading text for a new note on `page`.
pub fn note_heading(page: u32, style: &HeadingStyle) -> String {
    match style {
        HeadingStyle::PlainText => format!("Notes for page {page}"),
        HeadingStyle::ExternalLink { target } => {
            format!("Notes for page [[{target}::{page}][{page}]]")
        }
    }
}

/// Creates a Section for `page` inside `scope` and narrows to it.
///
/// # Errors
/// - `SectionNotFound` when the Scope anchor is no longer in the outline;
///   nothing is inserted in that case.
pub fn create_section<R: OutlineRepository + ?Sized>(
    repo: &mut R,
    scope: &Scope,
    property_key: &str,
    page: u32,
    style: &HeadingStyle,
    policy: InsertPolicy,
) -> OutlineRepoResult<SectionId> {
    let anchor = scope.anchor();
    let level = match anchor {
        None => 1,
        Some(id) => {
            repo.section(id)
                .ok_or(OutlineRepoError::SectionNotFound(id))?
                .level
                + 1
        }
    };
    let position = match policy {
        InsertPolicy::Append => None,
        InsertPolicy::PageOrder => repo
            .outline()
            .children(anchor)
            .and_then(|siblings| page_order_position(siblings, property_key, page)),
    };

    let mut section = Section::new(level, note_heading(page, style));
    section.set_property(property_key, page_value_string(page));
    section.body = repo
        .outline()
        .line_ending
        .as_str()
        .repeat(NEW_SECTION_BLANK_LINES);

    let id = repo.insert_section(anchor, position, section)?;
    repo.fold_drawer(id)?;
    repo.narrow(id)?;
    info!("event=create_section module=factory status=ok page={page} level={level}");
    Ok(id)
}

fn page_order_position(siblings: &[Section], property_key: &str, page: u32) -> Option<usize> {
    siblings
        .iter()
        .position(|sibling| matches!(sibling.page(property_key).page(), Some(other) if other > page))
}

fn absolute_path(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
