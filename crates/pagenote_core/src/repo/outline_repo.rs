//! Outline store contracts and Org-file implementation.
//!
//! # Responsibility
//! - Expose the search, mutation and view primitives the synchronization
//!   engine is written against.
//! - Keep file I/O and narrowing state inside the repository boundary.
//!
//! # Invariants
//! - Searches are exact property matches over the parsed tree, in pre-order.
//! - Every mutating call validates its target before changing anything.
//! - `save` writes only when the outline changed since the last load/save.

use crate::model::outline::Outline;
use crate::model::section::{Section, SectionId};
use log::{error, info};
use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Result type used by outline repository operations.
pub type OutlineRepoResult<T> = Result<T, OutlineRepoError>;

/// Errors from outline repository operations.
#[derive(Debug)]
pub enum OutlineRepoError {
    /// Reading or writing the notes file failed.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Target Section is not part of the loaded outline.
    SectionNotFound(SectionId),
}

impl Display for OutlineRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "notes file `{}`: {source}", path.display())
            }
            Self::SectionNotFound(id) => write!(f, "section not found: {id}"),
        }
    }
}

impl Error for OutlineRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::SectionNotFound(_) => None,
        }
    }
}

/// Outline store used by scope resolution, lookup, creation and sorting.
pub trait OutlineRepository {
    /// Read access to the loaded outline.
    fn outline(&self) -> &Outline;

    /// File the outline is persisted to, if any.
    fn location(&self) -> Option<&Path> {
        None
    }

    /// Loads one Section by id.
    fn section(&self, id: SectionId) -> Option<&Section> {
        self.outline().find(id)
    }

    /// Forward scan from the start of `anchor`'s subtree (or of the whole
    /// document) for the first Section whose `key` equals `value`.
    fn find_by_property(
        &self,
        anchor: Option<SectionId>,
        key: &str,
        value: &str,
    ) -> Option<SectionId> {
        self.outline()
            .preorder(anchor)
            .into_iter()
            .find(|section| section.property(key) == Some(value))
            .map(|section| section.id)
    }

    /// Reads one property value.
    fn property(&self, id: SectionId, key: &str) -> OutlineRepoResult<Option<String>> {
        self.section(id)
            .map(|section| section.property(key).map(str::to_string))
            .ok_or(OutlineRepoError::SectionNotFound(id))
    }

    /// Sets one property value.
    fn set_property(&mut self, id: SectionId, key: &str, value: &str) -> OutlineRepoResult<()>;

    /// Inserts `section` under `parent` (top level for `None`) at sibling
    /// `position`, or last when `position` is `None` or out of range.
    fn insert_section(
        &mut self,
        parent: Option<SectionId>,
        position: Option<usize>,
        section: Section,
    ) -> OutlineRepoResult<SectionId>;

    /// Restricts the notes view to one Section's subtree.
    fn narrow(&mut self, id: SectionId) -> OutlineRepoResult<()>;

    /// Removes any narrowing.
    fn widen(&mut self);

    /// Currently narrowed Section, if any.
    fn narrowed(&self) -> Option<SectionId>;

    /// Expands one Section and its whole subtree.
    fn reveal(&mut self, id: SectionId) -> OutlineRepoResult<()>;

    /// Hides the property drawer of one Section.
    fn fold_drawer(&mut self, id: SectionId) -> OutlineRepoResult<()>;

    /// Ends the Section body with a newline so the cursor sits on a fresh line.
    ///
    /// Returns whether the body changed.
    fn ensure_trailing_blank_line(&mut self, id: SectionId) -> OutlineRepoResult<bool>;

    /// Stable-sorts the direct children of `parent` with `compare`.
    fn sort_children(
        &mut self,
        parent: Option<SectionId>,
        compare: &mut dyn FnMut(&Section, &Section) -> Ordering,
    ) -> OutlineRepoResult<()>;

    /// Persists pending changes.
    fn save(&mut self) -> OutlineRepoResult<()>;
}

/// Outline repository over an Org-style text document.
#[derive(Debug, Default)]
pub struct OrgOutlineRepository {
    outline: Outline,
    path: Option<PathBuf>,
    narrowed: Option<SectionId>,
    dirty: bool,
}

impl OrgOutlineRepository {
    /// Opens a notes file. A missing file is treated as a new empty document
    /// that will be created on the first `save`.
    ///
    /// # Side effects
    /// - Emits `notes_open` logging events.
    pub fn open(path: impl AsRef<Path>) -> OutlineRepoResult<Self> {
        let path = path.as_ref().to_path_buf();
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(source) => {
                error!(
                    "event=notes_open module=repo status=error error_code=read_failed error={}",
                    source
                );
                return Err(OutlineRepoError::Io { path, source });
            }
        };

        let outline = Outline::parse(&text);
        info!(
            "event=notes_open module=repo status=ok sections={} new_file={}",
            outline.preorder(None).len(),
            text.is_empty()
        );
        Ok(Self {
            outline,
            path: Some(path),
            narrowed: None,
            dirty: false,
        })
    }

    /// Creates an unbound repository from text. `save` is a no-op.
    pub fn from_text(text: &str) -> Self {
        Self {
            outline: Outline::parse(text),
            ..Self::default()
        }
    }

    /// Whether there are unsaved changes.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Current document text.
    pub fn render(&self) -> String {
        self.outline.render()
    }

    fn section_mut(&mut self, id: SectionId) -> OutlineRepoResult<&mut Section> {
        self.outline
            .find_mut(id)
            .ok_or(OutlineRepoError::SectionNotFound(id))
    }
}

impl OutlineRepository for OrgOutlineRepository {
    fn outline(&self) -> &Outline {
        &self.outline
    }

    fn location(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn set_property(&mut self, id: SectionId, key: &str, value: &str) -> OutlineRepoResult<()> {
        self.section_mut(id)?.set_property(key, value);
        self.dirty = true;
        Ok(())
    }

    fn insert_section(
        &mut self,
        parent: Option<SectionId>,
        position: Option<usize>,
        section: Section,
    ) -> OutlineRepoResult<SectionId> {
        let siblings = self
            .outline
            .children_mut(parent)
            .ok_or_else(|| OutlineRepoError::SectionNotFound(parent.unwrap_or_default()))?;

        let id = section.id;
        let index = position.unwrap_or(siblings.len()).min(siblings.len());
        siblings.insert(index, section);
        self.dirty = true;
        Ok(id)
    }

    fn narrow(&mut self, id: SectionId) -> OutlineRepoResult<()> {
        if !self.outline.contains(id) {
            return Err(OutlineRepoError::SectionNotFound(id));
        }
        self.narrowed = Some(id);
        Ok(())
    }

    fn widen(&mut self) {
        self.narrowed = None;
    }

    fn narrowed(&self) -> Option<SectionId> {
        self.narrowed
    }

    fn reveal(&mut self, id: SectionId) -> OutlineRepoResult<()> {
        unfold_subtree(self.section_mut(id)?);
        Ok(())
    }

    fn fold_drawer(&mut self, id: SectionId) -> OutlineRepoResult<()> {
        self.section_mut(id)?.drawer_folded = true;
        Ok(())
    }

    fn ensure_trailing_blank_line(&mut self, id: SectionId) -> OutlineRepoResult<bool> {
        let eol = self.outline.line_ending.as_str();
        let section = self.section_mut(id)?;
        if section.body.is_empty() || section.body.ends_with('\n') {
            return Ok(false);
        }
        section.body.push_str(eol);
        self.dirty = true;
        Ok(true)
    }

    fn sort_children(
        &mut self,
        parent: Option<SectionId>,
        compare: &mut dyn FnMut(&Section, &Section) -> Ordering,
    ) -> OutlineRepoResult<()> {
        let siblings = self
            .outline
            .children_mut(parent)
            .ok_or_else(|| OutlineRepoError::SectionNotFound(parent.unwrap_or_default()))?;

        let before: Vec<SectionId> = siblings.iter().map(|section| section.id).collect();
        siblings.sort_by(|left, right| compare(left, right));
        if siblings
            .iter()
            .map(|section| section.id)
            .ne(before.into_iter())
        {
            self.dirty = true;
        }
        Ok(())
    }

    fn save(&mut self) -> OutlineRepoResult<()> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };
        if !self.dirty {
            return Ok(());
        }

        if let Err(source) = std::fs::write(&path, self.outline.render()) {
            error!(
                "event=notes_save module=repo status=error error_code=write_failed error={}",
                source
            );
            return Err(OutlineRepoError::Io { path, source });
        }
        self.dirty = false;
        info!("event=notes_save module=repo status=ok");
        Ok(())
    }
}

fn unfold_subtree(section: &mut Section) {
    section.folded = false;
    for child in &mut section.children {
        unfold_subtree(child);
    }
}
