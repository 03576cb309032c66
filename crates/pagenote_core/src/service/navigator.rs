//! Coupled navigation across the source document and its notes.
//!
//! # Responsibility
//! - Turn page changes and note commands into Scope resolution, page lookup,
//!   Section creation and view/focus switches.
//! - Track the navigation state and queue non-fatal user messages.
//!
//! # Invariants
//! - Scope is resolved before either document is changed; a resolution
//!   failure leaves both views as they were.
//! - Page moves never create Sections; only `add_or_open_note` does.
//! - Every operation runs to completion while holding `&mut self`;
//!   `SharedNavigator` extends that to multi-threaded hosts.

use crate::model::section::{PageValue, Section, SectionId};
use crate::repo::outline_repo::{OutlineRepoError, OutlineRepository};
use crate::service::factory::create_section;
use crate::service::locator::find_section_by_page;
use crate::service::scope::{Scope, ScopeError};
use crate::service::session::{Session, SessionResult};
use crate::viewer::DocumentViewer;
use log::{debug, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, PoisonError};

/// Result type for navigator operations.
pub type NavResult<T> = Result<T, NavigatorError>;

/// Operation-terminating navigator errors.
#[derive(Debug)]
pub enum NavigatorError {
    /// The active Root-Section could not be found.
    Scope(ScopeError),
    /// The outline store rejected a mutation.
    Outline(OutlineRepoError),
}

impl Display for NavigatorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scope(err) => write!(f, "{err}"),
            Self::Outline(err) => write!(f, "{err}"),
        }
    }
}

impl Error for NavigatorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Scope(err) => Some(err),
            Self::Outline(err) => Some(err),
        }
    }
}

impl From<ScopeError> for NavigatorError {
    fn from(value: ScopeError) -> Self {
        Self::Scope(value)
    }
}

impl From<OutlineRepoError> for NavigatorError {
    fn from(value: OutlineRepoError) -> Self {
        Self::Outline(value)
    }
}

/// Page step direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// What the notes view shows relative to the viewer page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    /// No lookup has happened yet.
    Idle,
    /// The notes view is narrowed to the Section for this page.
    ViewingNote(u32),
    /// This page has no Section; the notes view kept its last narrowing.
    NoNoteForPage(u32),
}

/// Which document has input focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Viewer,
    Notes,
}

/// Non-fatal feedback for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserMessage {
    /// No earlier page note in the Scope.
    FirstNote,
    /// No later page note in the Scope.
    NoNextNotes,
    /// Nothing is narrowed in the notes view.
    NoCurrentNote,
    MissingPageProperty { key: String },
    UnparsablePageProperty { key: String, value: String },
    PageOutOfRange { page: u32, page_count: u32 },
}

impl UserMessage {
    fn kind(&self) -> &'static str {
        match self {
            Self::FirstNote => "first_note",
            Self::NoNextNotes => "no_next_notes",
            Self::NoCurrentNote => "no_current_note",
            Self::MissingPageProperty { .. } => "missing_page_property",
            Self::UnparsablePageProperty { .. } => "unparsable_page_property",
            Self::PageOutOfRange { .. } => "page_out_of_range",
        }
    }
}

impl Display for UserMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FirstNote => write!(f, "First note"),
            Self::NoNextNotes => write!(f, "No next notes"),
            Self::NoCurrentNote => write!(f, "No note is open"),
            Self::MissingPageProperty { key } => {
                write!(f, "Current note has no `{key}` property")
            }
            Self::UnparsablePageProperty { key, value } => {
                write!(f, "Cannot read a page number from `{key}`: `{value}`")
            }
            Self::PageOutOfRange { page, page_count } => {
                write!(f, "Page {page} is outside the document (1-{page_count})")
            }
        }
    }
}

/// Page/note synchronization state machine over one session.
pub struct Navigator<V: DocumentViewer, R: OutlineRepository> {
    session: Session<V, R>,
    state: NavState,
    focus: Focus,
    messages: Vec<UserMessage>,
}

impl<V: DocumentViewer, R: OutlineRepository> Navigator<V, R> {
    pub fn new(session: Session<V, R>) -> Self {
        Self {
            session,
            state: NavState::Idle,
            focus: Focus::Viewer,
            messages: Vec::new(),
        }
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn session(&self) -> &Session<V, R> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<V, R> {
        &mut self.session
    }

    /// Drains queued user messages, oldest first.
    pub fn take_messages(&mut self) -> Vec<UserMessage> {
        std::mem::take(&mut self.messages)
    }

    /// Steps the viewer one page and looks up the note for the new page.
    ///
    /// On the first/last page the step is ignored: no lookup, state kept.
    /// Focus always returns to the viewer.
    pub fn go_to_page(&mut self, direction: Direction) -> NavResult<NavState> {
        let current = self.session.viewer.current_page();
        let at_boundary = match direction {
            Direction::Forward => current >= self.session.viewer.page_count(),
            Direction::Backward => current <= 1,
        };
        if at_boundary {
            debug!("event=go_to_page module=navigator status=boundary page={current}");
            self.focus = Focus::Viewer;
            return Ok(self.state);
        }

        let scope = self.session.resolve_scope()?;
        match direction {
            Direction::Forward => self.session.viewer.next_page(),
            Direction::Backward => self.session.viewer.previous_page(),
        }
        let page = self.session.viewer.current_page();
        let state = self.lookup(&scope, page)?;
        self.focus = Focus::Viewer;
        Ok(state)
    }

    /// Moves the viewer to `page` (clamped) and looks up its note.
    pub fn jump_to_page(&mut self, page: u32) -> NavResult<NavState> {
        let scope = self.session.resolve_scope()?;
        self.session.viewer.go_to_page(page);
        let page = self.session.viewer.current_page();
        let state = self.lookup(&scope, page)?;
        self.focus = Focus::Viewer;
        Ok(state)
    }

    /// Looks up the note for the viewer's current page without moving it.
    pub fn sync_current_page(&mut self) -> NavResult<NavState> {
        let scope = self.session.resolve_scope()?;
        let page = self.session.viewer.current_page();
        self.lookup(&scope, page)
    }

    /// Opens the note for the current page, creating it when missing, and
    /// focuses the notes view on it.
    pub fn add_or_open_note(&mut self) -> NavResult<SectionId> {
        let scope = self.session.resolve_scope()?;
        let key = self.session.page_property_key();
        let page = self.session.viewer.current_page();

        let session = &mut self.session;
        let id = match find_section_by_page(&mut session.notes, &scope, &key, page)? {
            Some(id) => {
                session.notes.ensure_trailing_blank_line(id)?;
                info!("event=open_note module=navigator status=ok page={page}");
                id
            }
            None => create_section(
                &mut session.notes,
                &scope,
                &key,
                page,
                &session.heading_style,
                session.config.insert_policy,
            )?,
        };

        self.state = NavState::ViewingNote(page);
        self.focus = Focus::Notes;
        Ok(id)
    }

    /// Moves the viewer to the page recorded on the narrowed note.
    ///
    /// Returns the page jumped to, or `None` after queuing a message when the
    /// note has no usable page.
    pub fn sync_page_from_current_note(&mut self) -> NavResult<Option<u32>> {
        let Some(id) = self.session.notes.narrowed() else {
            self.emit(UserMessage::NoCurrentNote);
            return Ok(None);
        };
        let key = self.session.page_property_key();
        let value = self
            .session
            .notes
            .section(id)
            .map(|section| section.page(&key))
            .unwrap_or(PageValue::Missing);

        match value {
            PageValue::Missing => {
                self.emit(UserMessage::MissingPageProperty { key });
                Ok(None)
            }
            PageValue::Unparsable(value) => {
                self.emit(UserMessage::UnparsablePageProperty { key, value });
                Ok(None)
            }
            PageValue::Page(page) => {
                if !self.show_page(page) {
                    return Ok(None);
                }
                self.state = NavState::ViewingNote(page);
                Ok(Some(page))
            }
        }
    }

    /// Jumps both views to the nearest earlier page note in the Scope.
    pub fn sync_to_previous_note(&mut self) -> NavResult<Option<SectionId>> {
        self.sync_adjacent(Direction::Backward)
    }

    /// Jumps both views to the nearest later page note outside the current
    /// note's subtree.
    pub fn sync_to_next_note(&mut self) -> NavResult<Option<SectionId>> {
        self.sync_adjacent(Direction::Forward)
    }

    /// Ends the session; see [`Session::end`].
    pub fn end_session(self) -> SessionResult<R> {
        self.session.end()
    }

    fn sync_adjacent(&mut self, direction: Direction) -> NavResult<Option<SectionId>> {
        let scope = self.session.resolve_scope()?;
        let key = self.session.page_property_key();

        let found = {
            let notes = &self.session.notes;
            let order = notes.outline().preorder(scope.anchor());
            let current = notes
                .narrowed()
                .and_then(|id| order.iter().position(|section| section.id == id));
            let candidates = match (direction, current) {
                (Direction::Backward, Some(index)) => &order[..index],
                (Direction::Backward, None) => &order[..0],
                (Direction::Forward, Some(index)) => {
                    let end = (index + 1 + order[index].descendant_count()).min(order.len());
                    &order[end..]
                }
                (Direction::Forward, None) => &order[..],
            };
            let with_page = |section: &&Section| {
                section.page(&key).page().map(|page| (section.id, page))
            };
            match direction {
                Direction::Backward => candidates.iter().rev().find_map(with_page),
                Direction::Forward => candidates.iter().find_map(with_page),
            }
        };

        let Some((id, page)) = found else {
            self.emit(match direction {
                Direction::Backward => UserMessage::FirstNote,
                Direction::Forward => UserMessage::NoNextNotes,
            });
            return Ok(None);
        };

        if !self.show_page(page) {
            return Ok(None);
        }
        self.session.notes.narrow(id)?;
        self.session.notes.reveal(id)?;
        self.state = NavState::ViewingNote(page);
        debug!("event=sync_note module=navigator status=ok direction={direction:?} page={page}");
        Ok(Some(id))
    }

    fn lookup(&mut self, scope: &Scope, page: u32) -> NavResult<NavState> {
        let key = self.session.page_property_key();
        self.state = match find_section_by_page(&mut self.session.notes, scope, &key, page)? {
            Some(_) => NavState::ViewingNote(page),
            None => NavState::NoNoteForPage(page),
        };
        Ok(self.state)
    }

    /// Moves the viewer to `page` when it exists; otherwise queues a message.
    fn show_page(&mut self, page: u32) -> bool {
        let page_count = self.session.viewer.page_count();
        if page == 0 || page > page_count {
            self.emit(UserMessage::PageOutOfRange { page, page_count });
            return false;
        }
        self.session.viewer.go_to_page(page);
        true
    }

    fn emit(&mut self, message: UserMessage) {
        info!(
            "event=user_message module=navigator kind={}",
            message.kind()
        );
        self.messages.push(message);
    }
}

/// Navigator shared between threads; every operation runs under one lock.
pub struct SharedNavigator<V: DocumentViewer, R: OutlineRepository> {
    inner: Arc<Mutex<Navigator<V, R>>>,
}

impl<V: DocumentViewer, R: OutlineRepository> Clone for SharedNavigator<V, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: DocumentViewer, R: OutlineRepository> SharedNavigator<V, R> {
    pub fn new(navigator: Navigator<V, R>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(navigator)),
        }
    }

    /// Runs `operation` with exclusive access to both documents.
    ///
    /// A panic in an earlier operation does not lock the navigator out.
    pub fn with<T>(&self, operation: impl FnOnce(&mut Navigator<V, R>) -> T) -> T {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        operation(&mut guard)
    }

    /// Returns the navigator when this is the last handle.
    pub fn into_inner(self) -> Option<Navigator<V, R>> {
        Arc::try_unwrap(self.inner)
            .ok()
            .map(|mutex| mutex.into_inner().unwrap_or_else(PoisonError::into_inner))
    }
}
