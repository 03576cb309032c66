//! Note-taking session lifecycle.
//!
//! # Responsibility
//! - Bind one source document viewer, one notes outline, the mode and the
//!   configuration into an explicit session object.
//! - Resolve the source document at start and run the teardown sort at end.
//!
//! # Invariants
//! - Mode and source document are fixed for the session lifetime.
//! - A session only exists when its source document exists on disk.
//! - Sort failures never block teardown.

use crate::config::NoterConfig;
use crate::repo::outline_repo::{OutlineRepoError, OutlineRepository};
use crate::service::factory::HeadingStyle;
use crate::service::scope::{Mode, Scope, ScopeError};
use crate::service::sort::sort_notes;
use crate::viewer::DocumentViewer;
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Result type for session lifecycle calls.
pub type SessionResult<T> = Result<T, SessionError>;

/// Session lifecycle errors.
#[derive(Debug)]
pub enum SessionError {
    /// The source document cannot be resolved or opened.
    ExternalResourceMissing {
        path: Option<PathBuf>,
        reason: String,
    },
    /// Persisting the notes document failed.
    Outline(OutlineRepoError),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExternalResourceMissing {
                path: Some(path),
                reason,
            } => write!(f, "source document `{}`: {reason}", path.display()),
            Self::ExternalResourceMissing { path: None, reason } => {
                write!(f, "source document: {reason}")
            }
            Self::Outline(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Outline(err) => Some(err),
            Self::ExternalResourceMissing { .. } => None,
        }
    }
}

impl From<OutlineRepoError> for SessionError {
    fn from(value: OutlineRepoError) -> Self {
        Self::Outline(value)
    }
}

/// Live pairing of a source document viewer and a notes outline.
pub struct Session<V: DocumentViewer, R: OutlineRepository> {
    pub(crate) viewer: V,
    pub(crate) notes: R,
    pub(crate) mode: Mode,
    pub(crate) config: NoterConfig,
    pub(crate) source_path: PathBuf,
    pub(crate) heading_style: HeadingStyle,
}

impl<V: DocumentViewer, R: OutlineRepository> Session<V, R> {
    /// Starts a session.
    ///
    /// The source document is `source` when given, otherwise the path
    /// declared in the notes document (`#+<source_property>:` keyword in
    /// single-document mode, `<source_property>` on the Root-Section in
    /// multi-document mode). Relative declared paths are resolved against the
    /// notes file directory. `open_viewer` receives the resolved path.
    ///
    /// # Errors
    /// - `ExternalResourceMissing` when no path is known, the path does not
    ///   exist, or the viewer fails to open it.
    pub fn start<F>(
        config: NoterConfig,
        mode: Mode,
        notes: R,
        source: Option<PathBuf>,
        open_viewer: F,
    ) -> SessionResult<Self>
    where
        F: FnOnce(&Path) -> std::io::Result<V>,
    {
        let notes_dir = notes.location().and_then(Path::parent).map(Path::to_path_buf);
        let source_path = match source {
            Some(path) => path,
            None => declared_source(&notes, &mode, &config, notes_dir.as_deref())?,
        };

        if !source_path.is_file() {
            error!(
                "event=session_start module=session status=error error_code=source_missing"
            );
            return Err(SessionError::ExternalResourceMissing {
                path: Some(source_path),
                reason: "file does not exist".to_string(),
            });
        }

        let viewer = open_viewer(&source_path).map_err(|err| {
            error!(
                "event=session_start module=session status=error error_code=viewer_open_failed"
            );
            SessionError::ExternalResourceMissing {
                path: Some(source_path.clone()),
                reason: err.to_string(),
            }
        })?;

        let heading_style = HeadingStyle::from_config(&config, &source_path, notes_dir.as_deref());
        info!(
            "event=session_start module=session status=ok mode={} pages={}",
            mode_label(&mode),
            viewer.page_count()
        );

        Ok(Self {
            viewer,
            notes,
            mode,
            config,
            source_path,
            heading_style,
        })
    }

    pub fn viewer(&self) -> &V {
        &self.viewer
    }

    pub fn viewer_mut(&mut self) -> &mut V {
        &mut self.viewer
    }

    pub fn notes(&self) -> &R {
        &self.notes
    }

    pub fn notes_mut(&mut self) -> &mut R {
        &mut self.notes
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn config(&self) -> &NoterConfig {
        &self.config
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Page property key for this session's mode.
    pub fn page_property_key(&self) -> String {
        self.mode.page_property_key(&self.config)
    }

    /// Resolves the active Scope against the current outline.
    pub fn resolve_scope(&self) -> Result<Scope, ScopeError> {
        self.mode.resolve_scope(&self.notes, &self.config)
    }

    /// Ends the session: sorts the Scope, widens the notes view, saves the
    /// notes document and releases the viewer.
    ///
    /// Returns the notes repository for callers that keep working with it.
    ///
    /// # Errors
    /// - `Outline` when saving fails. Sort problems are logged and skipped.
    pub fn end(mut self) -> SessionResult<R> {
        let key = self.page_property_key();
        match self.resolve_scope() {
            Ok(scope) => {
                if let Err(err) = sort_notes(&mut self.notes, &scope, &key, self.config.sort_order)
                {
                    warn!("event=session_end module=session status=sort_skipped error={err}");
                }
            }
            Err(err) => {
                warn!("event=session_end module=session status=sort_skipped error={err}");
            }
        }

        let Self {
            viewer, mut notes, ..
        } = self;
        drop(viewer);
        notes.widen();
        notes.save()?;
        info!("event=session_end module=session status=ok");
        Ok(notes)
    }
}

fn declared_source<R: OutlineRepository + ?Sized>(
    notes: &R,
    mode: &Mode,
    config: &NoterConfig,
    notes_dir: Option<&Path>,
) -> SessionResult<PathBuf> {
    let declared = match mode {
        Mode::SingleDocument => notes
            .outline()
            .keyword(&config.source_property)
            .map(str::to_string),
        Mode::MultiDocument { document_key } => notes
            .find_by_property(None, &config.document_id_property, document_key)
            .and_then(|id| notes.section(id))
            .and_then(|root| root.property(&config.source_property))
            .map(str::to_string),
    };

    let declared = declared
        .filter(|value| !value.is_empty())
        .ok_or_else(|| SessionError::ExternalResourceMissing {
            path: None,
            reason: format!(
                "no path given and no `{}` declared in the notes",
                config.source_property
            ),
        })?;

    let path = PathBuf::from(declared);
    Ok(match notes_dir {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path,
    })
}

fn mode_label(mode: &Mode) -> &'static str {
    match mode {
        Mode::SingleDocument => "single",
        Mode::MultiDocument { .. } => "multi",
    }
}

#[cfg(test)]
mod tests {
    use super::{Session, SessionError};
    use crate::config::NoterConfig;
    use crate::repo::outline_repo::OrgOutlineRepository;
    use crate::service::scope::Mode;
    use crate::viewer::SourceDocument;
    use std::path::{Path, PathBuf};

    fn open(path: &Path) -> std::io::Result<SourceDocument> {
        Ok(SourceDocument::new(path.display().to_string(), 10))
    }

    #[test]
    fn missing_declaration_is_external_resource_missing() {
        let notes = OrgOutlineRepository::from_text("* nothing here\n");
        let err = Session::start(
            NoterConfig::default(),
            Mode::SingleDocument,
            notes,
            None,
            open,
        )
        .err()
        .expect("start must fail without a source");
        assert!(matches!(
            err,
            SessionError::ExternalResourceMissing { path: None, .. }
        ));
    }

    #[test]
    fn nonexistent_source_is_external_resource_missing() {
        let notes = OrgOutlineRepository::from_text("");
        let missing = PathBuf::from("/definitely/not/here.pdf");
        let err = Session::start(
            NoterConfig::default(),
            Mode::SingleDocument,
            notes,
            Some(missing.clone()),
            open,
        )
        .err()
        .expect("start must fail for a missing file");
        assert!(matches!(
            err,
            SessionError::ExternalResourceMissing { path: Some(path), .. } if path == missing
        ));
    }

    #[test]
    fn viewer_failure_is_external_resource_missing() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("paper.pdf");
        std::fs::write(&source, b"%PDF").unwrap();

        let result = Session::start(
            NoterConfig::default(),
            Mode::SingleDocument,
            OrgOutlineRepository::from_text(""),
            Some(source),
            |_: &Path| -> std::io::Result<SourceDocument> {
                Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "not a pdf",
                ))
            },
        );
        assert!(matches!(
            result,
            Err(SessionError::ExternalResourceMissing { reason, .. }) if reason.contains("not a pdf")
        ));
    }
}
