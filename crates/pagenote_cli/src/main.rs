//! Interactive page-note session over one source document.
//!
//! # Responsibility
//! - Load configuration, start logging and open the notes file.
//! - Drive a navigator from line commands on stdin until `quit` or EOF.
//! - End the session (sort + save) on the way out.

mod repl;

use clap::Parser;
use log::error;
use pagenote_core::{
    init_from_config, ConfigError, Mode, Navigator, NoterConfig, OrgOutlineRepository,
    OutlineRepoError, Session, SessionError, SourceDocument,
};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::process::ExitCode;

/// pagenote – keep a paged document and its outline notes in step.
///
/// Commands (one per line on stdin):
///   next | prev        step the document one page
///   page <n>           jump to page n
///   here               look up the note for the current page
///   note               open or create the note for the current page
///   sync               move the document to the open note's page
///   prev-note          jump to the previous page note
///   next-note          jump to the next page note
///   show               print the open note
///   list               print the page notes as JSON
///   quit               sort, save and exit (also on EOF)
#[derive(Parser, Debug)]
#[command(name = "pagenote", version, about)]
struct Cli {
    /// Notes file; created on save when missing
    #[arg(short, long)]
    notes: PathBuf,

    /// Source document; defaults to the path declared in the notes file
    #[arg(short, long)]
    source: Option<PathBuf>,

    /// Number of pages in the source document
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    pages: u32,

    /// Document key of the Root-Section in a multi-document notes file
    #[arg(short = 'k', long)]
    document_key: Option<String>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Absolute directory for rotating log files (default: stderr)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Debug)]
enum CliError {
    Config(ConfigError),
    Logging(String),
    Notes(OutlineRepoError),
    Session(SessionError),
    Io(std::io::Error),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "config: {err}"),
            Self::Logging(err) => write!(f, "logging: {err}"),
            Self::Notes(err) => write!(f, "notes: {err}"),
            Self::Session(err) => write!(f, "session: {err}"),
            Self::Io(err) => write!(f, "io: {err}"),
        }
    }
}

impl Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<OutlineRepoError> for CliError {
    fn from(value: OutlineRepoError) -> Self {
        Self::Notes(value)
    }
}

impl From<SessionError> for CliError {
    fn from(value: SessionError) -> Self {
        Self::Session(value)
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_exit module=cli status=error");
            eprintln!("pagenote: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = NoterConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.log_dir {
        config.logging.dir = Some(dir);
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    init_from_config(&config.logging).map_err(CliError::Logging)?;

    let notes = OrgOutlineRepository::open(&cli.notes)?;
    let mode = match cli.document_key {
        Some(document_key) => Mode::MultiDocument { document_key },
        None => Mode::SingleDocument,
    };
    let pages = cli.pages;
    let session = Session::start(config, mode, notes, cli.source, |path| {
        Ok(SourceDocument::new(path.display().to_string(), pages))
    })?;

    let mut navigator = Navigator::new(session);
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let repl_result = repl::run(&mut navigator, stdin.lock(), &mut stdout);
    if let Err(err) = &repl_result {
        error!("event=repl module=cli status=error error={err}");
    }

    // Notes are saved even when reading commands failed.
    let end_result = navigator.end_session();
    repl_result?;
    end_result?;
    Ok(())
}
