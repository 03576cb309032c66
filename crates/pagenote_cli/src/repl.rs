//! Line-command loop over a navigator.

use log::debug;
use pagenote_core::{
    Direction, DocumentViewer, Navigator, OutlineRepository, Section, UserMessage,
};
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::io::{BufRead, Write};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Next,
    Prev,
    Page(u32),
    Here,
    Note,
    Sync,
    PrevNote,
    NextNote,
    Show,
    List,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Unknown(String),
    BadPage(String),
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown(word) => write!(f, "unknown command `{word}`"),
            Self::BadPage(raw) => write!(f, "expected a page number, got `{raw}`"),
        }
    }
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let word = words.next().unwrap_or_default().to_ascii_lowercase();
        let command = match word.as_str() {
            "next" | "n" => Self::Next,
            "prev" | "p" => Self::Prev,
            "page" | "g" => {
                let raw = words.next().unwrap_or_default();
                raw.parse::<u32>()
                    .map(Self::Page)
                    .map_err(|_| ParseError::BadPage(raw.to_string()))?
            }
            "here" => Self::Here,
            "note" | "i" => Self::Note,
            "sync" => Self::Sync,
            "prev-note" => Self::PrevNote,
            "next-note" => Self::NextNote,
            "show" => Self::Show,
            "list" => Self::List,
            "quit" | "q" | "exit" => Self::Quit,
            _ => return Err(ParseError::Unknown(word)),
        };
        Ok(command)
    }
}

/// One page note in `list` output.
#[derive(Debug, Serialize)]
struct NoteSummary<'a> {
    page: u32,
    level: usize,
    heading: &'a str,
}

/// Reads commands from `input` until `quit` or EOF.
///
/// Navigator errors are reported on `output` and do not stop the loop.
pub fn run<V, R, I, O>(
    navigator: &mut Navigator<V, R>,
    input: I,
    output: &mut O,
) -> std::io::Result<()>
where
    V: DocumentViewer,
    R: OutlineRepository,
    I: BufRead,
    O: Write,
{
    let mut input = input;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line,
            Err(_) => {
                writeln!(output, "error: input line is not valid UTF-8")?;
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(err) => {
                writeln!(output, "error: {err}")?;
                continue;
            }
        };
        debug!("event=command module=repl command={command:?}");
        if command == Command::Quit {
            break;
        }

        if let Err(err) = execute(navigator, command, output) {
            writeln!(output, "error: {err}")?;
        }
        for message in navigator.take_messages() {
            writeln!(output, "{}", describe(&message))?;
        }
        writeln!(output, "{}", status_line(navigator))?;
        output.flush()?;
    }
    Ok(())
}

fn execute<V, R, O>(
    navigator: &mut Navigator<V, R>,
    command: Command,
    output: &mut O,
) -> Result<(), Box<dyn std::error::Error>>
where
    V: DocumentViewer,
    R: OutlineRepository,
    O: Write,
{
    match command {
        Command::Next => {
            navigator.go_to_page(Direction::Forward)?;
        }
        Command::Prev => {
            navigator.go_to_page(Direction::Backward)?;
        }
        Command::Page(page) => {
            navigator.jump_to_page(page)?;
        }
        Command::Here => {
            navigator.sync_current_page()?;
        }
        Command::Note => {
            navigator.add_or_open_note()?;
        }
        Command::Sync => {
            navigator.sync_page_from_current_note()?;
        }
        Command::PrevNote => {
            navigator.sync_to_previous_note()?;
        }
        Command::NextNote => {
            navigator.sync_to_next_note()?;
        }
        Command::Show => {
            let notes = navigator.session().notes();
            match notes
                .narrowed()
                .and_then(|id| notes.outline().render_subtree(id))
            {
                Some(text) => write!(output, "{text}")?,
                None => writeln!(output, "{}", describe(&UserMessage::NoCurrentNote))?,
            }
        }
        Command::List => {
            let json = serde_json::to_string_pretty(&page_notes(navigator)?)?;
            writeln!(output, "{json}")?;
        }
        Command::Quit => {}
    }
    Ok(())
}

fn describe(message: &UserMessage) -> String {
    format!("-- {message}")
}

fn status_line<V: DocumentViewer, R: OutlineRepository>(navigator: &Navigator<V, R>) -> String {
    let viewer = navigator.session().viewer();
    let note = narrowed_section(navigator)
        .map(|section| section.heading.as_str())
        .unwrap_or("-");
    format!(
        "[page {}/{}] [{:?}] note: {note}",
        viewer.current_page(),
        viewer.page_count(),
        navigator.focus()
    )
}

fn narrowed_section<V: DocumentViewer, R: OutlineRepository>(
    navigator: &Navigator<V, R>,
) -> Option<&Section> {
    let notes = navigator.session().notes();
    notes.narrowed().and_then(|id| notes.section(id))
}

fn page_notes<V: DocumentViewer, R: OutlineRepository>(
    navigator: &Navigator<V, R>,
) -> Result<Vec<NoteSummary<'_>>, Box<dyn std::error::Error>> {
    let session = navigator.session();
    let scope = session.resolve_scope()?;
    let key = session.page_property_key();
    Ok(session
        .notes()
        .outline()
        .preorder(scope.anchor())
        .into_iter()
        .filter_map(|section| {
            section.page(&key).page().map(|page| NoteSummary {
                page,
                level: section.level,
                heading: section.heading.as_str(),
            })
        })
        .collect())
}
