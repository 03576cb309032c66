//! Outline notes document: parse, render and tree queries.
//!
//! # Responsibility
//! - Parse Org-style structured text into a Section tree.
//! - Render the tree back to text for persistence.
//! - Provide id-based lookup and pre-order traversal for scoped searches.
//!
//! # Invariants
//! - Parsing never fails; unrecognized text is kept as preamble, body or a
//!   raw drawer line, so parse then render loses no lines.
//! - A headline is one or more `*` followed by a space or tab.
//! - A property drawer is only recognized directly below a headline and only
//!   when it is closed by `:END:` before the next headline.
//! - Headline and drawer lines are written with the line ending of the first
//!   line of the loaded text; body text is kept byte for byte.
//! - Pre-order traversal matches top-to-bottom reading order of the file.

use crate::model::section::{DrawerLine, Property, Section, SectionId};
use once_cell::sync::Lazy;
use regex::Regex;

static HEADLINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\*+)[ \t]+(.*?)[ \t]*$").expect("valid headline regex"));
static PROPERTY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[ \t]*:([^:\s]+):(?:[ \t]+(.*?))?[ \t]*$").expect("valid property regex")
});
static KEYWORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#\+([A-Za-z_][A-Za-z0-9_-]*):[ \t]*(.*?)[ \t]*$").expect("valid keyword regex")
});

const DRAWER_START: &str = ":PROPERTIES:";
const DRAWER_END: &str = ":END:";

/// Line terminator used when writing structural lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }

    /// Line ending of the first terminated line in `text`; `Lf` when none.
    fn detect(text: &str) -> Self {
        match text.find('\n') {
            Some(index) if text[..index].ends_with('\r') => Self::CrLf,
            _ => Self::Lf,
        }
    }
}

/// In-memory notes document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outline {
    /// Text before the first headline, verbatim.
    pub preamble: String,
    /// Top-level Sections in document order.
    pub sections: Vec<Section>,
    /// Terminator for rendered headline and drawer lines.
    pub line_ending: LineEnding,
}

impl Outline {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses structured text into an outline.
    pub fn parse(text: &str) -> Self {
        let lines: Vec<&str> = text.split_inclusive('\n').collect();
        let mut preamble = String::new();
        let mut flat: Vec<Section> = Vec::new();

        let mut index = 0;
        while index < lines.len() {
            let line = lines[index];
            index += 1;

            let Some(caps) = HEADLINE_RE.captures(strip_eol(line)) else {
                match flat.last_mut() {
                    Some(current) => current.body.push_str(line),
                    None => preamble.push_str(line),
                }
                continue;
            };

            let level = caps[1].len();
            let heading = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            let mut section = Section::parsed(level, heading);
            if let Some((drawer, consumed)) = read_drawer(&lines[index..]) {
                section.drawer = Some(drawer);
                index += consumed;
            }
            flat.push(section);
        }

        Self {
            preamble,
            sections: nest(flat),
            line_ending: LineEnding::detect(text),
        }
    }

    /// Renders the outline back to structured text.
    pub fn render(&self) -> String {
        let mut out = self.preamble.clone();
        for section in &self.sections {
            render_section(section, self.line_ending.as_str(), &mut out);
        }
        out
    }

    /// Renders one Section and its subtree.
    pub fn render_subtree(&self, id: SectionId) -> Option<String> {
        let section = self.find(id)?;
        let mut out = String::new();
        render_section(section, self.line_ending.as_str(), &mut out);
        Some(out)
    }

    /// Value of a `#+KEY:` keyword in the preamble, matched case-insensitively.
    pub fn keyword(&self, key: &str) -> Option<&str> {
        self.preamble.lines().find_map(|line| {
            let caps = KEYWORD_RE.captures(line)?;
            if caps[1].eq_ignore_ascii_case(key) {
                caps.get(2).map(|m| m.as_str())
            } else {
                None
            }
        })
    }

    /// Finds a Section anywhere in the tree.
    pub fn find(&self, id: SectionId) -> Option<&Section> {
        self.sections.iter().find_map(|section| section.find(id))
    }

    /// Mutable variant of [`Outline::find`].
    pub fn find_mut(&mut self, id: SectionId) -> Option<&mut Section> {
        self.sections
            .iter_mut()
            .find_map(|section| section.find_mut(id))
    }

    pub fn contains(&self, id: SectionId) -> bool {
        self.find(id).is_some()
    }

    /// Direct children of `parent`, or the top-level Sections for `None`.
    ///
    /// Returns `None` when `parent` is not in the tree.
    pub fn children(&self, parent: Option<SectionId>) -> Option<&[Section]> {
        match parent {
            None => Some(self.sections.as_slice()),
            Some(id) => self.find(id).map(|section| section.children.as_slice()),
        }
    }

    /// Mutable variant of [`Outline::children`].
    pub fn children_mut(&mut self, parent: Option<SectionId>) -> Option<&mut Vec<Section>> {
        match parent {
            None => Some(&mut self.sections),
            Some(id) => self.find_mut(id).map(|section| &mut section.children),
        }
    }

    /// Pre-order listing of the whole document, or of the subtree rooted at
    /// `anchor` (anchor first). Unknown anchors yield an empty list.
    pub fn preorder(&self, anchor: Option<SectionId>) -> Vec<&Section> {
        let mut out = Vec::new();
        match anchor {
            None => push_preorder(&self.sections, &mut out),
            Some(id) => {
                if let Some(section) = self.find(id) {
                    out.push(section);
                    push_preorder(&section.children, &mut out);
                }
            }
        }
        out
    }
}

fn push_preorder<'a>(sections: &'a [Section], out: &mut Vec<&'a Section>) {
    for section in sections {
        out.push(section);
        push_preorder(&section.children, out);
    }
}

fn strip_eol(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

/// Reads a property drawer at the start of `lines`.
///
/// Returns the drawer lines and the number of lines consumed, or `None` when
/// no closed drawer starts there.
fn read_drawer(lines: &[&str]) -> Option<(Vec<DrawerLine>, usize)> {
    let first = lines.first()?;
    if !strip_eol(first).trim().eq_ignore_ascii_case(DRAWER_START) {
        return None;
    }

    let mut drawer = Vec::new();
    for (offset, line) in lines.iter().enumerate().skip(1) {
        let content = strip_eol(line);
        if content.trim().eq_ignore_ascii_case(DRAWER_END) {
            return Some((drawer, offset + 1));
        }
        if HEADLINE_RE.is_match(content) {
            return None;
        }
        drawer.push(match PROPERTY_RE.captures(content) {
            Some(caps) => DrawerLine::Property(Property {
                key: caps[1].to_string(),
                value: caps
                    .get(2)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default(),
            }),
            None => DrawerLine::Raw(content.to_string()),
        });
    }
    None
}

/// Turns a flat list of headlines into a tree using their levels.
fn nest(flat: Vec<Section>) -> Vec<Section> {
    let mut roots = Vec::new();
    let mut stack: Vec<Section> = Vec::new();

    for section in flat {
        while let Some(top) = stack.pop() {
            if top.level < section.level {
                stack.push(top);
                break;
            }
            attach(&mut stack, &mut roots, top);
        }
        stack.push(section);
    }
    while let Some(top) = stack.pop() {
        attach(&mut stack, &mut roots, top);
    }
    roots
}

fn attach(stack: &mut [Section], roots: &mut Vec<Section>, done: Section) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(done),
        None => roots.push(done),
    }
}

fn render_section(section: &Section, eol: &str, out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push_str(eol);
    }
    out.push_str(&"*".repeat(section.level));
    out.push(' ');
    out.push_str(&section.heading);
    out.push_str(eol);

    if let Some(drawer) = &section.drawer {
        out.push_str(DRAWER_START);
        out.push_str(eol);
        for line in drawer {
            match line {
                DrawerLine::Property(property) => {
                    out.push(':');
                    out.push_str(&property.key);
                    out.push(':');
                    if !property.value.is_empty() {
                        out.push(' ');
                        out.push_str(&property.value);
                    }
                }
                DrawerLine::Raw(text) => out.push_str(text),
            }
            out.push_str(eol);
        }
        out.push_str(DRAWER_END);
        out.push_str(eol);
    }

    out.push_str(&section.body);
    for child in &section.children {
        render_section(child, eol, out);
    }
}
