//! Section node of the outline notes tree.
//!
//! # Responsibility
//! - Hold one headline with its ordered property drawer, body and children.
//! - Interpret a named property as a source-document page number.
//!
//! # Invariants
//! - `id` is unique within one loaded outline and never reused.
//! - Drawer line order is preserved, including lines that are not
//!   properties; keys compare ASCII case-insensitively.
//! - `level` is at least 1 and children are deeper than their parent.

use uuid::Uuid;

/// Stable in-memory identifier of one Section.
///
/// Assigned at parse or creation time; not persisted to the notes file.
pub type SectionId = Uuid;

/// One `:KEY: value` entry of a property drawer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub key: String,
    pub value: String,
}

/// One line inside a `:PROPERTIES:` drawer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawerLine {
    Property(Property),
    /// Any other line, kept verbatim without its line ending.
    Raw(String),
}

/// Interpretation of a page property on one Section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageValue {
    /// The Section has no property with the requested key.
    Missing,
    /// The property exists but is not a positive decimal page number.
    Unparsable(String),
    /// A 1-based page number.
    Page(u32),
}

impl PageValue {
    /// Returns the page number when the value is usable for navigation.
    pub fn page(&self) -> Option<u32> {
        match self {
            Self::Page(page) => Some(*page),
            Self::Missing | Self::Unparsable(_) => None,
        }
    }
}

/// Outline node: a headline, its property drawer, body text and subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Stable in-memory id.
    pub id: SectionId,
    /// Headline depth (number of leading stars).
    pub level: usize,
    /// Headline text after the stars.
    pub heading: String,
    /// Property drawer lines in document order; `None` when the Section has
    /// no drawer at all.
    pub drawer: Option<Vec<DrawerLine>>,
    /// Raw body text between the drawer and the next headline.
    pub body: String,
    /// Direct child Sections in document order.
    pub children: Vec<Section>,
    /// Whether body and subtree are hidden in the notes view.
    pub folded: bool,
    /// Whether the property drawer is hidden in the notes view.
    pub drawer_folded: bool,
}

impl Section {
    /// Creates an expanded Section with a fresh id and a folded drawer.
    pub fn new(level: usize, heading: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            level: level.max(1),
            heading: heading.into(),
            drawer: None,
            body: String::new(),
            children: Vec::new(),
            folded: false,
            drawer_folded: true,
        }
    }

    /// Creates a Section the way it appears right after loading a file:
    /// folded, drawer folded.
    pub(crate) fn parsed(level: usize, heading: impl Into<String>) -> Self {
        let mut section = Self::new(level, heading);
        section.folded = true;
        section
    }

    /// Drawer properties in document order.
    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.drawer.iter().flatten().filter_map(|line| match line {
            DrawerLine::Property(property) => Some(property),
            DrawerLine::Raw(_) => None,
        })
    }

    /// Returns the trimmed value of `key`, if present.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties()
            .find(|property| property.key.eq_ignore_ascii_case(key))
            .map(|property| property.value.trim())
    }

    /// Sets `key` to `value`, replacing an existing entry in place or
    /// appending a new one. Creates the drawer when missing.
    pub fn set_property(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        let lines = self.drawer.get_or_insert_with(Vec::new);
        let existing = lines.iter_mut().find_map(|line| match line {
            DrawerLine::Property(property) if property.key.eq_ignore_ascii_case(key) => {
                Some(property)
            }
            _ => None,
        });
        match existing {
            Some(property) => property.value = value,
            None => lines.push(DrawerLine::Property(Property {
                key: key.to_string(),
                value,
            })),
        }
    }

    /// Reads `key` as a page number.
    pub fn page(&self, key: &str) -> PageValue {
        match self.property(key) {
            None => PageValue::Missing,
            Some(raw) => match parse_page(raw) {
                Some(page) => PageValue::Page(page),
                None => PageValue::Unparsable(raw.to_string()),
            },
        }
    }

    /// Whether `key` holds exactly the canonical decimal form of `page`.
    pub fn has_page(&self, key: &str, page: u32) -> bool {
        self.property(key) == Some(page_value_string(page).as_str())
    }

    /// Number of Sections below this one, at any depth.
    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| 1 + child.descendant_count())
            .sum()
    }

    /// Finds `id` in this subtree, including `self`.
    pub fn find(&self, id: SectionId) -> Option<&Section> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Mutable variant of [`Section::find`].
    pub fn find_mut(&mut self, id: SectionId) -> Option<&mut Section> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }
}

/// Parses a positive decimal page number, ignoring surrounding whitespace.
pub fn parse_page(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    trimmed.parse::<u32>().ok().filter(|page| *page > 0)
}

/// Canonical property value for `page`.
pub fn page_value_string(page: u32) -> String {
    page.to_string()
}
