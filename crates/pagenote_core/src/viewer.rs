//! Source document viewer contract.
//!
//! # Responsibility
//! - Describe the page cursor the synchronization engine reads and moves.
//! - Provide an in-process implementation for hosts without a renderer.
//!
//! # Invariants
//! - Pages are 1-based; `current_page` is always within `1..=page_count`.

/// Viewer collaborator for a paginated source document.
pub trait DocumentViewer {
    fn current_page(&self) -> u32;

    fn page_count(&self) -> u32;

    /// Jumps to `page`, clamped to the document range.
    fn go_to_page(&mut self, page: u32);

    /// Advances one page; stays put on the last page.
    fn next_page(&mut self) {
        let current = self.current_page();
        if current < self.page_count() {
            self.go_to_page(current + 1);
        }
    }

    /// Goes back one page; stays put on the first page.
    fn previous_page(&mut self) {
        let current = self.current_page();
        if current > 1 {
            self.go_to_page(current - 1);
        }
    }
}

/// Page cursor over one source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    identifier: String,
    current_page: u32,
    page_count: u32,
}

impl SourceDocument {
    /// Opens at page 1. A zero page count is treated as a one-page document.
    pub fn new(identifier: impl Into<String>, page_count: u32) -> Self {
        Self {
            identifier: identifier.into(),
            current_page: 1,
            page_count: page_count.max(1),
        }
    }

    /// Path or key the document was opened with.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

impl DocumentViewer for SourceDocument {
    fn current_page(&self) -> u32 {
        self.current_page
    }

    fn page_count(&self) -> u32 {
        self.page_count
    }

    fn go_to_page(&mut self, page: u32) {
        self.current_page = page.clamp(1, self.page_count);
    }
}
