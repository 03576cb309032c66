//! Page-to-Section lookup.
//!
//! # Responsibility
//! - Find the Section annotating one page within a Scope.
//! - Narrow and reveal the notes view on a hit.
//!
//! # Invariants
//! - Scans always start at the beginning of the Scope, never at the cursor.
//! - Matching is exact against the canonical decimal form of the page.
//! - With duplicates, the first Section in reading order wins.
//! - A miss leaves the notes view untouched.

use crate::model::section::{page_value_string, SectionId};
use crate::repo::outline_repo::{OutlineRepoResult, OutlineRepository};
use crate::service::scope::Scope;
use log::debug;

/// Finds the Section for `page` without touching the view.
pub fn locate_section<R: OutlineRepository + ?Sized>(
    repo: &R,
    scope: &Scope,
    property_key: &str,
    page: u32,
) -> Option<SectionId> {
    repo.find_by_property(scope.anchor(), property_key, &page_value_string(page))
}

/// Finds the Section for `page`; on a hit, narrows to it and reveals its body.
pub fn find_section_by_page<R: OutlineRepository + ?Sized>(
    repo: &mut R,
    scope: &Scope,
    property_key: &str,
    page: u32,
) -> OutlineRepoResult<Option<SectionId>> {
    let Some(id) = locate_section(repo, scope, property_key, page) else {
        debug!("event=locate_page module=locator status=miss page={page}");
        return Ok(None);
    };

    repo.narrow(id)?;
    repo.reveal(id)?;
    debug!("event=locate_page module=locator status=ok page={page}");
    Ok(Some(id))
}

#[cfg(test)]
mod tests {
    use super::find_section_by_page;
    use crate::repo::outline_repo::{OrgOutlineRepository, OutlineRepository};
    use crate::service::scope::Scope;

    const NOTES: &str = "* Intro\n:PROPERTIES:\n:page: 1\n:END:\n* Methods\n:PROPERTIES:\n:page: 12\n:END:\nbody\n";

    #[test]
    fn hit_narrows_and_reveals() {
        let mut repo = OrgOutlineRepository::from_text(NOTES);
        let methods = repo.outline().sections[1].id;

        let found = find_section_by_page(&mut repo, &Scope::Document, "page", 12).unwrap();
        assert_eq!(found, Some(methods));
        assert_eq!(repo.narrowed(), Some(methods));
        assert!(!repo.section(methods).unwrap().folded);
    }

    #[test]
    fn miss_keeps_previous_narrowing() {
        let mut repo = OrgOutlineRepository::from_text(NOTES);
        let intro = repo.outline().sections[0].id;
        find_section_by_page(&mut repo, &Scope::Document, "page", 1).unwrap();

        let found = find_section_by_page(&mut repo, &Scope::Document, "page", 2).unwrap();
        assert_eq!(found, None);
        assert_eq!(repo.narrowed(), Some(intro));
    }

    #[test]
    fn page_prefix_does_not_match() {
        let mut repo = OrgOutlineRepository::from_text(NOTES);
        let found = find_section_by_page(&mut repo, &Scope::Document, "page", 121).unwrap();
        assert_eq!(found, None);
    }
}
