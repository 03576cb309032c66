//! Page-order sorting of note Sections.
//!
//! # Invariants
//! - Only direct children of the Scope anchor move; subtrees move with them.
//! - The sort is stable: equal pages keep their relative order.
//! - Missing or unparsable page properties sort as the smallest value.

use crate::model::section::Section;
use crate::repo::outline_repo::{OutlineRepoResult, OutlineRepository};
use crate::service::scope::Scope;
use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Page order applied to sibling Sections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Sorts the direct children of the Scope anchor by page number.
pub fn sort_notes<R: OutlineRepository + ?Sized>(
    repo: &mut R,
    scope: &Scope,
    property_key: &str,
    order: SortOrder,
) -> OutlineRepoResult<()> {
    repo.sort_children(scope.anchor(), &mut |left: &Section, right: &Section| {
        compare_pages(
            left.page(property_key).page(),
            right.page(property_key).page(),
            order,
        )
    })?;
    debug!("event=sort_notes module=sort status=ok order={order:?}");
    Ok(())
}

fn compare_pages(left: Option<u32>, right: Option<u32>, order: SortOrder) -> Ordering {
    // `None < Some(_)`, so pageless Sections lead ascending and trail descending.
    match order {
        SortOrder::Ascending => left.cmp(&right),
        SortOrder::Descending => right.cmp(&left),
    }
}
