//! Feed document lists.

use crate::types::{Feed, Page, sort_by_date};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;

/// Build one [`Feed`] per configured feed type.
///
/// Each feed lists every dated page, newest first, and is stamped with
/// `now`. Undated pages never appear in a feed.
pub fn assemble(
    pages: &IndexMap<String, Page>,
    feeds: &IndexMap<String, String>,
    now: DateTime<Utc>,
) -> IndexMap<String, Feed> {
    let mut dated: Vec<String> = pages
        .iter()
        .filter(|(_, page)| page.date.is_some())
        .map(|(key, _)| key.clone())
        .collect();
    sort_by_date(&mut dated, pages);

    feeds
        .iter()
        .map(|(kind, url)| {
            (
                kind.clone(),
                Feed {
                    url: url.clone(),
                    pages: dated.clone(),
                    date: now,
                },
            )
        })
        .collect()
}
