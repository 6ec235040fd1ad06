//! Page data contracts and the rank extraction rule
//!
//! [`ExtractedPage`] is the transient, per-check view of one fetched results
//! page; [`rank_of`] turns it into a definitive rank (or "not found"). Both
//! are pure: no I/O, deterministic for a given input.

use serde::{Deserialize, Serialize};

/// One entry in a results-page section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEntry {
    /// 1-based position within the section
    pub position: u32,
    pub title: String,
    /// URL text as displayed on the page (not necessarily the destination)
    pub display_url: String,
    /// Destination link
    pub link: String,
}

/// Structured view of one fetched results page.
///
/// `organic` holds website-type results only. Missing or malformed sections
/// in the source page are represented as empty lists, never as an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedPage {
    pub ads: Vec<ResultEntry>,
    pub organic: Vec<ResultEntry>,
}

/// Determine the rank of the target within a fetched page.
///
/// Scans the ads section in position order; an entry matches when `target`
/// is a substring (case-sensitive) of its displayed URL or its title, and
/// the first match wins. Returns the matching entry's 1-based position.
///
/// Ads-only ranking is an explicit policy, not an oversight: the organic
/// section is captured alongside the ads (and kept for inspection), but the
/// product monitors paid placements, so organic entries never produce a
/// rank. Revisit only if that product decision changes.
pub fn rank_of(page: &ExtractedPage, target: &str) -> Option<u32> {
    page.ads
        .iter()
        .find(|entry| entry.display_url.contains(target) || entry.title.contains(target))
        .map(|entry| entry.position)
}
