//! The tally reducer and the derived winner/rank view.
//!
//! Everything here is pure: the connection manager parses frames into
//! [`TallyEvent`]s and the GUI thread applies them one at a time, so no
//! locking is needed beyond the caller's own serialization.

use crate::models::votes::VotingItem;
use crate::models::websocket::TallyEvent;

/// Applies one tally event and returns the fully re-ranked collection.
///
/// An event whose target is not in the collection is a no-op: the feed is
/// scoped to the SMS short-code, not to the page's participant subset, so
/// unknown ids are expected and not an error. `votes_percents` is left as
/// the bulk load set it; only a fresh fetch can recompute it.
pub fn apply(items: Vec<VotingItem>, event: &TallyEvent) -> Vec<VotingItem> {
    let mut items = items;
    if let Some(item) = items.iter_mut().find(|i| i.id == event.voting_item_id) {
        item.votes_count += event.increment;
    }
    rank(items)
}

/// Sorts descending by vote count. The sort is stable, so entries with equal
/// counts keep their relative order and tied rows do not jitter as live
/// events arrive one at a time.
pub fn rank(mut items: Vec<VotingItem>) -> Vec<VotingItem> {
    items.sort_by(|a, b| b.votes_count.cmp(&a.votes_count));
    items
}

/// Vote count of the rank-0 entry, 0 for an empty collection.
pub fn top_count(items: &[VotingItem]) -> u64 {
    items.first().map(|item| item.votes_count).unwrap_or(0)
}

/// Entries tied with rank 0 AND already at 100 percent. Ties produced purely
/// by live increments carry a stale percentage and will not show up here
/// until the next bulk reload; that matches the backend-facing behavior.
pub fn winners(items: &[VotingItem]) -> Vec<&VotingItem> {
    let top = top_count(items);
    items
        .iter()
        .filter(|item| item.votes_count == top && item.votes_percents == 100.0)
        .collect()
}

pub fn winners_count(items: &[VotingItem]) -> usize {
    winners(items).len()
}
