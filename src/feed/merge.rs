//! Combining per-source batches into one collection.
//!
//! Each step is a pure function over owned vectors so the aggregator and
//! the property tests exercise exactly the same code.

use std::cmp::Reverse;
use std::collections::HashSet;

use crate::types::Item;

/// Concatenates batches, dedups by link, sorts newest first and carries
/// favorite flags over from `previous`.
///
/// Batch order decides dedup survivorship: when two batches share a link,
/// the item from the earlier batch is kept.
pub fn merge(batches: Vec<Vec<Item>>, previous: &[Item]) -> Vec<Item> {
    let items = batches.into_iter().flatten().collect();
    let mut items = sort_newest_first(dedup_by_link(items));
    reconcile_favorites(&mut items, previous);
    items
}

/// Drops every item whose link was already seen, keeping the first.
pub fn dedup_by_link(items: Vec<Item>) -> Vec<Item> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .into_iter()
        .filter(|item| seen.insert(item.link.clone()))
        .collect()
}

/// Orders by publication time, newest first.
///
/// Items without a parseable date sort after every dated item. The sort is
/// stable, so equal timestamps keep their incoming order.
pub fn sort_newest_first(mut items: Vec<Item>) -> Vec<Item> {
    items.sort_by_key(|item| Reverse(item.published));
    items
}

/// Sets `is_favorite` on every item whose link was a favorite in
/// `previous`, and clears it on all others.
pub fn reconcile_favorites(items: &mut [Item], previous: &[Item]) {
    let favorites: HashSet<&str> = previous
        .iter()
        .filter(|item| item.is_favorite)
        .map(|item| item.link.as_str())
        .collect();

    for item in items.iter_mut() {
        item.is_favorite = favorites.contains(item.link.as_str());
    }
}
