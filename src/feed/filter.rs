//! Read-only views over a merged item collection.

use std::collections::BTreeMap;

use crate::types::Item;

/// Selection applied to a collection before display.
///
/// All criteria must hold; an unset criterion matches everything.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    /// Exact category name
    pub category: Option<String>,
    /// Case-insensitive substring of the title or description
    pub search: Option<String>,
    pub favorites_only: bool,
}

impl ItemFilter {
    pub fn matches(&self, item: &Item) -> bool {
        if self.favorites_only && !item.is_favorite {
            return false;
        }

        if let Some(category) = &self.category {
            if item.category != *category {
                return false;
            }
        }

        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                item.title.to_lowercase().contains(&needle)
                    || item.description.to_lowercase().contains(&needle)
            }
            _ => true,
        }
    }

    /// Returns the matching items in their existing order.
    pub fn apply<'a>(&self, items: &'a [Item]) -> Vec<&'a Item> {
        items.iter().filter(|item| self.matches(item)).collect()
    }
}

/// Counts items per category, keyed by category name.
pub fn category_counts(items: &[Item]) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for item in items {
        *counts.entry(item.category.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Flips the favorite flag of the item with `id`.
///
/// Returns the new flag, or `None` if no item has that id.
pub fn toggle_favorite(items: &mut [Item], id: &str) -> Option<bool> {
    let item = items.iter_mut().find(|item| item.id == id)?;
    item.is_favorite = !item.is_favorite;
    tracing::debug!(id = %id, is_favorite = item.is_favorite, "Toggled favorite");
    Some(item.is_favorite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item(id: &str, title: &str, description: &str, category: &str) -> Item {
        Item {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            link: format!("https://news.example.com/{id}"),
            pub_date: String::new(),
            published: None,
            category: category.to_string(),
            source: "Example".to_string(),
            image: None,
            is_favorite: false,
        }
    }

    fn sample() -> Vec<Item> {
        vec![
            item("1", "Chip exports climb", "Semiconductor demand", "Technology"),
            item("2", "Cup final tonight", "Football fans gather", "Sports"),
            item("3", "New phone launch", "Smartphone market heats up", "Technology"),
        ]
    }

    fn ids<'a>(items: &[&'a Item]) -> Vec<&'a str> {
        items.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn test_default_filter_matches_all() {
        let items = sample();
        assert_eq!(ids(&ItemFilter::default().apply(&items)), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_category_filter() {
        let items = sample();
        let filter = ItemFilter {
            category: Some("Technology".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&filter.apply(&items)), vec!["1", "3"]);
    }

    #[test]
    fn test_search_is_case_insensitive_over_title_and_description() {
        let items = sample();
        let filter = ItemFilter {
            search: Some("FOOTBALL".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&filter.apply(&items)), vec!["2"]);

        let filter = ItemFilter {
            search: Some("phone".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&filter.apply(&items)), vec!["3"]);
    }

    #[test]
    fn test_blank_search_ignored() {
        let items = sample();
        let filter = ItemFilter {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(filter.apply(&items).len(), 3);
    }

    #[test]
    fn test_favorites_only_combined_with_category() {
        let mut items = sample();
        assert_eq!(toggle_favorite(&mut items, "2"), Some(true));
        assert_eq!(toggle_favorite(&mut items, "3"), Some(true));

        let filter = ItemFilter {
            category: Some("Technology".to_string()),
            favorites_only: true,
            ..Default::default()
        };
        assert_eq!(ids(&filter.apply(&items)), vec!["3"]);
    }

    #[test]
    fn test_toggle_favorite_twice_and_unknown_id() {
        let mut items = sample();
        assert_eq!(toggle_favorite(&mut items, "1"), Some(true));
        assert_eq!(toggle_favorite(&mut items, "1"), Some(false));
        assert_eq!(toggle_favorite(&mut items, "missing"), None);
        assert!(items.iter().all(|i| !i.is_favorite));
    }

    #[test]
    fn test_category_counts() {
        let items = sample();
        let counts = category_counts(&items);
        assert_eq!(counts.get("Technology"), Some(&2));
        assert_eq!(counts.get("Sports"), Some(&1));
        assert_eq!(counts.get("Health"), None);
    }
}
