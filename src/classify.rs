//! Keyword-based category assignment.
//!
//! Rules are a priority list: the first rule with a keyword contained in the
//! item text wins, and within a rule the keywords are tried in order. There
//! is no scoring, so moving a rule up changes results for any text that
//! matches more than one rule.

use serde::Deserialize;

use crate::types::DEFAULT_CATEGORY;

/// A named category with its ordered keyword list and display metadata.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub icon: String,
}

impl CategoryRule {
    fn new(name: &str, color: &str, icon: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            // Stored lowercased so matching never allocates per keyword.
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            color: color.to_string(),
            icon: icon.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<CategoryRule>,
}

impl Classifier {
    /// Builds a classifier over `rules` in the given order.
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|mut rule| {
                rule.keywords = rule
                    .keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect();
                rule
            })
            .collect();
        Self { rules }
    }

    /// Returns the category for an item with the given title and description.
    ///
    /// Falls back to [`DEFAULT_CATEGORY`] when no keyword matches.
    pub fn classify(&self, title: &str, description: &str) -> &str {
        let content = format!("{} {}", title, description).to_lowercase();

        for rule in &self.rules {
            if rule.keywords.iter().any(|k| content.contains(k.as_str())) {
                return &rule.name;
            }
        }

        DEFAULT_CATEGORY
    }

    /// Looks up display metadata for a category name.
    pub fn rule(&self, name: &str) -> Option<&CategoryRule> {
        self.rules.iter().find(|r| r.name == name)
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

/// The built-in rule list, in priority order.
pub fn default_rules() -> Vec<CategoryRule> {
    vec![
        CategoryRule::new(
            "Technology",
            "bg-blue-500",
            "Cpu",
            &[
                "tech",
                "technology",
                "software",
                "ai",
                "artificial intelligence",
                "computer",
                "digital",
                "internet",
                "cybersecurity",
                "blockchain",
                "cryptocurrency",
                "cyber",
                "security",
                "data breach",
                "malware",
                "network",
                "cloud",
            ],
        ),
        CategoryRule::new(
            "Sports",
            "bg-green-500",
            "Trophy",
            &[
                "sports",
                "football",
                "basketball",
                "soccer",
                "tennis",
                "baseball",
                "hockey",
                "olympics",
                "championship",
                "match",
                "game",
                "athlete",
            ],
        ),
        CategoryRule::new(
            "Politics",
            "bg-red-500",
            "Vote",
            &[
                "politics",
                "government",
                "election",
                "president",
                "congress",
                "senate",
                "policy",
                "vote",
                "campaign",
                "democracy",
                "legislation",
            ],
        ),
        CategoryRule::new(
            "Business",
            "bg-purple-500",
            "Briefcase",
            &[
                "business",
                "economy",
                "finance",
                "market",
                "stock",
                "investment",
                "company",
                "corporate",
                "earnings",
                "revenue",
                "startup",
            ],
        ),
        CategoryRule::new(
            "Health",
            "bg-pink-500",
            "Heart",
            &[
                "health",
                "medical",
                "medicine",
                "hospital",
                "doctor",
                "treatment",
                "disease",
                "wellness",
                "fitness",
                "nutrition",
            ],
        ),
        CategoryRule::new(
            "Weather",
            "bg-orange-500",
            "Cloud",
            &[
                "weather",
                "storm",
                "hurricane",
                "temperature",
                "climate",
                "rain",
                "snow",
                "forecast",
                "meteorology",
            ],
        ),
        CategoryRule::new(
            "Entertainment",
            "bg-indigo-500",
            "Film",
            &[
                "entertainment",
                "movie",
                "film",
                "music",
                "celebrity",
                "hollywood",
                "tv",
                "television",
                "streaming",
                "concert",
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str, keywords: &[&str]) -> CategoryRule {
        CategoryRule::new(name, "", "", keywords)
    }

    #[test]
    fn test_no_match_is_general() {
        let classifier = Classifier::default();
        assert_eq!(classifier.classify("Quiet day", "Nothing of note"), "General");
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let classifier = Classifier::default();
        assert_eq!(
            classifier.classify("HURRICANE warning issued", ""),
            "Weather"
        );
    }

    #[test]
    fn test_description_participates() {
        let classifier = Classifier::default();
        assert_eq!(
            classifier.classify("Update", "The senate passed the bill"),
            "Politics"
        );
    }

    #[test]
    fn test_earlier_rule_wins_over_later() {
        let classifier = Classifier::default();
        // "election" (Politics) and "software" (Technology): Technology is first.
        assert_eq!(
            classifier.classify("Election software audited", ""),
            "Technology"
        );
    }

    #[test]
    fn test_rule_order_is_priority() {
        let a = Classifier::new(vec![rule("A", &["apple"]), rule("B", &["banana"])]);
        let b = Classifier::new(vec![rule("B", &["banana"]), rule("A", &["apple"])]);
        let text = "apple and banana";
        assert_eq!(a.classify(text, ""), "A");
        assert_eq!(b.classify(text, ""), "B");
    }

    #[test]
    fn test_substring_match_not_word_match() {
        // "ai" matches inside "said": the matcher is a plain substring test.
        let classifier = Classifier::default();
        assert_eq!(classifier.classify("Officials said", ""), "Technology");
    }

    #[test]
    fn test_configured_keywords_are_normalized() {
        let classifier = Classifier::new(vec![CategoryRule {
            name: "Space".to_string(),
            keywords: vec!["  NASA ".to_string(), "".to_string()],
            color: String::new(),
            icon: String::new(),
        }]);
        assert_eq!(classifier.classify("nasa launch", ""), "Space");
        assert_eq!(classifier.classify("nothing", ""), "General");
    }

    #[test]
    fn test_rule_lookup() {
        let classifier = Classifier::default();
        let rule = classifier.rule("Health").unwrap();
        assert_eq!(rule.icon, "Heart");
        assert!(classifier.rule("General").is_none());
    }
}
