/// Decides whether a primary reply is a real answer or a refusal.
pub trait FallbackDetector: Send + Sync {
    fn is_usable(&self, text: &str) -> bool;
}

/// Phrases that mark a primary reply as a refusal or an error.
///
/// Matched as lowercase substrings, so "error" also trips on any answer
/// that merely mentions an error.
pub const DEFAULT_FALLBACK_PHRASES: &[&str] = &[
    "i cannot",
    "i am unable",
    "i don't have access",
    "i cannot access",
    "i don't have real-time",
    "i cannot provide real-time",
    "i cannot browse",
    "i don't have the ability",
    "error",
    "fallback",
    "unable to search",
    "cannot search the web",
    "no access to current",
    "cannot access current",
];

/// Substring detector over a lowercase phrase list.
///
/// A refusal worded in a way the list doesn't cover is accepted as usable.
#[derive(Debug, Clone)]
pub struct PhraseDetector {
    phrases: Vec<String>,
}

impl Default for PhraseDetector {
    fn default() -> Self {
        Self {
            phrases: DEFAULT_FALLBACK_PHRASES
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

impl PhraseDetector {
    /// Adds phrases to the default list. Blank entries are skipped.
    pub fn with_extra_phrases<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for phrase in extra {
            let phrase = phrase.as_ref().trim().to_lowercase();
            if !phrase.is_empty() && !self.phrases.contains(&phrase) {
                self.phrases.push(phrase);
            }
        }
        self
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }
}

impl FallbackDetector for PhraseDetector {
    fn is_usable(&self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }
        let lower = text.to_lowercase();
        match self.phrases.iter().find(|p| lower.contains(p.as_str())) {
            Some(phrase) => {
                tracing::debug!(phrase = %phrase, "Primary reply matched fallback phrase");
                false
            }
            None => true,
        }
    }
}
