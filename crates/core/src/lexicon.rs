//! Per-language word lists and the matchers built from them.
//!
//! English (`en`) and Turkish (`tr`) are built in; unknown languages fall
//! back to English.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("valid word pattern"));

const EN_FILLERS: &[&str] = &[
    "um", "uh", "uhm", "umm", "er", "erm", "ah", "hmm", "like", "you know", "i mean", "basically",
    "actually", "literally", "kind of", "sort of",
];

const TR_FILLERS: &[&str] = &[
    "eee", "ee", "ııı", "şey", "işte", "yani", "hani", "böyle", "falan", "filan", "tabi", "tabii",
    "şöyle", "böylece", "um", "uh", "hmm", "ah", "oh",
];

const EN_STOP_WORDS: &[&str] = &[
    "about", "above", "after", "again", "also", "been", "before", "being", "below", "between",
    "both", "could", "does", "doing", "down", "during", "each", "even", "from", "further", "going",
    "have", "having", "here", "into", "just", "like", "make", "many", "more", "most", "much",
    "must", "need", "only", "other", "ours", "over", "really", "right", "same", "should", "some",
    "such", "than", "that", "their", "them", "then", "there", "these", "they", "thing", "things",
    "this", "those", "through", "under", "until", "very", "want", "were", "what", "when",
    "where", "which", "while", "will", "with", "would", "your", "yours", "okay", "know", "because",
    "actually", "basically", "going", "gonna", "wanna", "something", "everything", "anything",
];

const TR_STOP_WORDS: &[&str] = &[
    "bir", "bu", "da", "de", "den", "ile", "için", "gibi", "daha", "ve", "var", "yok", "olan",
    "çok", "tüm", "her", "ama", "ancak", "bunu", "buna", "bunlar", "şimdi", "sonra", "kadar",
    "diye", "olarak", "oldu", "olur", "şekilde", "yani", "işte", "hani", "böyle", "şöyle",
    "değil", "nasıl", "neden", "çünkü", "eğer", "veya", "ayrıca", "hepsi", "biraz", "burada",
];

/// Discourse markers that signal an example, a question or an invitation.
const EN_INTERACTION_MARKERS: &[&str] = &[
    "for example",
    "for instance",
    "such as",
    "let's consider",
    "let us consider",
    "imagine",
    "suppose",
    "let's look",
    "let's see",
    "let's try",
    "think about",
    "what if",
    "have you",
    "can you",
    "do you",
    "question",
    "notice",
];

const TR_INTERACTION_MARKERS: &[&str] = &[
    "örnek",
    "örneğin",
    "mesela",
    "şöyle",
    "böyle",
    "soru",
    "soruyor",
    "düşünelim",
    "bakalım",
    "gördüğünüz",
    "dikkat",
    "fark ettiniz",
    "yapabiliriz",
    "deneyebiliriz",
    "uygulayalım",
];

fn filler_words(language: &str) -> &'static [&'static str] {
    match language {
        "tr" => TR_FILLERS,
        _ => EN_FILLERS,
    }
}

fn interaction_markers(language: &str) -> &'static [&'static str] {
    match language {
        "tr" => TR_INTERACTION_MARKERS,
        _ => EN_INTERACTION_MARKERS,
    }
}

pub fn stop_words(language: &str) -> HashSet<&'static str> {
    match language {
        "tr" => TR_STOP_WORDS.iter().copied().collect(),
        _ => EN_STOP_WORDS.iter().copied().collect(),
    }
}

/// Number of `\w+` runs, the word count used for rates and ratios.
pub fn count_words(text: &str) -> usize {
    WORD.find_iter(text).count()
}

pub fn words(text: &str) -> impl Iterator<Item = &str> {
    WORD.find_iter(text).map(|m| m.as_str())
}

/// Whole-word, case-insensitive matcher over a fixed list of phrases.
#[derive(Debug, Clone)]
pub struct PhraseMatcher {
    pattern: Regex,
}

impl PhraseMatcher {
    pub fn new(phrases: &[&str]) -> Result<Self, regex::Error> {
        let alternation = phrases
            .iter()
            .map(|p| regex::escape(p))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"(?i)\b(?:{})\b", alternation))?;
        Ok(Self { pattern })
    }

    pub fn fillers(language: &str) -> Result<Self, regex::Error> {
        Self::new(filler_words(language))
    }

    pub fn interaction_markers(language: &str) -> Result<Self, regex::Error> {
        Self::new(interaction_markers(language))
    }

    pub fn count(&self, text: &str) -> usize {
        self.pattern.find_iter(&text.to_lowercase()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fillers_match_whole_words_only() {
        let fillers = PhraseMatcher::fillers("en").unwrap();
        assert_eq!(fillers.count("Um, so the umbrella, uh, you know, works"), 3);
        assert_eq!(fillers.count("humdrum errands"), 0);
    }

    #[test]
    fn matching_ignores_case() {
        let fillers = PhraseMatcher::fillers("en").unwrap();
        assert_eq!(fillers.count("UM Uh LIKE"), 3);
    }

    #[test]
    fn turkish_lexicon_handles_non_ascii() {
        let fillers = PhraseMatcher::fillers("tr").unwrap();
        assert_eq!(fillers.count("Şey, yani bu konu işte önemli"), 3);
    }

    #[test]
    fn unknown_language_falls_back_to_english() {
        let markers = PhraseMatcher::interaction_markers("de").unwrap();
        assert_eq!(markers.count("For example, imagine a queue."), 2);
    }

    #[test]
    fn words_are_alphanumeric_runs() {
        assert_eq!(count_words("Hello, world! It's 2024."), 5);
        assert_eq!(count_words("   "), 0);
    }
}
