//! Prompt profanity masking.
//!
//! Blocked words are matched case-insensitively on word boundaries and
//! replaced with one `*` per character, so `"Damn it"` becomes `"**** it"`.

use regex::{Regex, RegexBuilder};
use tracing::warn;

const DEFAULT_BLOCKED_WORDS: &[&str] = &[
    "arse",
    "arsehole",
    "ass",
    "asshole",
    "bastard",
    "bitch",
    "bollocks",
    "bullshit",
    "crap",
    "cunt",
    "damn",
    "dick",
    "dickhead",
    "fuck",
    "fucked",
    "fucker",
    "fucking",
    "motherfucker",
    "piss",
    "pissed",
    "prick",
    "shit",
    "shitty",
    "slut",
    "twat",
    "wanker",
    "whore",
];

#[derive(Debug, Clone)]
pub struct ProfanityFilter {
    /// `None` only if the word list failed to compile; text then passes through.
    pattern: Option<Regex>,
}

impl ProfanityFilter {
    /// Filter over the built-in word list plus `extra` words.
    ///
    /// Blank entries in `extra` are ignored.
    pub fn new<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut words: Vec<String> = DEFAULT_BLOCKED_WORDS.iter().map(|w| w.to_string()).collect();
        words.extend(
            extra
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty()),
        );
        // Longest first so alternation never stops at a shorter prefix.
        words.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        words.dedup();

        let alternation = words
            .iter()
            .map(|w| regex::escape(w))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = match RegexBuilder::new(&format!(r"\b(?:{alternation})\b"))
            .case_insensitive(true)
            .build()
        {
            Ok(re) => Some(re),
            Err(e) => {
                warn!(error = %e, words = words.len(), "blocked word list failed to compile; filtering disabled");
                None
            }
        };

        Self { pattern }
    }

    /// Mask every blocked word in `text`.
    pub fn clean(&self, text: &str) -> String {
        match &self.pattern {
            Some(re) => re
                .replace_all(text, |caps: &regex::Captures<'_>| {
                    "*".repeat(caps[0].chars().count())
                })
                .into_owned(),
            None => text.to_owned(),
        }
    }

    pub fn is_clean(&self, text: &str) -> bool {
        self.pattern.as_ref().is_none_or(|re| !re.is_match(text))
    }
}

impl Default for ProfanityFilter {
    fn default() -> Self {
        Self::new(std::iter::empty::<&str>())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn masks_whole_words_case_insensitively() {
        let f = ProfanityFilter::default();
        assert_eq!(f.clean("Damn it"), "**** it");
        assert_eq!(f.clean("what the FUCK"), "what the ****");
    }

    #[test]
    fn leaves_substrings_of_clean_words_alone() {
        let f = ProfanityFilter::default();
        assert_eq!(f.clean("a classic assessment"), "a classic assessment");
        assert!(f.is_clean("Scunthorpe"));
    }

    #[test]
    fn clean_text_round_trips_unchanged() {
        let f = ProfanityFilter::default();
        let prompt = "Write a haiku about autumn leaves.";
        assert_eq!(f.clean(prompt), prompt);
    }

    #[test]
    fn extra_words_are_blocked() {
        let f = ProfanityFilter::new(["frak", "  ", "Gorram"]);
        assert_eq!(f.clean("frak this gorram ship"), "**** this ****** ship");
    }

    #[test]
    fn prefers_longest_match() {
        let f = ProfanityFilter::default();
        assert_eq!(f.clean("asshole"), "*******");
    }
}
