//! Keyword and bigram extraction from script text.
//!
//! The resulting tag phrase is used as a second, shorter search query and
//! is shown next to each match.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

const MAX_KEYWORDS: usize = 12;
const MAX_BIGRAMS: usize = 4;
const MAX_TAGS: usize = 15;
const MIN_KEYWORD_CHARS: usize = 4;
const MIN_BIGRAM_CHARS: usize = 8;

const STOP_WORDS: &[&str] = &[
    "и", "в", "на", "с", "по", "к", "о", "за", "для", "как", "что", "это", "из", "или", "но",
    "the", "and", "for", "with", "about", "from", "into", "over", "under", "been", "were",
    "was", "are", "you", "your", "our", "мы", "они", "она", "он", "его", "ее", "их", "там",
    "then", "than", "that", "this", "those", "these", "потом", "тогда", "еще", "ещё",
];

fn token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[A-Za-zА-Яа-яёЁ0-9]+").expect("valid token regex"))
}

fn stop_words() -> &'static HashSet<&'static str> {
    static WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    WORDS.get_or_init(|| STOP_WORDS.iter().copied().collect())
}

/// Extract up to 12 keywords followed by up to 4 bigrams.
pub fn extract_tags(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let tokens: Vec<&str> = token_pattern()
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .collect();
    let stop = stop_words();

    let mut keywords = Vec::new();
    let mut seen = HashSet::new();
    for token in &tokens {
        if token.chars().count() < MIN_KEYWORD_CHARS || stop.contains(token) {
            continue;
        }
        if seen.insert(*token) {
            keywords.push(token.to_string());
        }
        if keywords.len() >= MAX_KEYWORDS {
            break;
        }
    }

    let mut bigrams = Vec::new();
    for pair in tokens.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if stop.contains(a) || stop.contains(b) {
            continue;
        }
        let phrase = format!("{} {}", a, b);
        if phrase.chars().count() >= MIN_BIGRAM_CHARS {
            bigrams.push(phrase);
        }
        if bigrams.len() >= MAX_BIGRAMS {
            break;
        }
    }

    keywords.extend(bigrams);
    keywords.truncate(MAX_TAGS);
    keywords
}

/// The tag sub-query: tags joined with ", ". Empty when no tag qualifies.
pub fn tag_query(text: &str) -> String {
    extract_tags(text).join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_skip_short_and_stop_words() {
        let tags = extract_tags("The mountain and the river were calm");
        assert!(tags.contains(&"mountain".to_string()));
        assert!(tags.contains(&"river".to_string()));
        assert!(tags.contains(&"calm".to_string()));
        assert!(!tags.iter().any(|t| t == "the" || t == "were" || t == "and"));
    }

    #[test]
    fn test_bigrams_need_length_and_no_stop_words() {
        let tags = extract_tags("snowy mountain at dawn");
        assert!(tags.contains(&"snowy mountain".to_string()));
        // "at dawn" is only 7 chars.
        assert!(!tags.contains(&"at dawn".to_string()));
    }

    #[test]
    fn test_keywords_are_unique_and_capped() {
        let text = (0..30)
            .map(|i| format!("word{:02}", i % 20))
            .collect::<Vec<_>>()
            .join(" ");
        let tags = extract_tags(&text);
        let keywords: Vec<_> = tags.iter().filter(|t| !t.contains(' ')).collect();
        assert_eq!(keywords.len(), 12);
        let bigrams: Vec<_> = tags.iter().filter(|t| t.contains(' ')).collect();
        // 12 + 4 is cut to 15.
        assert_eq!(bigrams.len(), 3);
        assert_eq!(tags.len(), 15);
    }

    #[test]
    fn test_cyrillic_tokens() {
        let tags = extract_tags("Горный пейзаж и река");
        assert!(tags.contains(&"горный".to_string()));
        assert!(tags.contains(&"горный пейзаж".to_string()));
        assert!(!tags.iter().any(|t| t.contains(" и")));
    }

    #[test]
    fn test_empty_text() {
        assert!(extract_tags("").is_empty());
        assert_eq!(tag_query("a b c"), "");
    }
}
