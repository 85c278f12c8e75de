//! Local keyword extraction used for tilt projections and topic hints.

use std::collections::HashMap;

const STOPWORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "an", "and", "any", "are", "as", "at", "be", "been",
    "but", "by", "can", "could", "did", "do", "does", "for", "from", "had", "has", "have", "he",
    "her", "his", "how", "i", "if", "in", "into", "is", "it", "its", "just", "me", "more", "my",
    "no", "not", "of", "on", "or", "our", "out", "she", "so", "some", "than", "that", "the",
    "their", "them", "then", "there", "these", "they", "this", "to", "up", "us", "was", "we",
    "were", "what", "when", "where", "which", "who", "why", "will", "with", "would", "you",
    "your",
];

const MIN_TOKEN_LEN: usize = 3;

/// Lower-cased alphanumeric tokens, stopwords removed.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '-' && c != '_')
        .map(|t| t.trim_matches(|c| c == '-' || c == '_').to_lowercase())
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN && !STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// The `limit` most frequent tokens. Ties resolve by first appearance.
pub fn extract_keywords(text: &str, limit: usize) -> Vec<String> {
    let tokens = tokenize(text);
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (pos, token) in tokens.iter().enumerate() {
        let entry = counts.entry(token.as_str()).or_insert((0, pos));
        entry.0 += 1;
    }

    let mut ranked: Vec<(&str, usize, usize)> =
        counts.into_iter().map(|(t, (n, first))| (t, n, first)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));
    ranked
        .into_iter()
        .take(limit)
        .map(|(t, _, _)| t.to_string())
        .collect()
}

/// Split text into sentences on terminal punctuation.
pub fn sentences(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                out.push(trimmed.to_string());
            }
            current.clear();
        }
    }
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_stopwords_and_short_tokens() {
        let tokens = tokenize("The cat is on a mat, by the Graph-Store.");
        assert_eq!(tokens, vec!["cat", "mat", "graph-store"]);
    }

    #[test]
    fn keywords_rank_by_frequency_then_position() {
        let kws = extract_keywords("rust memory rust graph memory rust", 2);
        assert_eq!(kws, vec!["rust", "memory"]);
    }

    #[test]
    fn sentence_split() {
        let s = sentences("One. Two! Three? trailing");
        assert_eq!(s, vec!["One.", "Two!", "Three?", "trailing"]);
    }
}
