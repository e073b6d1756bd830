//! Keyword matching shared by the built-in relevance predicates.

/// Whether `keyword` occurs in the lower-cased `query`.
///
/// Alphabetic keywords must match on word boundaries ("now" does not
/// match "know"); keywords containing symbols match as substrings.
pub(crate) fn mentions(query: &str, keyword: &str) -> bool {
    let wordlike = keyword.chars().all(|c| c.is_alphabetic() || c == ' ');
    if !wordlike {
        return query.contains(keyword);
    }

    query.match_indices(keyword).any(|(start, matched)| {
        let end = start + matched.len();
        let before = query[..start].chars().next_back();
        let after = query[end..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

pub(crate) fn mentions_any(query: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| mentions(query, k))
}

/// Strip surrounding punctuation from a query word.
pub(crate) fn clean_word(word: &str) -> &str {
    word.trim_matches(|c: char| matches!(c, '.' | ',' | '!' | '?' | ';' | ':' | '"' | '(' | ')'))
}
