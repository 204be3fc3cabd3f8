//! Tokenizer shared by indexing and querying.

use crate::primitives::MAX_DISCARDED_TOKEN_LEN;

/// Split text into index terms.
///
/// Lowercases, drops every character that is neither alphanumeric nor
/// whitespace, splits on whitespace and discards terms of
/// `MAX_DISCARDED_TOKEN_LEN` characters or fewer. Duplicates are kept.
pub fn tokenize(text: &str) -> Vec<String> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();

    cleaned
        .split_whitespace()
        .filter(|term| term.chars().count() > MAX_DISCARDED_TOKEN_LEN)
        .map(str::to_string)
        .collect()
}
