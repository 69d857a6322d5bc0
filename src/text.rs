//! Text helpers for case and accent insensitive search.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Build the searchable form of a transaction description.
///
/// Diacritics are stripped, the text is lower-cased, and runs of whitespace
/// are collapsed to a single space.
///
/// ```
/// use budgeteur_ledger::normalize_description;
///
/// assert_eq!(normalize_description("  Café   CRÈME\tbrûlée "), "cafe creme brulee");
/// ```
pub fn normalize_description(description: &str) -> String {
    let stripped: String = description
        .nfd()
        .filter(|character| !is_combining_mark(*character))
        .collect();

    stripped
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
