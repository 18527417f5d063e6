//! Organization-string normalization for exact-key matching
//!
//! Canonicalizes free-text organization names so that differently punctuated
//! spellings of the same organization produce the same side-table key.

/// Characters replaced with a single space.
const DROP_CHARS: &[char] = &[
    '.', ',', '+', '\'', '"', '-', '–', '_', ':', '/', '\\', '*', '#', '|',
];

/// HTML entities unescaped to their literal characters.
const ENTITIES: &[(&str, &str)] = &[
    ("&amp;", "&"),
    ("&quot;", "\""),
    ("&lt;", "<"),
    ("&gt;", ">"),
];

/// Canonicalize an organization name.
///
/// Lowercases, unescapes a fixed set of HTML entities, replaces a fixed
/// punctuation drop-set with spaces, and collapses whitespace runs to single
/// spaces with no leading or trailing space. Pure and total; idempotent
/// because entities are unescaped before the drop-set pass, so the output
/// contains nothing a second pass would change.
///
/// ```
/// use pfx2org::normalize;
///
/// assert_eq!(normalize("AT&amp;T, Inc."), "at&t inc");
/// ```
pub fn normalize(text: &str) -> String {
    let mut cleaned = text.to_lowercase();
    for (entity, literal) in ENTITIES {
        if cleaned.contains(entity) {
            cleaned = cleaned.replace(entity, literal);
        }
    }
    let spaced: String = cleaned
        .chars()
        .map(|c| if DROP_CHARS.contains(&c) { ' ' } else { c })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}
