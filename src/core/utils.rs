use std::collections::HashSet;

/// Removes duplicates while keeping the first occurrence of each value.
pub fn dedup_preserving_order(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values.into_iter().filter(|value| seen.insert(value.clone())).collect()
}

/// Appends every value of `incoming` not already in `target`.
pub fn merge_unique(target: &mut Vec<String>, incoming: &[String]) {
    let mut seen: HashSet<String> = target.iter().cloned().collect();
    for value in incoming {
        if seen.insert(value.clone()) {
            target.push(value.clone());
        }
    }
}

/// Standard (U+FE00..U+FE0F) and ideographic (U+E0100..U+E01EF) variation selectors.
fn is_variation_selector(c: char) -> bool {
    matches!(c, '\u{FE00}'..='\u{FE0F}' | '\u{E0100}'..='\u{E01EF}')
}

/// One base character, optionally followed by variation selectors.
/// Other multi-codepoint clusters (combining marks, ZWJ sequences) count as several.
pub fn is_single_grapheme(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(base) if !is_variation_selector(base) => chars.all(is_variation_selector),
        _ => false,
    }
}
