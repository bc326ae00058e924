use std::collections::HashSet;

/// Word-overlap ratio between two texts: `|A ∩ B| / max(|A|, |B|)` over the
/// sets of lower-cased words. Zero when either side has no words.
pub fn similarity(a: &str, b: &str) -> f64 {
    let words_a = words(a);
    let words_b = words(b);

    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    let common = words_a.intersection(&words_b).count();
    common as f64 / words_a.len().max(words_b.len()) as f64
}

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}
