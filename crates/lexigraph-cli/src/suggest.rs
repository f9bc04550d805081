//! "Did you mean" verb suggestions using nucleo

use nucleo_matcher::{
    pattern::{AtomKind, CaseMatching, Normalization, Pattern},
    Config, Matcher, Utf32Str,
};

use lexigraph_core::Registry;

/// Registered verbs closest to any word of `text`, best first.
pub fn suggest_verbs(verbs: &Registry, text: &str, limit: usize) -> Vec<String> {
    let words: Vec<&str> = text
        .split(|c: char| c.is_whitespace() || c == '?')
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        return Vec::new();
    }

    let patterns: Vec<Pattern> = words
        .iter()
        .map(|w| Pattern::new(w, CaseMatching::Ignore, Normalization::Smart, AtomKind::Fuzzy))
        .collect();
    let mut matcher = Matcher::new(Config::DEFAULT);
    let mut buf = Vec::new();

    let mut scored: Vec<(u32, &str)> = verbs
        .iter()
        .filter_map(|(_, verb)| {
            patterns
                .iter()
                .filter_map(|p| p.score(Utf32Str::new(verb, &mut buf), &mut matcher))
                .max()
                .map(|score| (score, verb))
        })
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    scored
        .into_iter()
        .take(limit)
        .map(|(_, verb)| verb.to_string())
        .collect()
}
