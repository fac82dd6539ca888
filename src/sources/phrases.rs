//! Tier 3: source-type phrases, when the text has no URLs.

use verdant_core::message::{Source, SourceKind};

const PHRASES: &[(&str, SourceKind)] = &[
    ("scientific literature", SourceKind::ScientificLiterature),
    ("scientific research", SourceKind::ScientificLiterature),
    ("peer-reviewed", SourceKind::ScientificLiterature),
    ("knowledge base", SourceKind::KnowledgeBase),
    ("web search", SourceKind::WebSearch),
    ("internet search", SourceKind::WebSearch),
    ("encyclopedia", SourceKind::Encyclopedia),
    ("field guide", SourceKind::Book),
];

/// One bare source per distinct phrase, in order of first mention.
pub(super) fn sources_from_phrases(text: &str) -> Option<Vec<Source>> {
    let lower = text.to_lowercase();
    let mut found: Vec<(usize, &str, SourceKind)> = PHRASES
        .iter()
        .filter_map(|(phrase, kind)| lower.find(phrase).map(|pos| (pos, *phrase, *kind)))
        .collect();
    if found.is_empty() {
        return None;
    }
    found.sort_by_key(|(pos, _, _)| *pos);

    Some(
        found
            .into_iter()
            .map(|(_, phrase, kind)| Source {
                title: capitalize(phrase),
                url: None,
                kind,
            })
            .collect(),
    )
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
