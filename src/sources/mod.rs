//! Reply post-processing: pull cited sources out of model output.
//!
//! Sources come from the first tier of the cascade that finds any:
//! 1. a structured "Sources" section,
//! 2. URLs anywhere in the text, one source per domain,
//! 3. known source-type phrases.
//!
//! Nothing is synthesized when no tier finds evidence. The structured
//! section is always stripped from the display text.

mod domains;
mod phrases;
mod structured;

#[cfg(test)]
mod tests;

pub use structured::strip_sources_section;

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;
use verdant_core::message::{Source, SourceKind};

/// Display text and the sources cited by a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub display_text: String,
    pub sources: Vec<Source>,
}

/// A cascade tier. `None` means "no evidence here, try the next tier".
type Tier = fn(&str) -> Option<Vec<Source>>;

const CASCADE: &[(&str, Tier)] = &[
    ("structured", structured::parse_sources_section),
    ("urls", domains::sources_from_urls),
    ("phrases", phrases::sources_from_phrases),
];

/// Split a raw model reply into display text and sources.
pub fn extract(raw: &str) -> Extracted {
    let sources = CASCADE
        .iter()
        .find_map(|(name, tier)| {
            let found = tier(raw).filter(|s| !s.is_empty())?;
            debug!("sources: {} from {name} tier", found.len());
            Some(found)
        })
        .unwrap_or_default();

    Extracted {
        display_text: strip_sources_section(raw),
        sources,
    }
}

/// Append a plain sources list to a reply, for chat transports.
pub fn render_for_chat(display_text: &str, sources: &[Source]) -> String {
    if sources.is_empty() {
        return display_text.to_string();
    }
    let mut out = String::from(display_text.trim_end());
    out.push_str("\n\nSources:");
    for source in sources {
        out.push_str(&format!("\n- {} ({})", source.title, source.kind.label()));
        if let Some(url) = &source.url {
            out.push(' ');
            out.push_str(url);
        }
    }
    out
}

/// Whole-word patterns for type tags. Earlier rules win, so "web search"
/// resolves before the bare "web".
static TAG_RULES: LazyLock<Vec<(Regex, SourceKind)>> = LazyLock::new(|| {
    [
        (r"\b(knowledge|kb)\b", SourceKind::KnowledgeBase),
        (
            r"\b(scientific|literature|research|papers?|journals?|study|studies|articles?|научн\w*|литератур\w*)\b",
            SourceKind::ScientificLiterature,
        ),
        (r"\b(search|поиск\w*)\b", SourceKind::WebSearch),
        (r"\b(encyclop\w*|wiki\w*|энциклопед\w*)", SourceKind::Encyclopedia),
        (r"\b(books?|field guides?|книг\w*)\b", SourceKind::Book),
        (
            r"\b(repositor\w*|repos?|datasets?|databases?)\b",
            SourceKind::Repository,
        ),
        (
            r"\b(web|websites?|webpages?|sites?|online|resources?|сайт\w*)\b",
            SourceKind::WebResource,
        ),
    ]
    .into_iter()
    .map(|(pattern, kind)| {
        (
            Regex::new(pattern).expect("source tag regex compilation failed"),
            kind,
        )
    })
    .collect()
});

/// `http(s)://` runs up to whitespace, brackets or quotes.
static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^\s()\[\]<>"']+"#).expect("url regex compilation failed")
});

/// Map a free-form type tag such as "(scientific literature)" to a kind.
/// Only whole words count: "(parasite)" is not a site.
pub(crate) fn kind_from_tag(tag: &str) -> SourceKind {
    let tag = tag.trim().to_lowercase();
    TAG_RULES
        .iter()
        .find(|(re, _)| re.is_match(&tag))
        .map_or(SourceKind::Unknown, |(_, kind)| *kind)
}

/// Map a type emoji to a kind.
pub(crate) fn kind_from_emoji(ch: char) -> Option<SourceKind> {
    match ch {
        '\u{1f4da}' | '\u{1f4d5}' | '\u{1f4d7}' => Some(SourceKind::Book), // books
        '\u{1f4d6}' => Some(SourceKind::Encyclopedia),                      // open book
        '\u{1f52c}' | '\u{1f9ea}' => Some(SourceKind::ScientificLiterature), // microscope, test tube
        '\u{1f310}' | '\u{1f50d}' | '\u{1f50e}' => Some(SourceKind::WebSearch), // globe, magnifiers
        '\u{1f9e0}' => Some(SourceKind::KnowledgeBase),                     // brain
        '\u{1f4be}' | '\u{1f5c4}' => Some(SourceKind::Repository),          // disk, cabinet
        _ => None,
    }
}

/// `http(s)://` URLs in order of appearance, trailing punctuation removed.
pub(crate) fn find_urls(text: &str) -> Vec<&str> {
    URL_RE
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']))
        .filter(|url| !url.ends_with("://"))
        .collect()
}
