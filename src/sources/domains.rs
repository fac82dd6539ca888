//! Tier 2: URLs in the text, one source per domain.

use super::find_urls;
use verdant_core::message::{Source, SourceKind};

/// Known domains. More specific hosts come before their parents.
const DOMAIN_LABELS: &[(&str, &str, SourceKind)] = &[
    ("wikipedia.org", "Wikipedia", SourceKind::Encyclopedia),
    ("britannica.com", "Encyclopaedia Britannica", SourceKind::Encyclopedia),
    ("pubmed.ncbi.nlm.nih.gov", "PubMed", SourceKind::ScientificLiterature),
    ("ncbi.nlm.nih.gov", "NCBI", SourceKind::ScientificLiterature),
    ("doi.org", "DOI", SourceKind::ScientificLiterature),
    ("scholar.google.com", "Google Scholar", SourceKind::ScientificLiterature),
    ("sciencedirect.com", "ScienceDirect", SourceKind::ScientificLiterature),
    ("springer.com", "Springer", SourceKind::ScientificLiterature),
    ("nature.com", "Nature", SourceKind::ScientificLiterature),
    ("jstor.org", "JSTOR", SourceKind::ScientificLiterature),
    ("researchgate.net", "ResearchGate", SourceKind::ScientificLiterature),
    ("arxiv.org", "arXiv", SourceKind::Repository),
    ("biorxiv.org", "bioRxiv", SourceKind::Repository),
    ("gbif.org", "GBIF", SourceKind::Repository),
    ("inaturalist.org", "iNaturalist", SourceKind::Repository),
    ("zenodo.org", "Zenodo", SourceKind::Repository),
    ("github.com", "GitHub", SourceKind::Repository),
    ("books.google.com", "Google Books", SourceKind::Book),
    ("openlibrary.org", "Open Library", SourceKind::Book),
    ("gutenberg.org", "Project Gutenberg", SourceKind::Book),
];

/// Lowercased host without `www.`. `None` when the URL does not parse or
/// has no host.
pub(super) fn host_of(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    Some(host.strip_prefix("www.").map(str::to_string).unwrap_or(host))
}

fn lookup(host: &str) -> Option<&'static (&'static str, &'static str, SourceKind)> {
    DOMAIN_LABELS.iter().find(|(domain, _, _)| {
        host == *domain
            || host
                .strip_suffix(domain)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

pub(super) fn kind_for_url(url: &str) -> SourceKind {
    host_of(url)
        .and_then(|host| lookup(&host))
        .map_or(SourceKind::WebResource, |(_, _, kind)| *kind)
}

/// Known label for the URL's domain, or the bare host.
pub(super) fn label_for_url(url: &str) -> String {
    match host_of(url) {
        Some(host) => lookup(&host).map_or(host, |(_, label, _)| label.to_string()),
        None => url.to_string(),
    }
}

pub(super) fn sources_from_urls(text: &str) -> Option<Vec<Source>> {
    let mut seen = Vec::new();
    let mut sources = Vec::new();
    for url in find_urls(text) {
        let Some(host) = host_of(url) else {
            continue;
        };
        if seen.contains(&host) {
            continue;
        }
        sources.push(Source {
            title: label_for_url(url),
            url: Some(url.to_string()),
            kind: kind_for_url(url),
        });
        seen.push(host);
    }
    (!sources.is_empty()).then_some(sources)
}
