//! Tier 1: a "Sources" heading followed by itemized entries.

use super::{domains, find_urls, kind_from_emoji, kind_from_tag};
use regex::Regex;
use std::sync::LazyLock;
use verdant_core::message::{Source, SourceKind};

/// A sources section: byte range in the text plus its item lines.
struct Section<'a> {
    start: usize,
    end: usize,
    items: Vec<&'a str>,
}

/// A heading line on its own: optional `#`s or emoji, optional bold, the
/// word, optional colon. Bullets such as "- Source" never match.
static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:#{1,6}\s*)?(?:[\p{So}\x{FE0F}]+\s*)?(?:\*\*|__)?\s*(?:sources?|references|источники|источник|литература|ссылки)\s*:?\s*(?:\*\*|__)?\s*:?$",
    )
    .expect("sources heading regex compilation failed")
});

fn is_sources_heading(line: &str) -> bool {
    item_body(line).is_none() && HEADING_RE.is_match(line.trim())
}

/// Item text without its bullet, or `None` if the line is not an item.
fn item_body(line: &str) -> Option<&str> {
    let line = line.trim_start();
    for bullet in ["- ", "* ", "\u{2022} ", "\u{2013} "] {
        if let Some(rest) = line.strip_prefix(bullet) {
            return Some(rest.trim());
        }
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return Some(rest.trim());
        }
    }
    None
}

/// Every sources section, in order.
fn find_sections(text: &str) -> Vec<Section<'_>> {
    let mut lines = Vec::new();
    let mut pos = 0;
    for line in text.split_inclusive('\n') {
        lines.push((pos, line));
        pos += line.len();
    }

    let mut sections = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let (start, heading) = lines[i];
        if !is_sources_heading(heading.trim()) {
            i += 1;
            continue;
        }

        let mut items = Vec::new();
        let mut end = start + heading.len();
        i += 1;
        while i < lines.len() {
            let (line_start, line) = lines[i];
            let trimmed = line.trim();
            if trimmed.is_empty() {
                i += 1;
                continue;
            }
            match item_body(line) {
                Some(body) => {
                    items.push(body);
                    end = line_start + line.len();
                    i += 1;
                }
                None => break,
            }
        }
        sections.push(Section { start, end, items });
    }
    sections
}

/// `(tag)` groups that are not URLs, with their byte ranges.
fn paren_groups(body: &str) -> Vec<(usize, usize, &str)> {
    let mut groups = Vec::new();
    let mut search_from = 0;
    while let Some(open) = body[search_from..].find('(').map(|i| search_from + i) {
        let Some(close) = body[open..].find(')').map(|i| open + i) else {
            break;
        };
        let inner = body[open + 1..close].trim();
        if !inner.is_empty() && !inner.starts_with("http") {
            groups.push((open, close + 1, inner));
        }
        search_from = close + 1;
    }
    groups
}

fn parse_item(body: &str) -> Option<Source> {
    let url = find_urls(body).into_iter().next();

    // Markdown link: [title](url)
    let link_title = body
        .find('[')
        .zip(body.find("]("))
        .filter(|(open, close)| open < close)
        .map(|(open, close)| body[open + 1..close].trim());

    // Only groups that name a known type count as tags; "(Pinus sylvestris)" stays in the title.
    let tags: Vec<_> = paren_groups(body)
        .into_iter()
        .filter(|(_, _, tag)| kind_from_tag(tag) != SourceKind::Unknown)
        .collect();
    let kind = tags
        .last()
        .map(|(_, _, tag)| kind_from_tag(tag))
        .or_else(|| body.chars().find_map(kind_from_emoji))
        .or_else(|| url.map(domains::kind_for_url))
        .unwrap_or(SourceKind::Unknown);
    if kind == SourceKind::Unknown {
        return None;
    }

    let title = match link_title.filter(|t| !t.is_empty()) {
        Some(t) => t.to_string(),
        None => {
            let mut title = body.to_string();
            for (start, end, _) in tags.iter().rev() {
                title.replace_range(*start..*end, "");
            }
            if let Some(url) = url {
                title = title.replace(url, "");
            }
            title
                .chars()
                .filter(|c| kind_from_emoji(*c).is_none())
                .collect::<String>()
                .trim_matches(|c: char| c.is_whitespace() || "-\u{2013}\u{2014}:|*_\"".contains(c))
                .to_string()
        }
    };

    let title = if title.is_empty() {
        url.map(domains::label_for_url)
            .unwrap_or_else(|| kind.label().to_string())
    } else {
        title
    };

    Some(Source {
        title,
        url: url.map(str::to_string),
        kind,
    })
}

/// Entries of every structured sources section, in order. Entries whose
/// type cannot be resolved are dropped.
pub(super) fn parse_sources_section(text: &str) -> Option<Vec<Source>> {
    let sections = find_sections(text);
    if sections.is_empty() {
        return None;
    }
    Some(
        sections
            .iter()
            .flat_map(|s| s.items.iter())
            .filter_map(|item| parse_item(item))
            .collect(),
    )
}

/// Remove every structured sources section. Idempotent; other headings
/// and the text around the section are left alone.
pub fn strip_sources_section(text: &str) -> String {
    let sections = find_sections(text);
    if sections.is_empty() {
        return text.trim_end().to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for section in &sections {
        out.push_str(&text[cursor..section.start]);
        cursor = section.end;
    }
    let tail = text[cursor..].trim_start_matches('\n');
    if !tail.trim().is_empty() {
        let kept = out.trim_end().len();
        out.truncate(kept);
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str(tail);
    }
    out.trim_end().to_string()
}
