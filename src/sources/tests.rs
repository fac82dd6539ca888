use super::*;

#[test]
fn test_structured_section_preserves_order_and_strips() {
    let raw = "Birches are pioneer trees.\n\n\
               Sources:\n\
               - Flora of Russia (book)\n\
               - Birch ecology review (scientific literature) https://doi.org/10.1000/xyz\n\
               - Internal notes (knowledge base)\n";
    let out = extract(raw);
    assert_eq!(out.display_text, "Birches are pioneer trees.");
    let titles: Vec<_> = out.sources.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(
        titles,
        ["Flora of Russia", "Birch ecology review", "Internal notes"]
    );
    assert_eq!(out.sources[0].kind, SourceKind::Book);
    assert_eq!(out.sources[1].kind, SourceKind::ScientificLiterature);
    assert_eq!(
        out.sources[1].url.as_deref(),
        Some("https://doi.org/10.1000/xyz")
    );
    assert_eq!(out.sources[2].kind, SourceKind::KnowledgeBase);
}

#[test]
fn test_structured_entry_without_type_is_dropped() {
    let raw = "Answer.\n\nSources:\n1. Grandmother's stories\n2. Field notes (web search)\n";
    let out = extract(raw);
    assert_eq!(out.sources.len(), 1);
    assert_eq!(out.sources[0].title, "Field notes");
    assert_eq!(out.sources[0].kind, SourceKind::WebSearch);
}

#[test]
fn test_structured_kind_from_emoji_and_domain() {
    let raw = "Answer.\n\n**Sources**\n\
               * \u{1f4da} Mushrooms of Europe\n\
               * https://en.wikipedia.org/wiki/Amanita\n";
    let out = extract(raw);
    assert_eq!(out.sources.len(), 2);
    assert_eq!(out.sources[0].kind, SourceKind::Book);
    assert_eq!(out.sources[0].title, "Mushrooms of Europe");
    assert_eq!(out.sources[1].kind, SourceKind::Encyclopedia);
    assert_eq!(out.sources[1].title, "Wikipedia");
}

#[test]
fn test_species_name_in_parens_is_not_a_tag() {
    let raw = "Text.\n\nSources:\n- Scots pine (Pinus sylvestris) monograph (book)\n";
    let out = extract(raw);
    assert_eq!(out.sources.len(), 1);
    assert_eq!(out.sources[0].title, "Scots pine (Pinus sylvestris) monograph");
}

#[test]
fn test_markdown_link_title() {
    let raw = "Text.\n\nReferences:\n- [Lichen symbiosis](https://www.nature.com/articles/abc)\n";
    let out = extract(raw);
    assert_eq!(out.sources[0].title, "Lichen symbiosis");
    assert_eq!(out.sources[0].kind, SourceKind::ScientificLiterature);
}

#[test]
fn test_url_tier_dedups_by_domain() {
    let raw = "See https://en.wikipedia.org/wiki/Oak and https://en.wikipedia.org/wiki/Acorn, \
               also https://www.gbif.org/species/2878688.";
    let out = extract(raw);
    assert_eq!(out.display_text, raw);
    assert_eq!(out.sources.len(), 2);
    assert_eq!(out.sources[0].kind, SourceKind::Encyclopedia);
    assert_eq!(out.sources[1].title, "GBIF");
    assert_eq!(out.sources[1].kind, SourceKind::Repository);
    assert_eq!(
        out.sources[1].url.as_deref(),
        Some("https://www.gbif.org/species/2878688")
    );
}

#[test]
fn test_unknown_domain_is_web_resource() {
    let out = extract("Details at https://example.org/frogs");
    assert_eq!(out.sources.len(), 1);
    assert_eq!(out.sources[0].title, "example.org");
    assert_eq!(out.sources[0].kind, SourceKind::WebResource);
}

#[test]
fn test_phrase_tier_in_mention_order() {
    let raw = "According to a web search and the scientific literature, \
               and our Knowledge Base, moss grows on all sides.";
    let out = extract(raw);
    let kinds: Vec<_> = out.sources.iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        [
            SourceKind::WebSearch,
            SourceKind::ScientificLiterature,
            SourceKind::KnowledgeBase
        ]
    );
    assert!(out.sources.iter().all(|s| s.url.is_none()));
    assert_eq!(out.sources[0].title, "Web search");
}

#[test]
fn test_no_evidence_no_sources() {
    let out = extract("Frogs hibernate in mud at the bottom of ponds.");
    assert!(out.sources.is_empty());
    assert_eq!(
        out.display_text,
        "Frogs hibernate in mud at the bottom of ponds."
    );
}

#[test]
fn test_structured_tier_wins_over_urls() {
    let raw = "Look at https://example.org/x\n\nSources:\n- Field guide to ferns (book)\n";
    let out = extract(raw);
    assert_eq!(out.sources.len(), 1);
    assert_eq!(out.sources[0].kind, SourceKind::Book);
}

#[test]
fn test_strip_is_idempotent_and_keeps_other_headings() {
    let raw = "## Habitat\nWet meadows.\n\nSources:\n- Flora (book)\n\n## Season\nJune to August.";
    let once = strip_sources_section(raw);
    assert_eq!(once, "## Habitat\nWet meadows.\n\n## Season\nJune to August.");
    assert_eq!(strip_sources_section(&once), once);
}

#[test]
fn test_render_for_chat() {
    let sources = vec![
        Source {
            title: "Wikipedia".into(),
            url: Some("https://en.wikipedia.org/wiki/Oak".into()),
            kind: SourceKind::Encyclopedia,
        },
        Source {
            title: "Flora".into(),
            url: None,
            kind: SourceKind::Book,
        },
    ];
    assert_eq!(
        render_for_chat("Oaks live long.", &sources),
        "Oaks live long.\n\nSources:\n\
         - Wikipedia (encyclopedia) https://en.wikipedia.org/wiki/Oak\n\
         - Flora (book)"
    );
    assert_eq!(render_for_chat("Plain.", &[]), "Plain.");
}

#[test]
fn test_kind_from_tag() {
    assert_eq!(kind_from_tag("KB"), SourceKind::KnowledgeBase);
    assert_eq!(kind_from_tag("peer-reviewed journal"), SourceKind::ScientificLiterature);
    assert_eq!(kind_from_tag("research"), SourceKind::ScientificLiterature);
    assert_eq!(kind_from_tag("Web Search"), SourceKind::WebSearch);
    assert_eq!(kind_from_tag("grandmother"), SourceKind::Unknown);
}

#[test]
fn test_bullet_named_source_is_not_a_heading() {
    let raw = "A river has three parts:\n- Source\n- Mouth\n- Delta\n\nEach supports different mosses.";
    let out = extract(raw);
    assert_eq!(out.display_text, raw);
    assert!(out.sources.is_empty());
}

#[test]
fn test_heading_shapes() {
    for heading in [
        "Sources:",
        "## References",
        "**Sources:**",
        "\u{1f4da} Sources",
        "### \u{1f4da} **Источники:**",
        "ЛИТЕРАТУРА",
    ] {
        let raw = format!("Text.\n\n{heading}\n- Flora (book)\n");
        let out = extract(&raw);
        assert_eq!(out.display_text, "Text.", "heading {heading:?}");
        assert_eq!(out.sources.len(), 1, "heading {heading:?}");
    }
    for line in ["- Source", "* Sources:", "1. References", "Sources of the Volga"] {
        let raw = format!("Text.\n{line}\n- Flora (book)");
        assert_eq!(strip_sources_section(&raw), raw, "line {line:?}");
    }
}

#[test]
fn test_russian_sources_section() {
    let raw = "Берёза любит свет.\n\nИсточники:\n- Флора России (книга)\n- Атлас мхов (book)\n";
    let out = extract(raw);
    assert_eq!(out.display_text, "Берёза любит свет.");
    let titles: Vec<_> = out.sources.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, ["Флора России", "Атлас мхов"]);
    assert!(out.sources.iter().all(|s| s.kind == SourceKind::Book));
}

#[test]
fn test_tag_needs_whole_words() {
    assert_eq!(kind_from_tag("parasite"), SourceKind::Unknown);
    assert_eq!(kind_from_tag("report"), SourceKind::Unknown);
    assert_eq!(kind_from_tag("cobweb"), SourceKind::Unknown);
    assert_eq!(kind_from_tag("website"), SourceKind::WebResource);
    assert_eq!(kind_from_tag("online encyclopedia"), SourceKind::Encyclopedia);
    assert_eq!(kind_from_tag("GitHub repo"), SourceKind::Repository);

    let out = extract("Cats carry it.\n\nSources:\n- Toxoplasma gondii (parasite)\n");
    assert!(out.sources.is_empty());
    assert_eq!(out.display_text, "Cats carry it.");
}

#[test]
fn test_url_scan_and_host_parsing() {
    let raw = "Counts at (https://user:pw@WWW.GBIF.org:8443/occurrence), \
               see <https://en.wikipedia.org/wiki/Lynx>. Not a url: http:// alone.";
    let urls = find_urls(raw);
    assert_eq!(
        urls,
        [
            "https://user:pw@WWW.GBIF.org:8443/occurrence",
            "https://en.wikipedia.org/wiki/Lynx"
        ]
    );
    let out = extract(raw);
    let titles: Vec<_> = out.sources.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, ["GBIF", "Wikipedia"]);
}
