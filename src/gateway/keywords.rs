//! Keyword policy deciding which enrichment blocks a message asks for.

use verdant_core::context::EnrichmentHints;

const LOCATION_KW: &[&str] = &[
    "where",
    "near me",
    "nearby",
    "around here",
    "here in",
    "my area",
    "region",
    "habitat",
    "ecosystem",
    "forest",
    "meadow",
    "wetland",
    "swamp",
    "steppe",
    "tundra",
    "lake",
    "river",
    "coast",
    "mountain",
    "park",
    "garden",
    "где",
    "рядом",
    "лес",
    "луг",
    "болот",
];

const WEATHER_KW: &[&str] = &[
    "weather",
    "rain",
    "snow",
    "frost",
    "temperature",
    "forecast",
    "sunny",
    "cloudy",
    "wind",
    "storm",
    "humid",
    "погод",
    "дожд",
    "снег",
    "мороз",
];

const SEARCH_KW: &[&str] = &[
    "latest",
    "news",
    "recent",
    "research",
    "study",
    "article",
    "search",
    "look up",
    "find out",
    "новост",
    "исследован",
    "найди",
];

const BOOK_KW: &[&str] = &[
    "book",
    "field guide",
    "reading",
    "read about",
    "literature",
    "книг",
    "определител",
];

fn kw_match(msg_lower: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| msg_lower.contains(kw))
}

/// Enrichment hints for a message. Graph context is not keyword-driven.
pub fn hints_for(message: &str) -> EnrichmentHints {
    let lower = message.to_lowercase();
    EnrichmentHints {
        location: kw_match(&lower, LOCATION_KW),
        weather: kw_match(&lower, WEATHER_KW),
        web_search: kw_match(&lower, SEARCH_KW),
        books: kw_match(&lower, BOOK_KW),
    }
}
