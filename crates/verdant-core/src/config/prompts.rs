use std::collections::HashMap;

use super::shellexpand;

/// Prompt text prepended to every completion, loaded from `{data_dir}/prompts/`.
///
/// Missing files or sections fall back to the built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompts {
    /// Who the assistant is.
    pub identity: String,
    /// Behavioral rules.
    pub system: String,
    /// How to cite sources at the end of a reply.
    pub sources: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            identity: "You are Verdant, a naturalist's companion. You help people understand \
                       the organisms, ecosystems, weather, and places around them."
                .into(),
            system: "- Answer in the language the user writes in.\n\
                     - Use the provided location, weather, and search context when it is relevant; \
                     never invent observations.\n\
                     - If you are not sure, say so."
                .into(),
            sources: "When you relied on external material, end the reply with a section:\n\
                      Sources:\n\
                      - <title> (<type>) <url>\n\
                      where <type> is one of: knowledge base, scientific literature, web search, book."
                .into(),
        }
    }
}

impl Prompts {
    /// Load `{data_dir}/prompts/SYSTEM_PROMPT.md`, overriding the `## Identity`,
    /// `## System` and `## Sources` sections that are present.
    pub fn load(data_dir: &str) -> Self {
        let mut prompts = Self::default();
        let dir = shellexpand(data_dir);

        let prompt_path = format!("{dir}/prompts/SYSTEM_PROMPT.md");
        if let Ok(content) = std::fs::read_to_string(&prompt_path) {
            let mut sections = parse_markdown_sections(&content);
            if let Some(v) = sections.remove("Identity") {
                prompts.identity = v;
            }
            if let Some(v) = sections.remove("System") {
                prompts.system = v;
            }
            if let Some(v) = sections.remove("Sources") {
                prompts.sources = v;
            }
            tracing::info!("loaded prompts from {prompt_path}");
        }

        prompts
    }

    /// The full system prompt sent with every chat request.
    pub fn system_prompt(&self) -> String {
        [&self.identity, &self.system, &self.sources]
            .iter()
            .filter(|s| !s.is_empty())
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Split a markdown document on `## ` headers.
fn parse_markdown_sections(content: &str) -> HashMap<String, String> {
    let mut sections = HashMap::new();
    let mut current_key: Option<String> = None;
    let mut current_body = String::new();

    for line in content.lines() {
        if let Some(header) = line.strip_prefix("## ") {
            if let Some(key) = current_key.take() {
                let trimmed = current_body.trim().to_string();
                if !trimmed.is_empty() {
                    sections.insert(key, trimmed);
                }
            }
            current_key = Some(header.trim().to_string());
            current_body.clear();
        } else if current_key.is_some() {
            current_body.push_str(line);
            current_body.push('\n');
        }
    }

    if let Some(key) = current_key {
        let trimmed = current_body.trim().to_string();
        if !trimmed.is_empty() {
            sections.insert(key, trimmed);
        }
    }

    sections
}
