use serde::{Deserialize, Serialize};

/// Which optional enrichment blocks to request for a message.
///
/// Graph context is not listed here: it is governed by session length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentHints {
    /// Location / ecosystem block.
    pub location: bool,
    pub weather: bool,
    pub web_search: bool,
    pub books: bool,
}

impl EnrichmentHints {
    pub fn all() -> Self {
        Self {
            location: true,
            weather: true,
            web_search: true,
            books: true,
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

/// Block of the prompt an enrichment provider fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentSlot {
    Location,
    Weather,
    /// Web and book search share one block.
    Search,
    Graph,
}

impl EnrichmentSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Location => "location",
            Self::Weather => "weather",
            Self::Search => "search",
            Self::Graph => "graph",
        }
    }
}

/// Input handed to every enrichment provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentRequest {
    pub session_id: String,
    /// The current user message.
    pub message: String,
    pub hints: EnrichmentHints,
}

/// Per-request prompt aggregate. Every block is optional; empty means absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptContext {
    /// Last N conversation nodes as `"<Role>: <content>"` lines, oldest first.
    pub history: String,
    pub location_block: String,
    pub weather_block: String,
    pub web_block: String,
    pub graph_block: String,
}

impl PromptContext {
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
            && self.location_block.is_empty()
            && self.weather_block.is_empty()
            && self.web_block.is_empty()
            && self.graph_block.is_empty()
    }

    /// Mutable access to the block behind a slot.
    pub fn block_mut(&mut self, slot: EnrichmentSlot) -> &mut String {
        match slot {
            EnrichmentSlot::Location => &mut self.location_block,
            EnrichmentSlot::Weather => &mut self.weather_block,
            EnrichmentSlot::Search => &mut self.web_block,
            EnrichmentSlot::Graph => &mut self.graph_block,
        }
    }

    /// Merge context blocks and the current message into a single prompt.
    pub fn render(&self, current_message: &str) -> String {
        let mut parts = Vec::new();

        let blocks = [
            ("Location", &self.location_block),
            ("Weather", &self.weather_block),
            ("Search results", &self.web_block),
            ("Related concepts", &self.graph_block),
        ];
        for (title, block) in blocks {
            if !block.trim().is_empty() {
                parts.push(format!("[{title}]\n{}", block.trim()));
            }
        }

        if !self.history.is_empty() {
            parts.push(format!("[Conversation history]\n{}", self.history));
        }

        parts.push(format!("[User]\n{current_message}"));
        parts.join("\n\n")
    }
}

/// Prompt size class used by the backend to pick a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeHint {
    Normal,
    Large,
}

impl SizeHint {
    /// Derive the size class from prompt length in characters.
    pub fn for_prompt(prompt: &str, large_threshold_chars: usize) -> Self {
        if prompt.chars().count() > large_threshold_chars {
            Self::Large
        } else {
            Self::Normal
        }
    }
}

/// A structured message for chat-completion backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMessage {
    pub role: String,
    pub content: String,
}

/// One chat-completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub system: Option<String>,
    pub prompt: String,
    /// Caller label for logs (e.g. "chat", "telegram").
    pub origin: String,
    pub size_hint: SizeHint,
}

impl ChatRequest {
    /// Messages in wire order: optional system message, then the prompt.
    pub fn to_api_messages(&self) -> Vec<ApiMessage> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = self.system.as_deref().filter(|s| !s.is_empty()) {
            messages.push(ApiMessage {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }
        messages.push(ApiMessage {
            role: "user".to_string(),
            content: self.prompt.clone(),
        });
        messages
    }
}
