use crate::session::SetCookie;
use serde::{Deserialize, Serialize};

/// Category of a source cited by a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    KnowledgeBase,
    ScientificLiterature,
    WebSearch,
    Book,
    Encyclopedia,
    Repository,
    WebResource,
    Unknown,
}

impl SourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::KnowledgeBase => "knowledge base",
            Self::ScientificLiterature => "scientific literature",
            Self::WebSearch => "web search",
            Self::Book => "book",
            Self::Encyclopedia => "encyclopedia",
            Self::Repository => "repository",
            Self::WebResource => "web resource",
            Self::Unknown => "unknown",
        }
    }
}

/// A source extracted from a model reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub url: Option<String>,
    pub kind: SourceKind,
}

/// Whether the assistant produced an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyStatus {
    Answered,
    /// The model could not answer; `display_text` is empty and nothing was fabricated.
    NoAnswer,
}

/// Result of handling one user message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub session_id: String,
    pub display_text: String,
    pub sources: Vec<Source>,
    pub status: ReplyStatus,
    /// Cookie the HTTP layer must set when a cookie session was created.
    #[serde(skip)]
    pub set_cookie: Option<SetCookie>,
}

impl Reply {
    pub fn is_answered(&self) -> bool {
        self.status == ReplyStatus::Answered
    }
}
