use super::*;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex as StdMutex;
use std::time::Duration;
use verdant_channels::{Dispatch, UpdateHandler};
use verdant_core::{
    context::{ChatRequest, EnrichmentRequest, EnrichmentSlot},
    conversation::Role,
    error::{LlmError, VerdantError},
    message::{ReplyStatus, SourceKind},
    retry::RetryPolicy,
    session::SessionIdentity,
    traits::{ChatBackend, SessionStore, Transport},
    update::{BotIdentity, ChatKind, FetchOutcome, InboundMessage, Sender},
};

const DEFAULT_REPLY: &str = "Mosses have no true roots.";

/// Backend that replays a script, then a default reply, recording prompts.
struct ScriptedBackend {
    script: StdMutex<VecDeque<Result<String, LlmError>>>,
    prompts: StdMutex<Vec<String>>,
}

impl ScriptedBackend {
    fn new(script: Vec<Result<String, LlmError>>) -> Arc<Self> {
        Arc::new(Self {
            script: StdMutex::new(script.into()),
            prompts: StdMutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(DEFAULT_REPLY.to_string()))
    }

    async fn is_available(&self) -> bool {
        true
    }
}

/// Enrichment provider that always comes back empty, as a failed lookup does.
struct Failing(EnrichmentSlot);

#[async_trait]
impl EnrichmentProvider for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    fn slot(&self) -> EnrichmentSlot {
        self.0
    }

    async fn fetch(&self, _request: &EnrichmentRequest) -> String {
        String::new()
    }
}

/// Enrichment provider that never answers in time.
struct Hanging;

#[async_trait]
impl EnrichmentProvider for Hanging {
    fn name(&self) -> &str {
        "hanging"
    }

    fn slot(&self) -> EnrichmentSlot {
        EnrichmentSlot::Graph
    }

    async fn fetch(&self, _request: &EnrichmentRequest) -> String {
        tokio::time::sleep(Duration::from_secs(30)).await;
        "too late".into()
    }
}

fn gateway_with(
    memory: &Memory,
    backend: Arc<ScriptedBackend>,
    providers: Vec<Arc<dyn EnrichmentProvider>>,
) -> Gateway {
    let mut config = Config::default();
    config.context.enrichment_timeout_secs = 0;
    Gateway::new(
        memory,
        LlmGateway::new(backend, RetryPolicy::immediate(3)),
        providers,
        &config,
        Prompts::default(),
    )
}

#[tokio::test]
async fn test_telegram_user_keeps_one_session() {
    let memory = Memory::in_process();
    let gw = gateway_with(&memory, ScriptedBackend::new(Vec::new()), Vec::new());
    let identity = SessionIdentity::telegram(42);

    let first = gw
        .handle_message_with("telegram", &identity, "hi", None)
        .await
        .unwrap();
    let second = gw
        .handle_message_with("telegram", &identity, "hello", None)
        .await
        .unwrap();

    assert_eq!(first.session_id, second.session_id);
    let session = memory
        .sessions
        .get(&second.session_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(session.message_count, 2);
    assert!(first.set_cookie.is_none());
}

#[tokio::test]
async fn test_turns_are_linked_causally() {
    let memory = Memory::in_process();
    let gw = gateway_with(&memory, ScriptedBackend::new(Vec::new()), Vec::new());
    let identity = SessionIdentity::explicit("s1");
    gw.handle_message(&identity, "first question").await.unwrap();
    gw.handle_message(&identity, "second question").await.unwrap();

    let nodes = memory.conversations.list_nodes("s1").await.unwrap();
    let roles: Vec<_> = nodes.iter().map(|n| n.role).collect();
    assert_eq!(
        roles,
        [Role::User, Role::Assistant, Role::User, Role::Assistant]
    );
    assert_eq!(nodes[0].parent_id, None);
    for pair in nodes.windows(2) {
        assert_eq!(pair[1].parent_id.as_deref(), Some(pair[0].id.as_str()));
    }
}

#[tokio::test]
async fn test_failed_enrichment_leaves_history_intact() {
    let memory = Memory::in_process();
    let backend = ScriptedBackend::new(Vec::new());
    let providers: Vec<Arc<dyn EnrichmentProvider>> = vec![
        Arc::new(Failing(EnrichmentSlot::Location)),
        Arc::new(Failing(EnrichmentSlot::Weather)),
        Arc::new(Failing(EnrichmentSlot::Search)),
        Arc::new(Hanging),
    ];
    let gw = gateway_with(&memory, backend.clone(), providers);
    let identity = SessionIdentity::explicit("s1");

    gw.handle_message(&identity, "what grows in this forest?")
        .await
        .unwrap();
    gw.handle_message(&identity, "will rain help the mushrooms?")
        .await
        .unwrap();
    let reply = gw
        .handle_message(&identity, "any field guide to read?")
        .await
        .unwrap();
    assert!(reply.is_answered());

    let prompts = backend.prompts();
    assert_eq!(prompts.len(), 3);
    assert_eq!(prompts[0], "[User]\nwhat grows in this forest?");
    let expected_history = format!(
        "[Conversation history]\n\
         User: what grows in this forest?\n\
         Assistant: {DEFAULT_REPLY}\n\
         User: will rain help the mushrooms?\n\
         Assistant: {DEFAULT_REPLY}\n\n\
         [User]\nany field guide to read?"
    );
    assert_eq!(prompts[2], expected_history);
}

#[tokio::test]
async fn test_llm_failure_yields_no_answer_and_keeps_user_message() {
    let memory = Memory::in_process();
    let backend = ScriptedBackend::new(vec![Err(LlmError::Permanent("401".into()))]);
    let gw = gateway_with(&memory, backend.clone(), Vec::new());

    let reply = gw
        .handle_message(&SessionIdentity::explicit("s1"), "hello?")
        .await
        .unwrap();
    assert_eq!(reply.status, ReplyStatus::NoAnswer);
    assert!(reply.display_text.is_empty());
    assert!(reply.sources.is_empty());
    assert_eq!(backend.prompts().len(), 1);

    let nodes = memory.conversations.list_nodes("s1").await.unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].role, Role::User);
    assert_eq!(nodes[0].content, "hello?");
}

#[tokio::test]
async fn test_sources_are_extracted_and_not_stored() {
    let memory = Memory::in_process();
    let raw = "Sphagnum holds up to twenty times its weight in water.\n\n\
               Sources:\n- Peatland ecology (scientific literature)\n";
    let backend = ScriptedBackend::new(vec![Ok(raw.to_string())]);
    let gw = gateway_with(&memory, backend, Vec::new());

    let reply = gw
        .handle_message(&SessionIdentity::explicit("s1"), "tell me about sphagnum")
        .await
        .unwrap();
    assert_eq!(
        reply.display_text,
        "Sphagnum holds up to twenty times its weight in water."
    );
    assert_eq!(reply.sources.len(), 1);
    assert_eq!(reply.sources[0].kind, SourceKind::ScientificLiterature);

    let nodes = memory.conversations.list_nodes("s1").await.unwrap();
    assert_eq!(nodes[1].content, reply.display_text);
}

#[tokio::test]
async fn test_new_cookie_session_sets_cookie() {
    let memory = Memory::in_process();
    let gw = gateway_with(&memory, ScriptedBackend::new(Vec::new()), Vec::new());
    let reply = gw
        .handle_message(&SessionIdentity::cookie(""), "hi")
        .await
        .unwrap();
    let cookie = reply.set_cookie.unwrap();
    assert_eq!(cookie.name, "verdant_session");
    assert_eq!(cookie.value, reply.session_id);

    let again = gw
        .handle_message(&SessionIdentity::cookie(reply.session_id.clone()), "again")
        .await
        .unwrap();
    assert!(again.set_cookie.is_none());
}

#[tokio::test]
async fn test_concurrent_messages_in_one_session_stay_paired() {
    let memory = Memory::in_process();
    let gw = Arc::new(gateway_with(
        &memory,
        ScriptedBackend::new(Vec::new()),
        Vec::new(),
    ));
    let mut tasks = Vec::new();
    for i in 0..5 {
        let gw = gw.clone();
        tasks.push(tokio::spawn(async move {
            gw.handle_message(&SessionIdentity::explicit("busy"), &format!("question {i}"))
                .await
                .unwrap()
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let nodes = memory.conversations.list_nodes("busy").await.unwrap();
    assert_eq!(nodes.len(), 10);
    for pair in nodes.chunks(2) {
        assert_eq!(pair[0].role, Role::User);
        assert_eq!(pair[1].role, Role::Assistant);
        assert_eq!(pair[1].parent_id.as_deref(), Some(pair[0].id.as_str()));
    }
}

/// Transport that records outgoing messages and reactions.
#[derive(Default)]
struct RecordingTransport {
    sent: StdMutex<Vec<(i64, String)>>,
    reactions: StdMutex<Vec<(i64, i64, String)>>,
}

#[async_trait]
impl Transport for RecordingTransport {
    fn name(&self) -> &str {
        "recording"
    }

    async fn fetch_updates(
        &self,
        _offset: i64,
        _timeout: Duration,
    ) -> Result<FetchOutcome, VerdantError> {
        Ok(FetchOutcome::default())
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), VerdantError> {
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }

    async fn send_reaction(
        &self,
        chat_id: i64,
        message_id: i64,
        emoji: &str,
    ) -> Result<(), VerdantError> {
        self.reactions
            .lock()
            .unwrap()
            .push((chat_id, message_id, emoji.to_string()));
        Ok(())
    }

    async fn delete_webhook(&self) -> Result<(), VerdantError> {
        Ok(())
    }

    async fn get_me(&self) -> Result<BotIdentity, VerdantError> {
        Ok(BotIdentity {
            id: 1,
            username: "verdant_bot".into(),
        })
    }
}

fn dispatch(text: &str) -> Dispatch {
    let sender = Sender {
        id: 42,
        first_name: "Ann".into(),
        username: None,
        is_bot: false,
    };
    Dispatch {
        update_id: 7,
        message: InboundMessage {
            message_id: 100,
            chat_id: 42,
            chat_kind: ChatKind::Private,
            from: Some(sender.clone()),
            text: Some(text.into()),
            reply_to_user_id: None,
        },
        sender,
        text: text.into(),
    }
}

#[tokio::test]
async fn test_responder_sends_reply_with_sources() {
    let memory = Memory::in_process();
    let raw = "Look under birches.\n\nSources:\n- Mushrooms of Europe (book)\n";
    let backend = ScriptedBackend::new(vec![Ok(raw.to_string())]);
    let gw = Arc::new(gateway_with(&memory, backend, Vec::new()));
    let transport = Arc::new(RecordingTransport::default());
    let responder = TelegramResponder::new(gw, transport.clone(), "\u{1f44e}");

    responder.handle(dispatch("where are boletes?")).await.unwrap();

    let sent = transport.sent.lock().unwrap();
    assert_eq!(
        *sent,
        vec![(
            42,
            "Look under birches.\n\nSources:\n- Mushrooms of Europe (book)".to_string()
        )]
    );
    assert!(transport.reactions.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_responder_reacts_on_no_answer() {
    let memory = Memory::in_process();
    let backend = ScriptedBackend::new(vec![Err(LlmError::Permanent("401".into()))]);
    let gw = Arc::new(gateway_with(&memory, backend, Vec::new()));
    let transport = Arc::new(RecordingTransport::default());
    let responder = TelegramResponder::new(gw, transport.clone(), "\u{1f44e}");

    responder.handle(dispatch("hello")).await.unwrap();

    assert!(transport.sent.lock().unwrap().is_empty());
    assert_eq!(
        *transport.reactions.lock().unwrap(),
        vec![(42, 100, "\u{1f44e}".to_string())]
    );
}
