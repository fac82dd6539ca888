//! Update ingestion loop for polling transports.
//!
//! Two states: `Polling` and `WebhookBlocked`. A 409 from the transport
//! moves to `WebhookBlocked`: the webhook is deleted once and control goes
//! back to the caller. The next normal fetch moves back to `Polling`.
//!
//! Each chat in a batch is served by its own task, so a slow reply in one
//! chat does not hold up the others. Within a chat, updates are handled in
//! order, each in its own task, so a failing or panicking handler never
//! stops the rest of the batch. The cursor is advanced past an update
//! before it is dispatched.

mod cursor;
mod mention;


pub use cursor::UpdateCursor;
pub use mention::{find_bot_mention_spans, is_addressed_to_bot, strip_bot_mentions};

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, OnceCell};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use verdant_core::{
    config::TelegramConfig,
    error::VerdantError,
    traits::Transport,
    update::{BotIdentity, ChatKind, InboundMessage, Sender, Update},
};

/// A message that passed filtering and is ready for the reply pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub update_id: i64,
    pub message: InboundMessage,
    pub sender: Sender,
    /// Message text with bot mentions removed.
    pub text: String,
}

/// Consumer of dispatched messages.
#[async_trait]
pub trait UpdateHandler: Send + Sync {
    async fn handle(&self, dispatch: Dispatch) -> Result<(), VerdantError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Polling,
    WebhookBlocked,
}

/// Result of a single fetch-and-dispatch round.
#[derive(Debug)]
pub enum PollOutcome {
    Batch {
        received: usize,
        dispatched: usize,
        failed: usize,
    },
    WebhookBlocked,
    FetchFailed(VerdantError),
}

/// Why [`IngestionLoop::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    Shutdown,
    /// A webhook owns the update stream; deliver through it instead.
    WebhookBlocked,
}

/// Handle one chat's updates in arrival order. Returns (dispatched, failed).
async fn dispatch_in_order(
    handler: Arc<dyn UpdateHandler>,
    queue: Vec<Dispatch>,
) -> (usize, usize) {
    let mut dispatched = 0;
    let mut failed = 0;
    for dispatch in queue {
        let update_id = dispatch.update_id;
        let handler = handler.clone();
        match tokio::spawn(async move { handler.handle(dispatch).await }).await {
            Ok(Ok(())) => dispatched += 1,
            Ok(Err(e)) => {
                warn!("update {update_id} failed: {e}");
                failed += 1;
            }
            Err(e) => {
                error!("update {update_id} handler panicked: {e}");
                failed += 1;
            }
        }
    }
    (dispatched, failed)
}

/// Polls a transport and dispatches addressed messages to a handler.
pub struct IngestionLoop<T: Transport + ?Sized> {
    transport: Arc<T>,
    handler: Arc<dyn UpdateHandler>,
    cursor: UpdateCursor,
    bot: OnceCell<BotIdentity>,
    blocked: AtomicBool,
    allowed_users: Vec<i64>,
    poll_timeout: Duration,
    retry_delay: Duration,
}

impl<T: Transport + ?Sized> IngestionLoop<T> {
    pub fn new(transport: Arc<T>, handler: Arc<dyn UpdateHandler>) -> Self {
        Self {
            transport,
            handler,
            cursor: UpdateCursor::default(),
            bot: OnceCell::new(),
            blocked: AtomicBool::new(false),
            allowed_users: Vec::new(),
            poll_timeout: Duration::from_secs(30),
            retry_delay: Duration::from_secs(5),
        }
    }

    pub fn from_config(
        transport: Arc<T>,
        handler: Arc<dyn UpdateHandler>,
        config: &TelegramConfig,
    ) -> Self {
        Self::new(transport, handler)
            .with_allowed_users(config.allowed_users.clone())
            .with_poll_timeout(Duration::from_secs(config.poll_timeout_secs))
            .with_retry_delay(Duration::from_secs(config.fetch_retry_secs))
    }

    /// Empty = everyone.
    pub fn with_allowed_users(mut self, users: Vec<i64>) -> Self {
        self.allowed_users = users;
        self
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn state(&self) -> LoopState {
        if self.blocked.load(Ordering::SeqCst) {
            LoopState::WebhookBlocked
        } else {
            LoopState::Polling
        }
    }

    pub fn offset(&self) -> i64 {
        self.cursor.current()
    }

    /// Fetch once and dispatch every update in the batch.
    pub async fn poll_once(&self) -> PollOutcome {
        let offset = self.cursor.current();
        let outcome = match self.transport.fetch_updates(offset, self.poll_timeout).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("{}: fetch failed: {e}", self.transport.name());
                return PollOutcome::FetchFailed(e);
            }
        };

        if outcome.webhook_blocked {
            if !self.blocked.swap(true, Ordering::SeqCst) {
                warn!(
                    "{}: webhook is active, polling blocked; deleting webhook",
                    self.transport.name()
                );
                if let Err(e) = self.transport.delete_webhook().await {
                    warn!("{}: webhook deletion failed: {e}", self.transport.name());
                }
            }
            return PollOutcome::WebhookBlocked;
        }

        if self.blocked.swap(false, Ordering::SeqCst) {
            info!("{}: polling resumed", self.transport.name());
        }

        let received = outcome.updates.len();
        let mut per_chat: Vec<(i64, Vec<Dispatch>)> = Vec::new();
        for update in outcome.updates {
            self.cursor.advance(update.update_id);

            let Some(dispatch) = self.prepare(update).await else {
                continue;
            };
            let chat_id = dispatch.message.chat_id;
            match per_chat.iter_mut().find(|(id, _)| *id == chat_id) {
                Some((_, queue)) => queue.push(dispatch),
                None => per_chat.push((chat_id, vec![dispatch])),
            }
        }

        let mut chats = JoinSet::new();
        for (_, queue) in per_chat {
            chats.spawn(dispatch_in_order(self.handler.clone(), queue));
        }

        let mut dispatched = 0;
        let mut failed = 0;
        while let Some(joined) = chats.join_next().await {
            match joined {
                Ok((ok, err)) => {
                    dispatched += ok;
                    failed += err;
                }
                Err(e) => error!("chat dispatch task failed: {e}"),
            }
        }

        PollOutcome::Batch {
            received,
            dispatched,
            failed,
        }
    }

    /// Poll until shutdown or until a webhook blocks polling.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> LoopExit {
        info!(
            "{}: ingestion loop started at offset {}",
            self.transport.name(),
            self.cursor.current()
        );
        loop {
            if *shutdown.borrow() {
                return LoopExit::Shutdown;
            }

            let outcome = tokio::select! {
                _ = shutdown.changed() => return LoopExit::Shutdown,
                outcome = self.poll_once() => outcome,
            };

            match outcome {
                PollOutcome::WebhookBlocked => return LoopExit::WebhookBlocked,
                PollOutcome::FetchFailed(_) => {
                    tokio::select! {
                        _ = shutdown.changed() => return LoopExit::Shutdown,
                        _ = tokio::time::sleep(self.retry_delay) => {}
                    }
                }
                PollOutcome::Batch { .. } => {}
            }
        }
    }

    /// Filter an update down to something worth answering.
    async fn prepare(&self, update: Update) -> Option<Dispatch> {
        let message = update.message?;
        let sender = match message.from.clone() {
            Some(s) if !s.is_bot => s,
            _ => return None,
        };

        if !self.allowed_users.is_empty() && !self.allowed_users.contains(&sender.id) {
            warn!("ignoring message from unauthorized user {}", sender.id);
            return None;
        }

        let raw = message.text.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }

        let text = if message.chat_kind != ChatKind::Private {
            let bot = match self.bot_identity().await {
                Ok(bot) => bot,
                Err(e) => {
                    warn!("cannot check group addressing without bot identity: {e}");
                    return None;
                }
            };
            if !is_addressed_to_bot(&message, bot) {
                debug!("group message {} not addressed to bot", message.message_id);
                return None;
            }
            strip_bot_mentions(raw, &bot.username)?
        } else {
            raw.to_string()
        };

        Some(Dispatch {
            update_id: update.update_id,
            message,
            sender,
            text,
        })
    }

    /// The bot's own account, fetched once per loop.
    async fn bot_identity(&self) -> Result<&BotIdentity, VerdantError> {
        self.bot
            .get_or_try_init(|| self.transport.get_me())
            .await
    }
}
