//! # verdant-channels
//!
//! Polling transports (Telegram) and the update ingestion loop that feeds
//! them into the reply pipeline.

pub mod ingest;
pub mod telegram;

pub use ingest::{Dispatch, IngestionLoop, LoopExit, PollOutcome, UpdateHandler};
pub use telegram::TelegramChannel;
