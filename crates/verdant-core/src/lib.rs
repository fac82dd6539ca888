//! # verdant-core
//!
//! Core types, traits, configuration, and error handling for the Verdant
//! conversational backend.

pub mod config;
pub mod context;
pub mod conversation;
pub mod error;
pub mod message;
pub mod retry;
pub mod session;
pub mod traits;
pub mod update;
