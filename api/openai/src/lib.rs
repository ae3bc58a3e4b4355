// src/lib.rs
//! `OpenAI` chat-completions backend for the error-analysis pipeline.
//! Exposes [`OpenAiProvider`], an implementation of
//! `error_advisor_core::provider::Provider`.

mod client;
mod error;

pub use client::{ OpenAiProvider, boxed };
pub use error::OpenAiError;
