// src/lib.rs
//! Gemini `generateContent` backend for the error-analysis pipeline.
//! Exposes [`GeminiProvider`], an implementation of
//! `error_advisor_core::provider::Provider`.

mod client;
mod error;

pub use client::{ GeminiProvider, boxed };
pub use error::GeminiError;
