// src/lib.rs
//! Turns a raw application error into actionable, deduplicated remediation
//! advice without hammering the LLM provider behind it.
//!
//! The crate's only load-bearing promise is the pipeline behind `analyze`:
//! sanitize the error, fingerprint it, answer from cache if one equivalent
//! error was already analyzed within the TTL window, otherwise admit the
//! call through a bounded concurrency gate and a circuit breaker in front
//! of whichever `Provider` is configured. Every stage reports through the
//! structured logger facade; nothing here ever throws back to the caller -
//! a failed analysis resolves to `None`, not an error.
//!
//! ## Governing principle : at-most-once advice per equivalent error
//!
//! This crate makes no claim about the *correctness* of the advice a
//! provider returns - only that, for a TTL window, an equivalent error
//! (same name, message and stack after sanitization) triggers at most one
//! outbound call. Callers that need durability, multi-node cache sharing,
//! or retried provider calls are expected to layer that on top; none of it
//! lives here.
//!
//! ## Module layout
//!
//! - [`error`] - the `AdvisorError` kinds surfaced internally.
//! - [`secret`] - credential wrapper with exposure auditing.
//! - [`types`] - `ErrorRecord`, `Advice`, `ProviderConfig`.
//! - [`sanitizer`] - C1, message/context/stack scrubbing.
//! - [`fingerprint`] - C2, stable dedup key.
//! - [`cache`] - C3, the advice cache.
//! - [`circuit_breaker`] - C4.
//! - [`gate`] - C5, the concurrency gate.
//! - [`provider`] - C6, the `Provider` trait and registry.
//! - [`logger`] - C8, the structured logging facade.
//! - [`config`] - environment-driven configuration.
//! - [`orchestrator`] - C7, `AnalysisOrchestrator::analyze`.

#[ cfg( feature = "enabled" ) ]
use mod_interface::mod_interface;

/// Define a private namespace for all its items.
#[ cfg( feature = "enabled" ) ]
mod private {}

#[ cfg( feature = "enabled" ) ]
crate ::mod_interface!
{
  layer error;
  layer secret;
  layer types;
  layer sanitizer;
  layer fingerprint;
  layer cache;
  layer circuit_breaker;
  layer gate;
  layer provider;
  layer logger;
  layer config;
  layer orchestrator;
}
