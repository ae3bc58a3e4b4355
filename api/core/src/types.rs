// src/types.rs
//! Transient and value types shared across the pipeline: the per-call
//! `ErrorRecord`, the immutable `Advice` payload, and `ProviderConfig`.

/// Define a private namespace for all its items.
mod private
{
  use std::collections::HashMap;

  /// An error as seen by the pipeline for the duration of a single
  /// `analyze` call. Never shared across calls and never mutated after
  /// `fingerprint` is filled in by the fingerprinter.
  #[ derive( Debug, Clone ) ]
  pub struct ErrorRecord
  {
    /// Error type name, e.g. `TypeError` or `AxiosError`.
    pub name : String,
    /// Human-readable error message.
    pub message : String,
    /// Stack trace text, newline-separated frames.
    pub stack : String,
    /// Free-form context supplied by the caller.
    pub context : HashMap< String, serde_json::Value >,
    /// Opaque per-incident correlation id, propagated to log records.
    pub unique_id : String,
    /// Filled in on first need by the fingerprinter; `None` beforehand.
    pub fingerprint : Option< String >,
  }

  impl ErrorRecord
  {
    /// Builds a new record with a freshly-generated correlation id.
    #[ inline ]
    #[ must_use ]
    pub fn new( name : impl Into< String >, message : impl Into< String >, stack : impl Into< String >, context : HashMap< String, serde_json::Value > ) -> Self
    {
      Self
      {
        name : name.into(),
        message : message.into(),
        stack : stack.into(),
        context,
        unique_id : uuid::Uuid::new_v4().to_string(),
        fingerprint : None,
      }
    }

    /// Builds a new record reusing a caller-supplied correlation id, useful
    /// when the id must match an id already emitted elsewhere (e.g. an
    /// inbound request id).
    #[ inline ]
    #[ must_use ]
    pub fn with_unique_id( name : impl Into< String >, message : impl Into< String >, stack : impl Into< String >, context : HashMap< String, serde_json::Value >, unique_id : impl Into< String > ) -> Self
    {
      Self
      {
        name : name.into(),
        message : message.into(),
        stack : stack.into(),
        context,
        unique_id : unique_id.into(),
        fingerprint : None,
      }
    }
  }

  /// Opaque structured remediation suggestion returned by a provider.
  /// Treated as an immutable value from the moment it is produced until
  /// cache eviction.
  #[ derive( Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize ) ]
  #[ non_exhaustive ]
  pub struct Advice
  {
    /// Free-form remediation text. A well-formed response that omits this
    /// field deserializes to an empty string rather than failing to parse -
    /// `is_empty` and the orchestrator then treat it as `no-advice`, never
    /// as a provider failure.
    #[ serde( default ) ]
    pub advice : String,
    /// Optional structured fields the provider chose to include alongside
    /// `advice` (severity hints, suggested patches, links).
    #[ serde( default, skip_serializing_if = "serde_json::Map::is_empty" ) ]
    pub extra : serde_json::Map< String, serde_json::Value >,
  }

  impl Advice
  {
    /// Whether this advice carries any remediation text at all. Empty
    /// advice is treated as `no-advice` by the orchestrator and is never
    /// cached.
    #[ inline ]
    #[ must_use ]
    pub fn is_empty( &self ) -> bool
    {
      self.advice.trim().is_empty()
    }
  }

  /// Per-provider configuration resolved once at startup and treated as
  /// read-only thereafter.
  #[ derive( Debug, Clone ) ]
  pub struct ProviderConfig
  {
    /// Stable identifier for the provider, e.g. `"openai"` or `"gemini"`.
    pub provider_id : String,
    /// Base endpoint URL for the provider's API.
    pub endpoint : String,
    /// Model identifier to request.
    pub model : String,
    /// Cap on provider output tokens.
    pub max_output_tokens : u32,
    /// Sampling temperature.
    pub temperature : f32,
  }

} // end mod private

crate ::mod_interface!
{
  exposed use
  {
    ErrorRecord,
    Advice,
    ProviderConfig,
  };
}

#[ cfg( test ) ]
mod tests
{
  use super::private::Advice;

  #[ test ]
  fn response_missing_advice_field_deserializes_to_empty_not_an_error()
  {
    let parsed : Advice = serde_json::from_str( "{}" ).unwrap();
    assert!( parsed.is_empty() );
  }

  #[ test ]
  fn response_with_blank_advice_field_is_also_empty()
  {
    let parsed : Advice = serde_json::from_str( r#"{"advice":"   "}"# ).unwrap();
    assert!( parsed.is_empty() );
  }
}
