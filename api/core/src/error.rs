// src/error.rs
//! This module defines the error kinds surfaced internally by the analysis
//! pipeline. None of these ever escape `Orchestrator::analyze` - they are
//! mapped to `None` and a structured warning at the boundary.

/// Define a private namespace for all its items.
mod private
{
  use error_tools::dependency::thiserror;

  /// Failure kinds produced while servicing one `analyze` call.
  ///
  /// # Used By
  /// - `CircuitBreaker` (decides which kinds count as a failure)
  /// - `Orchestrator` (maps every kind to a warning record, never to a panic)
  #[ derive( Debug, Clone, PartialEq, thiserror::Error ) ]
  #[ non_exhaustive ]
  pub enum AdvisorError
  {
    /// Network failure or non-2xx response from the provider.
    #[ error( "transport error : {0}" ) ]
    Transport( String ),
    /// The provider call exceeded its configured timeout.
    #[ error( "operation timeout after {0}ms" ) ]
    OperationTimeout( u64 ),
    /// The circuit breaker rejected the call while open.
    #[ error( "circuit breaker is open for provider {0}" ) ]
    CircuitOpen( String ),
    /// The concurrency gate rejected the call; queue was full.
    #[ error( "concurrency gate queue exhausted" ) ]
    QueueExhausted,
    /// No credential could be discovered for any configured provider.
    #[ error( "no credential available for provider {0}" ) ]
    AbsentCredential( String ),
    /// The provider response did not parse into a structured advice envelope.
    #[ error( "failed to parse provider response : {0}" ) ]
    Parse( String ),
    /// The provider refused the request on content-safety grounds.
    #[ error( "request rejected by provider content safety filter : {0}" ) ]
    ContentFiltered( String ),
    /// The error being analyzed originated from the library's own outbound
    /// HTTP client; analysis is skipped to avoid a reentrant failure loop.
    #[ error( "reentrant transport error, skipping analysis" ) ]
    ReentrantTransport,
    /// A configuration value failed validation at construction time.
    #[ error( "invalid configuration : {0}" ) ]
    Config( String ),
  }

  impl AdvisorError
  {
    /// Stable lowercase kind tag used in structured log records, matching
    /// the kind names from the component design (`transport-error`,
    /// `circuit-open`, and so on).
    #[ must_use ]
    #[ inline ]
    pub fn kind( &self ) -> &'static str
    {
      match self
      {
        Self::Transport( _ ) => "transport-error",
        Self::OperationTimeout( _ ) => "operation-timeout",
        Self::CircuitOpen( _ ) => "circuit-open",
        Self::QueueExhausted => "queue-exhausted",
        Self::AbsentCredential( _ ) => "absent-credential",
        Self::Parse( _ ) => "parse-error",
        Self::ContentFiltered( _ ) => "content-filtered",
        Self::ReentrantTransport => "reentrant-transport",
        Self::Config( _ ) => "config-error",
      }
    }

    /// Whether the breaker should count this kind as a failed invocation.
    /// Rejections that never reached the provider (`circuit-open`,
    /// `queue-exhausted`, `reentrant-transport`) do not count.
    #[ must_use ]
    #[ inline ]
    pub fn counts_as_breaker_failure( &self ) -> bool
    {
      !matches!( self, Self::CircuitOpen( _ ) | Self::QueueExhausted | Self::ReentrantTransport )
    }
  }

  /// Type alias for Results using the `error_tools` pattern.
  pub type Result< T > = error_tools::untyped::Result< T >;

} // end mod private

crate ::mod_interface!
{
  exposed use
  {
    AdvisorError,
    Result,
  };
}
