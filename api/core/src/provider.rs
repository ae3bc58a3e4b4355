// src/provider.rs
//! Abstracts over concrete LLM backends. A `Provider` turns a sanitized
//! error record into `Advice`; a `ProviderRegistry` resolves which
//! configured provider should handle a call, by explicit id or by the
//! first one with a discoverable credential.

#![ allow( clippy::missing_inline_in_public_items ) ]

/// Define a private namespace for all its items.
mod private
{
  use std::sync::Arc;
  use async_trait::async_trait;

  use crate::error::AdvisorError;
  use crate::types::{ ErrorRecord, Advice, ProviderConfig };

  /// A single LLM backend capable of producing remediation advice for a
  /// sanitized error record. Implementations live in their own crates
  /// (`error_advisor_provider_openai`, `error_advisor_provider_gemini`) and
  /// own their transport, credential discovery and response parsing.
  #[ async_trait ]
  pub trait Provider : Send + Sync + core::fmt::Debug
  {
    /// Stable identifier, e.g. `"openai"` or `"gemini"`; matched against
    /// `ANALYZER_PROVIDER` and used to tag log records and metrics.
    fn id( &self ) -> &str;

    /// Whether this provider currently has a usable credential. Consulted
    /// by `ProviderRegistry::resolve` before a call is ever attempted.
    fn is_configured( &self ) -> bool;

    /// Sends the sanitized record to the backend and parses its response
    /// into `Advice`.
    ///
    /// # Errors
    /// Returns `AdvisorError::Transport` for network failures,
    /// `AdvisorError::OperationTimeout` if the call exceeds its deadline,
    /// `AdvisorError::ContentFiltered` if the backend refuses to answer,
    /// and `AdvisorError::Parse` if the response cannot be interpreted.
    async fn generate_advice( &self, record : &ErrorRecord, config : &ProviderConfig ) -> Result< Advice, AdvisorError >;
  }

  /// Resolves which registered provider should service a call. Providers
  /// are consulted in registration order, so callers should register in
  /// priority order (`openai` before `gemini`, matching the credential
  /// discovery order of the component design).
  #[ derive( Default ) ]
  pub struct ProviderRegistry
  {
    providers : Vec< Arc< dyn Provider > >,
  }

  impl core::fmt::Debug for ProviderRegistry
  {
    fn fmt( &self, f : &mut core::fmt::Formatter< '_ > ) -> core::fmt::Result
    {
      f.debug_struct( "ProviderRegistry" )
        .field( "providers", &self.providers.iter().map( | p | p.id() ).collect::< Vec< _ > >() )
        .finish()
    }
  }

  impl ProviderRegistry
  {
    /// Creates an empty registry.
    #[ must_use ]
    pub fn new() -> Self
    {
      Self::default()
    }

    /// Registers a provider. Order matters : ties in `resolve` favor
    /// earlier registrations.
    pub fn register( &mut self, provider : Arc< dyn Provider > )
    {
      self.providers.push( provider );
    }

    /// Resolves a provider to use for a call.
    ///
    /// If `preferred_id` names a registered, configured provider, it wins
    /// outright. Otherwise the first configured provider in registration
    /// order is used. Returns `None` if no registered provider is
    /// configured (or `preferred_id` names a provider that is not).
    #[ must_use ]
    pub fn resolve( &self, preferred_id : Option< &str > ) -> Option< Arc< dyn Provider > >
    {
      if let Some( id ) = preferred_id
      {
        if let Some( provider ) = self.providers.iter().find( | p | p.id() == id )
        {
          return provider.is_configured().then( || Arc::clone( provider ) );
        }
        return None;
      }

      self.providers.iter().find( | p | p.is_configured() ).map( Arc::clone )
    }

    /// All registered provider ids, in registration order, regardless of
    /// configuration state. Useful for diagnostics.
    #[ must_use ]
    pub fn registered_ids( &self ) -> Vec< String >
    {
      self.providers.iter().map( | p | p.id().to_string() ).collect()
    }
  }

} // end mod private

crate ::mod_interface!
{
  exposed use
  {
    Provider,
    ProviderRegistry,
  };
}

#[ cfg( test ) ]
mod tests
{
  use super::private::{ Provider, ProviderRegistry };
  use crate::error::AdvisorError;
  use crate::types::{ ErrorRecord, Advice, ProviderConfig };
  use async_trait::async_trait;
  use std::sync::Arc;
  use std::collections::HashMap;

  #[ derive( Debug ) ]
  struct StubProvider
  {
    name : &'static str,
    configured : bool,
  }

  #[ async_trait ]
  impl Provider for StubProvider
  {
    fn id( &self ) -> &str { self.name }
    fn is_configured( &self ) -> bool { self.configured }
    async fn generate_advice( &self, _record : &ErrorRecord, _config : &ProviderConfig ) -> Result< Advice, AdvisorError >
    {
      Ok( Advice { advice : format!( "advice from {}", self.name ), extra : serde_json::Map::new() } )
    }
  }

  fn record() -> ErrorRecord
  {
    ErrorRecord::new( "Error", "boom", "stack", HashMap::new() )
  }

  fn config( id : &str ) -> ProviderConfig
  {
    ProviderConfig { provider_id : id.to_string(), endpoint : String::new(), model : String::new(), max_output_tokens : 256, temperature : 0.0 }
  }

  #[ tokio::test ]
  async fn resolves_first_configured_provider_when_no_preference()
  {
    let mut registry = ProviderRegistry::new();
    registry.register( Arc::new( StubProvider { name : "openai", configured : false } ) );
    registry.register( Arc::new( StubProvider { name : "gemini", configured : true } ) );

    let resolved = registry.resolve( None ).unwrap();
    assert_eq!( resolved.id(), "gemini" );
  }

  #[ tokio::test ]
  async fn preferred_id_wins_when_configured()
  {
    let mut registry = ProviderRegistry::new();
    registry.register( Arc::new( StubProvider { name : "openai", configured : true } ) );
    registry.register( Arc::new( StubProvider { name : "gemini", configured : true } ) );

    let resolved = registry.resolve( Some( "gemini" ) ).unwrap();
    assert_eq!( resolved.id(), "gemini" );

    let advice = resolved.generate_advice( &record(), &config( "gemini" ) ).await.unwrap();
    assert_eq!( advice.advice, "advice from gemini" );
  }

  #[ tokio::test ]
  async fn returns_none_when_nothing_is_configured()
  {
    let mut registry = ProviderRegistry::new();
    registry.register( Arc::new( StubProvider { name : "openai", configured : false } ) );
    assert!( registry.resolve( None ).is_none() );
  }
}
