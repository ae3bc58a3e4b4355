// src/orchestrator.rs
//! Wires the sanitizer, fingerprinter, cache, gate and breaker together
//! behind the single public entry point : `analyze`. Every internal
//! failure is absorbed here and mapped to `None`; nothing propagates as an
//! error to the caller of `analyze`.

#![ allow( clippy::missing_inline_in_public_items ) ]

/// Define a private namespace for all its items.
mod private
{
  use std::collections::HashMap;
  use std::sync::{ Arc, Weak };
  use std::time::Instant;
  use core::time::Duration;
  use core::sync::atomic::{ AtomicBool, Ordering };

  use crate::cache::AdviceCache;
  use crate::circuit_breaker::{ CircuitBreaker, BreakerState, BreakerMetrics };
  use crate::config::Config;
  use crate::error::AdvisorError;
  use crate::fingerprint::{ fingerprint, FingerprintMode };
  use crate::gate::{ ConcurrencyGate, GateMetrics };
  use crate::logger::{ Level, Logger };
  use crate::provider::ProviderRegistry;
  use crate::sanitizer::{ sanitize_message, sanitize_context, sanitize_stack };
  use crate::types::{ Advice, ErrorRecord, ProviderConfig };

  /// Spawns the `METRIC_INTERVAL_MS` timer that periodically logs
  /// `GateMetrics` (`rejectedTotal` and current depths). Holds only a
  /// `Weak` reference to the gate, so the task exits on its own once the
  /// orchestrator (and every clone of its gate handle) is dropped, instead
  /// of leaking a timer per instance for the life of the process.
  fn spawn_gate_metrics_emitter( gate : &Arc< ConcurrencyGate >, interval : Duration, logger : Logger )
  {
    let gate : Weak< ConcurrencyGate > = Arc::downgrade( gate );
    tokio::spawn( async move
    {
      let mut ticker = tokio::time::interval( interval );
      ticker.tick().await; // first tick fires immediately; skip it.
      loop
      {
        ticker.tick().await;
        let Some( gate ) = gate.upgrade() else { break };
        let metrics = gate.metrics();
        logger.log(
          Level::Info,
          "gate metrics",
          serde_json::json!(
          {
            "active" : metrics.active,
            "waiting" : metrics.waiting,
            "rejected_total" : metrics.rejected,
            "admitted_total" : metrics.admitted_total,
          } ).as_object().cloned().unwrap_or_default(),
          None,
        );
      }
    } );
  }

  /// Assembles the components (C1-C6, C8) into the single `analyze` entry
  /// point described by the component design (C7). One instance per
  /// provider identity; the cache, breaker and gate it owns are the
  /// process-wide singletons for that provider.
  #[ derive( Debug ) ]
  pub struct AnalysisOrchestrator
  {
    cache : Arc< AdviceCache >,
    breaker : Arc< CircuitBreaker >,
    gate : Arc< ConcurrencyGate >,
    registry : Arc< ProviderRegistry >,
    provider_config : ProviderConfig,
    logger : Logger,
    fingerprint_mode : FingerprintMode,
    operation_timeout : core::time::Duration,
    preferred_provider : Option< String >,
    reentrant_name_prefixes : Vec< String >,
    absent_credential_warned : AtomicBool,
  }

  impl AnalysisOrchestrator
  {
    /// Builds an orchestrator from a resolved `Config`, a provider
    /// registry and the per-call provider parameters (model, token cap,
    /// temperature) to present to whichever provider is resolved.
    #[ must_use ]
    pub fn new( config : &Config, registry : Arc< ProviderRegistry >, provider_config : ProviderConfig, logger : Logger ) -> Self
    {
      let gate = Arc::new( ConcurrencyGate::new( config.concurrency as usize, config.queue_limit as usize ) );
      let logger = logger.with_verbose( config.verbose );

      spawn_gate_metrics_emitter( &gate, config.metric_interval, logger.clone() );

      Self
      {
        cache : Arc::new( AdviceCache::new( config.cache_limit as usize, config.cache_ttl ) ),
        breaker : Arc::new( CircuitBreaker::new( config.circuit_breaker_failure_threshold, config.circuit_breaker_recovery ) ),
        gate,
        registry,
        provider_config,
        logger,
        fingerprint_mode : if config.use_secure_cache_keys { FingerprintMode::Secure } else { FingerprintMode::Fast },
        operation_timeout : config.operation_timeout,
        preferred_provider : config.preferred_provider.clone(),
        reentrant_name_prefixes : config.reentrant_name_prefixes.clone(),
        absent_credential_warned : AtomicBool::new( false ),
      }
    }

    /// The single public entry point : sanitizes `message`/`stack`/
    /// `context`, fingerprints the result, and either returns a cached
    /// answer or attempts exactly one provider call, respecting the gate
    /// and breaker. Never returns an error; every failure path emits a
    /// `Level::Warn` record and resolves to `None`.
    pub async fn analyze( &self, name : &str, message : &str, stack : &str, context : HashMap< String, serde_json::Value > ) -> Option< Advice >
    {
      let record = ErrorRecord::new( name, message, stack, context );

      // Step 1 : skip errors originating from our own outbound HTTP client
      // before sanitization, fingerprinting, the cache, the gate or the
      // breaker are ever touched - analyzing them would feed a transport
      // failure from the provider call right back into the provider.
      if self.reentrant_name_prefixes.iter().any( | prefix | !prefix.is_empty() && record.name.starts_with( prefix.as_str() ) )
      {
        self.warn_failure( &AdvisorError::ReentrantTransport, &record.unique_id );
        return None;
      }

      let sanitized_message = sanitize_message( &record.message );
      // Full, untruncated stack : the fingerprinter has its own 1000-code-point
      // cap, which must see the real stack rather than a prompt-sized excerpt,
      // or two errors that only agree on their first lines would collide.
      let sanitized_stack = sanitize_stack( &record.stack );
      let sanitized_context = sanitize_context( &record.context );

      let fp = fingerprint( &record.name, &sanitized_message, &sanitized_stack, self.fingerprint_mode );

      if let Some( advice ) = self.cache.get( &fp ).await
      {
        self.logger.log(
          crate::logger::Level::Info,
          "advice served from cache",
          serde_json::json!( { "fingerprint" : fp } ).as_object().cloned().unwrap_or_default(),
          Some( &record.unique_id ),
        );
        return Some( advice );
      }

      let Some( provider ) = self.registry.resolve( self.preferred_provider.as_deref() ) else
      {
        self.warn_absent_credential_once( &record.unique_id );
        return None;
      };

      let permit = match self.gate.acquire().await
      {
        Ok( permit ) => permit,
        Err( err ) =>
        {
          self.warn_failure( &err, &record.unique_id );
          return None;
        }
      };

      if let Err( err ) = self.breaker.admit().await
      {
        drop( permit );
        self.warn_failure( &err, &record.unique_id );
        return None;
      }

      let sanitized_record = ErrorRecord
      {
        name : record.name.clone(),
        message : sanitized_message,
        stack : sanitized_stack,
        context : sanitized_context,
        unique_id : record.unique_id.clone(),
        fingerprint : Some( fp.clone() ),
      };

      let started_at = Instant::now();
      let outcome = tokio::time::timeout(
        self.operation_timeout,
        provider.generate_advice( &sanitized_record, &self.provider_config ),
      ).await;
      drop( permit );
      let elapsed = started_at.elapsed();

      match outcome
      {
        Err( _elapsed ) =>
        {
          let err = AdvisorError::OperationTimeout( u64::try_from( self.operation_timeout.as_millis() ).unwrap_or( u64::MAX ) );
          self.breaker.record( false, elapsed ).await;
          self.warn_failure( &err, &record.unique_id );
          None
        }
        Ok( Err( err ) ) =>
        {
          if err.counts_as_breaker_failure()
          {
            self.breaker.record( false, elapsed ).await;
          }
          self.warn_failure( &err, &record.unique_id );
          None
        }
        Ok( Ok( advice ) ) =>
        {
          self.breaker.record( true, elapsed ).await;

          if advice.is_empty()
          {
            self.logger.log(
              crate::logger::Level::Info,
              "provider returned no advice",
              serde_json::json!( { "fingerprint" : fp } ).as_object().cloned().unwrap_or_default(),
              Some( &record.unique_id ),
            );
            return None;
          }

          self.cache.clone().put( fp.clone(), advice.clone() ).await;
          self.logger.log(
            crate::logger::Level::Info,
            "advice produced and cached",
            serde_json::json!( { "fingerprint" : fp, "provider" : provider.id() } ).as_object().cloned().unwrap_or_default(),
            Some( &record.unique_id ),
          );
          Some( advice )
        }
      }
    }

    fn warn_failure( &self, err : &AdvisorError, request_id : &str )
    {
      self.logger.log(
        crate::logger::Level::Warn,
        "analysis failed",
        serde_json::json!( { "kind" : err.kind() } ).as_object().cloned().unwrap_or_default(),
        Some( request_id ),
      );
    }

    fn warn_absent_credential_once( &self, request_id : &str )
    {
      if !self.absent_credential_warned.swap( true, Ordering::AcqRel )
      {
        self.logger.log(
          crate::logger::Level::Warn,
          "no provider credential available",
          serde_json::json!( { "kind" : "absent-credential" } ).as_object().cloned().unwrap_or_default(),
          Some( request_id ),
        );
      }
    }

    /// Cache administration : unconditional clear.
    pub async fn clear_cache( &self )
    {
      self.cache.clear().await;
    }

    /// Cache administration : removes expired entries, returns the count
    /// removed.
    pub async fn purge_expired_cache( &self ) -> usize
    {
      self.cache.purge_expired().await
    }

    /// Cache administration : (re)starts the background reaper.
    pub fn start_cache_reaper( &self )
    {
      self.cache.ensure_reaper_started();
    }

    /// Cache administration : stops the background reaper.
    pub fn stop_cache_reaper( &self )
    {
      self.cache.stop_reaper();
    }

    /// Breaker administration : forces `Closed`.
    pub async fn reset_breaker( &self )
    {
      self.breaker.reset().await;
    }

    /// Breaker administration : forces `Open`.
    pub async fn force_open_breaker( &self )
    {
      self.breaker.force_open().await;
    }

    /// Breaker administration : current state.
    pub async fn breaker_state( &self ) -> BreakerState
    {
      self.breaker.state().await
    }

    /// Breaker administration : metrics snapshot.
    pub async fn breaker_metrics( &self ) -> BreakerMetrics
    {
      self.breaker.metrics().await
    }

    /// Gate introspection : calls rejected since construction.
    #[ must_use ]
    pub fn gate_reject_count( &self ) -> u64
    {
      self.gate.metrics().rejected
    }

    /// Gate introspection : current queue depth.
    #[ must_use ]
    pub fn gate_depth( &self ) -> usize
    {
      self.gate.metrics().waiting
    }

    /// Gate introspection : full metrics snapshot.
    #[ must_use ]
    pub fn gate_metrics( &self ) -> GateMetrics
    {
      self.gate.metrics()
    }
  }

} // end mod private

crate ::mod_interface!
{
  exposed use
  {
    AnalysisOrchestrator,
  };
}

#[ cfg( test ) ]
mod tests
{
  use super::private::AnalysisOrchestrator;
  use crate::config::Config;
  use crate::error::AdvisorError;
  use crate::logger::Logger;
  use crate::provider::{ Provider, ProviderRegistry };
  use crate::types::{ Advice, ErrorRecord, ProviderConfig };
  use async_trait::async_trait;
  use std::sync::Arc;
  use std::sync::atomic::{ AtomicU32, Ordering };
  use std::collections::HashMap;

  #[ derive( Debug ) ]
  struct AlwaysAdvises;

  #[ async_trait ]
  impl Provider for AlwaysAdvises
  {
    fn id( &self ) -> &str { "stub" }
    fn is_configured( &self ) -> bool { true }
    async fn generate_advice( &self, _record : &ErrorRecord, _config : &ProviderConfig ) -> Result< Advice, AdvisorError >
    {
      Ok( Advice { advice : "retry with backoff".to_string(), extra : serde_json::Map::new() } )
    }
  }

  #[ derive( Debug ) ]
  struct AlwaysFails
  {
    calls : AtomicU32,
  }

  #[ async_trait ]
  impl Provider for AlwaysFails
  {
    fn id( &self ) -> &str { "stub" }
    fn is_configured( &self ) -> bool { true }
    async fn generate_advice( &self, _record : &ErrorRecord, _config : &ProviderConfig ) -> Result< Advice, AdvisorError >
    {
      self.calls.fetch_add( 1, Ordering::Relaxed );
      Err( AdvisorError::Transport( "connection reset".to_string() ) )
    }
  }

  fn provider_config() -> ProviderConfig
  {
    ProviderConfig { provider_id : "stub".to_string(), endpoint : String::new(), model : "test-model".to_string(), max_output_tokens : 256, temperature : 0.0 }
  }

  #[ tokio::test ]
  async fn second_call_with_equivalent_error_is_served_from_cache()
  {
    let mut registry = ProviderRegistry::new();
    registry.register( Arc::new( AlwaysAdvises ) );

    let orchestrator = AnalysisOrchestrator::new( &Config::from_env(), Arc::new( registry ), provider_config(), Logger::new( "test", "test" ) );

    let first = orchestrator.analyze( "TypeError", "x is undefined", "at a.js:1", HashMap::new() ).await;
    assert!( first.is_some() );

    let second = orchestrator.analyze( "TypeError", "x is undefined", "at a.js:1", HashMap::new() ).await;
    assert_eq!( first, second );
  }

  #[ tokio::test ]
  async fn breaker_trips_after_threshold_consecutive_failures()
  {
    let provider = Arc::new( AlwaysFails { calls : AtomicU32::new( 0 ) } );
    let mut registry = ProviderRegistry::new();
    registry.register( provider.clone() );

    std::env::set_var( "CIRCUIT_BREAKER_FAILURE_THRESHOLD", "3" );
    std::env::set_var( "CACHE_LIMIT", "0" );
    let config = Config::from_env();
    std::env::remove_var( "CIRCUIT_BREAKER_FAILURE_THRESHOLD" );
    std::env::remove_var( "CACHE_LIMIT" );

    let orchestrator = AnalysisOrchestrator::new( &config, Arc::new( registry ), provider_config(), Logger::new( "test", "test" ) );

    for i in 0..3
    {
      let result = orchestrator.analyze( "Error", "boom", "stack", HashMap::new() ).await;
      assert!( result.is_none(), "call {i} should have failed" );
    }

    let before_metrics = orchestrator.breaker_metrics().await;
    assert_eq!( before_metrics.failed_requests, 3 );

    let fourth = orchestrator.analyze( "Error", "boom", "stack", HashMap::new() ).await;
    assert!( fourth.is_none() );
    assert_eq!( provider.calls.load( Ordering::Relaxed ), 3, "fourth call must not reach the provider" );
  }

  #[ tokio::test ]
  async fn no_provider_configured_yields_none_without_panicking()
  {
    let registry = ProviderRegistry::new();
    let orchestrator = AnalysisOrchestrator::new( &Config::from_env(), Arc::new( registry ), provider_config(), Logger::new( "test", "test" ) );
    let result = orchestrator.analyze( "Error", "boom", "stack", HashMap::new() ).await;
    assert!( result.is_none() );
  }

  #[ tokio::test ]
  async fn reentrant_transport_error_short_circuits_before_the_provider_is_touched()
  {
    let provider = Arc::new( AlwaysAdvises );
    let mut registry = ProviderRegistry::new();
    registry.register( provider );

    let orchestrator = AnalysisOrchestrator::new( &Config::from_env(), Arc::new( registry ), provider_config(), Logger::new( "test", "test" ) );

    let result = orchestrator.analyze( "AxiosError", "connect ECONNREFUSED 127.0.0.1:443", "stack", HashMap::new() ).await;
    assert!( result.is_none() );

    // A second, equivalent call must short-circuit again rather than be
    // served from a cache entry that a reentrant error should never reach.
    let second = orchestrator.analyze( "AxiosError", "connect ECONNREFUSED 127.0.0.1:443", "stack", HashMap::new() ).await;
    assert!( second.is_none() );
  }

  #[ tokio::test ]
  async fn configured_reentrant_prefix_also_short_circuits()
  {
    let provider = Arc::new( AlwaysFails { calls : AtomicU32::new( 0 ) } );
    let mut registry = ProviderRegistry::new();
    registry.register( provider.clone() );

    std::env::set_var( "REENTRANT_ERROR_PREFIXES", "CustomHttpError" );
    let config = Config::from_env();
    std::env::remove_var( "REENTRANT_ERROR_PREFIXES" );

    let orchestrator = AnalysisOrchestrator::new( &config, Arc::new( registry ), provider_config(), Logger::new( "test", "test" ) );

    let result = orchestrator.analyze( "CustomHttpErrorTimeout", "boom", "stack", HashMap::new() ).await;
    assert!( result.is_none() );
    assert_eq!( provider.calls.load( Ordering::Relaxed ), 0, "reentrant error must never reach the provider" );
  }
}
