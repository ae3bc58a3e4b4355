// tests/analysis_pipeline_integration_test.rs
//! End-to-end coverage of `AnalysisOrchestrator::analyze` against the
//! scenarios a deployment actually hits : queue exhaustion, sanitization
//! reaching the provider, and a disabled cache forcing one call per
//! invocation.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{ AtomicU32, Ordering };
use std::sync::Arc;
use std::time::Duration;

use error_advisor_core::config::Config;
use error_advisor_core::error::AdvisorError;
use error_advisor_core::logger::Logger;
use error_advisor_core::orchestrator::AnalysisOrchestrator;
use error_advisor_core::provider::{ Provider, ProviderRegistry };
use error_advisor_core::types::{ Advice, ErrorRecord, ProviderConfig };

#[ derive( Debug ) ]
struct SlowProvider
{
  delay : Duration,
  calls : AtomicU32,
}

#[ async_trait ]
impl Provider for SlowProvider
{
  fn id( &self ) -> &str { "slow" }
  fn is_configured( &self ) -> bool { true }
  async fn generate_advice( &self, _record : &ErrorRecord, _config : &ProviderConfig ) -> Result< Advice, AdvisorError >
  {
    self.calls.fetch_add( 1, Ordering::Relaxed );
    tokio::time::sleep( self.delay ).await;
    Ok( Advice { advice : "slow advice".to_string(), extra : serde_json::Map::new() } )
  }
}

#[ derive( Debug ) ]
struct CapturingProvider
{
  last_message : std::sync::Mutex< Option< String > >,
}

#[ async_trait ]
impl Provider for CapturingProvider
{
  fn id( &self ) -> &str { "capturing" }
  fn is_configured( &self ) -> bool { true }
  async fn generate_advice( &self, record : &ErrorRecord, _config : &ProviderConfig ) -> Result< Advice, AdvisorError >
  {
    *self.last_message.lock().unwrap() = Some( record.message.clone() );
    Ok( Advice { advice : "sanitization observed".to_string(), extra : serde_json::Map::new() } )
  }
}

fn provider_config() -> ProviderConfig
{
  ProviderConfig { provider_id : "test".to_string(), endpoint : String::new(), model : "m".to_string(), max_output_tokens : 64, temperature : 0.0 }
}

#[ tokio::test ]
async fn queue_exhaustion_rejects_without_touching_the_provider()
{
  let provider = Arc::new( SlowProvider { delay : Duration::from_millis( 200 ), calls : AtomicU32::new( 0 ) } );
  let mut registry = ProviderRegistry::new();
  registry.register( provider.clone() );

  std::env::set_var( "CONCURRENCY", "1" );
  std::env::set_var( "QUEUE_LIMIT", "0" );
  std::env::set_var( "CACHE_LIMIT", "0" );
  let config = Config::from_env();
  std::env::remove_var( "CONCURRENCY" );
  std::env::remove_var( "QUEUE_LIMIT" );
  std::env::remove_var( "CACHE_LIMIT" );

  let orchestrator = Arc::new( AnalysisOrchestrator::new( &config, Arc::new( registry ), provider_config(), Logger::new( "test", "test" ) ) );

  let first_orchestrator = orchestrator.clone();
  let first = tokio::spawn( async move
  {
    first_orchestrator.analyze( "Error", "slow path", "stack", HashMap::new() ).await
  } );

  tokio::time::sleep( Duration::from_millis( 20 ) ).await;

  // Second call arrives while the first already holds the only slot and
  // the queue has no room; it must be rejected synchronously.
  let second = orchestrator.analyze( "Error", "slow path take two", "stack", HashMap::new() ).await;
  assert!( second.is_none() );

  let first_result = first.await.unwrap();
  assert!( first_result.is_some() );
  assert_eq!( provider.calls.load( Ordering::Relaxed ), 1 );
  assert!( orchestrator.gate_reject_count() >= 1 );
}

#[ tokio::test ]
async fn disabled_cache_forces_one_provider_call_per_analysis()
{
  let provider = Arc::new( SlowProvider { delay : Duration::from_millis( 1 ), calls : AtomicU32::new( 0 ) } );
  let mut registry = ProviderRegistry::new();
  registry.register( provider.clone() );

  std::env::set_var( "CACHE_LIMIT", "0" );
  let config = Config::from_env();
  std::env::remove_var( "CACHE_LIMIT" );

  let orchestrator = AnalysisOrchestrator::new( &config, Arc::new( registry ), provider_config(), Logger::new( "test", "test" ) );

  for _ in 0..3
  {
    let result = orchestrator.analyze( "Error", "identical every time", "same stack", HashMap::new() ).await;
    assert!( result.is_some() );
  }

  assert_eq!( provider.calls.load( Ordering::Relaxed ), 3 );
}

#[ tokio::test ]
async fn sanitized_message_is_what_reaches_the_provider()
{
  let provider = Arc::new( CapturingProvider { last_message : std::sync::Mutex::new( None ) } );
  let mut registry = ProviderRegistry::new();
  registry.register( provider.clone() );

  let orchestrator = AnalysisOrchestrator::new( &Config::from_env(), Arc::new( registry ), provider_config(), Logger::new( "test", "test" ) );

  let mut context = HashMap::new();
  context.insert( "password".to_string(), serde_json::json!( "hunter2" ) );

  let raw_message = "token=<secret>abc\r\ndef";
  let result = orchestrator.analyze( "Error", raw_message, "stack", context ).await;
  assert!( result.is_some() );

  let captured = provider.last_message.lock().unwrap().clone().unwrap();
  assert!( !captured.contains( '<' ) );
  assert!( !captured.contains( '\r' ) );
  assert!( !captured.contains( '\n' ) );
}
