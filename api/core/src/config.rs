// src/config.rs
//! Loads and clamps the recognized configuration options from the process
//! environment. Validation happens once, at construction; every other
//! component trusts the clamped values it receives and never re-validates.

#![ allow( clippy::missing_inline_in_public_items ) ]

/// Define a private namespace for all its items.
mod private
{
  use core::time::Duration;

  /// Clamp applied to concurrency, queue and socket-pool limits unless the
  /// caller raises it explicitly via `SAFE_THRESHOLD`.
  const DEFAULT_SAFE_THRESHOLD : u32 = 64;

  fn env_u32( key : &str, default : u32 ) -> u32
  {
    std::env::var( key ).ok().and_then( | v | v.parse().ok() ).unwrap_or( default )
  }

  fn env_u64( key : &str, default : u64 ) -> u64
  {
    std::env::var( key ).ok().and_then( | v | v.parse().ok() ).unwrap_or( default )
  }

  fn env_bool( key : &str, default : bool ) -> bool
  {
    std::env::var( key )
      .ok()
      .map( | v | matches!( v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on" ) )
      .unwrap_or( default )
  }

  fn env_string( key : &str, default : &str ) -> String
  {
    std::env::var( key ).ok().filter( | v | !v.is_empty() ).unwrap_or_else( || default.to_string() )
  }

  /// Parses a comma-separated list, falling back to `default` when the
  /// variable is absent or empty. Blank entries (consecutive commas,
  /// leading/trailing whitespace-only segments) are dropped.
  fn env_string_list( key : &str, default : &[ &str ] ) -> Vec< String >
  {
    std::env::var( key )
      .ok()
      .filter( | v | !v.is_empty() )
      .map( | v | v.split( ',' ).map( | s | s.trim().to_string() ).filter( | s | !s.is_empty() ).collect() )
      .unwrap_or_else( || default.iter().map( | s | ( *s ).to_string() ).collect() )
  }

  /// Fully resolved, already-clamped runtime configuration. Built once at
  /// startup via `Config::from_env`; every field here is load-bearing for
  /// exactly one component.
  #[ derive( Debug, Clone ) ]
  pub struct Config
  {
    /// `CONCURRENCY` : gate parallelism, clamped to `[1, SAFE_THRESHOLD]`.
    pub concurrency : u32,
    /// `QUEUE_LIMIT` : waiting slots before rejection, clamped to
    /// `[0, SAFE_THRESHOLD]`.
    pub queue_limit : u32,
    /// `SAFE_THRESHOLD` : upper clamp applied to concurrency, queue and
    /// socket-pool limits.
    pub safe_threshold : u32,
    /// `CACHE_LIMIT` : max cache entries, clamped to `[0, 1000]`.
    pub cache_limit : u32,
    /// `CACHE_TTL` : entry lifetime in seconds, clamped to `[0, 86400]`.
    pub cache_ttl : Duration,
    /// `RETRY_ATTEMPTS` : accepted and clamped but never consulted by the
    /// orchestrator; reserved for provider-internal use.
    pub retry_attempts : u32,
    /// `RETRY_BASE_MS` : see `retry_attempts`.
    pub retry_base_ms : u64,
    /// `RETRY_MAX_MS` : see `retry_attempts`.
    pub retry_max_ms : u64,
    /// `TIMEOUT` : provider call operation timeout.
    pub operation_timeout : Duration,
    /// `MAX_TOKENS` : cap on provider output tokens.
    pub max_tokens : u32,
    /// `OPENAI_URL` : OpenAI-style endpoint base URL.
    pub openai_url : String,
    /// `OPENAI_API_VERSION`.
    pub openai_api_version : String,
    /// `MAX_SOCKETS` : outbound HTTP pool bound, clamped to `SAFE_THRESHOLD`.
    pub max_sockets : u32,
    /// `MAX_FREE_SOCKETS` : outbound HTTP idle pool bound, clamped to
    /// `max_sockets`.
    pub max_free_sockets : u32,
    /// `METRIC_INTERVAL_MS` : gate/cache metrics cadence, floored at 1000.
    pub metric_interval : Duration,
    /// `VERBOSE` : whether `Level::Debug` records reach the logger.
    pub verbose : bool,
    /// `USE_SECURE_CACHE_KEYS` : selects `FingerprintMode::Secure`.
    pub use_secure_cache_keys : bool,
    /// `CIRCUIT_BREAKER_FAILURE_THRESHOLD` : consecutive failures before the
    /// breaker opens.
    pub circuit_breaker_failure_threshold : u32,
    /// `CIRCUIT_BREAKER_RECOVERY_MS` : time the breaker stays `Open` before
    /// admitting a `HalfOpen` probe.
    pub circuit_breaker_recovery : Duration,
    /// `ANALYZER_PROVIDER` : preferred provider id passed to
    /// `ProviderRegistry::resolve`; empty means "first configured".
    pub preferred_provider : Option< String >,
    /// `REENTRANT_ERROR_PREFIXES` : error-name prefixes that short-circuit
    /// `analyze` before sanitization, fingerprinting, the cache, the gate or
    /// the breaker are ever touched. Exists to stop the pipeline analyzing
    /// failures from its own outbound HTTP client, which would otherwise
    /// feed a transport error back into the provider it came from. Defaults
    /// to `["AxiosError"]`; comma-separated to configure more.
    pub reentrant_name_prefixes : Vec< String >,
  }

  impl Config
  {
    /// Loads configuration from the process environment, applying the
    /// documented defaults and clamps. Never fails : every malformed or
    /// missing value silently falls back to its default.
    #[ must_use ]
    pub fn from_env() -> Self
    {
      let safe_threshold = env_u32( "SAFE_THRESHOLD", DEFAULT_SAFE_THRESHOLD ).max( 1 );

      let concurrency = env_u32( "CONCURRENCY", 4 ).clamp( 1, safe_threshold );
      let queue_limit = env_u32( "QUEUE_LIMIT", 16 ).min( safe_threshold );
      let cache_limit = env_u32( "CACHE_LIMIT", 500 ).min( 1000 );
      let cache_ttl_secs = env_u64( "CACHE_TTL", 3600 ).min( 86_400 );
      let max_sockets = env_u32( "MAX_SOCKETS", safe_threshold ).min( safe_threshold );
      let max_free_sockets = env_u32( "MAX_FREE_SOCKETS", max_sockets ).min( max_sockets );
      let metric_interval_ms = env_u64( "METRIC_INTERVAL_MS", 10_000 ).max( 1000 );

      Self
      {
        concurrency,
        queue_limit,
        safe_threshold,
        cache_limit,
        cache_ttl : Duration::from_secs( cache_ttl_secs ),
        retry_attempts : env_u32( "RETRY_ATTEMPTS", 0 ),
        retry_base_ms : env_u64( "RETRY_BASE_MS", 0 ),
        retry_max_ms : env_u64( "RETRY_MAX_MS", 0 ),
        operation_timeout : Duration::from_millis( env_u64( "TIMEOUT", 10_000 ) ),
        max_tokens : env_u32( "MAX_TOKENS", 512 ),
        openai_url : env_string( "OPENAI_URL", "https://api.openai.com/v1" ),
        openai_api_version : env_string( "OPENAI_API_VERSION", "2024-02-01" ),
        max_sockets,
        max_free_sockets,
        metric_interval : Duration::from_millis( metric_interval_ms ),
        verbose : env_bool( "VERBOSE", false ),
        use_secure_cache_keys : env_bool( "USE_SECURE_CACHE_KEYS", false ),
        circuit_breaker_failure_threshold : env_u32( "CIRCUIT_BREAKER_FAILURE_THRESHOLD", 5 ).max( 1 ),
        circuit_breaker_recovery : Duration::from_millis( env_u64( "CIRCUIT_BREAKER_RECOVERY_MS", 30_000 ) ),
        preferred_provider : std::env::var( "ANALYZER_PROVIDER" ).ok().filter( | v | !v.is_empty() ),
        reentrant_name_prefixes : env_string_list( "REENTRANT_ERROR_PREFIXES", &[ "AxiosError" ] ),
      }
    }
  }

} // end mod private

crate ::mod_interface!
{
  exposed use
  {
    Config,
  };
}

#[ cfg( test ) ]
mod tests
{
  use super::private::Config;
  use std::sync::Mutex;

  // Environment variable mutation is process-global; serialize tests that
  // touch it so they cannot observe each other's values.
  static ENV_LOCK : Mutex< () > = Mutex::new( () );

  #[ test ]
  fn defaults_are_sane_with_empty_environment()
  {
    let _guard = ENV_LOCK.lock().unwrap();
    let config = Config::from_env();
    assert!( config.concurrency >= 1 );
    assert!( config.cache_limit <= 1000 );
    assert!( config.cache_ttl.as_secs() <= 86_400 );
  }

  #[ test ]
  fn concurrency_is_clamped_to_safe_threshold()
  {
    let _guard = ENV_LOCK.lock().unwrap();
    std::env::set_var( "SAFE_THRESHOLD", "2" );
    std::env::set_var( "CONCURRENCY", "99" );
    let config = Config::from_env();
    assert_eq!( config.concurrency, 2 );
    std::env::remove_var( "SAFE_THRESHOLD" );
    std::env::remove_var( "CONCURRENCY" );
  }

  #[ test ]
  fn cache_limit_is_clamped_to_one_thousand()
  {
    let _guard = ENV_LOCK.lock().unwrap();
    std::env::set_var( "CACHE_LIMIT", "5000" );
    let config = Config::from_env();
    assert_eq!( config.cache_limit, 1000 );
    std::env::remove_var( "CACHE_LIMIT" );
  }

  #[ test ]
  fn reentrant_prefixes_default_to_axios_error()
  {
    let _guard = ENV_LOCK.lock().unwrap();
    let config = Config::from_env();
    assert_eq!( config.reentrant_name_prefixes, vec![ "AxiosError".to_string() ] );
  }

  #[ test ]
  fn reentrant_prefixes_are_parsed_from_a_comma_separated_list()
  {
    let _guard = ENV_LOCK.lock().unwrap();
    std::env::set_var( "REENTRANT_ERROR_PREFIXES", "AxiosError, FetchError ,,HttpError" );
    let config = Config::from_env();
    assert_eq!( config.reentrant_name_prefixes, vec![ "AxiosError".to_string(), "FetchError".to_string(), "HttpError".to_string() ] );
    std::env::remove_var( "REENTRANT_ERROR_PREFIXES" );
  }
}
