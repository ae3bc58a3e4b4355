// src/logger.rs
//! Structured logging facade : every pipeline stage logs through `Logger`,
//! which assembles a `LogRecord` and emits it via `tracing` at the matching
//! level. Call sites never format log lines themselves.

#![ allow( clippy::missing_inline_in_public_items ) ]

/// Define a private namespace for all its items.
mod private
{
  /// Severity of a log record. `Trace` through `Error` map 1:1 onto
  /// `tracing`'s levels; `Fatal` and `Audit` are dispatched through the
  /// nearest `tracing` level (`ERROR` and `INFO` respectively) but keep
  /// their own tag in the structured record so a log sink can still tell
  /// them apart from an ordinary error or info event.
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, serde::Serialize ) ]
  #[ serde( rename_all = "lowercase" ) ]
  pub enum Level
  {
    /// Fine-grained diagnostic detail, disabled by default in production.
    Trace,
    /// Diagnostic detail useful while developing or troubleshooting; only
    /// emitted when the logger was built with `verbose` set.
    Debug,
    /// Normal operational events.
    Info,
    /// Recoverable anomalies worth operator attention.
    Warn,
    /// Failures that affected the outcome of a call.
    Error,
    /// Unrecoverable failures requiring immediate operator intervention.
    Fatal,
    /// Security- or compliance-relevant events kept for traceability,
    /// regardless of the ambient verbosity setting.
    Audit,
  }

  /// One structured log entry. Carries enough context to reconstruct what
  /// happened to a given `request_id` without grepping free text.
  #[ derive( Debug, Clone, serde::Serialize ) ]
  pub struct LogRecord
  {
    /// RFC 3339 timestamp.
    pub timestamp : String,
    /// Severity.
    pub level : Level,
    /// Human-readable message.
    pub message : String,
    /// Free-form structured fields (already sanitized by the caller).
    pub context : serde_json::Map< String, serde_json::Value >,
    /// Correlation id of the `ErrorRecord` this log entry concerns, if any.
    pub request_id : Option< String >,
    /// Logical service name, e.g. `"error-advisor"`.
    pub service : String,
    /// Deployment environment, e.g. `"production"` or `"staging"`.
    pub environment : String,
    /// Resident memory usage in bytes at emission time, when available on
    /// the host platform.
    pub memory_usage_bytes : Option< u64 >,
  }

  /// Reads resident set size from `/proc/self/status` on Linux. Returns
  /// `None` on any other platform or on any read failure; memory reporting
  /// is diagnostic only and never allowed to fail a log call.
  #[ cfg( target_os = "linux" ) ]
  fn current_memory_usage_bytes() -> Option< u64 >
  {
    let status = std::fs::read_to_string( "/proc/self/status" ).ok()?;
    status
      .lines()
      .find( | line | line.starts_with( "VmRSS:" ) )
      .and_then( | line | line.split_whitespace().nth( 1 ) )
      .and_then( | kib | kib.parse::< u64 >().ok() )
      .map( | kib | kib * 1024 )
  }

  #[ cfg( not( target_os = "linux" ) ) ]
  fn current_memory_usage_bytes() -> Option< u64 >
  {
    None
  }

  /// Structured logging facade bound to a service name and environment.
  /// Cheap to clone and share.
  #[ derive( Debug, Clone ) ]
  pub struct Logger
  {
    service : String,
    environment : String,
    verbose : bool,
  }

  impl Logger
  {
    /// Creates a logger for `service` running in `environment`, with
    /// `Level::Debug` emission disabled (`VERBOSE` defaults to `false`).
    /// Call `with_verbose` to match a resolved `Config`.
    #[ must_use ]
    pub fn new( service : impl Into< String >, environment : impl Into< String > ) -> Self
    {
      Self { service : service.into(), environment : environment.into(), verbose : false }
    }

    /// Sets whether `Level::Debug` records reach `tracing`, matching
    /// `Config::verbose`. `Level::Trace` through `Level::Audit` are
    /// unaffected - this only gates debug-level chatter.
    #[ must_use ]
    pub fn with_verbose( mut self, verbose : bool ) -> Self
    {
      self.verbose = verbose;
      self
    }

    /// Builds a `LogRecord` and emits it through `tracing` at the matching
    /// level. Returns the record so callers (and tests) can inspect what
    /// was logged without re-parsing trace output.
    pub fn log( &self, level : Level, message : &str, context : serde_json::Map< String, serde_json::Value >, request_id : Option< &str > ) -> LogRecord
    {
      let record = LogRecord
      {
        timestamp : chrono::Utc::now().to_rfc3339(),
        level,
        message : message.to_string(),
        context,
        request_id : request_id.map( ToOwned::to_owned ),
        service : self.service.clone(),
        environment : self.environment.clone(),
        memory_usage_bytes : current_memory_usage_bytes(),
      };

      let context_json = serde_json::Value::Object( record.context.clone() ).to_string();
      match level
      {
        Level::Trace => tracing::event!( tracing::Level::TRACE, message = %record.message, request_id = ?record.request_id, context = %context_json ),
        Level::Debug =>
        {
          if self.verbose
          {
            tracing::event!( tracing::Level::DEBUG, message = %record.message, request_id = ?record.request_id, context = %context_json );
          }
        }
        Level::Info => tracing::event!( tracing::Level::INFO, message = %record.message, request_id = ?record.request_id, context = %context_json ),
        Level::Warn => tracing::event!( tracing::Level::WARN, message = %record.message, request_id = ?record.request_id, context = %context_json ),
        Level::Error => tracing::event!( tracing::Level::ERROR, message = %record.message, request_id = ?record.request_id, context = %context_json ),
        Level::Fatal => tracing::event!( tracing::Level::ERROR, fatal = true, message = %record.message, request_id = ?record.request_id, context = %context_json ),
        Level::Audit => tracing::event!( tracing::Level::INFO, audit = true, message = %record.message, request_id = ?record.request_id, context = %context_json ),
      }

      record
    }

    /// Convenience wrapper for `Level::Info`.
    pub fn info( &self, message : &str, context : serde_json::Map< String, serde_json::Value >, request_id : Option< &str > ) -> LogRecord
    {
      self.log( Level::Info, message, context, request_id )
    }

    /// Convenience wrapper for `Level::Warn`.
    pub fn warn( &self, message : &str, context : serde_json::Map< String, serde_json::Value >, request_id : Option< &str > ) -> LogRecord
    {
      self.log( Level::Warn, message, context, request_id )
    }

    /// Convenience wrapper for `Level::Error`.
    pub fn error( &self, message : &str, context : serde_json::Map< String, serde_json::Value >, request_id : Option< &str > ) -> LogRecord
    {
      self.log( Level::Error, message, context, request_id )
    }

    /// Convenience wrapper for `Level::Debug`.
    pub fn debug( &self, message : &str, context : serde_json::Map< String, serde_json::Value >, request_id : Option< &str > ) -> LogRecord
    {
      self.log( Level::Debug, message, context, request_id )
    }

    /// Convenience wrapper for `Level::Fatal`.
    pub fn fatal( &self, message : &str, context : serde_json::Map< String, serde_json::Value >, request_id : Option< &str > ) -> LogRecord
    {
      self.log( Level::Fatal, message, context, request_id )
    }

    /// Convenience wrapper for `Level::Audit`.
    pub fn audit( &self, message : &str, context : serde_json::Map< String, serde_json::Value >, request_id : Option< &str > ) -> LogRecord
    {
      self.log( Level::Audit, message, context, request_id )
    }
  }

} // end mod private

crate ::mod_interface!
{
  exposed use
  {
    Logger,
    LogRecord,
    Level,
  };
}

#[ cfg( test ) ]
mod tests
{
  use super::private::{ Logger, Level };

  #[ test ]
  fn log_record_carries_service_and_environment()
  {
    let logger = Logger::new( "error-advisor", "test" );
    let record = logger.info( "analysis completed", serde_json::Map::new(), Some( "req-1" ) );
    assert_eq!( record.service, "error-advisor" );
    assert_eq!( record.environment, "test" );
    assert_eq!( record.request_id.as_deref(), Some( "req-1" ) );
    assert_eq!( record.level, Level::Info );
  }

  #[ test ]
  fn timestamp_is_rfc3339()
  {
    let logger = Logger::new( "svc", "test" );
    let record = logger.debug( "hello", serde_json::Map::new(), None );
    assert!( chrono::DateTime::parse_from_rfc3339( &record.timestamp ).is_ok() );
  }

  #[ test ]
  fn fatal_and_audit_records_carry_their_own_level()
  {
    let logger = Logger::new( "svc", "test" );
    let fatal = logger.fatal( "out of memory", serde_json::Map::new(), None );
    assert_eq!( fatal.level, Level::Fatal );

    let audit = logger.audit( "credential rotated", serde_json::Map::new(), None );
    assert_eq!( audit.level, Level::Audit );
  }

  #[ test ]
  fn debug_record_is_still_built_regardless_of_verbosity()
  {
    // `with_verbose` only gates whether `tracing::event!` fires for
    // `Level::Debug`; the returned `LogRecord` is always populated so
    // callers (and tests) can inspect what would have been logged.
    let quiet = Logger::new( "svc", "test" );
    let record = quiet.debug( "detail", serde_json::Map::new(), None );
    assert_eq!( record.level, Level::Debug );

    let loud = Logger::new( "svc", "test" ).with_verbose( true );
    let record = loud.debug( "detail", serde_json::Map::new(), None );
    assert_eq!( record.level, Level::Debug );
  }

  #[ test ]
  fn emits_through_a_real_tracing_subscriber_without_panicking()
  {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let logger = Logger::new( "error-advisor", "test" ).with_verbose( true );
    logger.info( "analysis completed", serde_json::Map::new(), Some( "req-1" ) );
    logger.debug( "provider request body", serde_json::Map::new(), Some( "req-1" ) );
    logger.fatal( "process is out of memory", serde_json::Map::new(), None );
    logger.audit( "credential rotated", serde_json::Map::new(), None );
  }
}
