// src/circuit_breaker.rs
//! Guards the provider boundary against cascading failure. Three states :
//! `Closed` (normal operation), `Open` (calls rejected without reaching the
//! provider), `HalfOpen` (a single probe call is allowed through to test
//! recovery).

#![ allow( clippy::missing_inline_in_public_items ) ]

/// Define a private namespace for all its items.
mod private
{
  use std::time::Instant;
  use core::time::Duration;
  use core::sync::atomic::{ AtomicU32, AtomicU64, AtomicBool, Ordering };
  use tokio::sync::Mutex;

  use crate::error::AdvisorError;

  /// Observable state of a `CircuitBreaker`.
  #[ derive( Debug, Clone, Copy, PartialEq, Eq ) ]
  pub enum BreakerState
  {
    /// Calls pass through to the provider normally.
    Closed,
    /// Calls are rejected immediately with `AdvisorError::CircuitOpen`.
    Open,
    /// A single probe call is in flight or about to be admitted; every
    /// other caller is rejected until the probe resolves.
    HalfOpen,
  }

  /// Point-in-time snapshot of breaker counters, safe to clone and log.
  #[ derive( Debug, Clone ) ]
  pub struct BreakerMetrics
  {
    /// Current state.
    pub state : BreakerState,
    /// Total calls observed (successes + failures), since construction.
    pub total_requests : u64,
    /// Calls that completed without error.
    pub successful_requests : u64,
    /// Calls that completed with a breaker-counted error.
    pub failed_requests : u64,
    /// Running average response time across all observed calls, in
    /// milliseconds.
    pub average_response_time_ms : f64,
    /// Milliseconds since the last counted failure, or `None` if there has
    /// not been one yet.
    pub ms_since_last_failure : Option< u64 >,
  }

  #[ derive( Debug ) ]
  struct Inner
  {
    state : BreakerState,
    consecutive_failures : u32,
    opened_at : Option< Instant >,
    last_failure_at : Option< Instant >,
    half_open_probe_in_flight : bool,
  }

  /// Trips to `Open` after `failure_threshold` consecutive counted failures,
  /// and transitions to `HalfOpen` after `recovery_timeout` has elapsed,
  /// admitting exactly one probe call. A successful probe closes the
  /// breaker; a failed probe reopens it and restarts the recovery timer.
  #[ derive( Debug ) ]
  pub struct CircuitBreaker
  {
    failure_threshold : u32,
    recovery_timeout : Duration,
    inner : Mutex< Inner >,

    total_requests : AtomicU64,
    successful_requests : AtomicU64,
    failed_requests : AtomicU64,
    total_response_time_ms : AtomicU64,
    tripped_ever : AtomicBool,
  }

  impl CircuitBreaker
  {
    /// Creates a new breaker in the `Closed` state.
    #[ must_use ]
    pub fn new( failure_threshold : u32, recovery_timeout : Duration ) -> Self
    {
      Self
      {
        failure_threshold : failure_threshold.max( 1 ),
        recovery_timeout,
        inner : Mutex::new( Inner
        {
          state : BreakerState::Closed,
          consecutive_failures : 0,
          opened_at : None,
          last_failure_at : None,
          half_open_probe_in_flight : false,
        } ),
        total_requests : AtomicU64::new( 0 ),
        successful_requests : AtomicU64::new( 0 ),
        failed_requests : AtomicU64::new( 0 ),
        total_response_time_ms : AtomicU64::new( 0 ),
        tripped_ever : AtomicBool::new( false ),
      }
    }

    /// Checks admission, upgrading `Open` to `HalfOpen` once the recovery
    /// timeout has elapsed. Returns an error without touching any counters
    /// if the call should be rejected.
    ///
    /// # Errors
    /// Returns `AdvisorError::CircuitOpen` if the breaker is `Open` (and the
    /// recovery timeout has not yet elapsed) or if a `HalfOpen` probe is
    /// already in flight.
    pub async fn admit( &self ) -> Result< (), AdvisorError >
    {
      let mut inner = self.inner.lock().await;
      match inner.state
      {
        BreakerState::Closed => Ok( () ),
        BreakerState::Open =>
        {
          let elapsed = inner.opened_at.map( | at | at.elapsed() ).unwrap_or_default();
          if elapsed >= self.recovery_timeout
          {
            inner.state = BreakerState::HalfOpen;
            inner.half_open_probe_in_flight = true;
            Ok( () )
          }
          else
          {
            Err( AdvisorError::CircuitOpen( format!(
              "circuit open, retry in {} ms", ( self.recovery_timeout - elapsed ).as_millis()
            ) ) )
          }
        }
        BreakerState::HalfOpen =>
        {
          if inner.half_open_probe_in_flight
          {
            Err( AdvisorError::CircuitOpen( "half-open probe already in flight".to_string() ) )
          }
          else
          {
            inner.half_open_probe_in_flight = true;
            Ok( () )
          }
        }
      }
    }

    /// Records the outcome of a call previously admitted by `admit`.
    /// `counts_as_failure` should usually come from
    /// `AdvisorError::counts_as_breaker_failure`, so that rejections the
    /// breaker itself produced never feed back into its own threshold.
    pub async fn record( &self, succeeded : bool, elapsed : Duration )
    {
      self.total_requests.fetch_add( 1, Ordering::Relaxed );
      self.total_response_time_ms.fetch_add( u64::try_from( elapsed.as_millis() ).unwrap_or( u64::MAX ), Ordering::Relaxed );

      if succeeded
      {
        self.successful_requests.fetch_add( 1, Ordering::Relaxed );
      }
      else
      {
        self.failed_requests.fetch_add( 1, Ordering::Relaxed );
      }

      let mut inner = self.inner.lock().await;
      inner.half_open_probe_in_flight = false;

      match inner.state
      {
        BreakerState::HalfOpen =>
        {
          if succeeded
          {
            inner.state = BreakerState::Closed;
            inner.consecutive_failures = 0;
            inner.opened_at = None;
          }
          else
          {
            inner.state = BreakerState::Open;
            inner.opened_at = Some( Instant::now() );
            inner.last_failure_at = Some( Instant::now() );
            self.tripped_ever.store( true, Ordering::Relaxed );
          }
        }
        BreakerState::Closed =>
        {
          if succeeded
          {
            inner.consecutive_failures = 0;
          }
          else
          {
            inner.consecutive_failures += 1;
            inner.last_failure_at = Some( Instant::now() );
            if inner.consecutive_failures >= self.failure_threshold
            {
              inner.state = BreakerState::Open;
              inner.opened_at = Some( Instant::now() );
              self.tripped_ever.store( true, Ordering::Relaxed );
            }
          }
        }
        BreakerState::Open =>
        {
          // A call outcome arriving while already `Open` (e.g. a racing
          // probe) just refreshes the failure timestamp.
          if !succeeded
          {
            inner.last_failure_at = Some( Instant::now() );
          }
        }
      }
    }

    /// Current state.
    pub async fn state( &self ) -> BreakerState
    {
      self.inner.lock().await.state
    }

    /// Point-in-time metrics snapshot.
    pub async fn metrics( &self ) -> BreakerMetrics
    {
      let inner = self.inner.lock().await;
      let total = self.total_requests.load( Ordering::Relaxed );
      let total_time = self.total_response_time_ms.load( Ordering::Relaxed );

      BreakerMetrics
      {
        state : inner.state,
        total_requests : total,
        successful_requests : self.successful_requests.load( Ordering::Relaxed ),
        failed_requests : self.failed_requests.load( Ordering::Relaxed ),
        average_response_time_ms : if total == 0 { 0.0 } else { total_time as f64 / total as f64 },
        ms_since_last_failure : inner.last_failure_at.map( | at | u64::try_from( at.elapsed().as_millis() ).unwrap_or( u64::MAX ) ),
      }
    }

    /// Forces the breaker back to `Closed`, clearing counters used for
    /// tripping. Intended for administrative recovery, not normal
    /// operation.
    pub async fn reset( &self )
    {
      let mut inner = self.inner.lock().await;
      inner.state = BreakerState::Closed;
      inner.consecutive_failures = 0;
      inner.opened_at = None;
      inner.half_open_probe_in_flight = false;
    }

    /// Forces the breaker to `Open` regardless of its failure history.
    /// Intended for administrative use (draining a provider, manual
    /// incident response), not triggered by normal call outcomes.
    pub async fn force_open( &self )
    {
      let mut inner = self.inner.lock().await;
      inner.state = BreakerState::Open;
      inner.opened_at = Some( Instant::now() );
      inner.half_open_probe_in_flight = false;
      self.tripped_ever.store( true, Ordering::Relaxed );
    }
  }

} // end mod private

crate ::mod_interface!
{
  exposed use
  {
    CircuitBreaker,
    BreakerState,
    BreakerMetrics,
  };
}

#[ cfg( test ) ]
mod tests
{
  use super::private::{ CircuitBreaker, BreakerState };
  use core::time::Duration;

  #[ tokio::test ]
  async fn opens_after_consecutive_failures_reach_threshold()
  {
    let breaker = CircuitBreaker::new( 3, Duration::from_secs( 60 ) );
    for _ in 0..3
    {
      breaker.admit().await.unwrap();
      breaker.record( false, Duration::from_millis( 1 ) ).await;
    }
    assert_eq!( breaker.state().await, BreakerState::Open );
  }

  #[ tokio::test ]
  async fn rejects_calls_while_open()
  {
    let breaker = CircuitBreaker::new( 1, Duration::from_secs( 60 ) );
    breaker.admit().await.unwrap();
    breaker.record( false, Duration::from_millis( 1 ) ).await;
    assert!( breaker.admit().await.is_err() );
  }

  #[ tokio::test ]
  async fn half_open_probe_closes_breaker_on_success()
  {
    let breaker = CircuitBreaker::new( 1, Duration::from_millis( 1 ) );
    breaker.admit().await.unwrap();
    breaker.record( false, Duration::from_millis( 1 ) ).await;

    tokio::time::sleep( Duration::from_millis( 5 ) ).await;

    breaker.admit().await.unwrap();
    assert_eq!( breaker.state().await, BreakerState::HalfOpen );
    breaker.record( true, Duration::from_millis( 1 ) ).await;
    assert_eq!( breaker.state().await, BreakerState::Closed );
  }

  #[ tokio::test ]
  async fn half_open_probe_reopens_breaker_on_failure()
  {
    let breaker = CircuitBreaker::new( 1, Duration::from_millis( 1 ) );
    breaker.admit().await.unwrap();
    breaker.record( false, Duration::from_millis( 1 ) ).await;

    tokio::time::sleep( Duration::from_millis( 5 ) ).await;

    breaker.admit().await.unwrap();
    breaker.record( false, Duration::from_millis( 1 ) ).await;
    assert_eq!( breaker.state().await, BreakerState::Open );
  }

  #[ tokio::test ]
  async fn only_one_probe_admitted_while_half_open()
  {
    let breaker = CircuitBreaker::new( 1, Duration::from_millis( 1 ) );
    breaker.admit().await.unwrap();
    breaker.record( false, Duration::from_millis( 1 ) ).await;

    tokio::time::sleep( Duration::from_millis( 5 ) ).await;

    breaker.admit().await.unwrap();
    assert!( breaker.admit().await.is_err() );
  }
}
