// src/gate.rs
//! Bounds concurrent calls into a provider and applies backpressure once a
//! bounded queue of waiters also fills up, instead of growing an unbounded
//! queue of pending callers.

#![ allow( clippy::missing_inline_in_public_items ) ]

/// Define a private namespace for all its items.
mod private
{
  use std::sync::Arc;
  use core::sync::atomic::{ AtomicU64, AtomicUsize, Ordering };
  use tokio::sync::{ Semaphore, OwnedSemaphorePermit };

  use crate::error::AdvisorError;

  /// Point-in-time snapshot of gate counters.
  #[ derive( Debug, Clone ) ]
  pub struct GateMetrics
  {
    /// Calls currently holding a permit.
    pub active : usize,
    /// Callers currently queued, waiting for a permit.
    pub waiting : usize,
    /// Calls rejected because the queue was already full.
    pub rejected : u64,
    /// Calls admitted since construction (queued or not).
    pub admitted_total : u64,
  }

  /// Held for the duration of one provider call; dropping it releases the
  /// concurrency slot back to the gate.
  #[ derive( Debug ) ]
  pub struct GatePermit
  {
    _permit : OwnedSemaphorePermit,
  }

  /// Reserves one waiting-list slot on construction and releases it on
  /// drop, including when the owning future is cancelled mid-await rather
  /// than completing normally. This is what keeps `waiting` accurate under
  /// cancellation : a queued caller whose future is simply dropped (a
  /// timeout, a `select!` that picked another branch) must not permanently
  /// inflate the count.
  struct WaitingSlot<'a>
  {
    waiting : &'a AtomicUsize,
  }

  impl Drop for WaitingSlot< '_ >
  {
    fn drop( &mut self )
    {
      self.waiting.fetch_sub( 1, Ordering::AcqRel );
    }
  }

  /// Admission control in front of a provider : `max_concurrency` permits
  /// are available at once, and up to `max_queue` additional callers may
  /// wait for one. A caller arriving when both are exhausted is rejected
  /// immediately rather than queued.
  #[ derive( Debug ) ]
  pub struct ConcurrencyGate
  {
    semaphore : Arc< Semaphore >,
    max_concurrency : usize,
    max_queue : usize,
    waiting : AtomicUsize,
    rejected : AtomicU64,
    admitted_total : AtomicU64,
  }

  impl ConcurrencyGate
  {
    /// Creates a new gate. `max_concurrency` of zero means no call is ever
    /// admitted.
    #[ must_use ]
    pub fn new( max_concurrency : usize, max_queue : usize ) -> Self
    {
      Self
      {
        semaphore : Arc::new( Semaphore::new( max_concurrency ) ),
        max_concurrency,
        max_queue,
        waiting : AtomicUsize::new( 0 ),
        rejected : AtomicU64::new( 0 ),
        admitted_total : AtomicU64::new( 0 ),
      }
    }

    /// Acquires a permit, queueing the caller if none is immediately
    /// available and the queue still has room.
    ///
    /// # Errors
    /// Returns `AdvisorError::QueueExhausted` if no permit is immediately
    /// available and the queue is already at `max_queue` waiters.
    pub async fn acquire( &self ) -> Result< GatePermit, AdvisorError >
    {
      if let Ok( permit ) = Arc::clone( &self.semaphore ).try_acquire_owned()
      {
        self.admitted_total.fetch_add( 1, Ordering::Relaxed );
        return Ok( GatePermit { _permit : permit } );
      }

      let Some( _slot ) = self.try_reserve_waiting_slot() else
      {
        self.rejected.fetch_add( 1, Ordering::Relaxed );
        return Err( AdvisorError::QueueExhausted );
      };

      let result = Arc::clone( &self.semaphore ).acquire_owned().await;

      match result
      {
        Ok( permit ) =>
        {
          self.admitted_total.fetch_add( 1, Ordering::Relaxed );
          Ok( GatePermit { _permit : permit } )
        }
        Err( _closed ) => Err( AdvisorError::QueueExhausted ),
      }
    }

    /// Atomically checks `waiting < max_queue` and reserves a slot in the
    /// same compare-exchange step, so concurrent callers racing the same
    /// check never both observe room and both enqueue.
    fn try_reserve_waiting_slot( &self ) -> Option< WaitingSlot< '_ > >
    {
      let mut current = self.waiting.load( Ordering::Acquire );
      loop
      {
        if current >= self.max_queue
        {
          return None;
        }

        match self.waiting.compare_exchange_weak( current, current + 1, Ordering::AcqRel, Ordering::Acquire )
        {
          Ok( _ ) => return Some( WaitingSlot { waiting : &self.waiting } ),
          Err( observed ) => current = observed,
        }
      }
    }

    /// Point-in-time metrics snapshot.
    #[ must_use ]
    pub fn metrics( &self ) -> GateMetrics
    {
      let available = self.semaphore.available_permits();
      GateMetrics
      {
        active : self.max_concurrency.saturating_sub( available ),
        waiting : self.waiting.load( Ordering::Relaxed ),
        rejected : self.rejected.load( Ordering::Relaxed ),
        admitted_total : self.admitted_total.load( Ordering::Relaxed ),
      }
    }
  }

} // end mod private

crate ::mod_interface!
{
  exposed use
  {
    ConcurrencyGate,
    GatePermit,
    GateMetrics,
  };
}

#[ cfg( test ) ]
mod tests
{
  use super::private::ConcurrencyGate;
  use std::sync::Arc;

  #[ tokio::test ]
  async fn admits_up_to_max_concurrency_immediately()
  {
    let gate = ConcurrencyGate::new( 2, 0 );
    let _a = gate.acquire().await.unwrap();
    let _b = gate.acquire().await.unwrap();
    assert_eq!( gate.metrics().active, 2 );
  }

  #[ tokio::test ]
  async fn rejects_when_queue_is_full()
  {
    let gate = Arc::new( ConcurrencyGate::new( 1, 0 ) );
    let _permit = gate.acquire().await.unwrap();
    let err = gate.acquire().await.unwrap_err();
    assert_eq!( err.kind(), "queue-exhausted" );
  }

  #[ tokio::test ]
  async fn queued_caller_is_admitted_once_a_permit_frees()
  {
    let gate = Arc::new( ConcurrencyGate::new( 1, 1 ) );
    let permit = gate.acquire().await.unwrap();

    let gate_clone = Arc::clone( &gate );
    let waiter = tokio::spawn( async move { gate_clone.acquire().await } );

    tokio::task::yield_now().await;
    assert_eq!( gate.metrics().waiting, 1 );

    drop( permit );
    let result = waiter.await.unwrap();
    assert!( result.is_ok() );
  }

  #[ tokio::test ]
  async fn cancelling_a_queued_caller_does_not_leak_its_waiting_slot()
  {
    let gate = Arc::new( ConcurrencyGate::new( 1, 1 ) );
    let held = gate.acquire().await.unwrap();

    let gate_clone = Arc::clone( &gate );
    let waiter = tokio::spawn( async move { gate_clone.acquire().await } );

    tokio::task::yield_now().await;
    assert_eq!( gate.metrics().waiting, 1 );

    // Cancel the queued caller instead of letting a permit free it up.
    waiter.abort();
    let _ = waiter.await;

    // Give the aborted task's drop glue a chance to run.
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;

    assert_eq!( gate.metrics().waiting, 0, "cancelled waiter must release its queue slot" );
    drop( held );
  }

  #[ tokio::test ]
  async fn concurrent_admissions_never_exceed_the_queue_limit()
  {
    let gate = Arc::new( ConcurrencyGate::new( 1, 2 ) );
    let _held = gate.acquire().await.unwrap();

    let mut waiters = Vec::new();
    for _ in 0 .. 8
    {
      let gate_clone = Arc::clone( &gate );
      waiters.push( tokio::spawn( async move { gate_clone.acquire().await } ) );
    }

    tokio::task::yield_now().await;
    assert!( gate.metrics().waiting <= 2, "waiting list must never exceed max_queue" );

    for waiter in waiters
    {
      let _ = waiter.abort();
    }
  }
}
