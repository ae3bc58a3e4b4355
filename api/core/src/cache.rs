// src/cache.rs
//! Bounded key-to-advice mapping with LRU eviction and per-entry TTL, plus
//! a background reaper that removes expired entries on a timer.

#![ allow( clippy::missing_inline_in_public_items ) ]

/// Define a private namespace for all its items.
mod private
{
  use crate::types::Advice;

  use std::
  {
    collections ::HashMap,
    sync ::{ Arc, Weak },
    time ::Instant,
  };
  use core::time::Duration;
  use core::sync::atomic::{ AtomicBool, AtomicU32, AtomicU64, Ordering };
  use tokio::sync::RwLock;

  /// Upper clamp on `max_entries` : `CACHE_LIMIT` never exceeds this.
  const MAX_ENTRIES_CEILING : usize = 1000;
  /// Upper clamp on the TTL : `CACHE_TTL` never exceeds 24 hours.
  const TTL_CEILING : Duration = Duration::from_secs( 86_400 );
  /// Floor on the reaper period, even for very short TTLs.
  const REAPER_PERIOD_FLOOR : Duration = Duration::from_secs( 60 );

  /// Read-only snapshot of cache performance counters.
  #[ derive( Debug, Default ) ]
  pub struct CacheStatistics
  {
    /// Total number of `get` calls that returned a live entry.
    pub hits : Arc< AtomicU64 >,
    /// Total number of `get` calls that found nothing live.
    pub misses : Arc< AtomicU64 >,
    /// Total number of entries removed by eviction or expiry.
    pub evictions : Arc< AtomicU64 >,
    /// Current number of live entries.
    pub entries : Arc< AtomicU32 >,
  }

  #[ derive( Debug ) ]
  struct CacheEntry
  {
    value : Advice,
    inserted_at : Instant,
    last_access_at : Instant,
  }

  impl CacheEntry
  {
    fn is_expired( &self, ttl : Duration ) -> bool
    {
      self.inserted_at.elapsed() > ttl
    }
  }

  /// Bounded, TTL-bound advice cache keyed by error fingerprint.
  ///
  /// `max_entries` and `ttl` are clamped at construction : `max_entries` to
  /// `[0, 1000]` and `ttl` to at most 24 hours. A value of zero for either
  /// disables caching entirely - `get` always returns `None` and `put` is a
  /// no-op.
  #[ derive( Debug ) ]
  pub struct AdviceCache
  {
    entries : RwLock< HashMap< String, CacheEntry > >,
    max_entries : usize,
    ttl : Duration,
    statistics : CacheStatistics,
    reaper_running : AtomicBool,
  }

  impl AdviceCache
  {
    /// Creates a new cache, clamping `max_entries` and `ttl` to their
    /// documented bounds.
    #[ must_use ]
    pub fn new( max_entries : usize, ttl : Duration ) -> Self
    {
      Self
      {
        entries : RwLock::new( HashMap::new() ),
        max_entries : max_entries.min( MAX_ENTRIES_CEILING ),
        ttl : ttl.min( TTL_CEILING ),
        statistics : CacheStatistics::default(),
        reaper_running : AtomicBool::new( false ),
      }
    }

    /// Whether caching is disabled (either bound clamped to zero).
    #[ must_use ]
    #[ inline ]
    pub fn is_disabled( &self ) -> bool
    {
      self.max_entries == 0 || self.ttl.is_zero()
    }

    /// The reaper period : `TTL / 4`, floored at 60 seconds.
    #[ must_use ]
    fn reaper_period( &self ) -> Duration
    {
      ( self.ttl / 4 ).max( REAPER_PERIOD_FLOOR )
    }

    /// Reads a value by key. Returns `None` if absent, expired, or caching
    /// is disabled. An expired entry found on read is removed immediately.
    pub async fn get( &self, key : &str ) -> Option< Advice >
    {
      if self.is_disabled()
      {
        return None;
      }

      {
        let entries = self.entries.read().await;
        if let Some( entry ) = entries.get( key )
        {
          if !entry.is_expired( self.ttl )
          {
            self.statistics.hits.fetch_add( 1, Ordering::Relaxed );
            let value = entry.value.clone();
            drop( entries );
            // Touch last_access_at under a short write lock.
            let mut entries = self.entries.write().await;
            if let Some( entry ) = entries.get_mut( key )
            {
              entry.last_access_at = Instant::now();
            }
            return Some( value );
          }
        }
      }

      // Absent or expired : drop any stale entry and count a miss.
      let mut entries = self.entries.write().await;
      if entries.remove( key ).is_some()
      {
        self.statistics.entries.fetch_sub( 1, Ordering::Relaxed );
        self.statistics.evictions.fetch_add( 1, Ordering::Relaxed );
      }
      self.statistics.misses.fetch_add( 1, Ordering::Relaxed );
      None
    }

    /// Inserts or overwrites an entry, evicting the least-recently-accessed
    /// entry until `max_entries` is satisfied. A no-op when caching is
    /// disabled. Lazily starts the background reaper on the first
    /// non-empty insert.
    pub async fn put( self : &Arc< Self >, key : String, value : Advice )
    {
      if self.is_disabled()
      {
        return;
      }

      {
        let mut entries = self.entries.write().await;
        if !entries.contains_key( &key )
        {
          while entries.len() >= self.max_entries
          {
            let Some( oldest_key ) = entries
              .iter()
              .min_by_key( | ( _, entry ) | entry.last_access_at )
              .map( | ( k, _ ) | k.clone() )
            else
            {
              break;
            };
            entries.remove( &oldest_key );
            self.statistics.evictions.fetch_add( 1, Ordering::Relaxed );
            self.statistics.entries.fetch_sub( 1, Ordering::Relaxed );
          }

          self.statistics.entries.fetch_add( 1, Ordering::Relaxed );
        }

        let now = Instant::now();
        entries.insert( key, CacheEntry { value, inserted_at : now, last_access_at : now } );
      }

      self.ensure_reaper_started();
    }

    /// Removes every entry with `now - insertedAt > TTL`. Returns the
    /// number of entries removed.
    pub async fn purge_expired( &self ) -> usize
    {
      let mut entries = self.entries.write().await;
      let before = entries.len();
      entries.retain( | _, entry | !entry.is_expired( self.ttl ) );
      let removed = before - entries.len();

      if removed > 0
      {
        self.statistics.entries.fetch_sub( u32::try_from( removed ).unwrap_or( u32::MAX ), Ordering::Relaxed );
        self.statistics.evictions.fetch_add( u64::try_from( removed ).unwrap_or( u64::MAX ), Ordering::Relaxed );
      }

      removed
    }

    /// Removes every entry, unconditionally.
    pub async fn clear( &self )
    {
      let mut entries = self.entries.write().await;
      let count = entries.len();
      entries.clear();
      self.statistics.entries.store( 0, Ordering::Relaxed );
      self.statistics.evictions.fetch_add( u64::try_from( count ).unwrap_or( u64::MAX ), Ordering::Relaxed );
    }

    /// Current number of live entries (including not-yet-reaped expired
    /// ones, which are only removed lazily on read or by the reaper).
    pub async fn len( &self ) -> usize
    {
      self.entries.read().await.len()
    }

    /// Read-only performance counters.
    #[ must_use ]
    pub fn statistics( &self ) -> &CacheStatistics
    {
      &self.statistics
    }

    /// Starts the background reaper if it is not already running. Exposed
    /// for the cache administration surface (`start_reaper`/`stop_reaper`);
    /// `put` calls this automatically.
    pub fn ensure_reaper_started( self : &Arc< Self > )
    {
      if self.is_disabled()
      {
        return;
      }
      if self.reaper_running.swap( true, Ordering::AcqRel )
      {
        return;
      }

      let weak : Weak< Self > = Arc::downgrade( self );
      let period = self.reaper_period();

      tokio::spawn( async move
      {
        let mut ticker = tokio::time::interval( period );
        loop
        {
          ticker.tick().await;
          let Some( cache ) = weak.upgrade() else { break };

          cache.purge_expired().await;

          let now_empty = cache.entries.read().await.is_empty();
          if now_empty
          {
            cache.reaper_running.store( false, Ordering::Release );
            break;
          }
        }
      } );
    }

    /// Stops the background reaper; it restarts lazily on the next
    /// non-empty `put`. Best-effort : the in-flight tick, if any, still
    /// completes before the task notices.
    pub fn stop_reaper( &self )
    {
      self.reaper_running.store( false, Ordering::Release );
    }
  }

} // end mod private

crate ::mod_interface!
{
  exposed use
  {
    AdviceCache,
    CacheStatistics,
  };
}

#[ cfg( test ) ]
mod tests
{
  use super::private::AdviceCache;
  use crate::types::Advice;
  use std::sync::Arc;
  use core::time::Duration;

  fn advice( text : &str ) -> Advice
  {
    Advice { advice : text.to_string(), extra : serde_json::Map::new() }
  }

  #[ tokio::test ]
  async fn put_then_get_returns_same_advice()
  {
    let cache = Arc::new( AdviceCache::new( 10, Duration::from_secs( 60 ) ) );
    cache.clone().put( "fp1".to_string(), advice( "retry with backoff" ) ).await;
    let got = cache.get( "fp1" ).await;
    assert_eq!( got, Some( advice( "retry with backoff" ) ) );
  }

  #[ tokio::test ]
  async fn zero_max_entries_disables_cache()
  {
    let cache = Arc::new( AdviceCache::new( 0, Duration::from_secs( 60 ) ) );
    cache.clone().put( "fp1".to_string(), advice( "x" ) ).await;
    assert_eq!( cache.get( "fp1" ).await, None );
  }

  #[ tokio::test ]
  async fn eviction_keeps_size_at_or_under_max_entries()
  {
    let cache = Arc::new( AdviceCache::new( 2, Duration::from_secs( 60 ) ) );
    cache.clone().put( "a".to_string(), advice( "a" ) ).await;
    cache.clone().put( "b".to_string(), advice( "b" ) ).await;
    cache.clone().put( "c".to_string(), advice( "c" ) ).await;
    assert!( cache.len().await <= 2 );
  }

  #[ tokio::test ]
  async fn expired_entry_is_absent_on_read()
  {
    let cache = Arc::new( AdviceCache::new( 10, Duration::from_millis( 5 ) ) );
    cache.clone().put( "fp1".to_string(), advice( "x" ) ).await;
    tokio::time::sleep( Duration::from_millis( 20 ) ).await;
    assert_eq!( cache.get( "fp1" ).await, None );
  }

  #[ tokio::test ]
  async fn clear_removes_everything()
  {
    let cache = Arc::new( AdviceCache::new( 10, Duration::from_secs( 60 ) ) );
    cache.clone().put( "fp1".to_string(), advice( "x" ) ).await;
    cache.clear().await;
    assert_eq!( cache.len().await, 0 );
  }
}
