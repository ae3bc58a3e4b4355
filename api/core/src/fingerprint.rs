// src/fingerprint.rs
//! Produces a stable short key identifying equivalent errors, used by the
//! advice cache. Two modes are supported behind `USE_SECURE_CACHE_KEYS` :
//! a fast 32-bit FNV-1a hash (the default), and a SHA-256 digest for
//! environments that require stronger collision resistance.

/// Define a private namespace for all its items.
mod private
{
  /// Maximum code points of `message` folded into the fingerprint.
  const MESSAGE_MAX : usize = 500;
  /// Maximum code points of `stack` folded into the fingerprint.
  const STACK_MAX : usize = 1000;
  /// Separator byte placed between the message and stack segments.
  const SEGMENT_SEPARATOR : u8 = 0x1F;

  /// FNV-1a 32-bit offset basis.
  const FNV_OFFSET_BASIS : u32 = 0x811C_9DC5;
  /// FNV-1a 32-bit prime.
  const FNV_PRIME : u32 = 0x0100_0193;

  /// Builds the byte sequence that both hash modes operate over : the
  /// error name, then the truncated message, then the separator byte, then
  /// the truncated stack.
  fn concat_bytes( name : &str, message : &str, stack : &str ) -> Vec< u8 >
  {
    let message_truncated : String = message.chars().take( MESSAGE_MAX ).collect();
    let stack_truncated : String = stack.chars().take( STACK_MAX ).collect();

    let mut bytes = Vec::with_capacity( name.len() + message_truncated.len() + stack_truncated.len() + 1 );
    bytes.extend_from_slice( name.as_bytes() );
    bytes.extend_from_slice( message_truncated.as_bytes() );
    bytes.push( SEGMENT_SEPARATOR );
    bytes.extend_from_slice( stack_truncated.as_bytes() );
    bytes
  }

  /// 32-bit FNV-1a hash, masked to 31 bits and rendered as zero-padded
  /// lower-case hex (8 characters).
  #[ must_use ]
  fn fnv1a_hex( bytes : &[ u8 ] ) -> String
  {
    let mut hash = FNV_OFFSET_BASIS;
    for &byte in bytes
    {
      hash ^= u32::from( byte );
      hash = hash.wrapping_mul( FNV_PRIME );
    }
    format!( "{:08x}", hash & 0x7FFF_FFFF )
  }

  /// SHA-256 digest rendered as lower-case hex, used when
  /// `USE_SECURE_CACHE_KEYS` selects the cryptographic mode.
  #[ cfg( feature = "secure_fingerprint" ) ]
  #[ must_use ]
  fn sha256_hex( bytes : &[ u8 ] ) -> String
  {
    use sha2::{ Sha256, Digest };
    let mut hasher = Sha256::new();
    hasher.update( bytes );
    format!( "{:x}", hasher.finalize() )
  }

  /// Which hash family `fingerprint` should use.
  #[ derive( Debug, Clone, Copy, PartialEq, Eq ) ]
  pub enum FingerprintMode
  {
    /// Fast, non-cryptographic 32-bit FNV-1a (8 hex characters).
    Fast,
    /// Cryptographic SHA-256 digest (64 hex characters), selected by
    /// `USE_SECURE_CACHE_KEYS`.
    Secure,
  }

  /// Computes a stable hex fingerprint from an error's name, message and
  /// stack. Identical inputs always produce identical output.
  ///
  /// # Panics
  /// Panics if `mode` is `FingerprintMode::Secure` and the crate was built
  /// without the `secure_fingerprint` feature.
  #[ must_use ]
  pub fn fingerprint( name : &str, message : &str, stack : &str, mode : FingerprintMode ) -> String
  {
    let bytes = concat_bytes( name, message, stack );
    match mode
    {
      FingerprintMode::Fast => fnv1a_hex( &bytes ),
      #[ cfg( feature = "secure_fingerprint" ) ]
      FingerprintMode::Secure => sha256_hex( &bytes ),
      #[ cfg( not( feature = "secure_fingerprint" ) ) ]
      FingerprintMode::Secure => panic!( "secure_fingerprint feature is not enabled" ),
    }
  }

} // end mod private

crate ::mod_interface!
{
  exposed use
  {
    FingerprintMode,
    fingerprint,
  };
}

#[ cfg( test ) ]
mod tests
{
  use super::private::*;

  #[ test ]
  fn identical_inputs_produce_identical_fingerprints()
  {
    let a = fingerprint( "TypeError", "x is undefined", "at foo.js:1", FingerprintMode::Fast );
    let b = fingerprint( "TypeError", "x is undefined", "at foo.js:1", FingerprintMode::Fast );
    assert_eq!( a, b );
  }

  #[ test ]
  fn different_inputs_produce_different_fingerprints()
  {
    let a = fingerprint( "TypeError", "x is undefined", "at foo.js:1", FingerprintMode::Fast );
    let b = fingerprint( "TypeError", "y is undefined", "at foo.js:1", FingerprintMode::Fast );
    assert_ne!( a, b );
  }

  #[ test ]
  fn fast_mode_is_eight_hex_characters()
  {
    let fp = fingerprint( "Error", "boom", "stack", FingerprintMode::Fast );
    assert_eq!( fp.len(), 8 );
    assert!( fp.chars().all( | c | c.is_ascii_hexdigit() ) );
  }

  #[ cfg( feature = "secure_fingerprint" ) ]
  #[ test ]
  fn secure_mode_is_sixty_four_hex_characters()
  {
    let fp = fingerprint( "Error", "boom", "stack", FingerprintMode::Secure );
    assert_eq!( fp.len(), 64 );
  }
}
