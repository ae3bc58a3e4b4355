// src/sanitizer.rs
//! Redacts secrets and control characters from messages and context maps
//! before they reach an outbound provider call or a log record.
//!
//! All functions here are pure and idempotent : `sanitize(sanitize(x)) == sanitize(x)`.

/// Define a private namespace for all its items.
mod private
{
  use std::collections::HashMap;
  use regex::Regex;
  use std::sync::OnceLock;

  /// Maximum code points kept by `sanitize_message`.
  const MESSAGE_MAX_CODE_POINTS : usize = 500;

  /// Keys whose values are replaced wholesale, matched case-insensitively
  /// as whole-or-partial key names (e.g. `"x-auth-token"` matches `auth`
  /// and `token`).
  fn redacted_key_pattern() -> &'static Regex
  {
    static PATTERN : OnceLock< Regex > = OnceLock::new();
    PATTERN.get_or_init( || Regex::new( "(?i)password|token|secret|key|auth|authorization|cookie" ).unwrap() )
  }

  /// Removes angle brackets, carriage returns, newlines and C0/DEL control
  /// code points, trims, then truncates to 500 code points.
  #[ must_use ]
  #[ inline ]
  pub fn sanitize_message( s : &str ) -> String
  {
    let filtered : String = s
      .chars()
      .filter( | &c | !matches!( c, '<' | '>' | '\r' | '\n' ) && !is_control_code_point( c ) )
      .collect();

    filtered
      .trim()
      .chars()
      .take( MESSAGE_MAX_CODE_POINTS )
      .collect()
  }

  /// C0 controls (U+0000-U+001F) and DEL (U+007F).
  #[ must_use ]
  #[ inline ]
  fn is_control_code_point( c : char ) -> bool
  {
    ( '\u{0000}'..='\u{001F}' ).contains( &c ) || c == '\u{007F}'
  }

  /// Shallow-copies a context map, replacing the value of any key matching
  /// `redacted_key_pattern` with the literal `"[REDACTED]"`.
  #[ must_use ]
  pub fn sanitize_context( context : &HashMap< String, serde_json::Value > ) -> HashMap< String, serde_json::Value >
  {
    context
      .iter()
      .map( | ( k, v ) |
      {
        if redacted_key_pattern().is_match( k )
        {
          ( k.clone(), serde_json::Value::String( "[REDACTED]".to_string() ) )
        }
        else
        {
          ( k.clone(), v.clone() )
        }
      } )
      .collect()
  }

  /// Masks a string key for diagnostic output : keeps the first four
  /// characters and replaces the remainder with `"***"`; strings of length
  /// four or fewer are replaced entirely with `"***"`.
  #[ must_use ]
  #[ inline ]
  pub fn mask_key( k : &str ) -> String
  {
    if k.chars().count() > 4
    {
      let prefix : String = k.chars().take( 4 ).collect();
      format!( "{prefix}***" )
    }
    else
    {
      "***".to_string()
    }
  }

  /// Truncates a stack trace to its first `max_lines` lines, used when
  /// assembling the prompt sent to a provider.
  #[ must_use ]
  pub fn truncate_stack( stack : &str, max_lines : usize ) -> String
  {
    stack.lines().take( max_lines ).collect::< Vec< _ > >().join( "\n" )
  }

  /// Strips angle brackets, carriage returns and C0/DEL control code points
  /// from a stack trace while preserving newlines, so line-oriented
  /// consumers (`truncate_stack`, the fingerprinter) still see the original
  /// frame boundaries. Unlike `sanitize_message`, this never truncates by
  /// length; callers that need a bounded excerpt call `truncate_stack`
  /// themselves.
  #[ must_use ]
  pub fn sanitize_stack( s : &str ) -> String
  {
    s
      .chars()
      .filter( | &c | !matches!( c, '<' | '>' | '\r' ) && ( c == '\n' || !is_control_code_point( c ) ) )
      .collect()
  }

} // end mod private

crate ::mod_interface!
{
  exposed use
  {
    sanitize_message,
    sanitize_context,
    mask_key,
    truncate_stack,
    sanitize_stack,
  };
}

#[ cfg( test ) ]
mod tests
{
  use super::private::*;
  use std::collections::HashMap;

  #[ test ]
  fn strips_control_chars_and_markup()
  {
    let input = "hi<script>\r\nthere\u{0007}";
    let out = sanitize_message( input );
    assert_eq!( out, "hiscriptthere" );
  }

  #[ test ]
  fn truncates_to_500_code_points()
  {
    let input = "a".repeat( 600 );
    let out = sanitize_message( &input );
    assert_eq!( out.chars().count(), 500 );
  }

  #[ test ]
  fn is_idempotent()
  {
    let input = "  <tag> secret\r\nvalue  ";
    let once = sanitize_message( input );
    let twice = sanitize_message( &once );
    assert_eq!( once, twice );
  }

  #[ test ]
  fn redacts_matching_context_keys_case_insensitively()
  {
    let mut ctx = HashMap::new();
    ctx.insert( "password".to_string(), serde_json::json!( "hunter2" ) );
    ctx.insert( "Authorization".to_string(), serde_json::json!( "Bearer abc" ) );
    ctx.insert( "userId".to_string(), serde_json::json!( "u1" ) );

    let sanitized = sanitize_context( &ctx );
    assert_eq!( sanitized[ "password" ], serde_json::json!( "[REDACTED]" ) );
    assert_eq!( sanitized[ "Authorization" ], serde_json::json!( "[REDACTED]" ) );
    assert_eq!( sanitized[ "userId" ], serde_json::json!( "u1" ) );
  }

  #[ test ]
  fn masks_short_and_long_keys()
  {
    assert_eq!( mask_key( "ab" ), "***" );
    assert_eq!( mask_key( "abcdef" ), "abcd***" );
  }

  #[ test ]
  fn truncates_stack_to_line_budget()
  {
    let stack = ( 0..30 ).map( | i | format!( "frame {i}" ) ).collect::< Vec< _ > >().join( "\n" );
    let truncated = truncate_stack( &stack, 20 );
    assert_eq!( truncated.lines().count(), 20 );
  }

  #[ test ]
  fn sanitize_stack_preserves_newlines_but_strips_markup()
  {
    let input = "at <script>foo\r\nat bar\u{0007}";
    let out = sanitize_stack( input );
    assert_eq!( out, "at scriptfoo\nat bar" );
  }

  #[ test ]
  fn sanitize_stack_does_not_truncate_long_input()
  {
    let stack = ( 0..2000 ).map( | i | format!( "frame {i}" ) ).collect::< Vec< _ > >().join( "\n" );
    let out = sanitize_stack( &stack );
    assert_eq!( out.lines().count(), 2000 );
  }
}
