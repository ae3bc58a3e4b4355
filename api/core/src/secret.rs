// src/secret.rs
//! This module defines the `Secret` type used to carry provider credentials
//! through the pipeline without accidentally leaking them into debug output
//! or log records.

/// Define a private namespace for all its items.
mod private
{
  use secrecy::{ SecretString, ExposeSecret };
  use error_tools::untyped::Result;
  use core::sync::atomic::{ AtomicU64, Ordering };

  /// Global counter for tracking secret exposures, for security auditing.
  static SECRET_EXPOSURE_COUNT : AtomicU64 = AtomicU64::new( 0 );

  /// Represents a provider credential, such as an API key.
  /// It wraps `secrecy::SecretString` to prevent accidental exposure.
  #[ derive( Debug, Clone ) ]
  #[ non_exhaustive ]
  pub struct Secret( SecretString );

  impl Secret
  {
    /// Creates a new `Secret` from a string, rejecting obviously-empty or
    /// unreasonably long values.
    ///
    /// # Errors
    /// Returns `crate::error::AdvisorError::Config` if the value is empty or
    /// implausibly long.
    #[ inline ]
    pub fn new( value : String ) -> Result< Self >
    {
      let trimmed = value.trim();
      if trimmed.is_empty()
      {
        return Err( error_tools::Error::from( crate::error::AdvisorError::Config(
          "credential must not be empty".to_string()
        ) ) );
      }
      if trimmed.len() > 4096
      {
        return Err( error_tools::Error::from( crate::error::AdvisorError::Config(
          "credential is implausibly long".to_string()
        ) ) );
      }
      Ok( Self( SecretString::from( trimmed.to_string() ) ) )
    }

    /// Creates a `Secret` without validation; used by in-process stores that
    /// have already validated the value.
    #[ inline ]
    #[ must_use ]
    pub fn new_unchecked( value : String ) -> Self
    {
      Self( SecretString::from( value ) )
    }

    /// Validates that the credential begins with `prefix`. `OpenAI`
    /// credentials must begin with `sk-`; other providers may pass a
    /// different prefix or skip the check entirely.
    ///
    /// # Errors
    /// Returns `crate::error::AdvisorError::Config` if the prefix does not match.
    #[ inline ]
    pub fn require_prefix( &self, prefix : &str ) -> Result< () >
    {
      if self.0.expose_secret().starts_with( prefix )
      {
        Ok( () )
      }
      else
      {
        Err( error_tools::Error::from( crate::error::AdvisorError::Config(
          format!( "credential must start with '{prefix}' prefix" )
        ) ) )
      }
    }

    /// Loads a credential from an environment variable.
    ///
    /// # Errors
    /// Returns `crate::error::AdvisorError::Config` if the variable is unset
    /// or empty.
    #[ inline ]
    pub fn load_from_env( env_var : &str ) -> Result< Self >
    {
      let value = std::env::var( env_var ).map_err( | e |
        error_tools::Error::from( crate::error::AdvisorError::Config(
          format!( "missing environment variable {env_var} : {e}" )
        ) )
      )?;
      Self::new( value )
    }

    /// Total number of times `expose_secret` has been called this process.
    /// Useful for security auditing and monitoring.
    #[ inline ]
    #[ must_use ]
    pub fn exposure_count() -> u64
    {
      SECRET_EXPOSURE_COUNT.load( Ordering::Relaxed )
    }

    #[ cfg( test ) ]
    pub( crate ) fn reset_exposure_count()
    {
      SECRET_EXPOSURE_COUNT.store( 0, Ordering::Relaxed );
    }
  }

  impl ExposeSecret< str > for Secret
  {
    #[ inline ]
    fn expose_secret( &self ) -> &str
    {
      SECRET_EXPOSURE_COUNT.fetch_add( 1, Ordering::Relaxed );
      self.0.expose_secret()
    }
  }

  impl From< String > for Secret
  {
    #[ inline ]
    fn from( value : String ) -> Self
    {
      Self::new_unchecked( value )
    }
  }

  impl From< &str > for Secret
  {
    #[ inline ]
    fn from( value : &str ) -> Self
    {
      Self::new_unchecked( value.to_owned() )
    }
  }

  /// In-process secure store consulted before environment variables, per
  /// the credential discovery order of the component design. Populated by
  /// the host application; never persisted.
  #[ derive( Debug, Default ) ]
  pub struct SecureStore
  {
    entries : std::collections::HashMap< String, Secret >,
  }

  impl SecureStore
  {
    /// Creates an empty store.
    #[ inline ]
    #[ must_use ]
    pub fn new() -> Self
    {
      Self::default()
    }

    /// Registers a credential under `key` (typically a provider id).
    #[ inline ]
    pub fn insert( &mut self, key : impl Into< String >, secret : Secret )
    {
      self.entries.insert( key.into(), secret );
    }

    /// Looks up a previously-registered credential.
    #[ inline ]
    #[ must_use ]
    pub fn get( &self, key : &str ) -> Option< &Secret >
    {
      self.entries.get( key )
    }
  }

} // end mod private

crate ::mod_interface!
{
  exposed use
  {
    Secret,
    SecureStore,
  };
}
