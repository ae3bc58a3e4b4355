// tests/provider_configuration_test.rs
//! Covers credential discovery and prefix validation without making any
//! network call.

use error_advisor_core::provider::Provider;
use error_advisor_core::secret::{ Secret, SecureStore };
use error_advisor_provider_openai::OpenAiProvider;

#[ tokio::test ]
async fn unconfigured_when_no_credential_is_discoverable()
{
  std::env::remove_var( "OPENAI_API_KEY" );
  let store = SecureStore::new();
  let provider = OpenAiProvider::new( &store, "https://api.openai.com/v1" );
  assert!( !provider.is_configured() );
}

#[ tokio::test ]
async fn configured_when_store_has_a_valid_key()
{
  let mut store = SecureStore::new();
  store.insert( "openai", Secret::new( "sk-test1234567890".to_string() ).unwrap() );
  let provider = OpenAiProvider::new( &store, "https://api.openai.com/v1" );
  assert!( provider.is_configured() );
}

#[ tokio::test ]
async fn unconfigured_when_store_key_lacks_required_prefix()
{
  let mut store = SecureStore::new();
  store.insert( "openai", Secret::new( "not-a-valid-key".to_string() ).unwrap() );
  let provider = OpenAiProvider::new( &store, "https://api.openai.com/v1" );
  assert!( !provider.is_configured() );
}
