// tests/provider_configuration_test.rs
//! Covers credential discovery across both recognized environment
//! variables without making any network call.

use error_advisor_core::provider::Provider;
use error_advisor_core::secret::{ Secret, SecureStore };
use error_advisor_provider_gemini::GeminiProvider;

#[ tokio::test ]
async fn unconfigured_when_no_credential_is_discoverable()
{
  std::env::remove_var( "GEMINI_API_KEY" );
  std::env::remove_var( "GOOGLE_AI_API_KEY" );
  let store = SecureStore::new();
  let provider = GeminiProvider::new( &store, None );
  assert!( !provider.is_configured() );
}

#[ tokio::test ]
async fn falls_back_to_google_ai_api_key()
{
  std::env::remove_var( "GEMINI_API_KEY" );
  std::env::set_var( "GOOGLE_AI_API_KEY", "fallback-key-value" );
  let store = SecureStore::new();
  let provider = GeminiProvider::new( &store, None );
  assert!( provider.is_configured() );
  std::env::remove_var( "GOOGLE_AI_API_KEY" );
}

#[ tokio::test ]
async fn store_credential_takes_precedence()
{
  let mut store = SecureStore::new();
  store.insert( "gemini", Secret::new( "store-key-value".to_string() ).unwrap() );
  let provider = GeminiProvider::new( &store, None );
  assert!( provider.is_configured() );
}
