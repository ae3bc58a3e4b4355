// src/client.rs
//! `OpenAiProvider` : a `Provider` implementation calling the OpenAI chat
//! completions endpoint and parsing its response into `Advice`.

use std::sync::Arc;
use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{ Deserialize, Serialize };

use error_advisor_core::error::AdvisorError;
use error_advisor_core::provider::Provider;
use error_advisor_core::sanitizer::truncate_stack;
use error_advisor_core::secret::{ Secret, SecureStore };
use error_advisor_core::types::{ Advice, ErrorRecord, ProviderConfig };

use crate::error::OpenAiError;

const PROVIDER_ID : &str = "openai";
const CREDENTIAL_PREFIX : &str = "sk-";
const CREDENTIAL_ENV_VAR : &str = "OPENAI_API_KEY";
/// Stack frames kept in the prompt sent to the model; deeper frames carry
/// little additional diagnostic value once truncated past this point.
const STACK_EXCERPT_LINES : usize = 20;

#[ derive( Serialize ) ]
struct ChatMessage
{
  role : &'static str,
  content : String,
}

#[ derive( Serialize ) ]
struct ChatRequest
{
  model : String,
  messages : Vec< ChatMessage >,
  max_tokens : u32,
  temperature : f32,
  response_format : ResponseFormat,
}

#[ derive( Serialize ) ]
struct ResponseFormat
{
  r#type : &'static str,
}

#[ derive( Deserialize ) ]
struct ChatResponse
{
  choices : Vec< ChatChoice >,
}

#[ derive( Deserialize ) ]
struct ChatChoice
{
  message : ChatChoiceMessage,
}

#[ derive( Deserialize ) ]
struct ChatChoiceMessage
{
  content : String,
}

/// Calls the OpenAI chat-completions endpoint on behalf of the pipeline.
/// Credentials are discovered once at construction, following the
/// in-process store, then environment variable order; the provider reports
/// itself unconfigured rather than erroring when neither is present.
#[ derive( Debug ) ]
pub struct OpenAiProvider
{
  credential : Option< Secret >,
  base_url : String,
  http : reqwest::Client,
}

impl OpenAiProvider
{
  /// Builds a provider, discovering its credential from `store` first and
  /// the `OPENAI_API_KEY` environment variable second. `base_url` is
  /// normally `Config::openai_url`.
  #[ must_use ]
  pub fn new( store : &SecureStore, base_url : impl Into< String > ) -> Self
  {
    let credential = store
      .get( PROVIDER_ID )
      .cloned()
      .or_else( || Secret::load_from_env( CREDENTIAL_ENV_VAR ).ok() )
      .filter( | secret | secret.require_prefix( CREDENTIAL_PREFIX ).is_ok() );

    Self
    {
      credential,
      base_url : base_url.into(),
      http : reqwest::Client::new(),
    }
  }

  async fn call( &self, credential : &Secret, record : &ErrorRecord, config : &ProviderConfig ) -> Result< Advice, OpenAiError >
  {
    let stack_excerpt = truncate_stack( &record.stack, STACK_EXCERPT_LINES );
    let prompt = format!(
      "Error name: {}\nMessage: {}\nStack:\n{}\n\nRespond with a JSON object of the shape {{\"advice\": string}} containing a concise remediation suggestion.",
      record.name, record.message, stack_excerpt,
    );

    let request = ChatRequest
    {
      model : config.model.clone(),
      messages : vec![ ChatMessage { role : "user", content : prompt } ],
      max_tokens : config.max_output_tokens,
      temperature : config.temperature,
      response_format : ResponseFormat { r#type : "json_object" },
    };

    let response = self
      .http
      .post( format!( "{}/chat/completions", self.base_url ) )
      .bearer_auth( credential.expose_secret() )
      .json( &request )
      .send()
      .await
      .map_err( | err | OpenAiError::Request( err.to_string() ) )?;

    let status = response.status();
    if !status.is_success()
    {
      let body = response.text().await.unwrap_or_default();
      return Err( OpenAiError::Status { status : status.as_u16(), body } );
    }

    let parsed : ChatResponse = response
      .json()
      .await
      .map_err( | err | OpenAiError::Decode( err.to_string() ) )?;

    let content = parsed
      .choices
      .into_iter()
      .next()
      .map( | choice | choice.message.content )
      .ok_or_else( || OpenAiError::Decode( "no choices in response".to_string() ) )?;

    serde_json::from_str::< Advice >( &content )
      .map_err( | err | OpenAiError::AdviceShape( err.to_string() ) )
  }
}

#[ async_trait ]
impl Provider for OpenAiProvider
{
  fn id( &self ) -> &str
  {
    PROVIDER_ID
  }

  fn is_configured( &self ) -> bool
  {
    self.credential.is_some()
  }

  async fn generate_advice( &self, record : &ErrorRecord, config : &ProviderConfig ) -> Result< Advice, AdvisorError >
  {
    let Some( credential ) = &self.credential else
    {
      return Err( AdvisorError::AbsentCredential( PROVIDER_ID.to_string() ) );
    };

    self.call( credential, record, config ).await.map_err( AdvisorError::from )
  }
}

/// Convenience constructor returning a type-erased `Provider`, ready for
/// `ProviderRegistry::register`.
#[ must_use ]
pub fn boxed( store : &SecureStore, base_url : impl Into< String > ) -> Arc< dyn Provider >
{
  Arc::new( OpenAiProvider::new( store, base_url ) )
}
