// src/client.rs
//! `GeminiProvider` : a `Provider` implementation calling the Gemini
//! `generateContent` endpoint and parsing its response into `Advice`.

use std::sync::Arc;
use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{ Deserialize, Serialize };

use error_advisor_core::error::AdvisorError;
use error_advisor_core::provider::Provider;
use error_advisor_core::sanitizer::truncate_stack;
use error_advisor_core::secret::{ Secret, SecureStore };
use error_advisor_core::types::{ Advice, ErrorRecord, ProviderConfig };

use crate::error::GeminiError;

const PROVIDER_ID : &str = "gemini";
const DEFAULT_BASE_URL : &str = "https://generativelanguage.googleapis.com/v1beta";
const PRIMARY_ENV_VAR : &str = "GEMINI_API_KEY";
const FALLBACK_ENV_VAR : &str = "GOOGLE_AI_API_KEY";
/// Stack frames kept in the prompt sent to the model; deeper frames carry
/// little additional diagnostic value once truncated past this point.
const STACK_EXCERPT_LINES : usize = 20;

#[ derive( Serialize ) ]
struct GenerateContentRequest
{
  contents : Vec< Content >,
  #[ serde( rename = "generationConfig" ) ]
  generation_config : GenerationConfig,
}

#[ derive( Serialize ) ]
struct Content
{
  parts : Vec< Part >,
}

#[ derive( Serialize ) ]
struct Part
{
  text : String,
}

#[ derive( Serialize ) ]
struct GenerationConfig
{
  #[ serde( rename = "maxOutputTokens" ) ]
  max_output_tokens : u32,
  temperature : f32,
  #[ serde( rename = "responseMimeType" ) ]
  response_mime_type : &'static str,
}

#[ derive( Deserialize ) ]
struct GenerateContentResponse
{
  #[ serde( default ) ]
  candidates : Vec< Candidate >,
}

#[ derive( Deserialize ) ]
struct Candidate
{
  content : Option< ResponseContent >,
  #[ serde( rename = "finishReason", default ) ]
  finish_reason : Option< String >,
}

#[ derive( Deserialize ) ]
struct ResponseContent
{
  parts : Vec< ResponsePart >,
}

#[ derive( Deserialize ) ]
struct ResponsePart
{
  text : String,
}

/// Calls the Gemini `generateContent` endpoint on behalf of the pipeline.
/// Credentials are discovered once at construction : in-process store
/// first, then `GEMINI_API_KEY`, then `GOOGLE_AI_API_KEY`.
#[ derive( Debug ) ]
pub struct GeminiProvider
{
  credential : Option< Secret >,
  base_url : String,
  http : reqwest::Client,
}

impl GeminiProvider
{
  /// Builds a provider, discovering its credential from `store` first and
  /// the environment second.
  #[ must_use ]
  pub fn new( store : &SecureStore, base_url : impl Into< Option< String > > ) -> Self
  {
    let credential = store
      .get( PROVIDER_ID )
      .cloned()
      .or_else( || Secret::load_from_env( PRIMARY_ENV_VAR ).ok() )
      .or_else( || Secret::load_from_env( FALLBACK_ENV_VAR ).ok() );

    Self
    {
      credential,
      base_url : base_url.into().unwrap_or_else( || DEFAULT_BASE_URL.to_string() ),
      http : reqwest::Client::new(),
    }
  }

  async fn call( &self, credential : &Secret, record : &ErrorRecord, config : &ProviderConfig ) -> Result< Advice, GeminiError >
  {
    let stack_excerpt = truncate_stack( &record.stack, STACK_EXCERPT_LINES );
    let prompt = format!(
      "Error name: {}\nMessage: {}\nStack:\n{}\n\nRespond with a JSON object of the shape {{\"advice\": string}} containing a concise remediation suggestion.",
      record.name, record.message, stack_excerpt,
    );

    let request = GenerateContentRequest
    {
      contents : vec![ Content { parts : vec![ Part { text : prompt } ] } ],
      generation_config : GenerationConfig
      {
        max_output_tokens : config.max_output_tokens,
        temperature : config.temperature,
        response_mime_type : "application/json",
      },
    };

    let url = format!( "{}/models/{}:generateContent?key={}", self.base_url, config.model, credential.expose_secret() );

    let response = self
      .http
      .post( url )
      .json( &request )
      .send()
      .await
      .map_err( | err | GeminiError::Request( err.to_string() ) )?;

    let status = response.status();
    if !status.is_success()
    {
      let body = response.text().await.unwrap_or_default();
      return Err( GeminiError::Status { status : status.as_u16(), body } );
    }

    let parsed : GenerateContentResponse = response
      .json()
      .await
      .map_err( | err | GeminiError::Decode( err.to_string() ) )?;

    let candidate = parsed
      .candidates
      .into_iter()
      .next()
      .ok_or_else( || GeminiError::Decode( "no candidates in response".to_string() ) )?;

    if let Some( reason ) = &candidate.finish_reason
    {
      if reason == "SAFETY" || reason == "PROHIBITED_CONTENT"
      {
        return Err( GeminiError::SafetyBlocked( reason.clone() ) );
      }
    }

    let text = candidate
      .content
      .and_then( | content | content.parts.into_iter().next() )
      .map( | part | part.text )
      .ok_or_else( || GeminiError::Decode( "candidate carried no text part".to_string() ) )?;

    serde_json::from_str::< Advice >( &text )
      .map_err( | err | GeminiError::AdviceShape( err.to_string() ) )
  }
}

#[ async_trait ]
impl Provider for GeminiProvider
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
pub fn boxed( store : &SecureStore, base_url : impl Into< Option< String > > ) -> Arc< dyn Provider >
{
  Arc::new( GeminiProvider::new( store, base_url ) )
}
