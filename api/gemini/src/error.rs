// src/error.rs
//! Maps Gemini-specific transport and response failures onto the
//! pipeline's `AdvisorError` kinds.

/// Define a private namespace for all its items.
mod private
{
  use error_advisor_core::error::AdvisorError;
  use error_tools::dependency::thiserror;

  /// Failures specific to talking to the Gemini `generateContent`
  /// endpoint, before they are narrowed down to an `AdvisorError` kind.
  #[ derive( Debug, thiserror::Error ) ]
  #[ non_exhaustive ]
  pub enum GeminiError
  {
    /// The HTTP request itself could not be sent or the connection failed.
    #[ error( "request failed : {0}" ) ]
    Request( String ),
    /// The endpoint returned a non-2xx status.
    #[ error( "gemini returned status {status} : {body}" ) ]
    Status
    {
      /// HTTP status code.
      status : u16,
      /// Response body, truncated for logging.
      body : String,
    },
    /// The response body did not parse as the expected `generateContent`
    /// envelope.
    #[ error( "failed to parse gemini response : {0}" ) ]
    Decode( String ),
    /// The model declined to answer (`finishReason: SAFETY` or similar).
    #[ error( "content blocked by gemini safety filter : {0}" ) ]
    SafetyBlocked( String ),
    /// The returned text was present but not valid JSON advice.
    #[ error( "candidate content was not a valid advice object : {0}" ) ]
    AdviceShape( String ),
  }

  impl From< GeminiError > for AdvisorError
  {
    fn from( err : GeminiError ) -> Self
    {
      match err
      {
        GeminiError::Request( message ) => AdvisorError::Transport( message ),
        GeminiError::Status { status, body } if status == 429 || status == 503 =>
          AdvisorError::Transport( format!( "rate limited or unavailable ({status}) : {body}" ) ),
        GeminiError::Status { status, body } => AdvisorError::Transport( format!( "status {status} : {body}" ) ),
        GeminiError::SafetyBlocked( reason ) => AdvisorError::ContentFiltered( reason ),
        GeminiError::Decode( message ) | GeminiError::AdviceShape( message ) => AdvisorError::Parse( message ),
      }
    }
  }

} // end mod private

pub use private::GeminiError;
