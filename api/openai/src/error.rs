// src/error.rs
//! Maps OpenAI-specific transport and response failures onto the pipeline's
//! `AdvisorError` kinds.

/// Define a private namespace for all its items.
mod private
{
  use error_advisor_core::error::AdvisorError;
  use error_tools::dependency::thiserror;

  /// Failures specific to talking to the OpenAI chat-completions endpoint,
  /// before they are narrowed down to an `AdvisorError` kind.
  #[ derive( Debug, thiserror::Error ) ]
  #[ non_exhaustive ]
  pub enum OpenAiError
  {
    /// The HTTP request itself could not be sent or the connection failed.
    #[ error( "request failed : {0}" ) ]
    Request( String ),
    /// The endpoint returned a non-2xx status.
    #[ error( "openai returned status {status} : {body}" ) ]
    Status
    {
      /// HTTP status code.
      status : u16,
      /// Response body, truncated for logging.
      body : String,
    },
    /// The response body did not parse as the expected chat-completions
    /// envelope.
    #[ error( "failed to parse openai response : {0}" ) ]
    Decode( String ),
    /// `choices[0].message.content` was present but not valid JSON advice.
    #[ error( "choice content was not a valid advice object : {0}" ) ]
    AdviceShape( String ),
  }

  impl From< OpenAiError > for AdvisorError
  {
    fn from( err : OpenAiError ) -> Self
    {
      match err
      {
        OpenAiError::Request( message ) => AdvisorError::Transport( message ),
        OpenAiError::Status { status, body } if status == 429 || status == 503 =>
          AdvisorError::Transport( format!( "rate limited or unavailable ({status}) : {body}" ) ),
        OpenAiError::Status { status, body } if status == 400 && body.to_ascii_lowercase().contains( "safety" ) =>
          AdvisorError::ContentFiltered( body ),
        OpenAiError::Status { status, body } => AdvisorError::Transport( format!( "status {status} : {body}" ) ),
        OpenAiError::Decode( message ) | OpenAiError::AdviceShape( message ) => AdvisorError::Parse( message ),
      }
    }
  }

} // end mod private

pub use private::OpenAiError;
