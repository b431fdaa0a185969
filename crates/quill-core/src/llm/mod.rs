//! Outbound LLM calls: the client trait, the HTTP implementation, and the
//! retrying caller.

pub mod anthropic;
pub mod retry;

use async_trait::async_trait;
use thiserror::Error;

pub use anthropic::AnthropicClient;
pub use retry::{RetryPolicy, call_with_retry};

/// Binary attachment sent alongside a prompt (e.g. a source image).
#[derive(Debug, Clone)]
pub struct Attachment {
    /// MIME type, e.g. `image/png`.
    pub media_type: String,
    pub data: Vec<u8>,
}

/// Failures from an outbound model call.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Transient provider-side capacity failure; eligible for retry.
    #[error("provider overloaded: {message}")]
    Overloaded { message: String },

    /// Any other non-success HTTP response.
    #[error("provider returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Connection-level failure before an HTTP status was available.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned an empty response")]
    EmptyResponse,
}

impl LlmError {
    /// Whether this failure is a transient overload worth retrying.
    ///
    /// Providers signal overload in several shapes: a dedicated variant, a
    /// bare 503 status, or just a message mentioning 503 / Service
    /// Unavailable. Everything else propagates immediately.
    pub fn is_overload(&self) -> bool {
        match self {
            Self::Overloaded { .. } => true,
            Self::Http { status: 503, .. } => true,
            Self::Http { message, .. } | Self::Transport(message) => {
                message.contains("503") || message.contains("Service Unavailable")
            }
            Self::EmptyResponse => false,
        }
    }
}

/// A single request/response LLM call. No streaming.
///
/// Object-safe so orchestration code can hold an `Arc<dyn LlmClient>` and
/// tests can substitute a scripted client.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Human-readable provider name (e.g. "anthropic").
    fn name(&self) -> &str;

    /// Send one prompt and return the raw text of the model's answer.
    ///
    /// Callers wrap this in [`call_with_retry`]; implementations must be
    /// safe to invoke more than once with the same arguments.
    async fn generate(&self, prompt: &str, attachments: &[Attachment])
    -> Result<String, LlmError>;
}

// Compile-time assertion: LlmClient must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn LlmClient) {}
};
