//! Completion dispatch for Threadline.
//!
//! - [`dispatcher::CompletionDispatcher`]: model-tier × credential failover
//! - [`credentials::CredentialPool`]: ordered API keys with a shared rotation cursor
//! - [`openai::OpenAiCompatTransport`]: one request against an OpenAI-compatible
//!   chat-completions endpoint, with failures classified as rate-limit,
//!   transient, or rejection
//! - [`json::extract_json`]: recover a JSON object embedded in model prose
//!
//! # Examples
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use threadline_common::Message;
//! use threadline_llm::{
//!     CompletionDispatcher, CredentialPool, OpenAiCompatTransport, ResponseMode, SamplingSettings,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let transport = OpenAiCompatTransport::new(
//!     "https://api.groq.com/openai/v1/chat/completions",
//!     Duration::from_secs(60),
//! )?;
//! let dispatcher = CompletionDispatcher::new(
//!     Arc::new(transport),
//!     Arc::new(CredentialPool::from_comma_separated("key-a,key-b")),
//!     vec!["llama-3.3-70b-versatile".into(), "llama-3.1-8b-instant".into()],
//!     SamplingSettings::default(),
//! );
//! let done = dispatcher
//!     .dispatch(&[Message::user("Say OK")], ResponseMode::Text)
//!     .await?;
//! println!("{}", done.text);
//! # Ok(())
//! # }
//! ```
pub mod credentials;
pub mod dispatcher;
pub mod json;
pub mod openai;
pub mod traits;

pub use credentials::CredentialPool;
pub use dispatcher::{Completion, CompletionDispatcher, DispatchError, SamplingSettings};
pub use openai::OpenAiCompatTransport;
pub use traits::{
    AttemptError, Completer, CompletionRequest, CompletionTransport, ResponseFormat, ResponseMode,
};
