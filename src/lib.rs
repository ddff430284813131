// HealAI Library - conversation core shared by the CLI and any other front end
//
// The session keeps the turn log; the Gemini client answers through a
// retrying HTTP client. Nothing here depends on a UI toolkit.

pub mod assistant;
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod gemini;
pub mod persona;
pub mod retry;
pub mod session;
pub mod transport;

#[cfg(test)]
mod testing;

// Re-export key types for convenience
pub use assistant::{Assistant, Reply, Source};
pub use client::ResilientClient;
pub use config::{
    build_assistant, delete_api_key, get_config_dir, has_api_key, read_api_key, read_settings,
    validate_api_key, write_api_key, write_settings, AssistantSettings, ConfigError,
};
pub use error::ClientError;
pub use gemini::GeminiClient;
pub use persona::SessionKind;
pub use retry::RetryPolicy;
pub use session::{ConversationSession, Origin, Turn, TurnId, TurnStatus};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};
