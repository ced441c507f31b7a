//! chatview-core – the chat view behind the chatview browser UI.
//!
//! This crate has no HTTP server dependency.  It owns:
//! - the [`Message`] record and the [`MessageThread`] that holds a conversation,
//! - the [`AiModel`] options shown in the model picker,
//! - the [`ChatView`] state machine (form value, thinking flag, settings modal, alert),
//! - the [`AiProvider`] seam with an OpenAI-compatible implementation,
//! - the [`SettingsStore`] seam for the persisted API key.
//!
//! [`ChatSession`] ties a view to a provider and is what the server drives.

pub mod error;
pub mod filter;
pub mod message;
pub mod model;
pub mod provider;
pub mod session;
pub mod settings;
pub mod thread;
pub mod view;

pub use error::{ProviderError, SendError, SettingsError};
pub use filter::ProfanityFilter;
pub use message::{Message, MessageKind};
pub use model::AiModel;
pub use provider::openai::{OpenAiClient, OpenAiConfig};
pub use provider::{AiProvider, CompletionRequest, Turn};
pub use session::{ChatSession, SendOutcome};
pub use settings::{ApiKey, MemorySettingsStore, SettingsStore};
pub use thread::MessageThread;
pub use view::{ChatView, PendingSend, ViewSnapshot, MAX_PROMPT_BYTES};
