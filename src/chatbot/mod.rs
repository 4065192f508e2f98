//! Chatbot module - answers Discord messages through Gemini with Groq as fallback.

pub mod discord;
pub mod engine;
pub mod gemini;
pub mod generation;
pub mod groq;
pub mod message;
pub mod persona;
pub mod store;

pub use discord::DiscordClient;
pub use engine::{ChatTransport, ChatbotEngine, EngineConfig, Outcome, ResponseMode};
pub use gemini::GeminiClient;
pub use generation::{ConversationInput, ConversationTurn, GenerationClient, GenerationError};
pub use groq::GroqClient;
pub use message::InboundMessage;
pub use persona::Personas;
pub use store::{ConversationStore, MemoryStore};
