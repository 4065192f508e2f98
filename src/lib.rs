pub mod chatbot;
pub mod clock;
pub mod config;
pub mod discord_log;
pub mod moderation;
