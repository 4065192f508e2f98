//! Chatbot engine - decides how to answer each message and drives the
//! generation providers.
//!
//! Per message, in priority order:
//! 1. ignore it (bot author, broadcast, out of scope, not addressed),
//! 2. warn the author when it contains a banned term,
//! 3. revisit the last reply when the author says it was wrong,
//! 4. answer in persona, primary provider first with one retry on overload,
//!    then the fallback provider with the recent history.
//!
//! Messages from the same user are handled one at a time.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::chatbot::generation::{ConversationInput, ErrorKind, GenerationClient, GenerationError};
use crate::chatbot::message::{prepare_reply, InboundMessage};
use crate::chatbot::persona::Personas;
use crate::chatbot::store::ConversationStore;
use crate::moderation::{contains_banned_term, normalize, BannedTerms};

/// Primary provider attempts per persona reply.
pub const MAX_PRIMARY_ATTEMPTS: usize = 2;

/// Wait between primary attempts after an overload.
pub const RETRY_BACKOFF: Duration = Duration::from_millis(1500);

pub const DEFAULT_CORRECTION_KEYWORDS: [&str; 3] = ["that's wrong", "mali", "wrong"];

/// Outbound side of the chat gateway.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_typing(&self, channel_id: u64) -> Result<(), String>;

    /// Send `text` as a reply to `to`. Callers keep `text` within the transport limit.
    async fn reply(&self, to: &InboundMessage, text: &str) -> Result<(), String>;
}

/// Set of channels a feature applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelScope {
    Everywhere,
    Channels(HashSet<u64>),
    Nowhere,
}

impl ChannelScope {
    /// Empty list means `empty`.
    pub fn from_ids(ids: impl IntoIterator<Item = u64>, empty: ChannelScope) -> Self {
        let ids: HashSet<u64> = ids.into_iter().collect();
        if ids.is_empty() { empty } else { Self::Channels(ids) }
    }

    pub fn contains(&self, channel_id: u64) -> bool {
        match self {
            Self::Everywhere => true,
            Self::Channels(ids) => ids.contains(&channel_id),
            Self::Nowhere => false,
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Channels where the bot converses.
    pub response_scope: ChannelScope,
    /// Channels where banned terms trigger a warning.
    pub moderation_scope: ChannelScope,
    /// Only answer messages that mention the bot.
    pub require_mention: bool,
    /// Skip `@everyone` / `@here` messages.
    pub ignore_broadcasts: bool,
    /// Normalized phrases that ask for a correction.
    pub correction_keywords: Vec<String>,
    pub banned_terms: BannedTerms,
    pub personas: Personas,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            response_scope: ChannelScope::Everywhere,
            moderation_scope: ChannelScope::Nowhere,
            require_mention: true,
            ignore_broadcasts: true,
            correction_keywords: normalize_keywords(DEFAULT_CORRECTION_KEYWORDS),
            banned_terms: BannedTerms::default(),
            personas: Personas::default(),
        }
    }
}

pub fn normalize_keywords<I, S>(keywords: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    keywords
        .into_iter()
        .map(|k| normalize(k.as_ref()))
        .filter(|k| !k.is_empty())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    BotAuthor,
    Broadcast,
    OutOfScope,
    NotAddressed,
}

/// Result of looking at a message before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Ignore(IgnoreReason),
    /// Contains a banned term in a moderated channel.
    Moderate,
    Converse,
}

impl EngineConfig {
    /// Decide what kind of handling a message gets. Pure.
    pub fn route(&self, msg: &InboundMessage, normalized: &str) -> Route {
        if msg.author_is_bot {
            return Route::Ignore(IgnoreReason::BotAuthor);
        }
        if self.ignore_broadcasts && msg.mentions_everyone {
            return Route::Ignore(IgnoreReason::Broadcast);
        }

        let responds_here = self.response_scope.contains(msg.channel_id);
        let moderates_here = self.moderation_scope.contains(msg.channel_id);
        if !responds_here && !moderates_here {
            return Route::Ignore(IgnoreReason::OutOfScope);
        }

        if moderates_here && contains_banned_term(normalized, &self.banned_terms) {
            return Route::Moderate;
        }

        if !responds_here {
            return Route::Ignore(IgnoreReason::OutOfScope);
        }
        if self.require_mention && !msg.mentions_bot {
            return Route::Ignore(IgnoreReason::NotAddressed);
        }

        Route::Converse
    }

    pub fn wants_correction(&self, normalized: &str) -> bool {
        self.correction_keywords
            .iter()
            .any(|k| normalized.contains(k.as_str()))
    }
}

/// Which path produced a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    ModerationWarning,
    Correction,
    Primary,
    Fallback,
}

/// What happened to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ignored(IgnoreReason),
    Replied { mode: ResponseMode, text: String },
    /// Something failed and the apology was sent instead.
    Apologized,
}

#[derive(Debug)]
pub enum EngineError {
    Generation(GenerationError),
    Send(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generation(e) => write!(f, "generation failed: {e}"),
            Self::Send(e) => write!(f, "send failed: {e}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Generation(e) => Some(e),
            Self::Send(_) => None,
        }
    }
}

impl From<GenerationError> for EngineError {
    fn from(e: GenerationError) -> Self {
        Self::Generation(e)
    }
}

/// The chatbot engine.
pub struct ChatbotEngine {
    config: EngineConfig,
    store: Arc<dyn ConversationStore>,
    primary: Arc<dyn GenerationClient>,
    fallback: Arc<dyn GenerationClient>,
    transport: Arc<dyn ChatTransport>,
    user_locks: Mutex<HashMap<u64, Arc<Mutex<()>>>>,
}

impl ChatbotEngine {
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn ConversationStore>,
        primary: Arc<dyn GenerationClient>,
        fallback: Arc<dyn GenerationClient>,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        Self {
            config,
            store,
            primary,
            fallback,
            transport,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Handle an incoming message. Never fails; errors end in the apology reply.
    pub async fn handle_message(&self, msg: &InboundMessage) -> Outcome {
        let normalized = normalize(&msg.content);
        let route = self.config.route(msg, &normalized);
        if let Route::Ignore(reason) = route {
            debug!("Ignoring message {} from {}: {:?}", msg.message_id, msg.author_id, reason);
            return Outcome::Ignored(reason);
        }

        info!(
            "📨 {} ({}): \"{}\"",
            msg.author_name,
            msg.author_id,
            msg.content.chars().take(50).collect::<String>()
        );

        let lock = self.user_lock(msg.author_id).await;
        let guard = lock.lock().await;

        let outcome = match self.respond(msg, &normalized, route).await {
            Ok((mode, text)) => Outcome::Replied { mode, text },
            Err(e) => {
                error!("❌ Bot error for {} ({}): {}", msg.author_name, msg.author_id, e);
                if let Err(e) = self.transport.reply(msg, &self.config.personas.apology).await {
                    error!("Failed to send apology: {}", e);
                }
                Outcome::Apologized
            }
        };

        drop(guard);
        self.release_user_lock(msg.author_id, lock).await;
        outcome
    }

    async fn user_lock(&self, user_id: u64) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().await;
        locks.entry(user_id).or_default().clone()
    }

    /// Forget the user's lock unless another message is already queued on it.
    async fn release_user_lock(&self, user_id: u64, lock: Arc<Mutex<()>>) {
        let mut locks = self.user_locks.lock().await;
        // One reference in the map, one held here.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&user_id);
        }
    }

    /// Users with a message currently being handled or queued.
    pub async fn busy_users(&self) -> usize {
        self.user_locks.lock().await.len()
    }

    async fn respond(
        &self,
        msg: &InboundMessage,
        normalized: &str,
        route: Route,
    ) -> Result<(ResponseMode, String), EngineError> {
        self.store.append_user_turn(msg.author_id, &msg.content).await;

        if let Err(e) = self.transport.send_typing(msg.channel_id).await {
            debug!("Typing indicator skipped: {}", e);
        }

        let (mode, text) = match route {
            Route::Moderate => self.moderation_warning(msg).await?,
            _ => match self.correction_target(msg, normalized).await {
                Some(previous) => self.correction(msg, &previous).await?,
                None => self.persona_reply(msg).await?,
            },
        };

        self.transport.reply(msg, &text).await.map_err(EngineError::Send)?;
        self.store.append_assistant_turn(msg.author_id, &text).await;

        info!("📤 Replied to {} via {:?} ({} chars)", msg.author_id, mode, text.chars().count());
        Ok((mode, text))
    }

    async fn correction_target(&self, msg: &InboundMessage, normalized: &str) -> Option<String> {
        if !self.config.wants_correction(normalized) {
            return None;
        }
        self.store.last_reply(msg.author_id).await
    }

    async fn moderation_warning(&self, msg: &InboundMessage) -> Result<(ResponseMode, String), EngineError> {
        let count = self.store.increment_warning(msg.author_id).await;
        warn!("🚨 {} ({}) used a banned term, warning #{}", msg.author_name, msg.author_id, count);

        let personas = &self.config.personas;
        let prompt = personas.moderation_prompt(count);
        let input = ConversationInput::Message(msg.content.clone());
        let text = self.primary.generate(&prompt, &input).await?;

        Ok((ResponseMode::ModerationWarning, prepare_reply(&text, &personas.moderation_filler)))
    }

    async fn correction(
        &self,
        msg: &InboundMessage,
        previous: &str,
    ) -> Result<(ResponseMode, String), EngineError> {
        info!("🔁 Correction requested by {}", msg.author_id);

        let personas = &self.config.personas;
        let prompt = personas.correction_prompt(previous);
        let input = ConversationInput::Message(msg.content.clone());
        let text = self.fallback.generate(&prompt, &input).await?;

        Ok((ResponseMode::Correction, prepare_reply(&text, &personas.correction_filler)))
    }

    async fn persona_reply(&self, msg: &InboundMessage) -> Result<(ResponseMode, String), EngineError> {
        let personas = &self.config.personas;
        let input = ConversationInput::Message(msg.content.clone());

        match self.generate_with_retry(&personas.primary, &input).await {
            Ok(text) => return Ok((ResponseMode::Primary, prepare_reply(&text, &personas.fallback_filler))),
            Err(e) => warn!(
                "⚠️ {} unavailable ({}), switching to {} fallback...",
                self.primary.name(),
                e,
                self.fallback.name()
            ),
        }

        let history = ConversationInput::History(self.store.history(msg.author_id).await);
        let text = self.fallback.generate(&personas.fallback, &history).await?;

        Ok((ResponseMode::Fallback, prepare_reply(&text, &personas.fallback_filler)))
    }

    /// Primary provider with bounded retry on overload. Empty text counts as failure.
    async fn generate_with_retry(&self, persona: &str, input: &ConversationInput) -> Result<String, GenerationError> {
        let mut attempt = 1;
        loop {
            match self.primary.generate(persona, input).await {
                Ok(text) if !text.trim().is_empty() => return Ok(text),
                Ok(_) => {
                    return Err(GenerationError::new(ErrorKind::Empty, self.primary.name(), "no text in response"));
                }
                Err(e) if e.is_transient() && attempt < MAX_PRIMARY_ATTEMPTS => {
                    warn!("🚧 {} overloaded, retrying in {:?}...", self.primary.name(), RETRY_BACKOFF);
                    tokio::time::sleep(RETRY_BACKOFF).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(text: &str) -> InboundMessage {
        InboundMessage {
            message_id: 1,
            channel_id: 100,
            author_id: 42,
            author_name: "alice".to_string(),
            author_is_bot: false,
            mentions_bot: true,
            mentions_everyone: false,
            content: text.to_string(),
        }
    }

    fn moderated_config() -> EngineConfig {
        EngineConfig {
            moderation_scope: ChannelScope::from_ids([100], ChannelScope::Nowhere),
            banned_terms: BannedTerms::new(["scam"]).unwrap(),
            ..EngineConfig::default()
        }
    }

    fn route(config: &EngineConfig, m: &InboundMessage) -> Route {
        config.route(m, &normalize(&m.content))
    }

    #[test]
    fn test_bot_author_ignored_first() {
        let config = moderated_config();
        let mut m = msg("scam");
        m.author_is_bot = true;
        assert_eq!(route(&config, &m), Route::Ignore(IgnoreReason::BotAuthor));
    }

    #[test]
    fn test_broadcast_ignored() {
        let config = EngineConfig::default();
        let mut m = msg("@everyone hi");
        m.mentions_everyone = true;
        assert_eq!(route(&config, &m), Route::Ignore(IgnoreReason::Broadcast));

        let config = EngineConfig { ignore_broadcasts: false, ..EngineConfig::default() };
        assert_eq!(route(&config, &m), Route::Converse);
    }

    #[test]
    fn test_unaddressed_message_ignored_when_mention_required() {
        let config = EngineConfig::default();
        let mut m = msg("hello");
        m.mentions_bot = false;
        assert_eq!(route(&config, &m), Route::Ignore(IgnoreReason::NotAddressed));

        let config = EngineConfig { require_mention: false, ..EngineConfig::default() };
        assert_eq!(route(&config, &m), Route::Converse);
    }

    #[test]
    fn test_out_of_scope_channel_ignored() {
        let config = EngineConfig {
            response_scope: ChannelScope::from_ids([5], ChannelScope::Everywhere),
            ..EngineConfig::default()
        };
        assert_eq!(route(&config, &msg("hello")), Route::Ignore(IgnoreReason::OutOfScope));
    }

    #[test]
    fn test_moderation_beats_mention() {
        let config = moderated_config();
        assert_eq!(route(&config, &msg("free sc4m here")), Route::Moderate);
    }

    #[test]
    fn test_moderation_fires_without_mention() {
        let config = moderated_config();
        let mut m = msg("5c4m");
        m.mentions_bot = false;
        assert_eq!(route(&config, &m), Route::Moderate);
    }

    #[test]
    fn test_moderation_only_in_scope() {
        let config = moderated_config();
        let mut m = msg("scam");
        m.channel_id = 999;
        assert_eq!(route(&config, &m), Route::Converse);
    }

    #[test]
    fn test_moderation_only_channel_ignores_clean_messages() {
        let config = EngineConfig {
            response_scope: ChannelScope::from_ids([1], ChannelScope::Everywhere),
            ..moderated_config()
        };
        assert_eq!(route(&config, &msg("hello")), Route::Ignore(IgnoreReason::OutOfScope));
        assert_eq!(route(&config, &msg("scam")), Route::Moderate);
    }

    #[test]
    fn test_correction_keywords() {
        let config = EngineConfig::default();
        assert!(config.wants_correction(&normalize("That's wrong, Mona")));
        assert!(config.wants_correction(&normalize("mali ka")));
        assert!(config.wants_correction(&normalize("WRONG!")));
        assert!(!config.wants_correction(&normalize("you're right")));
    }

    #[test]
    fn test_scope_from_ids() {
        assert_eq!(ChannelScope::from_ids([], ChannelScope::Nowhere), ChannelScope::Nowhere);
        let scope = ChannelScope::from_ids([1, 2], ChannelScope::Nowhere);
        assert!(scope.contains(2));
        assert!(!scope.contains(3));
    }
}
