//! Per-user conversation state.
//!
//! Holds a sliding window of recent turns, the last reply sent to each user
//! and how many moderation warnings they have received. Nothing is persisted;
//! state lives as long as the process.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::chatbot::generation::ConversationTurn;

/// Turns kept per user.
pub const MAX_HISTORY_TURNS: usize = 10;

/// Storage for per-user conversation state.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn append_user_turn(&self, user_id: u64, text: &str);

    /// Append an assistant turn and make it the user's last reply.
    async fn append_assistant_turn(&self, user_id: u64, text: &str);

    /// Current window, oldest first.
    async fn history(&self, user_id: u64) -> Vec<ConversationTurn>;

    async fn last_reply(&self, user_id: u64) -> Option<String>;

    /// Bump the warning counter and return the new value.
    async fn increment_warning(&self, user_id: u64) -> u32;

    async fn warning_count(&self, user_id: u64) -> u32;
}

#[derive(Default)]
struct UserState {
    history: VecDeque<ConversationTurn>,
    last_reply: Option<String>,
    warnings: u32,
}

impl UserState {
    fn push(&mut self, turn: ConversationTurn) {
        self.history.push_back(turn);
        while self.history.len() > MAX_HISTORY_TURNS {
            self.history.pop_front();
        }
    }
}

/// In-memory store.
#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<HashMap<u64, UserState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users seen so far.
    pub async fn user_count(&self) -> usize {
        self.users.lock().await.len()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn append_user_turn(&self, user_id: u64, text: &str) {
        let mut users = self.users.lock().await;
        users.entry(user_id).or_default().push(ConversationTurn::user(text));
    }

    async fn append_assistant_turn(&self, user_id: u64, text: &str) {
        let mut users = self.users.lock().await;
        let state = users.entry(user_id).or_default();
        state.push(ConversationTurn::assistant(text));
        state.last_reply = Some(text.to_string());
    }

    async fn history(&self, user_id: u64) -> Vec<ConversationTurn> {
        let users = self.users.lock().await;
        users
            .get(&user_id)
            .map(|s| s.history.iter().cloned().collect())
            .unwrap_or_default()
    }

    async fn last_reply(&self, user_id: u64) -> Option<String> {
        let users = self.users.lock().await;
        users.get(&user_id).and_then(|s| s.last_reply.clone())
    }

    async fn increment_warning(&self, user_id: u64) -> u32 {
        let mut users = self.users.lock().await;
        let state = users.entry(user_id).or_default();
        state.warnings += 1;
        state.warnings
    }

    async fn warning_count(&self, user_id: u64) -> u32 {
        let users = self.users.lock().await;
        users.get(&user_id).map(|s| s.warnings).unwrap_or(0)
    }
}
