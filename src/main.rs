use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono_tz::Tz;
use serenity::async_trait;
use serenity::http::Http;
use serenity::model::channel::Message;
use serenity::model::gateway::{GatewayIntents, Ready};
use serenity::prelude::*;
use tracing::{error, info};
use tracing_subscriber::prelude::*;

use mona::chatbot::discord::to_inbound;
use mona::chatbot::{ChatbotEngine, DiscordClient, GeminiClient, GroqClient, MemoryStore};
use mona::clock;
use mona::config::Config;
use mona::discord_log::DiscordLogLayer;

struct Handler {
    engine: Arc<ChatbotEngine>,
    bot_user_id: AtomicU64,
    timezone: Tz,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        self.bot_user_id.store(ready.user.id.get(), Ordering::Relaxed);
        info!("✅ Logged in as {} ({})", ready.user.name, ready.user.id);
        info!("🕒 Current local time: {}", clock::local_now(self.timezone));
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        let bot_user_id = self.bot_user_id.load(Ordering::Relaxed);
        let inbound = to_inbound(&msg, bot_user_id);
        self.engine.handle_message(&inbound).await;
    }
}

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "mona.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {e}");
            std::process::exit(1);
        }
    };

    let http = Arc::new(Http::new(&config.discord_bot_token));

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("mona.log"))
        .expect("Failed to open log file");
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    let registry = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        );

    if let Some(log_channel_id) = config.log_channel_id {
        let discord_layer = DiscordLogLayer::new(http.clone(), log_channel_id);
        registry.with(discord_layer).init();
    } else {
        registry.init();
    }

    info!("🚀 Starting mona...");
    info!("Loaded config from {config_path}");
    info!(
        "Models: {} (primary), {} (fallback); {} banned term(s)",
        config.gemini_model,
        config.groq_model,
        config.engine.banned_terms.len()
    );

    let engine = ChatbotEngine::new(
        config.engine,
        Arc::new(MemoryStore::new()),
        Arc::new(GeminiClient::new(config.gemini_api_key, config.gemini_model)),
        Arc::new(GroqClient::new(config.groq_api_key, config.groq_model)),
        Arc::new(DiscordClient::new(http)),
    );

    let handler = Handler {
        engine: Arc::new(engine),
        bot_user_id: AtomicU64::new(0),
        timezone: config.timezone,
    };

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = match Client::builder(&config.discord_bot_token, intents)
        .event_handler(handler)
        .await
    {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create Discord client: {e}");
            std::process::exit(1);
        }
    };

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm = signal(SignalKind::terminate()).expect("SIGTERM handler");
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await.ok();
        }
        info!("Shutdown signal received, stopping Discord client...");
        shard_manager.shutdown_all().await;
    });

    if let Err(e) = client.start().await {
        error!("Discord client error: {e}");
    }
    info!("👋 mona stopped");
}
