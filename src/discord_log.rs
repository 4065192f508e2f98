//! Tracing layer that mirrors log lines into a Discord channel.

use std::sync::Arc;
use std::time::Duration;

use serenity::http::Http;
use serenity::model::id::ChannelId;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use crate::chatbot::message::{truncate_chars, MAX_REPLY_CHARS};

/// INFO lines buffered before an early flush.
const MAX_BUFFERED_LINES: usize = 50;

/// Log message with priority.
enum LogMessage {
    /// High priority (WARN/ERROR) - send immediately
    Urgent(String),
    /// Low priority (INFO) - batch and send periodically
    Info(String),
}

pub struct DiscordLogLayer {
    tx: mpsc::UnboundedSender<LogMessage>,
}

impl DiscordLogLayer {
    /// Must be called inside a tokio runtime.
    pub fn new(http: Arc<Http>, channel_id: u64) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<LogMessage>();
        let channel = ChannelId::new(channel_id);

        tokio::spawn(async move {
            let mut info_buffer: Vec<String> = Vec::new();
            let mut interval = tokio::time::interval(Duration::from_secs(5));

            loop {
                tokio::select! {
                    msg = rx.recv() => {
                        match msg {
                            Some(LogMessage::Urgent(text)) => {
                                // WARN/ERROR go out right away
                                send_log(&http, channel, &text).await;
                            }
                            Some(LogMessage::Info(text)) => {
                                info_buffer.push(text);
                                // Don't let a chatty burst wait for the tick
                                if info_buffer.len() >= MAX_BUFFERED_LINES {
                                    flush_buffer(&http, channel, &mut info_buffer).await;
                                }
                            }
                            None => break,
                        }
                    }
                    _ = interval.tick() => {
                        // Periodic flush of the INFO batch
                        if !info_buffer.is_empty() {
                            flush_buffer(&http, channel, &mut info_buffer).await;
                        }
                    }
                }
            }
        });

        Self { tx }
    }
}

/// Fit a log line into one Discord message.
fn clip(text: &str) -> String {
    if text.chars().count() <= MAX_REPLY_CHARS {
        return text.to_string();
    }
    format!("{}...", truncate_chars(text, MAX_REPLY_CHARS - 3))
}

async fn send_log(http: &Http, channel: ChannelId, text: &str) {
    if let Err(e) = channel.say(http, clip(text)).await {
        eprintln!("Failed to send log to Discord: {e}");
    }
}

async fn flush_buffer(http: &Http, channel: ChannelId, buffer: &mut Vec<String>) {
    if buffer.is_empty() {
        return;
    }
    // One Discord message per batch
    let combined = buffer.join("\n");
    buffer.clear();
    send_log(http, channel, &combined).await;
}

struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else if self.message.is_empty() {
            self.message = format!("{} = {:?}", field.name(), value);
        } else {
            self.message
                .push_str(&format!(", {} = {:?}", field.name(), value));
        }
    }
}

impl<S: Subscriber> Layer<S> for DiscordLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = *event.metadata().level();

        // DEBUG and TRACE stay local
        if level > Level::INFO {
            return;
        }
        // Serenity's own logs would feed back into this channel.
        if event.metadata().target().starts_with("serenity") {
            return;
        }

        let mut visitor = MessageVisitor {
            message: String::new(),
        };
        event.record(&mut visitor);

        // Emoji prefix marks WARN/ERROR in the channel
        let msg = match level {
            Level::ERROR => LogMessage::Urgent(format!("❌ {}", visitor.message)),
            Level::WARN => LogMessage::Urgent(format!("⚠️ {}", visitor.message)),
            _ => LogMessage::Info(visitor.message),
        };

        if self.tx.send(msg).is_err() {
            eprintln!("Log channel closed, message dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_short_untouched() {
        assert_eq!(clip("hello"), "hello");
    }

    #[test]
    fn test_clip_long_fits_discord_limit() {
        let clipped = clip(&"x".repeat(5000));
        assert_eq!(clipped.chars().count(), MAX_REPLY_CHARS);
        assert!(clipped.ends_with("..."));
    }
}
