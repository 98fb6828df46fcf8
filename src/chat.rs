//! Community chat channels stored alongside templates.

use std::sync::LazyLock;

use chrono::{DateTime, TimeZone, Utc};
use regex::Regex;
use rusqlite::params;
use tracing::{debug, info};

use crate::block::new_id;
use crate::error::{PromptError, Result};
use crate::store::Database;
use crate::template::Owner;
use crate::validators::validate_message;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#([\w-]+)").unwrap());

const SYSTEM_AUTHOR_ID: &str = "system";
const SYSTEM_AUTHOR_NAME: &str = "PromptForge";

/// A fixed discussion channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    welcome: &'static str,
}

pub const CHANNELS: &[Channel] = &[
    Channel {
        id: "general",
        name: "General",
        description: "General discussion about prompts and AI",
        welcome: "Welcome to #general! Talk about anything related to prompts and AI.",
    },
    Channel {
        id: "ideas",
        name: "Ideas & Suggestions",
        description: "Share your prompt ideas",
        welcome: "Welcome to #ideas! Share your ideas and suggestions for new prompts.",
    },
    Channel {
        id: "help",
        name: "Help",
        description: "Get help from the community",
        welcome: "Welcome to #help! Ask questions and get assistance from the community.",
    },
];

/// Look up a channel by id.
pub fn find_channel(id: &str) -> Option<&'static Channel> {
    CHANNELS.iter().find(|c| c.id == id)
}

/// A posted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    pub id: String,
    pub channel: String,
    pub author_id: String,
    pub author_name: String,
    pub text: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// `#tag` words in a message, without the `#`, first occurrence order.
pub fn extract_tags(text: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for caps in TAG_RE.captures_iter(text) {
        let tag = caps[1].to_string();
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

impl Database {
    /// Insert the welcome message into every channel that has no messages yet.
    pub(crate) fn seed_channels(&self) -> Result<()> {
        for channel in CHANNELS {
            let count: i64 = self.conn.query_row(
                "SELECT COUNT(*) FROM chat_messages WHERE channel = ?1",
                params![channel.id],
                |row| row.get(0),
            )?;
            if count == 0 {
                self.insert_message(
                    channel.id,
                    SYSTEM_AUTHOR_ID,
                    SYSTEM_AUTHOR_NAME,
                    channel.welcome,
                    &["welcome".to_string()],
                )?;
                debug!(channel = channel.id, "chat_channel_seeded");
            }
        }
        Ok(())
    }

    fn insert_message(
        &self,
        channel: &str,
        author_id: &str,
        author_name: &str,
        text: &str,
        tags: &[String],
    ) -> Result<ChannelMessage> {
        let message = ChannelMessage {
            id: new_id(),
            channel: channel.to_string(),
            author_id: author_id.to_string(),
            author_name: author_name.to_string(),
            text: text.to_string(),
            tags: tags.to_vec(),
            created_at: self.now(),
        };
        self.conn.execute(
            "INSERT INTO chat_messages (id, channel, author_id, author_name, text, tags, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                message.id,
                message.channel,
                message.author_id,
                message.author_name,
                message.text,
                serde_json::to_string(&message.tags)?,
                message.created_at.timestamp_millis()
            ],
        )?;
        Ok(message)
    }

    /// Post a message as `author`. Blank text and unknown channels are rejected.
    pub fn post(&self, channel: &str, text: &str, author: &Owner) -> Result<ChannelMessage> {
        if let Some(error) = validate_message(text) {
            return Err(PromptError::Validation(vec![error]));
        }
        if find_channel(channel).is_none() {
            return Err(PromptError::NotFound(format!("channel #{}", channel)));
        }

        let text = text.trim();
        let message = self.insert_message(
            channel,
            &author.user_id,
            author.display_name(),
            text,
            &extract_tags(text),
        )?;
        info!(channel, author = %author.user_id, tags = message.tags.len(), "chat_message_posted");
        Ok(message)
    }

    /// Messages in a channel, oldest first.
    pub fn messages(&self, channel: &str) -> Result<Vec<ChannelMessage>> {
        if find_channel(channel).is_none() {
            return Err(PromptError::NotFound(format!("channel #{}", channel)));
        }

        let mut stmt = self.conn.prepare(
            "SELECT id, channel, author_id, author_name, text, tags, created_at
             FROM chat_messages WHERE channel = ?1 ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt
            .query_map(params![channel], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, i64>(6)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(
                |(id, channel, author_id, author_name, text, tags, created_at)| -> Result<ChannelMessage> {
                    Ok(ChannelMessage {
                        id,
                        channel,
                        author_id,
                        author_name,
                        text,
                        tags: serde_json::from_str(&tags)?,
                        created_at: Utc
                            .timestamp_millis_opt(created_at)
                            .single()
                            .unwrap_or_default(),
                    })
                },
            )
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{Local, TimeDelta};
    use std::sync::Arc;

    fn setup() -> (Database, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(
            Local.with_ymd_and_hms(2026, 9, 1, 8, 0, 0).unwrap(),
        ));
        (Database::open_in_memory(clock.clone()).unwrap(), clock)
    }

    #[test]
    fn test_extract_tags() {
        assert_eq!(
            extract_tags("Try #chain-of-thought with #few_shot, and #chain-of-thought again"),
            vec!["chain-of-thought".to_string(), "few_shot".to_string()]
        );
        assert!(extract_tags("no tags # here").is_empty());
    }

    #[test]
    fn test_channels_are_seeded_once() {
        let (db, _clock) = setup();
        for channel in CHANNELS {
            let messages = db.messages(channel.id).unwrap();
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0].author_id, SYSTEM_AUTHOR_ID);
            assert_eq!(messages[0].tags, vec!["welcome".to_string()]);
        }
        db.seed_channels().unwrap();
        assert_eq!(db.messages("general").unwrap().len(), 1);
    }

    #[test]
    fn test_post_and_read_oldest_first() {
        let (db, clock) = setup();
        let owner = Owner {
            user_id: "u1".to_string(),
            email: None,
            name: Some("Ana".to_string()),
        };

        clock.advance(TimeDelta::minutes(1));
        db.post("ideas", "  First #idea  ", &owner).unwrap();
        clock.advance(TimeDelta::minutes(1));
        let second = db.post("ideas", "Second", &owner).unwrap();
        assert_eq!(second.author_name, "Ana");

        let texts: Vec<_> = db
            .messages("ideas")
            .unwrap()
            .into_iter()
            .map(|m| (m.text, m.tags))
            .collect();
        assert_eq!(texts.len(), 3);
        assert_eq!(texts[1], ("First #idea".to_string(), vec!["idea".to_string()]));
        assert_eq!(texts[2].0, "Second");
    }

    #[test]
    fn test_post_rejects_blank_and_unknown_channel() {
        let (db, _clock) = setup();
        let owner = Owner::new("u1");
        assert!(matches!(
            db.post("general", "   ", &owner),
            Err(PromptError::Validation(_))
        ));
        assert!(matches!(
            db.post("random", "hello", &owner),
            Err(PromptError::NotFound(_))
        ));
        assert!(matches!(db.messages("random"), Err(PromptError::NotFound(_))));
    }
}
