//! Chat transcript kept per session

use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Number of entries shown in the recent-history view.
pub const RECENT_HISTORY_LEN: usize = 10;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    pub fn display_name(self) -> &'static str {
        match self {
            Speaker::User => "You",
            Speaker::Assistant => "Coderzz.AI",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub speaker: Speaker,
    pub timestamp: DateTime<Local>,
    pub text: String,
}

impl ChatEntry {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self::at(speaker, text, Local::now())
    }

    pub fn at(speaker: Speaker, text: impl Into<String>, timestamp: DateTime<Local>) -> Self {
        Self {
            speaker,
            timestamp,
            text: text.into(),
        }
    }
}

impl fmt::Display for ChatEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {}",
            self.speaker.display_name(),
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.text
        )
    }
}

/// Append-only transcript, cleared only by a session reset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatHistory {
    entries: Vec<ChatEntry>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ChatEntry) {
        self.entries.push(entry);
    }

    /// Record a question and its answer with the same timestamp.
    pub fn record_exchange(&mut self, question: &str, answer: &str) {
        let now = Local::now();
        self.push(ChatEntry::at(Speaker::User, question, now));
        self.push(ChatEntry::at(Speaker::Assistant, answer, now));
    }

    /// The last `n` entries, newest first.
    pub fn recent(&self, n: usize) -> Vec<&ChatEntry> {
        self.entries.iter().rev().take(n).collect()
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
