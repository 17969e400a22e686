use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::policy::RoomPolicy;

/// Hard cap on message and pinned text length, in characters. Longer
/// input is truncated, never rejected.
pub const MAX_TEXT_LEN: usize = 240;

/// Display name cap, in characters.
pub const MAX_NAME_LEN: usize = 30;

static MARKUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("markup regex is valid"));

static EMOJI_ONLY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{Emoji}\s]+$").expect("emoji regex is valid"));

/// Strip markup tags, then cap at `max` characters.
pub fn sanitize_text(raw: &str, max: usize) -> String {
    let stripped = MARKUP_RE.replace_all(raw, "");
    stripped.chars().take(max).collect()
}

/// Why a candidate message was not accepted. Only the rejections with a
/// `user_message` are ever surfaced to the sender; `Empty` and
/// `Suppressed` produce no observable response at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Nothing left after stripping/truncation.
    Empty,
    /// Slow mode: the sender must wait `wait_secs` more seconds.
    RateLimited { wait_secs: u32 },
    /// Matched a banned word or pattern. Silent to the sender so the
    /// filter cannot be probed; visible only in server logs.
    Suppressed,
    /// Emoji-only mode is active and the text has non-emoji content.
    EmojiOnly,
    /// The text contains an http(s) link.
    LinkNotAllowed,
}

impl Rejection {
    pub fn user_message(&self) -> Option<String> {
        match self {
            Rejection::RateLimited { wait_secs } => {
                Some(format!("Slow mode: wait {wait_secs}s"))
            }
            Rejection::EmojiOnly => Some("Emoji-only mode is enabled".to_string()),
            Rejection::LinkNotAllowed => Some("Links are not allowed".to_string()),
            Rejection::Empty | Rejection::Suppressed => None,
        }
    }
}

/// External representation of the moderation config file:
/// `{"bannedWords": [...], "bannedPatterns": [...]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModerationDocument {
    #[serde(rename = "bannedWords", default)]
    pub banned_words: Vec<String>,
    #[serde(rename = "bannedPatterns", default)]
    pub banned_patterns: Vec<String>,
}

/// Compiled banned-content rules. Replaced wholesale on reload, never
/// merged: a reload either fully succeeds or leaves the previous value
/// untouched.
#[derive(Debug, Default)]
pub struct ModerationConfig {
    banned_words: Vec<String>,
    banned_patterns: Vec<Regex>,
}

impl ModerationConfig {
    /// Compile a document. Any single invalid pattern fails the whole
    /// compilation, so a bad reload can never be partially applied.
    pub fn from_document(doc: &ModerationDocument) -> Result<Self> {
        let banned_words = doc
            .banned_words
            .iter()
            .map(|w| w.to_lowercase())
            .collect();

        let banned_patterns = doc
            .banned_patterns
            .iter()
            .map(|p| {
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .with_context(|| format!("invalid banned pattern {p:?}"))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            banned_words,
            banned_patterns,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading moderation config {}", path.display()))?;
        let doc: ModerationDocument = serde_json::from_str(&raw)
            .with_context(|| format!("parsing moderation config {}", path.display()))?;
        Self::from_document(&doc)
    }

    pub fn is_banned(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        if self.banned_words.iter().any(|w| lowered.contains(w)) {
            return true;
        }
        self.banned_patterns.iter().any(|p| p.is_match(text))
    }
}

/// The validation/transform pipeline applied to every candidate message.
///
/// Step order is load-bearing: rate limiting short-circuits before any
/// content inspection, and the silent suppression check runs before the
/// visible emoji/link rules so a banned match never surfaces an error the
/// sender could use to map the filter.
pub fn evaluate(
    policy: &RoomPolicy,
    config: &ModerationConfig,
    last_sent_at_ms: i64,
    now_ms: i64,
    raw: &str,
) -> Result<String, Rejection> {
    let text = sanitize_text(raw, MAX_TEXT_LEN);

    if text.is_empty() {
        return Err(Rejection::Empty);
    }

    if policy.slow() > 0 {
        let elapsed_secs = (now_ms - last_sent_at_ms) as f64 / 1000.0;
        if elapsed_secs < policy.slow() as f64 {
            let wait_secs = (policy.slow() as f64 - elapsed_secs).ceil() as u32;
            return Err(Rejection::RateLimited { wait_secs });
        }
    }

    if config.is_banned(&text) {
        return Err(Rejection::Suppressed);
    }

    if policy.emoji_only() && !EMOJI_ONLY_RE.is_match(&text) {
        return Err(Rejection::EmojiOnly);
    }

    let lowered = text.to_lowercase();
    if lowered.contains("http://") || lowered.contains("https://") {
        return Err(Rejection::LinkNotAllowed);
    }

    Ok(text)
}
