use parlor_types::models::RoomMode;

use crate::moderation::{sanitize_text, MAX_TEXT_LEN};

/// Slow-mode interval bounds, in seconds.
pub const SLOW_MODE_MAX: i64 = 5;

/// Shared mutable room configuration. Owned by the coordinator; mutated
/// only on behalf of host sessions (or the admin control plane).
#[derive(Debug, Clone, Default)]
pub struct RoomPolicy {
    slow: u32,
    emoji_only: bool,
    pinned: String,
}

impl RoomPolicy {
    pub fn slow(&self) -> u32 {
        self.slow
    }

    pub fn emoji_only(&self) -> bool {
        self.emoji_only
    }

    /// Empty string means no pin.
    pub fn pinned(&self) -> &str {
        &self.pinned
    }

    pub fn mode(&self) -> RoomMode {
        RoomMode {
            slow: self.slow,
            emoji_only: self.emoji_only,
        }
    }

    /// Slow interval is clamped to [0, 5] seconds regardless of input.
    pub fn set_mode(&mut self, slow: i64, emoji_only: bool) {
        self.slow = slow.clamp(0, SLOW_MODE_MAX) as u32;
        self.emoji_only = emoji_only;
    }

    /// Pinned text goes through the same markup strip and 240-char cap as
    /// message bodies.
    pub fn set_pinned(&mut self, text: &str) {
        self.pinned = sanitize_text(text, MAX_TEXT_LEN);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slow_interval_is_clamped() {
        let mut policy = RoomPolicy::default();

        policy.set_mode(3, false);
        assert_eq!(policy.slow(), 3);

        policy.set_mode(99, false);
        assert_eq!(policy.slow(), 5);

        policy.set_mode(-7, true);
        assert_eq!(policy.slow(), 0);
        assert!(policy.emoji_only());
    }

    #[test]
    fn pinned_text_is_sanitized_and_capped() {
        let mut policy = RoomPolicy::default();

        policy.set_pinned("<b>read the rules</b>");
        assert_eq!(policy.pinned(), "read the rules");

        policy.set_pinned(&"x".repeat(500));
        assert_eq!(policy.pinned().chars().count(), 240);

        policy.set_pinned("");
        assert_eq!(policy.pinned(), "");
    }
}
