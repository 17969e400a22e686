use std::collections::HashMap;
use std::time::Duration;

/// How long a typing indicator lives without a refresh.
pub const TYPING_TTL: Duration = Duration::from_secs(2);

/// Ephemeral per-display-name typing state, independent of history.
///
/// Expiry works on epochs instead of timer cancellation: every `start`
/// bumps the name's epoch, and a timer firing with a stale epoch is
/// ignored. The coordinator arms the actual timers and feeds expirations
/// back in as events.
#[derive(Debug, Default)]
pub struct TypingAggregator {
    entries: HashMap<String, u64>,
    next_epoch: u64,
}

impl TypingAggregator {
    /// Mark `name` as typing. Returns the epoch the caller should arm a
    /// TTL timer with; any previously armed timer for this name is now
    /// stale.
    pub fn start(&mut self, name: &str) -> u64 {
        self.next_epoch += 1;
        self.entries.insert(name.to_string(), self.next_epoch);
        self.next_epoch
    }

    /// Explicit stop. Returns whether the set changed.
    pub fn stop(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    /// TTL expiry. Removes the entry only if `epoch` is still current;
    /// returns whether the set changed.
    pub fn expire(&mut self, name: &str, epoch: u64) -> bool {
        match self.entries.get(name) {
            Some(&current) if current == epoch => {
                self.entries.remove(name);
                true
            }
            _ => false,
        }
    }

    /// Full current membership, sorted for stable output.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_stop_membership() {
        let mut typing = TypingAggregator::default();
        typing.start("alice");
        typing.start("bob");
        assert_eq!(typing.names(), ["alice", "bob"]);

        // A stops: exactly B remains.
        assert!(typing.stop("alice"));
        assert_eq!(typing.names(), ["bob"]);

        // Stopping an absent name changes nothing.
        assert!(!typing.stop("alice"));
        assert_eq!(typing.names(), ["bob"]);
    }

    #[test]
    fn stale_epoch_expiry_is_ignored() {
        let mut typing = TypingAggregator::default();
        let first = typing.start("alice");
        // She typed again before the first TTL fired.
        let second = typing.start("alice");

        assert!(!typing.expire("alice", first));
        assert_eq!(typing.names(), ["alice"]);

        assert!(typing.expire("alice", second));
        assert!(typing.names().is_empty());
    }

    #[test]
    fn expire_after_stop_is_a_noop() {
        let mut typing = TypingAggregator::default();
        let epoch = typing.start("alice");
        typing.stop("alice");
        assert!(!typing.expire("alice", epoch));
    }
}
