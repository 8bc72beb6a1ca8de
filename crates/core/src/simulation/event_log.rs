//! Timestamped ring buffer of simulation events.
//!
//! Append-only during simulation, bounded at 4096 entries; exposed for
//! debugging and save inspection. Entries are plain strings with a
//! `[Sea Dd HH:MM]` prefix stamped by the world.

use serde::{Deserialize, Serialize};

pub const EVENT_LOG_MAX_ENTRIES: usize = 4096;
pub const EVENT_LOG_MAX_LENGTH: usize = 200;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    entries: Vec<String>,
    /// Next write position once the buffer has wrapped.
    head: usize,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line, truncating to the entry length cap and evicting the
    /// oldest entry once the ring is full.
    pub fn push(&mut self, mut line: String) {
        if line.len() > EVENT_LOG_MAX_LENGTH {
            let mut cut = EVENT_LOG_MAX_LENGTH;
            while !line.is_char_boundary(cut) {
                cut -= 1;
            }
            line.truncate(cut);
        }
        if self.entries.len() < EVENT_LOG_MAX_ENTRIES {
            self.entries.push(line);
        } else {
            self.entries[self.head] = line;
            self.head = (self.head + 1) % EVENT_LOG_MAX_ENTRIES;
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry by index, 0 = oldest still in the buffer.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        if index >= self.entries.len() {
            return None;
        }
        let idx = if self.entries.len() < EVENT_LOG_MAX_ENTRIES {
            index
        } else {
            (self.head + index) % EVENT_LOG_MAX_ENTRIES
        };
        self.entries.get(idx).map(String::as_str)
    }

    /// Oldest-to-newest iteration.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        (0..self.len()).filter_map(|i| self.get(i))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.head = 0;
    }

    /// Write the whole log, oldest first, one entry per line.
    ///
    /// # Errors
    /// Returns the underlying io error if the file cannot be written.
    pub fn dump_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> std::io::Result<()> {
        let mut out = String::new();
        for line in self.iter() {
            out.push_str(line);
            out.push('\n');
        }
        std::fs::write(path, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_insertion_order() {
        let mut log = EventLog::new();
        log.push("first".into());
        log.push("second".into());
        assert_eq!(log.len(), 2);
        assert_eq!(log.get(0), Some("first"));
        assert_eq!(log.get(1), Some("second"));
        assert_eq!(log.get(2), None);
    }

    #[test]
    fn wraps_at_capacity_evicting_oldest() {
        let mut log = EventLog::new();
        for i in 0..(EVENT_LOG_MAX_ENTRIES + 10) {
            log.push(format!("entry {i}"));
        }
        assert_eq!(log.len(), EVENT_LOG_MAX_ENTRIES);
        assert_eq!(log.get(0), Some("entry 10"));
        let last = log.get(EVENT_LOG_MAX_ENTRIES - 1).unwrap();
        assert_eq!(last, format!("entry {}", EVENT_LOG_MAX_ENTRIES + 9));
    }

    #[test]
    fn truncates_long_entries() {
        let mut log = EventLog::new();
        log.push("x".repeat(500));
        assert_eq!(log.get(0).unwrap().len(), EVENT_LOG_MAX_LENGTH);
    }

    #[test]
    fn iter_matches_get() {
        let mut log = EventLog::new();
        log.push("a".into());
        log.push("b".into());
        let collected: Vec<_> = log.iter().collect();
        assert_eq!(collected, vec!["a", "b"]);
    }
}
