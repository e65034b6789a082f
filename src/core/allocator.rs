use uuid::Uuid;

/// Source of fresh ids for connections and notes.
pub trait IdProvider: Send + Sync {
    fn next_id(&mut self, prefix: &str) -> String;

    /// Called for every id restored from a save so later ids cannot collide.
    fn observe(&mut self, _id: &str) {}
}

/// Monotonic counter shared by every prefix: `note-1`, `connection-2`, ...
#[derive(Debug, Clone)]
pub struct SequentialIds {
    next: u64,
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl SequentialIds {
    pub fn alloc(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    pub fn bump_to_at_least(&mut self, min_next: u64) {
        if self.next < min_next {
            self.next = min_next;
        }
    }
}

impl IdProvider for SequentialIds {
    fn next_id(&mut self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.alloc())
    }

    fn observe(&mut self, id: &str) {
        let suffix = id.rsplit('-').next().and_then(|n| n.parse::<u64>().ok());
        if let Some(n) = suffix {
            self.bump_to_at_least(n.saturating_add(1));
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdProvider for UuidIds {
    fn next_id(&mut self, prefix: &str) -> String {
        format!("{}-{}", prefix, Uuid::new_v4().simple())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids_count_across_prefixes() {
        let mut ids = SequentialIds::default();
        assert_eq!(ids.next_id("note"), "note-1");
        assert_eq!(ids.next_id("connection"), "connection-2");
    }

    #[test]
    fn observe_skips_past_restored_ids() {
        let mut ids = SequentialIds::default();
        ids.observe("note-7");
        ids.observe("connection-3");
        ids.observe("legacy");
        assert_eq!(ids.next_id("note"), "note-8");
    }

    #[test]
    fn uuid_ids_are_unique() {
        let mut ids = UuidIds;
        let first = ids.next_id("note");
        assert!(first.starts_with("note-"));
        assert_ne!(first, ids.next_id("note"));
    }
}
