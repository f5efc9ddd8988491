//! Named event registry.

use hashbrown::HashMap;

/// Per-tick named event registry.
///
/// States fire events by name during update; anything that runs later in
/// the same tick can poll them. All firings clear at
/// [`end_frame`](Self::end_frame).
#[derive(Debug, Default)]
pub struct EventBus {
    counts: HashMap<String, u32>,
}

impl EventBus {
    /// Create an empty event bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one firing of the named event.
    pub fn trigger(&mut self, name: &str) {
        *self.counts.entry_ref(name).or_insert(0) += 1;
    }

    /// Returns `true` if the event fired at least once this tick.
    #[must_use]
    pub fn triggered(&self, name: &str) -> bool {
        self.counts.contains_key(name)
    }

    /// How many times the event fired this tick.
    #[must_use]
    pub fn count(&self, name: &str) -> u32 {
        self.counts.get(name).copied().unwrap_or(0)
    }

    /// Called at end of tick to clear all firings.
    pub fn end_frame(&mut self) {
        self.counts.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fired_events_are_visible_within_the_tick() {
        let mut events = EventBus::new();
        assert!(!events.triggered("menu:ready"));

        events.trigger("menu:ready");
        assert!(events.triggered("menu:ready"));
        assert_eq!(events.count("menu:ready"), 1);
    }

    #[test]
    fn counts_accumulate() {
        let mut events = EventBus::new();
        events.trigger("spawn");
        events.trigger("spawn");
        events.trigger("spawn");
        assert_eq!(events.count("spawn"), 3);
    }

    #[test]
    fn end_frame_clears_everything() {
        let mut events = EventBus::new();
        events.trigger("a");
        events.trigger("b");

        events.end_frame();
        assert!(!events.triggered("a"));
        assert!(!events.triggered("b"));
        assert_eq!(events.count("a"), 0);
    }

    #[test]
    fn unknown_events_count_zero() {
        let events = EventBus::new();
        assert_eq!(events.count("never"), 0);
    }
}
