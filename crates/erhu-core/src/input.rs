//! Key events and the sample-to-event classifier.
//!
//! Both targets sample raw key levels (GPIO or SDL) and feed them through
//! [`KeyClassifier`], which synthesizes the short/long/repeat events the
//! application consumes. A press released before the long threshold becomes
//! a single `Short` on release; crossing the threshold emits `Long` once,
//! followed by a `Repeat` every repeat interval while the key stays held.

use crate::consts;

pub const NUM_KEYS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Up = 0,
    Down,
    Left,
    Right,
    Ok,
    Back,
}

pub const ALL_KEYS: [Key; NUM_KEYS] = [
    Key::Up,
    Key::Down,
    Key::Left,
    Key::Right,
    Key::Ok,
    Key::Back,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventKind {
    Short,
    Long,
    Repeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub kind: KeyEventKind,
}

/// Per-key hold tracking.
#[derive(Debug, Clone, Copy)]
struct KeyTracker {
    pressed: bool,
    held_ms: u32,
    long_fired: bool,
    next_repeat_ms: u32,
}

impl KeyTracker {
    const fn new() -> Self {
        Self {
            pressed: false,
            held_ms: 0,
            long_fired: false,
            next_repeat_ms: 0,
        }
    }
}

/// Turns sampled key levels into [`KeyEvent`]s.
pub struct KeyClassifier {
    keys: [KeyTracker; NUM_KEYS],
}

impl KeyClassifier {
    pub const fn new() -> Self {
        Self {
            keys: [KeyTracker::new(); NUM_KEYS],
        }
    }

    /// Feed one sample for `key`. `elapsed_ms` is the time since the
    /// previous sample of the same key. At most one event per sample.
    pub fn update(&mut self, key: Key, pressed: bool, elapsed_ms: u32) -> Option<KeyEvent> {
        let tracker = &mut self.keys[key as usize];

        if pressed {
            if !tracker.pressed {
                tracker.pressed = true;
                tracker.held_ms = 0;
                tracker.long_fired = false;
                return None;
            }

            tracker.held_ms = tracker.held_ms.saturating_add(elapsed_ms);
            if !tracker.long_fired && tracker.held_ms >= consts::KEY_LONG_PRESS_MS {
                tracker.long_fired = true;
                tracker.next_repeat_ms = tracker.held_ms + consts::KEY_REPEAT_MS;
                return Some(KeyEvent {
                    key,
                    kind: KeyEventKind::Long,
                });
            }
            if tracker.long_fired && tracker.held_ms >= tracker.next_repeat_ms {
                tracker.next_repeat_ms += consts::KEY_REPEAT_MS;
                return Some(KeyEvent {
                    key,
                    kind: KeyEventKind::Repeat,
                });
            }
            return None;
        }

        if tracker.pressed {
            tracker.pressed = false;
            // a hold that already fired Long does not also count as a tap
            if !tracker.long_fired {
                return Some(KeyEvent {
                    key,
                    kind: KeyEventKind::Short,
                });
            }
        }
        None
    }
}

impl Default for KeyClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK_MS: u32 = 50;

    fn hold(classifier: &mut KeyClassifier, key: Key, ticks: u32) -> heapless::Vec<KeyEvent, 32> {
        let mut events = heapless::Vec::new();
        for _ in 0..ticks {
            if let Some(event) = classifier.update(key, true, TICK_MS) {
                let _ = events.push(event);
            }
        }
        events
    }

    #[test]
    fn quick_tap_is_short_on_release() {
        let mut classifier = KeyClassifier::new();

        assert_eq!(classifier.update(Key::Ok, true, TICK_MS), None);
        assert_eq!(classifier.update(Key::Ok, true, TICK_MS), None);
        assert_eq!(
            classifier.update(Key::Ok, false, TICK_MS),
            Some(KeyEvent {
                key: Key::Ok,
                kind: KeyEventKind::Short,
            })
        );
    }

    #[test]
    fn hold_fires_long_once_then_repeats() {
        let mut classifier = KeyClassifier::new();

        // 1s of hold at 50ms sampling
        let events = hold(&mut classifier, Key::Back, 20);

        let longs = events
            .iter()
            .filter(|e| e.kind == KeyEventKind::Long)
            .count();
        let repeats = events
            .iter()
            .filter(|e| e.kind == KeyEventKind::Repeat)
            .count();

        assert_eq!(longs, 1);
        assert!(repeats >= 3);
        assert_eq!(events[0].kind, KeyEventKind::Long);

        // release after a long hold is not a tap
        assert_eq!(classifier.update(Key::Back, false, TICK_MS), None);
    }

    #[test]
    fn keys_are_tracked_independently() {
        let mut classifier = KeyClassifier::new();

        assert_eq!(classifier.update(Key::Up, true, TICK_MS), None);
        assert_eq!(classifier.update(Key::Down, true, TICK_MS), None);
        assert_eq!(
            classifier
                .update(Key::Down, false, TICK_MS)
                .map(|e| (e.key, e.kind)),
            Some((Key::Down, KeyEventKind::Short))
        );
        // Up is still held and unaffected by Down's release
        assert_eq!(classifier.update(Key::Up, true, TICK_MS), None);
    }

    #[test]
    fn idle_key_emits_nothing() {
        let mut classifier = KeyClassifier::new();
        for _ in 0..10 {
            assert_eq!(classifier.update(Key::Left, false, TICK_MS), None);
        }
    }
}
