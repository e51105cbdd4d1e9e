//! Chord detection over held keys.
//!
//! The tracker only knows which keys are down. When the held set equals the
//! chord it emits one [`HotkeyEvent`] and forgets every held key.

use std::fmt;

use anyhow::{Result, bail};

use crate::compare::eq_set;

/// A key name in browser `KeyboardEvent.key` style: `"Alt"`, `"Enter"`, `"n"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyId(String);

impl KeyId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for KeyId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyTransition {
    Down(KeyId),
    Up(KeyId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyEvent {
    CreateNode,
}

/// An unordered set of keys that must be held together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chord {
    keys: Vec<KeyId>,
}

impl Chord {
    /// Parse `Alt+n` style text. Modifier aliases (`Option`, `Ctrl`, `Cmd`)
    /// map onto the names the keyboard source reports.
    pub fn parse(text: &str) -> Result<Self> {
        let mut keys: Vec<KeyId> = Vec::new();
        for part in text.split('+') {
            let part = part.trim();
            if part.is_empty() {
                bail!("empty key in chord {:?}", text);
            }
            let key = KeyId::new(canonical_key_name(part));
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        Ok(Self { keys })
    }

    pub fn keys(&self) -> &[KeyId] {
        &self.keys
    }

    pub fn matches(&self, held: &[KeyId]) -> bool {
        eq_set(held, &self.keys)
    }
}

impl Default for Chord {
    fn default() -> Self {
        Self {
            keys: vec![KeyId::from("Alt"), KeyId::from("n")],
        }
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.keys.iter().map(KeyId::as_str).collect();
        f.write_str(&names.join("+"))
    }
}

fn canonical_key_name(name: &str) -> String {
    match name.to_ascii_lowercase().as_str() {
        "alt" | "option" | "opt" => "Alt".to_string(),
        "ctrl" | "control" => "Control".to_string(),
        "cmd" | "command" | "meta" | "super" | "win" => "Meta".to_string(),
        "shift" => "Shift".to_string(),
        _ if name.chars().count() == 1 => name.to_lowercase(),
        _ => name.to_string(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct HotkeyTracker {
    chord: Chord,
    held: Vec<KeyId>,
}

impl HotkeyTracker {
    pub fn new(chord: Chord) -> Self {
        Self {
            chord,
            held: Vec::new(),
        }
    }

    pub fn chord(&self) -> &Chord {
        &self.chord
    }

    pub fn held(&self) -> &[KeyId] {
        &self.held
    }

    pub fn apply(&mut self, transition: KeyTransition) -> Option<HotkeyEvent> {
        match transition {
            KeyTransition::Down(key) => self.key_down(key),
            KeyTransition::Up(key) => {
                self.key_up(&key);
                None
            }
        }
    }

    pub fn key_down(&mut self, key: KeyId) -> Option<HotkeyEvent> {
        if !self.held.contains(&key) {
            self.held.push(key);
        }
        if self.chord.matches(&self.held) {
            self.held.clear();
            return Some(HotkeyEvent::CreateNode);
        }
        None
    }

    /// Releasing a key that is not held is ignored.
    pub fn key_up(&mut self, key: &KeyId) {
        if let Some(idx) = self.held.iter().position(|k| k == key) {
            self.held.remove(idx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press_all(tracker: &mut HotkeyTracker, transitions: &[KeyTransition]) -> usize {
        transitions
            .iter()
            .cloned()
            .filter_map(|t| tracker.apply(t))
            .count()
    }

    fn down(name: &str) -> KeyTransition {
        KeyTransition::Down(KeyId::from(name))
    }

    fn up(name: &str) -> KeyTransition {
        KeyTransition::Up(KeyId::from(name))
    }

    #[test]
    fn chord_fires_once_in_either_order() {
        for order in [[down("n"), down("Alt")], [down("Alt"), down("n")]] {
            let mut tracker = HotkeyTracker::default();
            assert_eq!(press_all(&mut tracker, &order), 1);
            assert!(tracker.held().is_empty());
        }
    }

    #[test]
    fn extra_key_blocks_the_chord() {
        let mut tracker = HotkeyTracker::default();
        let fired = press_all(
            &mut tracker,
            &[down("Alt"), down("x"), up("Alt"), up("x")],
        );
        assert_eq!(fired, 0);
        assert!(tracker.held().is_empty());
    }

    #[test]
    fn releasing_an_unheld_key_is_ignored() {
        let mut tracker = HotkeyTracker::default();
        tracker.key_up(&KeyId::from("q"));
        tracker.key_down(KeyId::from("Alt"));
        tracker.key_up(&KeyId::from("q"));
        assert_eq!(tracker.held(), &[KeyId::from("Alt")]);
    }

    #[test]
    fn repeated_key_down_is_idempotent() {
        let mut tracker = HotkeyTracker::default();
        let fired = press_all(&mut tracker, &[down("Alt"), down("Alt"), down("n")]);
        assert_eq!(fired, 1);
    }

    #[test]
    fn chord_can_fire_again_after_reset() {
        let mut tracker = HotkeyTracker::default();
        let fired = press_all(
            &mut tracker,
            &[down("Alt"), down("n"), up("n"), up("Alt"), down("Alt"), down("n")],
        );
        assert_eq!(fired, 2);
    }

    #[test]
    fn chord_parse_accepts_aliases() {
        let chord = Chord::parse("Ctrl + Shift + k").unwrap();
        assert_eq!(
            chord.keys(),
            &[KeyId::from("Control"), KeyId::from("Shift"), KeyId::from("k")]
        );
        assert_eq!(Chord::parse("option+n").unwrap(), Chord::default());
        assert_eq!(Chord::parse("Alt+N").unwrap(), Chord::default());
        assert_eq!(Chord::default().to_string(), "Alt+n");
    }

    #[test]
    fn chord_parse_rejects_empty_parts() {
        assert!(Chord::parse("Alt+").is_err());
        assert!(Chord::parse("").is_err());
    }
}
