use std::io;

use crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags, ModifierKeyCode,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal;

use crate::hotkey::{KeyId, KeyTransition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Which end of an edge a reconnect gesture drags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeEnd {
    Source,
    Target,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    Move(Direction),
    Nudge(Direction),
    NextNode,
    PrevNode,
    Activate,
    Edit,
    ToggleExpand,
    StartConnect,
    StartReconnect(EdgeEnd),
    NextEdge,
    PrevEdge,
    DeleteNode,
    DeleteEdge,
    ToggleHelp,
    Quit,
    Cancel,
    Newline,
    Backspace,
    DeleteChar,
    LineStart,
    LineEnd,
    InputChar(char),
    Noop,
}

pub fn action_for_key(key: KeyEvent, text_mode: bool) -> KeyAction {
    let chorded = key
        .modifiers
        .intersects(KeyModifiers::ALT | KeyModifiers::CONTROL | KeyModifiers::SUPER);

    if text_mode {
        return match key.code {
            KeyCode::Esc => KeyAction::Cancel,
            KeyCode::Enter => KeyAction::Newline,
            KeyCode::Backspace => KeyAction::Backspace,
            KeyCode::Delete => KeyAction::DeleteChar,
            KeyCode::Home => KeyAction::LineStart,
            KeyCode::End => KeyAction::LineEnd,
            KeyCode::Up => KeyAction::Move(Direction::Up),
            KeyCode::Down => KeyAction::Move(Direction::Down),
            KeyCode::Left => KeyAction::Move(Direction::Left),
            KeyCode::Right => KeyAction::Move(Direction::Right),
            KeyCode::Tab => KeyAction::InputChar('\t'),
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                KeyAction::Cancel
            }
            KeyCode::Char(_) if chorded => KeyAction::Noop,
            KeyCode::Char(c) => KeyAction::InputChar(c),
            _ => KeyAction::Noop,
        };
    }

    let shift = key.modifiers.contains(KeyModifiers::SHIFT);
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => KeyAction::Quit,
        KeyCode::Char(_) if chorded => KeyAction::Noop,
        KeyCode::Up if shift => KeyAction::Nudge(Direction::Up),
        KeyCode::Down if shift => KeyAction::Nudge(Direction::Down),
        KeyCode::Left if shift => KeyAction::Nudge(Direction::Left),
        KeyCode::Right if shift => KeyAction::Nudge(Direction::Right),
        KeyCode::Up | KeyCode::Char('k') => KeyAction::Move(Direction::Up),
        KeyCode::Down | KeyCode::Char('j') => KeyAction::Move(Direction::Down),
        KeyCode::Left | KeyCode::Char('h') => KeyAction::Move(Direction::Left),
        KeyCode::Right | KeyCode::Char('l') => KeyAction::Move(Direction::Right),
        KeyCode::Char('K') => KeyAction::Nudge(Direction::Up),
        KeyCode::Char('J') => KeyAction::Nudge(Direction::Down),
        KeyCode::Char('H') => KeyAction::Nudge(Direction::Left),
        KeyCode::Char('L') => KeyAction::Nudge(Direction::Right),
        KeyCode::Tab => KeyAction::NextNode,
        KeyCode::BackTab => KeyAction::PrevNode,
        KeyCode::Enter => KeyAction::Activate,
        KeyCode::Esc | KeyCode::Backspace => KeyAction::Cancel,
        KeyCode::Delete | KeyCode::Char('D') => KeyAction::DeleteNode,
        KeyCode::Char('e') => KeyAction::Edit,
        KeyCode::Char(' ') => KeyAction::ToggleExpand,
        KeyCode::Char('c') => KeyAction::StartConnect,
        KeyCode::Char('r') => KeyAction::StartReconnect(EdgeEnd::Target),
        KeyCode::Char('R') => KeyAction::StartReconnect(EdgeEnd::Source),
        KeyCode::Char(']') => KeyAction::NextEdge,
        KeyCode::Char('[') => KeyAction::PrevEdge,
        KeyCode::Char('x') => KeyAction::DeleteEdge,
        KeyCode::Char('?') => KeyAction::ToggleHelp,
        KeyCode::Char('q') => KeyAction::Quit,
        _ => KeyAction::Noop,
    }
}

/// Browser-style name for a key, or `None` for keys the chord tracker ignores.
pub fn key_id(code: KeyCode) -> Option<KeyId> {
    let name = match code {
        KeyCode::Modifier(modifier) => match modifier {
            ModifierKeyCode::LeftAlt | ModifierKeyCode::RightAlt => "Alt",
            ModifierKeyCode::LeftControl | ModifierKeyCode::RightControl => "Control",
            ModifierKeyCode::LeftShift | ModifierKeyCode::RightShift => "Shift",
            ModifierKeyCode::LeftSuper
            | ModifierKeyCode::RightSuper
            | ModifierKeyCode::LeftMeta
            | ModifierKeyCode::RightMeta
            | ModifierKeyCode::LeftHyper
            | ModifierKeyCode::RightHyper => "Meta",
            _ => return None,
        },
        KeyCode::Char(c) => return Some(KeyId::new(c.to_lowercase().to_string())),
        KeyCode::F(n) => return Some(KeyId::new(format!("F{}", n))),
        KeyCode::Enter => "Enter",
        KeyCode::Esc => "Escape",
        KeyCode::Tab | KeyCode::BackTab => "Tab",
        KeyCode::Backspace => "Backspace",
        KeyCode::Delete => "Delete",
        KeyCode::Insert => "Insert",
        KeyCode::Home => "Home",
        KeyCode::End => "End",
        KeyCode::PageUp => "PageUp",
        KeyCode::PageDown => "PageDown",
        KeyCode::Up => "ArrowUp",
        KeyCode::Down => "ArrowDown",
        KeyCode::Left => "ArrowLeft",
        KeyCode::Right => "ArrowRight",
        _ => return None,
    };
    Some(KeyId::from(name))
}

/// Translate one terminal key event into held-key transitions.
///
/// Terminals with release reporting deliver modifiers and releases as their
/// own events. Legacy terminals only send a modified press, so the held
/// modifiers are replayed around it and everything is released at once.
pub fn key_transitions(key: KeyEvent, release_reporting: bool) -> Vec<KeyTransition> {
    let Some(id) = key_id(key.code) else {
        return Vec::new();
    };
    if key.kind == KeyEventKind::Release {
        return vec![KeyTransition::Up(id)];
    }
    if release_reporting || matches!(key.code, KeyCode::Modifier(_)) {
        return vec![KeyTransition::Down(id)];
    }

    let modifiers = held_modifiers(key.modifiers);
    let mut transitions: Vec<KeyTransition> = modifiers
        .iter()
        .cloned()
        .map(KeyTransition::Down)
        .collect();
    transitions.push(KeyTransition::Down(id.clone()));
    transitions.push(KeyTransition::Up(id));
    transitions.extend(modifiers.into_iter().rev().map(KeyTransition::Up));
    transitions
}

/// Shift is left out: it is already folded into the reported character.
fn held_modifiers(modifiers: KeyModifiers) -> Vec<KeyId> {
    let mut held = Vec::new();
    if modifiers.contains(KeyModifiers::CONTROL) {
        held.push(KeyId::from("Control"));
    }
    if modifiers.contains(KeyModifiers::ALT) {
        held.push(KeyId::from("Alt"));
    }
    if modifiers.intersects(KeyModifiers::SUPER | KeyModifiers::META | KeyModifiers::HYPER) {
        held.push(KeyId::from("Meta"));
    }
    held
}

/// Keyboard enhancement for the lifetime of the canvas. Pushed on acquire
/// when the terminal supports it, popped on drop either way.
pub struct KeyboardSubscription {
    release_reporting: bool,
}

impl KeyboardSubscription {
    pub fn acquire() -> io::Result<Self> {
        let release_reporting = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if release_reporting {
            execute!(
                io::stdout(),
                PushKeyboardEnhancementFlags(
                    KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                        | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                        | KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES
                )
            )?;
        }
        Ok(Self { release_reporting })
    }

    pub fn release_reporting(&self) -> bool {
        self.release_reporting
    }
}

impl Drop for KeyboardSubscription {
    fn drop(&mut self) {
        if self.release_reporting {
            let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::HotkeyTracker;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode, modifiers: KeyModifiers, kind: KeyEventKind) -> KeyEvent {
        KeyEvent {
            code,
            modifiers,
            kind,
            state: KeyEventState::NONE,
        }
    }

    fn down(name: &str) -> KeyTransition {
        KeyTransition::Down(KeyId::from(name))
    }

    fn up(name: &str) -> KeyTransition {
        KeyTransition::Up(KeyId::from(name))
    }

    #[test]
    fn legacy_modified_press_replays_modifiers() {
        let transitions = key_transitions(
            key(KeyCode::Char('n'), KeyModifiers::ALT, KeyEventKind::Press),
            false,
        );
        assert_eq!(transitions, vec![down("Alt"), down("n"), up("n"), up("Alt")]);
    }

    #[test]
    fn letter_case_does_not_split_press_and_release() {
        let press = key(
            KeyCode::Char('N'),
            KeyModifiers::SHIFT,
            KeyEventKind::Press,
        );
        let release = key(KeyCode::Char('n'), KeyModifiers::NONE, KeyEventKind::Release);
        assert_eq!(key_transitions(press, true), vec![down("n")]);
        assert_eq!(key_transitions(release, true), vec![up("n")]);

        let mut tracker = HotkeyTracker::default();
        for transition in key_transitions(press, true)
            .into_iter()
            .chain(key_transitions(release, true))
        {
            tracker.apply(transition);
        }
        assert!(tracker.held().is_empty());
    }

    #[test]
    fn release_reporting_maps_events_directly() {
        let press = key(
            KeyCode::Modifier(ModifierKeyCode::LeftAlt),
            KeyModifiers::ALT,
            KeyEventKind::Press,
        );
        assert_eq!(key_transitions(press, true), vec![down("Alt")]);

        let release = key(KeyCode::Char('n'), KeyModifiers::ALT, KeyEventKind::Release);
        assert_eq!(key_transitions(release, true), vec![up("n")]);

        let chorded = key(KeyCode::Char('n'), KeyModifiers::ALT, KeyEventKind::Press);
        assert_eq!(key_transitions(chorded, true), vec![down("n")]);
    }

    #[test]
    fn shift_is_folded_into_the_character() {
        let transitions = key_transitions(
            key(KeyCode::Char('N'), KeyModifiers::SHIFT, KeyEventKind::Press),
            false,
        );
        assert_eq!(transitions, vec![down("N"), up("N")]);
    }

    #[test]
    fn untracked_keys_produce_nothing() {
        let transitions = key_transitions(
            key(KeyCode::CapsLock, KeyModifiers::NONE, KeyEventKind::Press),
            false,
        );
        assert!(transitions.is_empty());
    }

    #[test]
    fn text_mode_ignores_chorded_characters() {
        let alt_n = key(KeyCode::Char('n'), KeyModifiers::ALT, KeyEventKind::Press);
        assert_eq!(action_for_key(alt_n, true), KeyAction::Noop);
        let plain = key(KeyCode::Char('n'), KeyModifiers::NONE, KeyEventKind::Press);
        assert_eq!(action_for_key(plain, true), KeyAction::InputChar('n'));
    }

    #[test]
    fn shifted_arrows_nudge_nodes() {
        let shifted = key(KeyCode::Left, KeyModifiers::SHIFT, KeyEventKind::Press);
        assert_eq!(
            action_for_key(shifted, false),
            KeyAction::Nudge(Direction::Left)
        );
        let plain = key(KeyCode::Left, KeyModifiers::NONE, KeyEventKind::Press);
        assert_eq!(action_for_key(plain, false), KeyAction::Move(Direction::Left));
    }
}
