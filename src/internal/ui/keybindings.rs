use crate::internal::ui::app::Action;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::HashMap;

/// Which binding table a key is looked up in. Search entry is not listed:
/// it consumes raw text input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyBindingContext {
    /// Checked first in every mode; holds only the universal bindings.
    Global,
    Navigation,
    /// Modal and drawer.
    Panel,
    Help,
}

/// Maps key events to actions
#[derive(Debug, Clone, Default)]
pub struct KeyBindingMap {
    global: HashMap<KeyEvent, Action>,
    navigation: HashMap<KeyEvent, Action>,
    panel: HashMap<KeyEvent, Action>,
    help: HashMap<KeyEvent, Action>,
}

impl KeyBindingMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self, context: KeyBindingContext) -> &HashMap<KeyEvent, Action> {
        match context {
            KeyBindingContext::Global => &self.global,
            KeyBindingContext::Navigation => &self.navigation,
            KeyBindingContext::Panel => &self.panel,
            KeyBindingContext::Help => &self.help,
        }
    }

    /// Action bound to `key` in exactly `context`, without global fallback.
    ///
    /// Modes are exclusive, so a key bound only in Navigation does nothing in
    /// Help; universal bindings are looked up separately in `Global`.
    pub fn get_action(&self, key: &KeyEvent, context: KeyBindingContext) -> Option<Action> {
        self.map(context).get(&normalize_key(*key)).copied()
    }

    pub fn add_binding(&mut self, context: KeyBindingContext, key: KeyEvent, action: Action) {
        let map = match context {
            KeyBindingContext::Global => &mut self.global,
            KeyBindingContext::Navigation => &mut self.navigation,
            KeyBindingContext::Panel => &mut self.panel,
            KeyBindingContext::Help => &mut self.help,
        };
        map.insert(normalize_key(key), action);
    }

    /// Merge custom keybindings from configuration
    pub fn merge_config(&mut self, config: &crate::config::KeyBindingConfig) {
        let mut merge = |ctx: KeyBindingContext, bindings: &HashMap<String, Action>| {
            for (key_str, action) in bindings {
                match parse_key_str(key_str) {
                    Some(key_event) => self.add_binding(ctx, key_event, *action),
                    None => tracing::warn!("Invalid key string in config: {}", key_str),
                }
            }
        };

        merge(KeyBindingContext::Global, &config.global);
        merge(KeyBindingContext::Navigation, &config.navigation);
        merge(KeyBindingContext::Panel, &config.panel);
        merge(KeyBindingContext::Help, &config.help);
    }

    /// Keys bound to `action` in `context`, for the help overlay.
    pub fn keys_for(&self, action: Action, context: KeyBindingContext) -> Vec<String> {
        let mut keys: Vec<String> = self
            .map(context)
            .iter()
            .filter(|(_, a)| **a == action)
            .map(|(k, _)| describe_key(k))
            .collect();
        keys.sort();
        keys
    }
}

/// Canonical form used as the map key: press kind, no state flags, and
/// SHIFT dropped where it is already encoded in the key code.
pub fn normalize_key(key: KeyEvent) -> KeyEvent {
    let mut modifiers = key.modifiers;
    let code = match key.code {
        KeyCode::Char(c) if modifiers.contains(KeyModifiers::CONTROL) => {
            KeyCode::Char(c.to_ascii_lowercase())
        }
        KeyCode::Tab if modifiers.contains(KeyModifiers::SHIFT) => KeyCode::BackTab,
        other => other,
    };
    if matches!(code, KeyCode::Char(_) | KeyCode::BackTab) {
        modifiers.remove(KeyModifiers::SHIFT);
    }
    KeyEvent::new(code, modifiers)
}

/// Parse a key string into a KeyEvent
/// Supported formats:
/// - Single char: "j", "G", "1"
/// - Special keys: "Enter", "Tab", "Esc", "Space", "Up", "Down", "Left", "Right"
/// - With modifiers: "Ctrl+C", "Shift+Tab"
pub fn parse_key_str(key_str: &str) -> Option<KeyEvent> {
    let parts: Vec<&str> = key_str.split('+').collect();
    // "+" itself, or a modifier followed by "+"
    let (modifier_parts, key_part) = match parts.as_slice() {
        [single] => (&[][..], *single),
        [rest @ .., "", ""] => (rest, "+"),
        [rest @ .., last] => (rest, *last),
        [] => return None,
    };

    let mut modifiers = KeyModifiers::empty();
    for modifier in modifier_parts {
        match modifier.to_lowercase().as_str() {
            "ctrl" => modifiers |= KeyModifiers::CONTROL,
            "shift" => modifiers |= KeyModifiers::SHIFT,
            "alt" => modifiers |= KeyModifiers::ALT,
            _ => return None, // Invalid modifier
        }
    }

    let code = match key_part {
        "Enter" => KeyCode::Enter,
        "Tab" => KeyCode::Tab,
        "BackTab" => KeyCode::BackTab,
        "Esc" => KeyCode::Esc,
        "Space" => KeyCode::Char(' '),
        "Up" => KeyCode::Up,
        "Down" => KeyCode::Down,
        "Left" => KeyCode::Left,
        "Right" => KeyCode::Right,
        "Backspace" => KeyCode::Backspace,
        "Delete" => KeyCode::Delete,
        "Home" => KeyCode::Home,
        "End" => KeyCode::End,
        "PageUp" => KeyCode::PageUp,
        "PageDown" => KeyCode::PageDown,
        s => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => KeyCode::Char(c),
                _ => return None, // Unknown key
            }
        }
    };

    Some(normalize_key(KeyEvent::new(code, modifiers)))
}

/// Human-readable label, the inverse of [`parse_key_str`] for common keys.
pub fn describe_key(key: &KeyEvent) -> String {
    let base = match key.code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::BackTab => "Shift+Tab".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Up => "↑".to_string(),
        KeyCode::Down => "↓".to_string(),
        KeyCode::Left => "←".to_string(),
        KeyCode::Right => "→".to_string(),
        KeyCode::Backspace => "Backspace".to_string(),
        KeyCode::Delete => "Delete".to_string(),
        KeyCode::Home => "Home".to_string(),
        KeyCode::End => "End".to_string(),
        KeyCode::PageUp => "PageUp".to_string(),
        KeyCode::PageDown => "PageDown".to_string(),
        other => format!("{other:?}"),
    };
    let mut prefix = String::new();
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        prefix.push_str("Ctrl+");
    }
    if key.modifiers.contains(KeyModifiers::ALT) {
        prefix.push_str("Alt+");
    }
    format!("{prefix}{base}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_char() {
        let key = parse_key_str("j").unwrap();
        assert_eq!(key.code, KeyCode::Char('j'));
        assert_eq!(key.modifiers, KeyModifiers::empty());
    }

    #[test]
    fn test_parse_special_key() {
        assert_eq!(parse_key_str("Enter").unwrap().code, KeyCode::Enter);
        assert_eq!(parse_key_str("Space").unwrap().code, KeyCode::Char(' '));
        assert_eq!(parse_key_str("Shift+Tab").unwrap().code, KeyCode::BackTab);
        assert!(parse_key_str("Hyper+x").is_none());
        assert!(parse_key_str("Nope").is_none());
    }

    #[test]
    fn test_parse_ctrl_matches_terminal_event() {
        let parsed = parse_key_str("Ctrl+C").unwrap();
        let from_terminal = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(parsed, normalize_key(from_terminal));
    }

    #[test]
    fn test_shifted_char_is_matched_without_shift() {
        let mut map = KeyBindingMap::new();
        map.add_binding(
            KeyBindingContext::Navigation,
            parse_key_str("G").unwrap(),
            Action::JumpToBottom,
        );

        let typed = KeyEvent::new(KeyCode::Char('G'), KeyModifiers::SHIFT);
        assert_eq!(
            map.get_action(&typed, KeyBindingContext::Navigation),
            Some(Action::JumpToBottom)
        );
    }

    #[test]
    fn test_contexts_do_not_fall_back() {
        let mut map = KeyBindingMap::new();
        let key = KeyEvent::new(KeyCode::Char('j'), KeyModifiers::empty());
        map.add_binding(KeyBindingContext::Navigation, key, Action::MoveDown);

        assert_eq!(map.get_action(&key, KeyBindingContext::Help), None);
        assert_eq!(
            map.get_action(&key, KeyBindingContext::Navigation),
            Some(Action::MoveDown)
        );
    }

    #[test]
    fn test_describe_key_round_trips_common_keys() {
        for s in ["j", "Enter", "Ctrl+c", "Shift+Tab", "Space"] {
            let key = parse_key_str(s).unwrap();
            assert_eq!(parse_key_str(&describe_key(&key)), Some(key), "{s}");
        }
    }
}
