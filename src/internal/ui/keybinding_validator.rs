use crate::config::KeyBindingConfig;
use crate::internal::ui::app::Action;
use crate::internal::ui::keybindings::parse_key_str;
use crossterm::event::KeyEvent;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct ConflictReport {
    pub description: String,
    pub keys: String,
    pub context: String,
}

/// Problems in user keybinding overrides: unparseable key strings, and
/// context bindings that shadow a universal (global) binding.
pub fn detect_conflicts(config: &KeyBindingConfig) -> Vec<ConflictReport> {
    let mut conflicts = Vec::new();

    let global_keys: HashMap<KeyEvent, Action> = config
        .global
        .iter()
        .filter_map(|(k, a)| parse_key_str(k).map(|key| (key, *a)))
        .collect();

    let mut check_context = |context_name: &str, bindings: &HashMap<String, Action>| {
        for (key, action) in bindings {
            let Some(parsed) = parse_key_str(key) else {
                conflicts.push(ConflictReport {
                    description: format!("{context_name} key '{key}' cannot be parsed"),
                    keys: key.clone(),
                    context: context_name.to_string(),
                });
                continue;
            };

            if context_name == "Global" {
                continue;
            }

            // Global bindings win in every mode, so a different context action is unreachable
            if let Some(global_action) = global_keys.get(&parsed)
                && global_action != action
            {
                conflicts.push(ConflictReport {
                    description: format!(
                        "{context_name} key '{key}' shadows Global key (Global: {global_action:?}, {context_name}: {action:?})"
                    ),
                    keys: key.clone(),
                    context: context_name.to_string(),
                });
            }
        }
    };

    check_context("Global", &config.global);
    check_context("Navigation", &config.navigation);
    check_context("Panel", &config.panel);
    check_context("Help", &config.help);

    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_shadowed_global_and_bad_keys() {
        let mut config = KeyBindingConfig::default();
        config.global.insert("Ctrl+x".to_string(), Action::Quit);
        config.navigation.insert("Ctrl+X".to_string(), Action::Refresh);
        config.panel.insert("Super+Nope".to_string(), Action::Back);

        let conflicts = detect_conflicts(&config);
        assert_eq!(conflicts.len(), 2);
        assert!(conflicts.iter().any(|c| c.context == "Navigation" && c.keys == "Ctrl+X"));
        assert!(conflicts.iter().any(|c| c.context == "Panel"));
    }

    #[test]
    fn test_same_action_is_not_a_conflict() {
        let mut config = KeyBindingConfig::default();
        config.global.insert("Ctrl+x".to_string(), Action::Quit);
        config.help.insert("Ctrl+x".to_string(), Action::Quit);
        assert!(detect_conflicts(&config).is_empty());
    }
}
