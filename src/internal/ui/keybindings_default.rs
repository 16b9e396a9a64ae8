use crate::internal::ui::app::Action;
use crate::internal::ui::keybindings::{KeyBindingContext, KeyBindingMap};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Create default keybindings for the application
pub fn create_default_keybindings() -> KeyBindingMap {
    let mut map = KeyBindingMap::new();

    add_global_bindings(&mut map);
    add_navigation_bindings(&mut map);
    add_panel_bindings(&mut map);
    add_help_bindings(&mut map);

    map
}

fn add_global_bindings(map: &mut KeyBindingMap) {
    // Universal quit, honored in every mode including search entry
    map.add_binding(
        KeyBindingContext::Global,
        KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
        Action::Quit,
    );
}

fn add_navigation_bindings(map: &mut KeyBindingMap) {
    let ctx = KeyBindingContext::Navigation;

    map.add_binding(ctx, key('q'), Action::Quit);

    // Selection
    map.add_binding(ctx, key('j'), Action::MoveDown);
    map.add_binding(ctx, key('k'), Action::MoveUp);
    map.add_binding(ctx, key_code(KeyCode::Down), Action::MoveDown);
    map.add_binding(ctx, key_code(KeyCode::Up), Action::MoveUp);
    map.add_binding(ctx, key('g'), Action::JumpToTop);
    map.add_binding(ctx, key('G'), Action::JumpToBottom);
    map.add_binding(ctx, key_code(KeyCode::Home), Action::JumpToTop);
    map.add_binding(ctx, key_code(KeyCode::End), Action::JumpToBottom);

    // Story actions
    map.add_binding(ctx, key_code(KeyCode::Enter), Action::OpenPanel);
    map.add_binding(ctx, key(' '), Action::OpenComments);
    map.add_binding(ctx, key('o'), Action::OpenArticle);
    map.add_binding(ctx, key('d'), Action::RemoveStory);

    // Search / sort
    map.add_binding(ctx, key('/'), Action::StartSearch);
    map.add_binding(ctx, key('s'), Action::ToggleSort);
    map.add_binding(ctx, key('S'), Action::ToggleDateOrder);

    // Tabs
    map.add_binding(ctx, key('r'), Action::Refresh);
    map.add_binding(ctx, key_code(KeyCode::Tab), Action::NextTab);
    map.add_binding(ctx, key_code(KeyCode::BackTab), Action::PrevTab);
    for n in 1..=9u8 {
        map.add_binding(ctx, key((b'0' + n) as char), Action::SelectTab(n as usize));
    }

    map.add_binding(ctx, key('?'), Action::ToggleHelp);
}

fn add_panel_bindings(map: &mut KeyBindingMap) {
    let ctx = KeyBindingContext::Panel;

    map.add_binding(ctx, key('q'), Action::Quit);
    map.add_binding(ctx, key_code(KeyCode::Esc), Action::Back);

    map.add_binding(ctx, key('j'), Action::MoveDown);
    map.add_binding(ctx, key('k'), Action::MoveUp);
    map.add_binding(ctx, key_code(KeyCode::Down), Action::MoveDown);
    map.add_binding(ctx, key_code(KeyCode::Up), Action::MoveUp);
    map.add_binding(ctx, key_code(KeyCode::Enter), Action::Confirm);

    // Shortcuts for the three options
    map.add_binding(ctx, key('c'), Action::OpenComments);
    map.add_binding(ctx, key(' '), Action::OpenComments);
    map.add_binding(ctx, key('o'), Action::OpenArticle);
    map.add_binding(ctx, key('d'), Action::RemoveStory);
}

fn add_help_bindings(map: &mut KeyBindingMap) {
    let ctx = KeyBindingContext::Help;

    map.add_binding(ctx, key('q'), Action::Quit);
    map.add_binding(ctx, key_code(KeyCode::Esc), Action::Back);
}

/// Helper to create a simple char key event
fn key(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::empty())
}

/// Helper to create a key event from KeyCode
fn key_code(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::empty())
}
